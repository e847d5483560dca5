//! Remote API subsystem.
//!
//! # Data Flow
//! ```text
//! Startup / reload:
//!     GatewayConfig
//!     → connect (connection context: profile, region, endpoint)
//!     → describe_variant (stage variables, optional)
//!     → list_resources (paths + allowed methods)
//!
//! Per request:
//!     RouteEntry + inbound request
//!     → invoke (test-invoke call)
//!     → InvocationResult (status, multi-value headers, body)
//! ```
//!
//! # Design Decisions
//! - `RemoteDescriptor` is the only seam to the outside world; routing and
//!   forwarding never see HTTP client types
//! - Identity lookups are for reporting only, never on the request path

pub mod descriptor;
pub mod http;

pub use descriptor::{
    ConnectionContext, DescriptorError, Identity, Invocation, InvocationResult,
    MultiValueHeaders, RemoteDescriptor, Resource, Variant,
};
pub use http::HttpDescriptor;
