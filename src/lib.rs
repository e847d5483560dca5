//! gateway-bridge
//!
//! Serves the resources of one or more remote REST API gateways on a local
//! HTTP listener. Each local request is matched against a route table built
//! at startup and executed through the remote API's invoke call.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                gateway-bridge                │
//!                    │                                              │
//!  Client Request    │  ┌────────┐    ┌─────────┐    ┌───────────┐  │
//!  ──────────────────┼─▶│  http  │───▶│ routing │───▶│   http    │──┼──▶ remote
//!                    │  │ server │    │ router  │    │ forward   │  │    invoke
//!                    │  └────────┘    └────▲────┘    └───────────┘  │
//!                    │                     │                        │
//!                    │              ┌──────┴──────┐                 │
//!                    │              │   routing   │◀────────────────┼─── remote
//!                    │              │   builder   │  list/describe  │    metadata
//!                    │              └─────────────┘                 │
//!                    │                                              │
//!                    │  cli · config · lifecycle · observability    │
//!                    └──────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod remote;
pub mod routing;

pub use config::schema::BridgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RouteTable, RouteTableBuilder};
