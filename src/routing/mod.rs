//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup / reload):
//!     GatewayConfig[]
//!     → builder.rs (concurrent resolution against the remote API)
//!     → compiler.rs (path template → anchored pattern)
//!     → table.rs (ordered, duplicate-free, frozen)
//!
//! Incoming Request (method, path)
//!     → router.rs (normalize, ordered scan)
//!     → Return: RouteEntry, NotFound or MethodNotAllowed
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (definition order, then discovery order)

pub mod builder;
pub mod compiler;
pub mod router;
pub mod table;

pub use builder::{BuildError, RouteTableBuilder};
pub use compiler::{compile, CompiledTemplate, TemplateError};
pub use router::{normalize_path, RouteError};
pub use table::{Route, RouteEntry, RouteTable, ANY_METHOD};
