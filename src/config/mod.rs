//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (single gateway) ──┐
//! config file (TOML)           ├→ loader.rs (parse & deserialize)
//!                              │  → validation.rs (semantic checks)
//!                              └→ BridgeConfig (validated, immutable)
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → gateways handed to the route table builder
//!     → atomic swap of Arc<RouteTable>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields except the gateway list have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BridgeConfig, GatewayConfig, LifecycleConfig, LimitsConfig, ListenerConfig,
    ObservabilityConfig, RemoteConfig, TimeoutConfig,
};
