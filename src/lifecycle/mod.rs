//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Flags → Config → Validate → Logging/metrics → Route table → Listener
//!
//! Reload (reload.rs, --watch only):
//!     Config change → Rebuild → Swap on success
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain up to the grace period → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
