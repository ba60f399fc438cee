//! Lifecycle Hooks Module
//!
//! Post-construct and pre-destroy callbacks, the container state machine, and
//! the application bootstrap built on top of them.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Container Creation                (Uninitialized)
//!    ↓
//! 2. First Registration                (Active)
//!    ↓
//! 3. Dependencies constructed, fields injected
//!    ↓
//! 4. #[post_construct] (each module)   ← Lifecycle Hook
//!    ↓
//! [Running...]
//!    ↓
//! 5. Shutdown Signal (SIGTERM/SIGINT)  (ShuttingDown)
//!    ↓
//! 6. #[pre_destroy] (reverse order)    ← Lifecycle Hook
//!    ↓
//! 7. Registry cleared                  (Terminated)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quill::{module, Injectable};
//!
//! #[derive(Injectable)]
//! pub struct DatabaseService {
//!     #[inject]
//!     config: Injected<ConfigManager>,
//! }
//!
//! #[module]
//! impl DatabaseService {
//!     fn new() -> Self { /* ... */ }
//!
//!     #[post_construct]
//!     fn connect(&self) -> anyhow::Result<()> {
//!         tracing::info!("Opening database connection");
//!         Ok(())
//!     }
//!
//!     #[pre_destroy]
//!     fn close(&self) {
//!         tracing::info!("Closing database connections");
//!     }
//! }
//! ```

mod application;
mod invoke;
mod scanner;
mod shutdown;
mod state;

pub use application::{Application, ApplicationBuilder};
pub use invoke::{DestroyFailure, ShutdownReport};
pub(crate) use invoke::{run_post_construct, run_pre_destroy};
pub(crate) use scanner::bind_lifecycle;
pub use scanner::{LifecycleMethod, Phase, ScannedLifecycle, scan};
pub use shutdown::shutdown_signal;
pub use state::ContainerState;
