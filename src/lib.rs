//! # Quill
//!
//! A module container with constructor and field injection for plugin-style
//! applications.
//!
//! A host application (a plugin, a daemon, a game server) is split into
//! long-lived singleton modules. Quill constructs each module once, wires its
//! dependencies, runs its post-construct hooks, and tears everything down in
//! reverse registration order when the host shuts down.
//!
//! ## Features
//!
//! - **Constructor Injection**: `Arc<T>` parameters are resolved recursively, on demand
//! - **Field Injection**: `#[inject]` fields are filled after construction, which
//!   allows the host object to take part in its own dependency graph
//! - **Lifecycle Hooks**: `#[post_construct]` and `#[pre_destroy]` methods
//! - **Cycle Detection**: dependency cycles are reported with the full path
//! - **Discovery**: every `#[module]` type linked into the binary can be registered in one call
//! - **Trait Object Support**: resolve `Arc<dyn Trait>` through explicit bindings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quill::prelude::*;
//!
//! // 1. Define a module with a constructor
//! #[derive(Injectable)]
//! pub struct ConfigManager { /* ... */ }
//!
//! #[module]
//! impl ConfigManager {
//!     fn new() -> Self { /* ... */ }
//!
//!     #[pre_destroy]
//!     fn save(&self) -> anyhow::Result<()> { /* ... */ }
//! }
//!
//! // 2. Depend on it through the constructor or a field
//! #[derive(Injectable)]
//! pub struct CommandManager {
//!     #[inject]
//!     config: Injected<ConfigManager>,
//! }
//!
//! #[module]
//! impl CommandManager {
//!     fn new() -> Self {
//!         Self { config: Injected::new() }
//!     }
//!
//!     #[post_construct]
//!     fn register_commands(&self) { /* ... */ }
//! }
//!
//! // 3. Bootstrap
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let container = Container::new();
//!     container.register_module::<CommandManager>()?;
//!
//!     let commands = container.get_module::<CommandManager>()?;
//!     // ...
//!
//!     shutdown_signal().await;
//!     container.shutdown();
//!     Ok(())
//! }
//! ```

extern crate self as quill;

pub mod config;
pub mod di;
pub mod error;
pub mod lifecycle;
pub mod module;

// Re-export core types
pub use config::ContainerConfig;
pub use di::{
    Arguments, Constructor, Container, ContainerBuilder, InjectionPoint, Injected, Instance,
};
pub use error::{ContainerError, ErrorKind, InjectionSite, Result};
pub use lifecycle::{
    Application, ApplicationBuilder, ContainerState, LifecycleMethod, Phase, ShutdownReport,
};
pub use module::{
    Callback, Injectable, Module, ModuleDescriptor, ModuleInfo, ModuleRegistration, ModuleType,
    discover,
};

// Re-export macros
pub use quill_macro::{Injectable as DeriveInjectable, module};

// Used by generated code
#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use inventory;

/// Prelude module for convenient imports
///
/// ```
/// use quill::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ContainerConfig;
    pub use crate::di::{Container, ContainerBuilder, Injected};
    pub use crate::error::{ContainerError, ErrorKind, Result};
    pub use crate::lifecycle::{Application, ApplicationBuilder, ContainerState, shutdown_signal};
    pub use crate::module::{Injectable, Module};
    pub use crate::{DeriveInjectable as Injectable, module};
    pub use std::sync::Arc;
}
