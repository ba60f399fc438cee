//! Application Bootstrap
//!
//! Provides a high-level API for bootstrapping a host application: the host
//! object, its core modules and every discovered module are registered in one
//! step, and torn down together on shutdown.

use super::{ShutdownReport, shutdown_signal};
use crate::config::ContainerConfig;
use crate::di::{Container, ContainerBuilder};
use crate::error::Result;
use crate::module::{Module, ModuleType, discover};
use std::future::Future;
use std::sync::Arc;

type HostRegistration = fn(&Container) -> Result<()>;

/// A bootstrapped application
///
/// # Example
///
/// ```rust,ignore
/// use quill::lifecycle::Application;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let app = Application::builder()
///         .host(Arc::new(MyPlugin::default()))
///         .config(ContainerConfig::from_env())
///         .module::<ConfigManager>()
///         .module::<EventManager>()
///         .discover(true)
///         .build()?;
///
///     app.wait_for_shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Application {
    container: Arc<Container>,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Tear down every registered module
    pub fn shutdown(&self) -> ShutdownReport {
        tracing::info!("Shutting down application...");
        let report = self.container.shutdown();
        tracing::info!("Application shutdown complete");
        report
    }

    /// Wait for `signal` to complete, then shut down
    pub async fn run_until<F: Future<Output = ()>>(&self, signal: F) -> ShutdownReport {
        signal.await;
        self.shutdown()
    }

    /// Wait for Ctrl+C or SIGTERM, then shut down
    pub async fn wait_for_shutdown(&self) -> ShutdownReport {
        self.run_until(shutdown_signal()).await
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    container: ContainerBuilder,
    host: Option<HostRegistration>,
    core_modules: Vec<ModuleType>,
    discover: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            container: ContainerBuilder::new(),
            host: None,
            core_modules: Vec::new(),
            discover: false,
        }
    }

    /// Set the host object; it is registered first, with its own injection and
    /// lifecycle callbacks
    pub fn host<H: Module>(mut self, host: Arc<H>) -> Self {
        self.container = self.container.host(host);
        let register: HostRegistration = |container| container.register_host::<H>().map(|_| ());
        self.host = Some(register);
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.container = self.container.config(config);
        self
    }

    /// Register `T` during bootstrap, before any discovered module
    pub fn module<T: Module>(mut self) -> Self {
        self.container = self.container.module::<T>();
        self.core_modules.push(ModuleType::of::<T>());
        self
    }

    /// Bind a trait to a concrete module
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        Impl: Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.container = self.container.bind::<Trait, Impl, F>(caster);
        self
    }

    /// Also register every `#[module]` type linked into the binary
    pub fn discover(mut self, enabled: bool) -> Self {
        self.discover = enabled;
        self
    }

    /// Build the container and register the host, core and discovered modules
    ///
    /// # Errors
    ///
    /// Returns the first registration error. Modules registered before the
    /// failure are torn down before returning.
    pub fn build(self) -> Result<Application> {
        let container = Arc::new(self.container.build());

        tracing::info!("Starting application bootstrap...");
        if let Err(e) = Self::bootstrap(&container, self.host, &self.core_modules, self.discover) {
            tracing::error!("Application bootstrap failed: {}", e);
            let report = container.shutdown();
            if !report.is_clean() {
                tracing::error!(
                    "{} pre-destroy callbacks failed while aborting bootstrap",
                    report.failures.len()
                );
            }
            return Err(e);
        }
        tracing::info!(
            "Application bootstrap complete ({} modules registered)",
            container.len()
        );

        Ok(Application { container })
    }

    fn bootstrap(
        container: &Container,
        host: Option<HostRegistration>,
        core_modules: &[ModuleType],
        discover_modules: bool,
    ) -> Result<()> {
        if let Some(register_host) = host {
            register_host(container)?;
        }

        for module in core_modules {
            container.register_type(*module)?;
        }

        if discover_modules {
            let failures = container.register_all(discover())?;
            if !failures.is_empty() {
                tracing::warn!("{} discovered modules failed to register", failures.len());
            }
        }
        Ok(())
    }
}
