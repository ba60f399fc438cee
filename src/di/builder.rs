use super::container::Host;
use crate::config::ContainerConfig;
use crate::di::Container;
use crate::module::{Blueprint, Module, ModuleType};
use std::sync::Arc;

type BindFn = Box<dyn FnOnce(&Container)>;

/// Builder for constructing a module container
///
/// Use this to supply the host object and configuration, and to declare
/// hand-written modules and trait bindings before the container is created.
///
/// # Example
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .host(Arc::new(plugin))
///     .config(ContainerConfig::from_env())
///     .module::<LocalCache>()
///     .bind::<dyn Cache, LocalCache, _>(|c| c as Arc<dyn Cache>)
///     .build();
/// ```
pub struct ContainerBuilder {
    config: ContainerConfig,
    host: Option<Host>,
    blueprints: Vec<Blueprint>,
    bindings: Vec<BindFn>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            host: None,
            blueprints: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Set the host object the container treats as already constructed
    pub fn host<H: Send + Sync + 'static>(mut self, host: Arc<H>) -> Self {
        self.host = Some(Host {
            module_type: ModuleType::of::<H>(),
            instance: host,
        });
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare a module type without registering it
    pub fn module<T: Module>(mut self) -> Self {
        self.blueprints.push(Blueprint::of::<T>());
        self
    }

    /// Bind a trait to a concrete module
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        Impl: Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.bindings.push(Box::new(move |container: &Container| {
            container.bind::<Trait, Impl, F>(caster);
        }));
        self
    }

    /// Build the container
    pub fn build(self) -> Container {
        let container = Container::from_parts(self.config, self.host);
        for blueprint in self.blueprints {
            container.declare_blueprint(blueprint);
        }
        for bind in self.bindings {
            bind(&container);
        }
        container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
