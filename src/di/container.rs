use super::Instance;
use super::binding::Binding;
use super::resolver::{ConstructionContext, Resolver, inject_fields};
use crate::config::ContainerConfig;
use crate::error::{ContainerError, ErrorKind, Result};
use crate::lifecycle::{self, ContainerState, ShutdownReport};
use crate::module::{Blueprint, Callback, Module, ModuleDescriptor, ModuleInfo, ModuleType};
use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::TypeId;
use std::sync::Arc;

/// The externally owned root object.
#[derive(Clone)]
pub(crate) struct Host {
    pub(crate) module_type: ModuleType,
    pub(crate) instance: Instance,
}

/// Singleton module container.
///
/// Modules are constructed on demand, exactly once, and torn down in reverse
/// registration order by [`Container::shutdown`]. Lookups through
/// [`Container::get_module`] are safe from any thread; registration and
/// shutdown are serialized internally.
///
/// # Example
/// ```rust,ignore
/// let container = Container::with_host(Arc::new(MyPlugin::default()));
/// container.register_module::<CommandManager>()?;
///
/// let commands = container.get_module::<CommandManager>()?;
/// // ...
/// container.shutdown();
/// ```
pub struct Container {
    config: ContainerConfig,
    host: Option<Host>,
    catalog: DashMap<TypeId, Blueprint>,
    modules: DashMap<TypeId, ModuleDescriptor>,
    ledger: RwLock<Vec<ModuleType>>,
    pub(crate) bindings: DashMap<TypeId, Vec<Binding>>,
    state: RwLock<ContainerState>,
    registration: ReentrantMutex<()>,
    construction: Mutex<ConstructionContext>,
}

impl Container {
    /// A container without a host object, with default configuration.
    pub fn new() -> Self {
        Self::from_parts(ContainerConfig::default(), None)
    }

    /// A container whose host object is `host`.
    pub fn with_host<H: Send + Sync + 'static>(host: Arc<H>) -> Self {
        Self::from_parts(
            ContainerConfig::default(),
            Some(Host {
                module_type: ModuleType::of::<H>(),
                instance: host,
            }),
        )
    }

    pub(crate) fn from_parts(config: ContainerConfig, host: Option<Host>) -> Self {
        let catalog = DashMap::new();
        for blueprint in crate::module::registration::registered_blueprints() {
            catalog.insert(blueprint.module_type.id(), blueprint);
        }

        Self {
            config,
            host,
            catalog,
            modules: DashMap::new(),
            ledger: RwLock::new(Vec::new()),
            bindings: DashMap::new(),
            state: RwLock::new(ContainerState::Uninitialized),
            registration: ReentrantMutex::new(()),
            construction: Mutex::new(ConstructionContext::default()),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn state(&self) -> ContainerState {
        *self.state.read()
    }

    pub fn host_type(&self) -> Option<ModuleType> {
        self.host.as_ref().map(|host| host.module_type)
    }

    /// Declare `T` as a module type this container may construct.
    ///
    /// Types using `#[module]` are declared automatically; this is for
    /// hand-written [`Module`] impls.
    pub fn declare<T: Module>(&self) -> &Self {
        self.declare_blueprint(Blueprint::of::<T>());
        self
    }

    pub(crate) fn declare_blueprint(&self, blueprint: Blueprint) {
        self.catalog.insert(blueprint.module_type.id(), blueprint);
    }

    pub fn is_declared(&self, module: ModuleType) -> bool {
        self.catalog.contains_key(&module.id())
    }

    /// Construct and register `T` together with everything it depends on.
    ///
    /// Registering an already registered type returns the existing instance
    /// without running its post-construct callbacks again.
    ///
    /// # Errors
    /// Fails if any dependency cannot be resolved, a dependency cycle is found, a
    /// constructor fails, or a post-construct callback fails. The error names
    /// `T`; nothing that failed is added to the registry.
    pub fn register_module<T: Module>(&self) -> Result<Arc<T>> {
        self.declare::<T>();
        let instance = self.register_type(ModuleType::of::<T>())?;
        downcast::<T>(instance)
    }

    /// Type-erased [`Container::register_module`], for discovery feeds.
    pub fn register_type(&self, module: ModuleType) -> Result<Instance> {
        let _guard = self.registration.lock();
        self.activate("register module")?;

        if let Some(existing) = self.registered_instance(module) {
            tracing::debug!("Module already registered: {}", module);
            return Ok(existing);
        }

        let mut resolver = Resolver::new(self);
        match resolver.resolve(module) {
            Ok(Some(instance)) => Ok(instance),
            Ok(None) => Err(ContainerError::wrap(
                module.name(),
                ContainerError::NotAModule {
                    module: module.name(),
                },
            )),
            Err(e) => {
                tracing::error!("Failed to register module {}: {}", module, e);
                Err(ContainerError::wrap(module.name(), e))
            }
        }
    }

    /// Register every type of a discovery feed, in feed order.
    ///
    /// With `continue_on_failure` set, failures are logged and returned while the
    /// remaining types are still attempted; otherwise the first failure aborts.
    pub fn register_all<I>(&self, modules: I) -> Result<Vec<(ModuleType, ContainerError)>>
    where
        I: IntoIterator<Item = ModuleType>,
    {
        let mut failures = Vec::new();
        for module in modules {
            match self.register_type(module) {
                Ok(_) => {}
                Err(e) if self.config.continue_on_failure && e.kind() != ErrorKind::State => {
                    tracing::error!("Skipping module {}: {}", module, e);
                    failures.push((module, e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(failures)
    }

    /// Register the host object itself.
    ///
    /// The host is inserted into the registry before its `#[inject]` fields are
    /// filled, then its post-construct callbacks run. It takes part in shutdown
    /// ordering like any other module.
    pub fn register_host<H: Module>(&self) -> Result<Arc<H>> {
        let _guard = self.registration.lock();
        self.activate("register host")?;

        let module = ModuleType::of::<H>();
        let host = match &self.host {
            Some(host) if host.module_type == module => host.clone(),
            Some(host) => {
                return Err(ContainerError::HostMismatch {
                    expected: host.module_type.name(),
                    actual: module.name(),
                });
            }
            None => {
                return Err(ContainerError::HostMismatch {
                    expected: "<none>",
                    actual: module.name(),
                });
            }
        };

        let typed = downcast::<H>(Arc::clone(&host.instance))?;
        if self.modules.contains_key(&module.id()) {
            return Ok(typed);
        }

        self.insert(ModuleDescriptor::new(
            module,
            Arc::clone(&host.instance),
            Vec::new(),
            Vec::new(),
        ));

        match self.wire_host(&typed, &host.instance) {
            Ok((post_construct, pre_destroy)) => {
                if let Some(mut descriptor) = self.modules.get_mut(&module.id()) {
                    descriptor.post_construct = post_construct;
                    descriptor.pre_destroy = pre_destroy;
                }
                Ok(typed)
            }
            Err(e) => {
                self.modules.remove(&module.id());
                self.ledger.write().retain(|ty| *ty != module);
                tracing::error!("Failed to register host {}: {}", module, e);
                Err(ContainerError::wrap(module.name(), e))
            }
        }
    }

    fn wire_host<H: Module>(
        &self,
        host: &Arc<H>,
        instance: &Instance,
    ) -> Result<(Vec<Callback>, Vec<Callback>)> {
        let mut resolver = Resolver::new(self);
        inject_fields(host.as_ref(), &mut resolver)?;
        let (post_construct, pre_destroy) = lifecycle::bind_lifecycle::<H>(instance)?;
        lifecycle::run_post_construct(ModuleType::of::<H>(), &post_construct)?;
        Ok((post_construct, pre_destroy))
    }

    /// Look up a registered module. Never constructs anything.
    ///
    /// # Errors
    /// `NotRegistered` if `T` has not been registered (and is not the host).
    pub fn get_module<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let instance = self.get_instance(ModuleType::of::<T>())?;
        downcast::<T>(instance)
    }

    /// Type-erased [`Container::get_module`].
    pub fn get_instance(&self, module: ModuleType) -> Result<Instance> {
        self.ensure_readable("get module")?;

        if let Some(host) = self.host_instance(module) {
            return Ok(host);
        }

        self.registered_instance(module)
            .ok_or(ContainerError::NotRegistered {
                module: module.name(),
            })
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_type(ModuleType::of::<T>())
    }

    pub fn contains_type(&self, module: ModuleType) -> bool {
        self.modules.contains_key(&module.id())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered types, in registration order.
    pub fn registration_order(&self) -> Vec<ModuleType> {
        self.ledger.read().clone()
    }

    /// Snapshots of every registered module, in registration order.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.registration_order()
            .iter()
            .filter_map(|ty| self.modules.get(&ty.id()).map(|d| d.info()))
            .collect()
    }

    /// Tear down every module in reverse registration order.
    ///
    /// Pre-destroy callbacks that fail or panic are logged and skipped; every
    /// module still gets its teardown attempt. Afterwards the registry is empty
    /// and the container only accepts further `shutdown` calls, which are no-ops.
    pub fn shutdown(&self) -> ShutdownReport {
        let _guard = self.registration.lock();
        {
            let mut state = self.state.write();
            if matches!(
                *state,
                ContainerState::ShuttingDown | ContainerState::Terminated
            ) {
                tracing::debug!("Container already {}, ignoring shutdown", *state);
                return ShutdownReport::default();
            }
            *state = ContainerState::ShuttingDown;
        }

        let ledger = std::mem::take(&mut *self.ledger.write());
        tracing::info!("Shutting down container ({} modules)...", ledger.len());

        let mut report = ShutdownReport::default();
        for module in ledger.iter().rev() {
            let callbacks = self
                .modules
                .get(&module.id())
                .map(|descriptor| descriptor.pre_destroy.clone());

            if let Some(callbacks) = callbacks {
                tracing::debug!("Destroying: {}", module);
                lifecycle::run_pre_destroy(*module, &callbacks, &mut report);
                report.destroyed.push(*module);
            }
        }

        self.modules.clear();
        self.bindings.clear();
        *self.state.write() = ContainerState::Terminated;

        tracing::info!(
            "Container shutdown complete ({} modules destroyed, {} callback failures)",
            report.destroyed.len(),
            report.failures.len()
        );
        report
    }

    pub(crate) fn host_instance(&self, module: ModuleType) -> Option<Instance> {
        self.host
            .as_ref()
            .filter(|host| host.module_type == module)
            .map(|host| Arc::clone(&host.instance))
    }

    pub(crate) fn registered_instance(&self, module: ModuleType) -> Option<Instance> {
        self.modules
            .get(&module.id())
            .map(|descriptor| Arc::clone(&descriptor.instance))
    }

    pub(crate) fn blueprint(&self, module: ModuleType) -> Option<Blueprint> {
        self.catalog.get(&module.id()).map(|entry| *entry)
    }

    /// Mark `module` as under construction, returning the new depth.
    ///
    /// Only called with the registration lock held.
    pub(crate) fn enter_construction(&self, module: ModuleType) -> Result<usize> {
        let mut context = self.construction.lock();
        context.enter(module)?;
        Ok(context.depth())
    }

    pub(crate) fn leave_construction(&self, module: ModuleType) {
        self.construction.lock().leave(module);
    }

    pub(crate) fn insert(&self, descriptor: ModuleDescriptor) {
        let module = descriptor.module_type;
        self.modules.insert(module.id(), descriptor);
        self.ledger.write().push(module);

        if self.config.debug {
            tracing::info!("Registered: {}", module);
        } else {
            tracing::debug!("Registered: {}", module);
        }
    }

    fn activate(&self, operation: &'static str) -> Result<()> {
        let mut state = self.state.write();
        match *state {
            ContainerState::Uninitialized => {
                *state = ContainerState::Active;
                Ok(())
            }
            ContainerState::Active => Ok(()),
            current => Err(ContainerError::InvalidState {
                operation,
                state: current,
            }),
        }
    }

    fn ensure_readable(&self, operation: &'static str) -> Result<()> {
        let state = self.state();
        if state.is_open() {
            Ok(())
        } else {
            Err(ContainerError::InvalidState { operation, state })
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::DowncastFailed {
            type_name: std::any::type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{Constructor, InjectionPoint, Injected};
    use crate::lifecycle::LifecycleMethod;
    use crate::module::Injectable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static EVENTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn record(event: impl Into<String>) {
        EVENTS.lock().push(event.into());
    }

    // Tests touching EVENTS run under this lock so they do not interleave.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn take_events() -> Vec<String> {
        std::mem::take(&mut *EVENTS.lock())
    }

    #[derive(Debug)]
    struct Config;

    impl Injectable for Config {}

    impl Module for Config {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_| {
                record("Config::new");
                Ok(Config)
            })]
        }

        fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
            vec![LifecycleMethod::pre_destroy("save", |_: &Config| {
                record("Config::save");
                Ok(())
            })]
        }
    }

    struct Events {
        config: Arc<Config>,
    }

    impl Injectable for Events {}

    impl Module for Events {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("empty", |_| {
                    record("Events::empty");
                    Ok(Events {
                        config: Arc::new(Config),
                    })
                }),
                Constructor::new("new", |args| {
                    record("Events::new");
                    Ok(Events {
                        config: args.take::<Config>()?,
                    })
                })
                .param::<Config>()
                .inject(),
            ]
        }

        fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
            vec![LifecycleMethod::pre_destroy("unregister", |_: &Events| {
                record("Events::unregister");
                Err(anyhow::anyhow!("listener still attached"))
            })]
        }
    }

    struct Commands {
        events: Injected<Events>,
        started: AtomicUsize,
    }

    impl Injectable for Commands {
        fn injection_points() -> Vec<InjectionPoint<Self>> {
            vec![InjectionPoint::new("events", |c: &Commands| &c.events)]
        }
    }

    impl Module for Commands {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_| {
                Ok(Commands {
                    events: Injected::default(),
                    started: AtomicUsize::new(0),
                })
            })]
        }

        fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
            vec![
                LifecycleMethod::post_construct("start", |c: &Commands| {
                    assert!(c.events.is_injected());
                    c.started.fetch_add(1, Ordering::SeqCst);
                    record("Commands::start");
                    Ok(())
                }),
                LifecycleMethod::pre_destroy("stop", |_: &Commands| {
                    record("Commands::stop");
                    Ok(())
                }),
            ]
        }
    }

    #[test]
    fn test_register_resolves_dependencies_transitively() {
        let _serial = SERIAL.lock();
        take_events();

        let container = Container::new();
        let commands = container.register_module::<Commands>().unwrap();

        assert_eq!(container.len(), 3);
        assert_eq!(container.state(), ContainerState::Active);
        let events = container.get_module::<Events>().unwrap();
        assert!(Arc::ptr_eq(commands.events.get().unwrap(), &events));
        assert!(Arc::ptr_eq(
            &events.config,
            &container.get_module::<Config>().unwrap()
        ));

        // Inject constructor wins over the nullary one.
        assert_eq!(
            take_events(),
            vec!["Config::new", "Events::new", "Commands::start"]
        );

        let order: Vec<&str> = container
            .registration_order()
            .iter()
            .map(|ty| ty.short_name())
            .collect();
        assert_eq!(order, vec!["Config", "Events", "Commands"]);
    }

    #[test]
    fn test_register_is_idempotent() {
        let _serial = SERIAL.lock();
        let container = Container::new();
        let first = container.register_module::<Commands>().unwrap();
        let second = container.register_module::<Commands>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.started.load(Ordering::SeqCst), 1);
        take_events();
    }

    #[test]
    fn test_shutdown_runs_pre_destroy_in_reverse_and_survives_failures() {
        let _serial = SERIAL.lock();
        let container = Container::new();
        container.register_module::<Commands>().unwrap();
        take_events();

        let report = container.shutdown();

        assert_eq!(
            take_events(),
            vec!["Commands::stop", "Events::unregister", "Config::save"]
        );
        assert_eq!(report.destroyed.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert!(container.is_empty());
        assert_eq!(container.state(), ContainerState::Terminated);
    }

    #[test]
    fn test_operations_rejected_after_shutdown() {
        let container = Container::new();
        let _ = container.shutdown();

        let err = container.register_module::<Config>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let err = container.get_module::<Config>().unwrap_err();
        assert!(matches!(err, ContainerError::InvalidState { .. }));

        // second shutdown is a no-op
        assert!(container.shutdown().destroyed.is_empty());
    }

    #[test]
    fn test_get_module_never_constructs() {
        let container = Container::new();
        container.declare::<Config>();

        let err = container.get_module::<Config>().unwrap_err();
        assert!(matches!(err, ContainerError::NotRegistered { .. }));
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(container.is_empty());
    }

    #[test]
    fn test_undeclared_dependency_is_configuration_error() {
        struct Orphan;
        #[derive(Debug)]
        struct NeedsOrphan;

        impl Injectable for NeedsOrphan {}
        impl Module for NeedsOrphan {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |_| Ok(NeedsOrphan)).param::<Orphan>()]
            }
        }

        let container = Container::new();
        let err = container.register_module::<NeedsOrphan>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            err.root(),
            ContainerError::UnresolvableDependency { .. }
        ));
        assert!(!container.contains::<NeedsOrphan>());
    }

    #[test]
    fn test_host_resolves_without_construction() {
        struct Plugin {
            name: &'static str,
        }
        struct UsesPlugin {
            plugin: Arc<Plugin>,
        }

        impl Injectable for UsesPlugin {}
        impl Module for UsesPlugin {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |args| {
                    Ok(UsesPlugin {
                        plugin: args.take::<Plugin>()?,
                    })
                })
                .param::<Plugin>()]
            }
        }

        let host = Arc::new(Plugin { name: "quill" });
        let container = Container::with_host(Arc::clone(&host));
        let module = container.register_module::<UsesPlugin>().unwrap();

        assert!(Arc::ptr_eq(&module.plugin, &host));
        assert_eq!(container.get_module::<Plugin>().unwrap().name, "quill");
        // the host is not registered as a module unless asked to be
        assert_eq!(container.len(), 1);
    }
}
