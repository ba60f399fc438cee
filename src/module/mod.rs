use crate::di::{Constructor, InjectionPoint};
use crate::lifecycle::LifecycleMethod;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

mod descriptor;
pub(crate) mod registration;

pub use descriptor::{Callback, ModuleDescriptor, ModuleInfo};
pub use registration::{Blueprint, ModuleRegistration, discover};

/// Identity of a module type, used as the registry key.
///
/// Two `ModuleType`s are equal when they refer to the same Rust type; the name is
/// only carried along for diagnostics.
#[derive(Clone, Copy)]
pub struct ModuleType {
    id: TypeId,
    name: &'static str,
}

impl ModuleType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `my_plugin::storage::Database`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the type name.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for ModuleType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModuleType {}

impl Hash for ModuleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleType").field(&self.name).finish()
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Types whose `#[inject]` fields can be filled by the container.
///
/// This trait is normally implemented with `#[derive(Injectable)]`, which turns
/// every field marked `#[inject]` into an [`InjectionPoint`].
///
/// # Example
/// ```rust,ignore
/// use quill::{Injectable, Injected};
///
/// #[derive(Injectable)]
/// pub struct ScoreboardService {
///     #[inject]
///     config: Injected<ConfigManager>,
///     title: String,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// The injectable fields of this type, in declaration order.
    fn injection_points() -> Vec<InjectionPoint<Self>> {
        Vec::new()
    }
}

/// A type the container is allowed to construct and register.
///
/// Implemented by the `#[module]` attribute on the type's `impl` block. The
/// attribute also declares the type to every container through `inventory`, so
/// it can be resolved as a dependency without being registered explicitly.
///
/// # Example
/// ```rust,ignore
/// use quill::module;
/// use std::sync::Arc;
///
/// #[module]
/// impl ScoreboardService {
///     #[inject]
///     pub fn new(events: Arc<EventManager>) -> Self { /* ... */ }
///
///     #[post_construct]
///     fn start(&self) -> anyhow::Result<()> { Ok(()) }
///
///     #[pre_destroy]
///     fn stop(&self) { }
/// }
/// ```
pub trait Module: Injectable {
    /// Every constructor the type declares, in declaration order.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Post-construct and pre-destroy methods, in declaration order.
    fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
        Vec::new()
    }
}
