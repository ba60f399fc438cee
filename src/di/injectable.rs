use super::Instance;
use crate::module::ModuleType;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A field filled by the container after the owning module is constructed.
///
/// Constructors leave it empty with `Injected::default()`; the container sets it
/// exactly once before any lifecycle callback of the owner runs.
///
/// # Panics
///
/// Dereferencing before injection panics. Use [`Injected::get`] from code that
/// can run before the owner is registered (e.g. inside a constructor).
pub struct Injected<T: ?Sized> {
    slot: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Injected<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }

    pub fn is_injected(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Fill the slot. Fails if it already holds a value.
    pub fn set(&self, value: Arc<T>) -> Result<(), Arc<T>> {
        self.slot.set(value)
    }
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Deref for Injected<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self.slot.get() {
            Some(value) => value,
            None => panic!(
                "dependency '{}' accessed before injection",
                std::any::type_name::<T>()
            ),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("type", &std::any::type_name::<T>())
            .field("injected", &self.is_injected())
            .finish()
    }
}

type AssignFn<T> = Box<dyn Fn(&T, Instance) -> Result<(), String> + Send + Sync>;

/// One `#[inject]` field of `T`: the dependency type and how to store it.
pub struct InjectionPoint<T> {
    field: &'static str,
    dependency: ModuleType,
    assign: AssignFn<T>,
}

impl<T: 'static> InjectionPoint<T> {
    pub fn new<D: Send + Sync + 'static>(field: &'static str, slot: fn(&T) -> &Injected<D>) -> Self {
        Self {
            field,
            dependency: ModuleType::of::<D>(),
            assign: Box::new(move |owner, value| {
                let value = value.downcast::<D>().map_err(|_| {
                    format!("resolved value is not a {}", std::any::type_name::<D>())
                })?;
                slot(owner)
                    .set(value)
                    .map_err(|_| "field was already set".to_string())
            }),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn dependency(&self) -> ModuleType {
        self.dependency
    }

    pub(crate) fn assign(&self, owner: &T, value: Instance) -> Result<(), String> {
        (self.assign)(owner, value)
    }
}

impl<T> fmt::Debug for InjectionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("field", &self.field)
            .field("dependency", &self.dependency)
            .finish()
    }
}
