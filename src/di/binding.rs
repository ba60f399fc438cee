use super::{Container, Instance};
use crate::error::{ContainerError, Result};
use crate::module::ModuleType;
use std::any::TypeId;
use std::sync::Arc;

/// Casts a concrete module instance into an erased `Arc<Arc<dyn Trait>>`.
type CasterFn = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Binding {
    implementation: ModuleType,
    caster: CasterFn,
}

impl Binding {
    fn cast<T: ?Sized + Send + Sync + 'static>(&self, instance: Instance) -> Option<Arc<T>> {
        let wrapper = (self.caster)(instance)?;
        let inner = wrapper.downcast::<Arc<T>>().ok()?;
        Some(inner.as_ref().clone())
    }
}

impl Container {
    /// Bind a trait to a module implementing it.
    ///
    /// Several implementations may be bound to the same trait; [`Container::all_of`]
    /// returns every one that is registered.
    ///
    /// # Example
    /// ```rust,ignore
    /// container.bind::<dyn Command, TeleportCommand, _>(|c| c as Arc<dyn Command>);
    /// ```
    pub fn bind<Trait, Impl, F>(&self, caster: F) -> &Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        Impl: Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |instance: Instance| {
            let concrete = instance.downcast::<Impl>().ok()?;
            let trait_obj: Arc<Trait> = caster(concrete);
            Some(Arc::new(trait_obj) as Instance)
        });

        let implementation = ModuleType::of::<Impl>();
        let mut entry = self.bindings.entry(TypeId::of::<Trait>()).or_default();
        if entry.iter().any(|b| b.implementation == implementation) {
            tracing::warn!(
                "{} is already bound to {}",
                implementation,
                std::any::type_name::<Trait>()
            );
            return self;
        }
        entry.push(Binding {
            implementation,
            caster,
        });
        self
    }

    /// The first registered implementation bound to `Trait`, in binding order.
    pub fn get_trait<Trait: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<Trait>> {
        let not_found = || ContainerError::NotRegistered {
            module: std::any::type_name::<Trait>(),
        };

        let bindings = self
            .bindings
            .get(&TypeId::of::<Trait>())
            .map(|entry| entry.clone())
            .ok_or_else(not_found)?;

        for binding in bindings {
            if let Ok(instance) = self.get_instance(binding.implementation) {
                return binding
                    .cast::<Trait>(instance)
                    .ok_or(ContainerError::DowncastFailed {
                        type_name: std::any::type_name::<Trait>(),
                    });
            }
        }
        Err(not_found())
    }

    /// Every registered implementation bound to `Trait`, in registration order.
    pub fn all_of<Trait: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<Trait>> {
        let Some(bindings) = self
            .bindings
            .get(&TypeId::of::<Trait>())
            .map(|entry| entry.clone())
        else {
            return Vec::new();
        };

        self.registration_order()
            .into_iter()
            .filter_map(|module| {
                let binding = bindings.iter().find(|b| b.implementation == module)?;
                let instance = self.get_instance(module).ok()?;
                binding.cast::<Trait>(instance)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::di::Constructor;
    use crate::module::{Injectable, Module};
    use crate::Container;
    use std::sync::Arc;

    trait Command: Send + Sync {
        fn label(&self) -> &'static str;
    }

    macro_rules! command_module {
        ($name:ident, $label:literal) => {
            struct $name;

            impl Command for $name {
                fn label(&self) -> &'static str {
                    $label
                }
            }

            impl Injectable for $name {}

            impl Module for $name {
                fn constructors() -> Vec<Constructor<Self>> {
                    vec![Constructor::new("new", |_| Ok($name))]
                }
            }
        };
    }

    command_module!(Spawn, "spawn");
    command_module!(Teleport, "tp");
    command_module!(Home, "home");

    fn bound_container() -> Container {
        let container = Container::new();
        container
            .bind::<dyn Command, Spawn, _>(|c| c as Arc<dyn Command>)
            .bind::<dyn Command, Teleport, _>(|c| c as Arc<dyn Command>)
            .bind::<dyn Command, Home, _>(|c| c as Arc<dyn Command>);
        container
    }

    #[test]
    fn test_all_of_follows_registration_order() {
        let container = bound_container();
        container.register_module::<Teleport>().unwrap();
        container.register_module::<Spawn>().unwrap();

        let labels: Vec<_> = container
            .all_of::<dyn Command>()
            .iter()
            .map(|c| c.label())
            .collect();
        assert_eq!(labels, vec!["tp", "spawn"]);
    }

    #[test]
    fn test_get_trait_skips_unregistered_bindings() {
        let container = bound_container();
        assert!(container.get_trait::<dyn Command>().is_err());

        container.register_module::<Home>().unwrap();
        assert_eq!(container.get_trait::<dyn Command>().unwrap().label(), "home");
    }
}
