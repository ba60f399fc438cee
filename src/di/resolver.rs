//! Recursive dependency resolution.
//!
//! The set of types under construction is owned by the [`Container`], not by a
//! single [`Resolver`], so a registration started from a post-construct callback
//! still sees the types its caller is building. A type counts as under
//! construction until its post-construct callbacks have returned.

use super::constructor::{Arguments, select_constructor};
use super::{Container, Instance};
use crate::error::{ContainerError, InjectionSite, Result};
use crate::lifecycle;
use crate::module::{Blueprint, Injectable, Module, ModuleDescriptor, ModuleType};
use std::sync::Arc;

/// Types currently being constructed, outermost first.
#[derive(Debug, Default)]
pub(crate) struct ConstructionContext {
    in_construction: Vec<ModuleType>,
}

impl ConstructionContext {
    pub(crate) fn enter(&mut self, module: ModuleType) -> Result<()> {
        if let Some(start) = self.in_construction.iter().position(|ty| *ty == module) {
            let cycle = self.in_construction[start..]
                .iter()
                .chain(std::iter::once(&module))
                .map(ModuleType::name)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ContainerError::CircularDependency { cycle });
        }
        self.in_construction.push(module);
        Ok(())
    }

    pub(crate) fn leave(&mut self, module: ModuleType) {
        debug_assert_eq!(self.in_construction.last(), Some(&module));
        self.in_construction.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.in_construction.len()
    }
}

pub(crate) struct Resolver<'c> {
    container: &'c Container,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(container: &'c Container) -> Self {
        Self { container }
    }

    /// Resolve `module`, building and registering it if it is a declared module.
    ///
    /// Returns `Ok(None)` when the type is neither the host, registered, nor
    /// declared; the caller decides whether that is fatal.
    pub(crate) fn resolve(&mut self, module: ModuleType) -> Result<Option<Instance>> {
        if let Some(host) = self.container.host_instance(module) {
            return Ok(Some(host));
        }

        if let Some(existing) = self.container.registered_instance(module) {
            return Ok(Some(existing));
        }

        match self.container.blueprint(module) {
            Some(blueprint) => self.build(blueprint).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a dependency of `owner`; an unresolvable type is an error.
    pub(crate) fn require(
        &mut self,
        owner: ModuleType,
        dependency: ModuleType,
        site: InjectionSite,
    ) -> Result<Instance> {
        self.resolve(dependency)?
            .ok_or_else(|| ContainerError::UnresolvableDependency {
                module: owner.name(),
                dependency: dependency.name(),
                site,
            })
    }

    pub(crate) fn strict_constructors(&self) -> bool {
        self.container.config().strict_constructors
    }

    fn build(&mut self, blueprint: Blueprint) -> Result<Instance> {
        let module = blueprint.module_type;
        let depth = self.container.enter_construction(module)?;
        let _entered = Entered {
            container: self.container,
            module,
        };
        tracing::trace!(depth, "Constructing: {}", module);

        self.construct(blueprint)
    }

    fn construct(&mut self, blueprint: Blueprint) -> Result<Instance> {
        let module = blueprint.module_type;
        let instance = (blueprint.instantiate)(self)?;

        let (post_construct, pre_destroy) = (blueprint.bind_lifecycle)(&instance)?;
        lifecycle::run_post_construct(module, &post_construct)?;

        self.container.insert(ModuleDescriptor::new(
            module,
            Arc::clone(&instance),
            post_construct,
            pre_destroy,
        ));
        Ok(instance)
    }
}

/// Leaves the construction context on drop, including while unwinding.
struct Entered<'c> {
    container: &'c Container,
    module: ModuleType,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.container.leave_construction(self.module);
    }
}

/// Select a constructor for `T`, resolve its parameters, build the value and fill
/// its `#[inject]` fields.
pub(crate) fn instantiate<T: Module>(resolver: &mut Resolver<'_>) -> Result<Instance> {
    let module = ModuleType::of::<T>();
    let constructor = select_constructor(module, T::constructors(), resolver.strict_constructors())?;

    let mut arguments = Vec::with_capacity(constructor.arity());
    for (index, parameter) in constructor.parameters().iter().enumerate() {
        let site = InjectionSite::Parameter {
            constructor: constructor.name(),
            index,
        };
        let value = resolver.require(module, *parameter, site)?;
        arguments.push((*parameter, value));
    }

    let value = constructor
        .build(Arguments::new(arguments))
        .map_err(|source| ContainerError::ConstructionFailed {
            module: module.name(),
            constructor: constructor.name(),
            source,
        })?;

    inject_fields(&value, resolver)?;
    Ok(Arc::new(value))
}

/// Fill every `#[inject]` field of `owner` from the container.
pub(crate) fn inject_fields<T: Injectable>(owner: &T, resolver: &mut Resolver<'_>) -> Result<()> {
    let module = ModuleType::of::<T>();
    for point in T::injection_points() {
        let value = resolver.require(module, point.dependency(), InjectionSite::Field(point.field()))?;
        point
            .assign(owner, value)
            .map_err(|reason| ContainerError::FieldInjectionFailed {
                module: module.name(),
                field: point.field(),
                reason,
            })?;
    }
    Ok(())
}
