//! Module discovery.
//!
//! `#[module]` submits a [`ModuleRegistration`] for its type via
//! `inventory::submit!`. Every container seeds its catalog from this collection,
//! and [`discover`] turns it into the ordered feed of bootstrap candidates.

use super::{Callback, Module, ModuleType};
use crate::di::{Instance, Resolver};
use crate::error::Result;

/// Type-erased construction recipe for one module type.
#[doc(hidden)]
#[derive(Clone, Copy)]
pub struct Blueprint {
    pub(crate) module_type: ModuleType,
    pub(crate) instantiate: fn(&mut Resolver<'_>) -> Result<Instance>,
    pub(crate) bind_lifecycle: fn(&Instance) -> Result<BoundLifecycle>,
}

/// Post-construct and pre-destroy callbacks bound to one instance.
pub(crate) type BoundLifecycle = (Vec<Callback>, Vec<Callback>);

impl Blueprint {
    pub fn of<T: Module>() -> Self {
        Self {
            module_type: ModuleType::of::<T>(),
            instantiate: crate::di::instantiate::<T>,
            bind_lifecycle: crate::lifecycle::bind_lifecycle::<T>,
        }
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }
}

/// Link-time registration record emitted by `#[module]`.
pub struct ModuleRegistration {
    blueprint: fn() -> Blueprint,
}

impl ModuleRegistration {
    pub const fn of<T: Module>() -> Self {
        Self {
            blueprint: Blueprint::of::<T>,
        }
    }

    pub fn blueprint(&self) -> Blueprint {
        (self.blueprint)()
    }
}

inventory::collect!(ModuleRegistration);

pub(crate) fn registered_blueprints() -> Vec<Blueprint> {
    let mut blueprints = Vec::new();
    for registration in inventory::iter::<ModuleRegistration> {
        blueprints.push(registration.blueprint());
    }
    blueprints
}

/// Every `#[module]` type linked into the binary, sorted by type name.
///
/// Link order is not stable across builds, so the feed is sorted to keep
/// registration (and therefore shutdown) order deterministic.
pub fn discover() -> Vec<ModuleType> {
    let mut types: Vec<ModuleType> = registered_blueprints()
        .into_iter()
        .map(|blueprint| blueprint.module_type)
        .collect();
    types.sort_by_key(|ty| ty.name());
    types.dedup();
    types
}
