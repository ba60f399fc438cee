mod binding;
mod builder;
mod constructor;
mod container;
mod injectable;
mod resolver;

use std::any::Any;
use std::sync::Arc;

/// A type-erased module instance as stored in the registry.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub use builder::ContainerBuilder;
pub use constructor::{Arguments, Constructor};
pub use container::Container;
pub use injectable::{InjectionPoint, Injected};

pub(crate) use container::downcast;
pub(crate) use resolver::{Resolver, instantiate};
