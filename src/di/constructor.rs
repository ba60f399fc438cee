use super::Instance;
use crate::error::{ContainerError, Result};
use crate::module::ModuleType;
use std::fmt;
use std::sync::Arc;

type BuildFn<T> = Box<dyn Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync>;

/// One way of building a module, with the dependency types it needs.
///
/// Parameters are resolved in the order they were added with [`Constructor::param`]
/// and handed to the build closure through [`Arguments`].
///
/// # Example
/// ```rust,ignore
/// Constructor::new("new", |args| Ok(CommandManager::new(args.take::<EventManager>()?)))
///     .param::<EventManager>()
///     .inject()
/// ```
pub struct Constructor<T> {
    name: &'static str,
    inject: bool,
    parameters: Vec<ModuleType>,
    build: BuildFn<T>,
}

impl<T> Constructor<T> {
    pub fn new<F>(name: &'static str, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name,
            inject: false,
            parameters: Vec::new(),
            build: Box::new(build),
        }
    }

    /// Append a parameter of type `P`, supplied to the build closure as `Arc<P>`.
    pub fn param<P: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(ModuleType::of::<P>());
        self
    }

    /// Mark this constructor as the injection constructor.
    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_inject(&self) -> bool {
        self.inject
    }

    pub fn parameters(&self) -> &[ModuleType] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub(crate) fn build(&self, mut arguments: Arguments) -> anyhow::Result<T> {
        (self.build)(&mut arguments)
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("inject", &self.inject)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Resolved constructor arguments, consumed in parameter order.
pub struct Arguments {
    values: std::vec::IntoIter<(ModuleType, Instance)>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<(ModuleType, Instance)>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Take the next argument as an `Arc<P>`.
    pub fn take<P: Send + Sync + 'static>(&mut self) -> anyhow::Result<Arc<P>> {
        let (declared, value) = self.values.next().ok_or_else(|| {
            anyhow::anyhow!(
                "constructor requested more arguments than it declared (next: {})",
                std::any::type_name::<P>()
            )
        })?;
        value.downcast::<P>().map_err(|_| {
            anyhow::anyhow!(
                "argument declared as {} was taken as {}",
                declared,
                std::any::type_name::<P>()
            )
        })
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Pick the constructor the container instantiates a module with.
///
/// The first `#[inject]` constructor wins, then the first zero-argument one, then
/// the first declared. Several `#[inject]` constructors are an error only when
/// `strict` is set.
pub(crate) fn select_constructor<T>(
    module: ModuleType,
    mut constructors: Vec<Constructor<T>>,
    strict: bool,
) -> Result<Constructor<T>> {
    if constructors.is_empty() {
        return Err(ContainerError::NoConstructor {
            module: module.name(),
        });
    }

    let marked: Vec<usize> = constructors
        .iter()
        .enumerate()
        .filter(|(_, ctor)| ctor.inject)
        .map(|(idx, _)| idx)
        .collect();

    if marked.len() > 1 {
        let candidates: Vec<&'static str> = marked.iter().map(|&idx| constructors[idx].name).collect();
        if strict {
            return Err(ContainerError::AmbiguousConstructor {
                module: module.name(),
                candidates,
            });
        }
        tracing::warn!(
            "{} declares several #[inject] constructors {:?}; using `{}`",
            module,
            candidates,
            candidates[0]
        );
    }

    let chosen = marked
        .first()
        .copied()
        .or_else(|| constructors.iter().position(|ctor| ctor.arity() == 0))
        .unwrap_or(0);

    Ok(constructors.swap_remove(chosen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, PartialEq)]
    struct Service {
        via: &'static str,
    }

    struct Dependency;

    fn ctor(name: &'static str) -> Constructor<Service> {
        Constructor::new(name, move |_| Ok(Service { via: name }))
    }

    fn pick(constructors: Vec<Constructor<Service>>) -> Result<Constructor<Service>> {
        select_constructor(ModuleType::of::<Service>(), constructors, false)
    }

    #[test]
    fn test_inject_constructor_wins_over_nullary() {
        let chosen = pick(vec![
            ctor("default"),
            ctor("with_dependency").param::<Dependency>().inject(),
        ])
        .unwrap();
        assert_eq!(chosen.name(), "with_dependency");
    }

    #[test]
    fn test_nullary_constructor_used_without_inject_marker() {
        let chosen = pick(vec![
            ctor("with_dependency").param::<Dependency>(),
            ctor("default"),
        ])
        .unwrap();
        assert_eq!(chosen.name(), "default");
    }

    #[test]
    fn test_first_declared_is_fallback() {
        let chosen = pick(vec![
            ctor("first").param::<Dependency>(),
            ctor("second").param::<Dependency>().param::<Dependency>(),
        ])
        .unwrap();
        assert_eq!(chosen.name(), "first");
    }

    #[test]
    fn test_no_constructor_is_construction_error() {
        let err = pick(Vec::new()).unwrap_err();
        assert!(matches!(err, ContainerError::NoConstructor { .. }));
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_ambiguous_inject_constructors() {
        let lenient = pick(vec![ctor("a").inject(), ctor("b").inject()]).unwrap();
        assert_eq!(lenient.name(), "a");

        let err = select_constructor(
            ModuleType::of::<Service>(),
            vec![ctor("a").inject(), ctor("b").inject()],
            true,
        )
        .unwrap_err();
        match err {
            ContainerError::AmbiguousConstructor { candidates, .. } => {
                assert_eq!(candidates, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_arguments_are_taken_in_order() {
        let mut args = Arguments::new(vec![
            (ModuleType::of::<u32>(), Arc::new(7u32) as Instance),
            (ModuleType::of::<String>(), Arc::new("db".to_string()) as Instance),
        ]);
        assert_eq!(*args.take::<u32>().unwrap(), 7);
        assert!(args.take::<u32>().is_err());
        assert_eq!(args.remaining(), 0);
        assert!(args.take::<String>().is_err());
    }
}
