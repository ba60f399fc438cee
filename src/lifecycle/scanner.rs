//! Lifecycle method discovery and validation.

use crate::di::{Instance, downcast};
use crate::error::{ContainerError, Result};
use crate::module::{Callback, Module, ModuleType};
use std::fmt;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display};

/// When a lifecycle method runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Phase {
    #[strum(serialize = "post_construct")]
    PostConstruct,
    #[strum(serialize = "pre_destroy")]
    PreDestroy,
}

type MethodFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// A post-construct or pre-destroy method declared by a module.
pub struct LifecycleMethod<T> {
    phase: Phase,
    name: &'static str,
    arity: usize,
    call: Option<MethodFn<T>>,
}

impl<T> LifecycleMethod<T> {
    pub fn post_construct<F>(name: &'static str, call: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::zero_arg(Phase::PostConstruct, name, call)
    }

    pub fn pre_destroy<F>(name: &'static str, call: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::zero_arg(Phase::PreDestroy, name, call)
    }

    /// A lifecycle method that takes arguments.
    ///
    /// `#[module]` emits this for annotated methods with parameters so that the
    /// scanner can reject them with the module's identity attached.
    pub fn parameterized(phase: Phase, name: &'static str, arity: usize) -> Self {
        Self {
            phase,
            name,
            arity,
            call: None,
        }
    }

    fn zero_arg<F>(phase: Phase, name: &'static str, call: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            phase,
            name,
            arity: 0,
            call: Some(Arc::new(call)),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl<T> fmt::Debug for LifecycleMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleMethod")
            .field("phase", &self.phase)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Validated lifecycle methods of one module type, in declaration order.
pub struct ScannedLifecycle<T> {
    pub post_construct: Vec<(&'static str, MethodFn<T>)>,
    pub pre_destroy: Vec<(&'static str, MethodFn<T>)>,
}

/// Split `T`'s lifecycle methods by phase, rejecting any that take parameters.
pub fn scan<T: Module>() -> Result<ScannedLifecycle<T>> {
    let module = ModuleType::of::<T>();
    let mut scanned = ScannedLifecycle {
        post_construct: Vec::new(),
        pre_destroy: Vec::new(),
    };

    for method in T::lifecycle_methods() {
        let call = match (method.arity, method.call) {
            (0, Some(call)) => call,
            (arity, _) => {
                return Err(ContainerError::InvalidLifecycleMethod {
                    module: module.name(),
                    method: method.name,
                    arity,
                });
            }
        };

        match method.phase {
            Phase::PostConstruct => scanned.post_construct.push((method.name, call)),
            Phase::PreDestroy => scanned.pre_destroy.push((method.name, call)),
        }
    }

    Ok(scanned)
}

/// Scan `T` and bind its lifecycle methods to `instance`.
pub(crate) fn bind_lifecycle<T: Module>(instance: &Instance) -> Result<(Vec<Callback>, Vec<Callback>)> {
    let scanned = scan::<T>()?;
    let typed = downcast::<T>(Arc::clone(instance))?;

    let bind = |methods: Vec<(&'static str, MethodFn<T>)>| -> Vec<Callback> {
        methods
            .into_iter()
            .map(|(name, call)| {
                let this = Arc::clone(&typed);
                Callback::new(name, move || call(this.as_ref()))
            })
            .collect()
    };

    Ok((bind(scanned.post_construct), bind(scanned.pre_destroy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Constructor;
    use crate::error::ErrorKind;
    use crate::module::Injectable;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Board {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Injectable for Board {}

    impl Module for Board {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_| Ok(Board::default()))]
        }

        fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
            vec![
                LifecycleMethod::pre_destroy("hide", |b: &Board| {
                    b.calls.lock().push("hide");
                    Ok(())
                }),
                LifecycleMethod::post_construct("render", |b: &Board| {
                    b.calls.lock().push("render");
                    Ok(())
                }),
                LifecycleMethod::post_construct("schedule", |b: &Board| {
                    b.calls.lock().push("schedule");
                    Ok(())
                }),
            ]
        }
    }

    struct Broken;

    impl Injectable for Broken {}

    impl Module for Broken {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_| Ok(Broken))]
        }

        fn lifecycle_methods() -> Vec<LifecycleMethod<Self>> {
            vec![
                LifecycleMethod::post_construct("ok", |_: &Broken| Ok(())),
                LifecycleMethod::parameterized(Phase::PreDestroy, "close", 2),
            ]
        }
    }

    #[test]
    fn test_scan_keeps_declaration_order_per_phase() {
        let scanned = scan::<Board>().unwrap();
        let post: Vec<_> = scanned.post_construct.iter().map(|(n, _)| *n).collect();
        let pre: Vec<_> = scanned.pre_destroy.iter().map(|(n, _)| *n).collect();
        assert_eq!(post, vec!["render", "schedule"]);
        assert_eq!(pre, vec!["hide"]);
    }

    #[test]
    fn test_scan_rejects_parameterized_method() {
        let err = scan::<Broken>().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        match err {
            ContainerError::InvalidLifecycleMethod { method, arity, .. } => {
                assert_eq!(method, "close");
                assert_eq!(arity, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bound_callbacks_target_instance() {
        let board = Arc::new(Board::default());
        let instance: Instance = board.clone();
        let (post, pre) = bind_lifecycle::<Board>(&instance).unwrap();

        for callback in post.iter().chain(pre.iter()) {
            callback.invoke().unwrap();
        }
        assert_eq!(*board.calls.lock(), vec!["render", "schedule", "hide"]);
        assert_eq!(Phase::PreDestroy.to_string(), "pre_destroy");
    }
}
