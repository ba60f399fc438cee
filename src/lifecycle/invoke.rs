use crate::error::{ContainerError, Result};
use crate::module::{Callback, ModuleType};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Outcome of [`Container::shutdown`](crate::Container::shutdown).
#[derive(Debug, Default, Serialize)]
pub struct ShutdownReport {
    /// Modules whose teardown was attempted, in the order it happened.
    #[serde(serialize_with = "serialize_types")]
    pub destroyed: Vec<ModuleType>,
    pub failures: Vec<DestroyFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DestroyFailure {
    pub module: &'static str,
    pub method: &'static str,
    pub message: String,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn serialize_types<S: serde::Serializer>(
    types: &[ModuleType],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(types.iter().map(ModuleType::name))
}

/// Run post-construct callbacks in order. The first failure aborts registration.
pub(crate) fn run_post_construct(module: ModuleType, callbacks: &[Callback]) -> Result<()> {
    for callback in callbacks {
        tracing::debug!("Post-construct: {}#{}", module.short_name(), callback.method());
        callback
            .invoke()
            .map_err(|source| ContainerError::PostConstructFailed {
                module: module.name(),
                method: callback.method(),
                source,
            })?;
    }
    Ok(())
}

/// Run pre-destroy callbacks in order. Errors and panics are logged and recorded
/// but never stop the remaining callbacks.
pub(crate) fn run_pre_destroy(module: ModuleType, callbacks: &[Callback], report: &mut ShutdownReport) {
    for callback in callbacks {
        tracing::debug!("Pre-destroy: {}#{}", module.short_name(), callback.method());
        let message = match catch_unwind(AssertUnwindSafe(|| callback.invoke())) {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::error!(
            "Failed to invoke pre-destroy method {}#{}: {}",
            module,
            callback.method(),
            message
        );
        report.failures.push(DestroyFailure {
            module: module.name(),
            method: callback.method(),
            message,
        });
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
