use super::ModuleType;
use crate::di::Instance;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

type CallbackFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A lifecycle method bound to a module instance.
#[derive(Clone)]
pub struct Callback {
    method: &'static str,
    call: CallbackFn,
}

impl Callback {
    pub fn new<F>(method: &'static str, call: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            method,
            call: Arc::new(call),
        }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn invoke(&self) -> anyhow::Result<()> {
        (self.call)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("method", &self.method)
            .finish()
    }
}

/// Registry entry for one module: the singleton plus its bound lifecycle callbacks.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub(crate) module_type: ModuleType,
    pub(crate) instance: Instance,
    pub(crate) post_construct: Vec<Callback>,
    pub(crate) pre_destroy: Vec<Callback>,
    pub(crate) registered_at: DateTime<Utc>,
}

impl ModuleDescriptor {
    pub(crate) fn new(
        module_type: ModuleType,
        instance: Instance,
        post_construct: Vec<Callback>,
        pre_destroy: Vec<Callback>,
    ) -> Self {
        Self {
            module_type,
            instance,
            post_construct,
            pre_destroy,
            registered_at: Utc::now(),
        }
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn post_construct(&self) -> &[Callback] {
        &self.post_construct
    }

    pub fn pre_destroy(&self) -> &[Callback] {
        &self.pre_destroy
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.module_type.name(),
            short_name: self.module_type.short_name(),
            post_construct: self.post_construct.iter().map(Callback::method).collect(),
            pre_destroy: self.pre_destroy.iter().map(Callback::method).collect(),
            registered_at: self.registered_at,
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("module_type", &self.module_type)
            .field("post_construct", &self.post_construct)
            .field("pre_destroy", &self.pre_destroy)
            .field("registered_at", &self.registered_at)
            .finish()
    }
}

/// Read-only snapshot of a registered module, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub short_name: &'static str,
    pub post_construct: Vec<&'static str>,
    pub pre_destroy: Vec<&'static str>,
    pub registered_at: DateTime<Utc>,
}
