use std::fmt;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContainerError>;

/// Broad classification of container failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Construction,
    Lifecycle,
    Lookup,
    State,
}

/// Where a dependency was requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionSite {
    Parameter {
        constructor: &'static str,
        index: usize,
    },
    Field(&'static str),
}

impl fmt::Display for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionSite::Parameter { constructor, index } => {
                write!(f, "constructor `{constructor}` parameter #{index}")
            }
            InjectionSite::Field(name) => write!(f, "field `{name}`"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Failed to register module {module}: {source}")]
    RegistrationFailed {
        module: &'static str,
        #[source]
        source: Box<ContainerError>,
    },

    #[error("Could not resolve dependency {dependency} for {site} of {module}")]
    UnresolvableDependency {
        module: &'static str,
        dependency: &'static str,
        site: InjectionSite,
    },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Lifecycle method must have no parameters: {module}#{method} takes {arity}")]
    InvalidLifecycleMethod {
        module: &'static str,
        method: &'static str,
        arity: usize,
    },

    #[error("Multiple #[inject] constructors on {module}: {candidates:?}")]
    AmbiguousConstructor {
        module: &'static str,
        candidates: Vec<&'static str>,
    },

    #[error("Type is not a module: {module}")]
    NotAModule { module: &'static str },

    #[error("Host type mismatch: container host is {expected}, got {actual}")]
    HostMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("No suitable constructor found for: {module}")]
    NoConstructor { module: &'static str },

    #[error("Failed to create instance of {module} via `{constructor}`: {source}")]
    ConstructionFailed {
        module: &'static str,
        constructor: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to inject field `{field}` of {module}: {reason}")]
    FieldInjectionFailed {
        module: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("Failed to invoke post-construct method {module}#{method}: {source}")]
    PostConstructFailed {
        module: &'static str,
        method: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Module not found: {module}. Make sure it's registered")]
    NotRegistered { module: &'static str },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: &'static str },

    #[error("Cannot {operation} while container is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::lifecycle::ContainerState,
    },
}

impl ContainerError {
    /// The innermost error, looking through registration wrappers.
    pub fn root(&self) -> &ContainerError {
        match self {
            ContainerError::RegistrationFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            ContainerError::UnresolvableDependency { .. }
            | ContainerError::CircularDependency { .. }
            | ContainerError::InvalidLifecycleMethod { .. }
            | ContainerError::AmbiguousConstructor { .. }
            | ContainerError::NotAModule { .. }
            | ContainerError::HostMismatch { .. } => ErrorKind::Configuration,
            ContainerError::NoConstructor { .. }
            | ContainerError::ConstructionFailed { .. }
            | ContainerError::FieldInjectionFailed { .. } => ErrorKind::Construction,
            ContainerError::PostConstructFailed { .. } => ErrorKind::Lifecycle,
            ContainerError::NotRegistered { .. } | ContainerError::DowncastFailed { .. } => {
                ErrorKind::Lookup
            }
            ContainerError::InvalidState { .. } => ErrorKind::State,
            // root() never returns a wrapper
            ContainerError::RegistrationFailed { .. } => ErrorKind::Construction,
        }
    }

    pub(crate) fn wrap(module: &'static str, error: ContainerError) -> Self {
        match error {
            already @ ContainerError::RegistrationFailed { .. } => already,
            other => ContainerError::RegistrationFailed {
                module,
                source: Box::new(other),
            },
        }
    }
}
