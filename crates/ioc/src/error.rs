//! Activation error taxonomy.
//!
//! - **ConfigurationError**: structural problems found while building a descriptor
//! - **ResolveError**: what a resolver reports when it cannot produce a dependency
//! - **ResolutionError**: a parameter could not be resolved for a target type
//! - **InvocationError**: the constructor itself failed
//! - **FactoryError**: everything `ConstructorFactory::create` can return
//!
//! Nothing here is recovered silently; each failure reaches the caller with
//! the target type attached.

use anyhow::Context;
use thiserror::Error;

use crate::{cardinality::Cardinality, type_info::TypeKey};

/// Wiring bugs detected without any resolution attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Type {type_key} has more than one constructor ({count})")]
    MultipleConstructors { type_key: TypeKey, count: usize },

    #[error("Type {type_key} has no public constructor")]
    NoConstructor { type_key: TypeKey },

    #[error(
        "Type {type_key} declares parameter position {position}, \
         expected a unique position below {parameter_count}"
    )]
    InvalidParameterPosition {
        type_key: TypeKey,
        position: usize,
        parameter_count: usize,
    },
}

impl ConfigurationError {
    pub fn type_key(&self) -> TypeKey {
        match self {
            ConfigurationError::MultipleConstructors { type_key, .. }
            | ConfigurationError::NoConstructor { type_key }
            | ConfigurationError::InvalidParameterPosition { type_key, .. } => *type_key,
        }
    }
}

/// Failure reported by a resolver for a single lookup
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Service {type_key} is not registered")]
    NotRegistered { type_key: TypeKey },

    #[error("Service {type_key} has {count} registrations, expected exactly one")]
    Ambiguous { type_key: TypeKey, count: usize },

    #[error("Circular dependency detected: {}", format_chain(.chain))]
    Circular { chain: Vec<TypeKey> },

    #[error("Resolution depth limit {limit} exceeded at {type_key}")]
    DepthExceeded { type_key: TypeKey, limit: usize },

    #[error("Resolution of {type_key} was cancelled")]
    Cancelled { type_key: TypeKey },

    #[error("Registered instance for {type_key} has an unexpected runtime type")]
    TypeMismatch { type_key: TypeKey },

    #[error("Failed to construct dependency")]
    Construction(#[source] Box<FactoryError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<FactoryError> for ResolveError {
    fn from(err: FactoryError) -> Self {
        ResolveError::Construction(Box::new(err))
    }
}

fn format_chain(chain: &[TypeKey]) -> String {
    chain
        .iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A constructor parameter of `target` could not be resolved
#[derive(Debug, Error)]
#[error("Cannot resolve {dependency} for parameter {position} of {target}")]
pub struct ResolutionError {
    pub target: TypeKey,
    pub dependency: TypeKey,
    pub position: usize,
    pub cardinality: Cardinality,
    #[source]
    pub source: ResolveError,
}

/// The constructor of `target` returned an error
#[derive(Debug, Error)]
#[error("Constructor of {target} failed")]
pub struct InvocationError {
    pub target: TypeKey,
    #[source]
    pub source: anyhow::Error,
}

/// Everything a single activation can fail with
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("Argument {position} for {target} does not match declared type {expected}")]
    ArgumentMismatch {
        target: TypeKey,
        position: usize,
        expected: TypeKey,
    },

    #[error("Activation of {target} cancelled after {completed} of {total} parameters")]
    Cancelled {
        target: TypeKey,
        completed: usize,
        total: usize,
    },

    #[error("Activated instance is not a {expected}")]
    Downcast { expected: TypeKey },
}

impl FactoryError {
    /// Type whose activation failed
    pub fn target(&self) -> Option<TypeKey> {
        match self {
            FactoryError::Configuration(err) => Some(err.type_key()),
            FactoryError::Resolution(err) => Some(err.target),
            FactoryError::Invocation(err) => Some(err.target),
            FactoryError::ArgumentMismatch { target, .. } => Some(*target),
            FactoryError::Cancelled { target, .. } => Some(*target),
            FactoryError::Downcast { .. } => None,
        }
    }

    /// Path of types from the outermost target down to the failing one.
    ///
    /// Nested activation failures (`ResolveError::Construction`) are followed;
    /// for a leaf resolver failure the unresolved dependency ends the chain.
    pub fn dependency_chain(&self) -> Vec<TypeKey> {
        let mut chain = Vec::new();
        let mut current = self;

        loop {
            match current {
                FactoryError::Resolution(err) => {
                    chain.push(err.target);
                    match &err.source {
                        ResolveError::Construction(inner) => current = inner,
                        _ => {
                            chain.push(err.dependency);
                            break;
                        }
                    }
                }
                other => {
                    chain.extend(other.target());
                    break;
                }
            }
        }

        chain
    }

    /// Message of the innermost error in the source chain
    pub fn root_cause(&self) -> String {
        let mut cause: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = cause.source() {
            cause = next;
        }
        cause.to_string()
    }

    /// Category for logs and monitoring
    pub fn category(&self) -> &'static str {
        match self {
            FactoryError::Configuration(_) => "configuration",
            FactoryError::Resolution(_) => "resolution",
            FactoryError::Invocation(_) => "invocation",
            FactoryError::ArgumentMismatch { .. } => "argument",
            FactoryError::Cancelled { .. } => "cancelled",
            FactoryError::Downcast { .. } => "downcast",
        }
    }

    /// Only cancellation is transient; everything else is a wiring or user-code bug
    pub fn is_retryable(&self) -> bool {
        matches!(self, FactoryError::Cancelled { .. })
    }
}

/// Adds activation context to activation results at application edges
pub trait ActivationContextExt<T> {
    fn activation_context(self, message: &str) -> anyhow::Result<T>;
    fn with_activation_context<F>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ActivationContextExt<T> for Result<T, FactoryError> {
    fn activation_context(self, message: &str) -> anyhow::Result<T> {
        self.map_err(anyhow::Error::from)
            .with_context(|| message.to_string())
    }

    fn with_activation_context<F>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(anyhow::Error::from).with_context(f)
    }
}
