//! ConstructorFactory - активация экземпляра через единственный конструктор
//!
//! Для каждого параметра дескриптора:
//! - Scalar → `resolve_one(declared type)`
//! - Sequence → `resolve_all(element type)`, порядок регистрации сохраняется
//!
//! Аргументы раскладываются по `position`, а не по порядку вычисления.
//! Любая ошибка фатальна для вызова: конструктор не вызывается, частичной
//! активации нет.

use rayon::prelude::*;
use tracing::{debug, instrument, trace, warn};

use crate::{
    cardinality::Cardinality,
    config::{ActivationConfig, ResolutionMode},
    dependency::{Argument, ArgumentError, Instance},
    descriptor::{ConstructorDescriptor, FactoryBuilder, ParameterDescriptor},
    error::{ConfigurationError, FactoryError, InvocationError, ResolutionError, ResolveError},
    resolver::{AsyncResolverContext, ResolverContext},
    type_info::Describe,
};

/// Resolution-time half of the pipeline: resolves parameters and invokes the constructor
#[derive(Debug, Clone)]
pub struct ConstructorFactory {
    descriptor: ConstructorDescriptor,
    mode: ResolutionMode,
    log_resolutions: bool,
}

impl ConstructorFactory {
    pub fn new(descriptor: ConstructorDescriptor) -> Self {
        Self::with_config(descriptor, &ActivationConfig::default())
    }

    pub fn with_config(descriptor: ConstructorDescriptor, config: &ActivationConfig) -> Self {
        Self {
            descriptor,
            mode: config.resolution_mode,
            log_resolutions: config.log_resolutions,
        }
    }

    /// Build the descriptor for `T` with default settings
    pub fn for_type<T: Describe>() -> Result<Self, ConfigurationError> {
        let descriptor = FactoryBuilder::new().build(&T::type_info())?;
        Ok(Self::new(descriptor))
    }

    pub fn descriptor(&self) -> &ConstructorDescriptor {
        &self.descriptor
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve every parameter through `context` and invoke the constructor once
    #[instrument(skip_all, fields(target_type = %self.descriptor.target()))]
    pub fn create(&self, context: &ResolverContext) -> Result<Instance, FactoryError> {
        let arguments = match self.mode {
            ResolutionMode::Sequential => self.resolve_sequential(context)?,
            ResolutionMode::Parallel => self.resolve_parallel(context)?,
        };
        self.invoke(arguments)
    }

    /// Async counterpart of [`ConstructorFactory::create`]; parameters are awaited in order
    pub async fn create_async(
        &self,
        context: &AsyncResolverContext,
    ) -> Result<Instance, FactoryError> {
        let total = self.descriptor.parameter_count();
        let mut slots: Vec<Option<Argument>> = vec![None; total];

        for (completed, parameter) in self.descriptor.parameters().iter().enumerate() {
            self.ensure_not_cancelled(context.is_cancelled(), completed)?;

            let key = parameter.dependency_key();
            let resolved = match parameter.cardinality() {
                Cardinality::Scalar => context
                    .resolver()
                    .resolve_one(&key, context)
                    .await
                    .map(Argument::Single),
                Cardinality::Sequence { .. } => context
                    .resolver()
                    .resolve_all(&key, context)
                    .await
                    .map(Argument::Sequence),
            };

            let argument = resolved.map_err(|source| self.resolution_error(parameter, source))?;
            self.trace_resolved(parameter, &argument);
            slots[parameter.position()] = Some(argument);
        }

        self.invoke(slots.into_iter().flatten().collect())
    }

    fn resolve_sequential(&self, context: &ResolverContext) -> Result<Vec<Argument>, FactoryError> {
        let mut slots: Vec<Option<Argument>> = vec![None; self.descriptor.parameter_count()];

        for (completed, parameter) in self.descriptor.parameters().iter().enumerate() {
            self.ensure_not_cancelled(context.is_cancelled(), completed)?;
            let argument = self.resolve_parameter(parameter, context)?;
            slots[parameter.position()] = Some(argument);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn resolve_parallel(&self, context: &ResolverContext) -> Result<Vec<Argument>, FactoryError> {
        self.ensure_not_cancelled(context.is_cancelled(), 0)?;

        let mut results: Vec<(usize, Result<Argument, FactoryError>)> = self
            .descriptor
            .parameters()
            .par_iter()
            .map(|parameter| {
                let result = if context.is_cancelled() {
                    Err(FactoryError::Cancelled {
                        target: self.descriptor.target(),
                        completed: 0,
                        total: self.descriptor.parameter_count(),
                    })
                } else {
                    self.resolve_parameter(parameter, context)
                };
                (parameter.position(), result)
            })
            .collect();

        results.sort_by_key(|(position, _)| *position);

        let completed = results.iter().filter(|(_, result)| result.is_ok()).count();
        results
            .into_iter()
            .map(|(_, result)| {
                result.map_err(|err| match err {
                    FactoryError::Cancelled { target, total, .. } => FactoryError::Cancelled {
                        target,
                        completed,
                        total,
                    },
                    other => other,
                })
            })
            .collect()
    }

    fn resolve_parameter(
        &self,
        parameter: &ParameterDescriptor,
        context: &ResolverContext,
    ) -> Result<Argument, FactoryError> {
        let key = parameter.dependency_key();
        let resolved = match parameter.cardinality() {
            Cardinality::Scalar => context
                .resolver()
                .resolve_one(&key, context)
                .map(Argument::Single),
            Cardinality::Sequence { .. } => context
                .resolver()
                .resolve_all(&key, context)
                .map(Argument::Sequence),
        };

        let argument = resolved.map_err(|source| self.resolution_error(parameter, source))?;
        self.trace_resolved(parameter, &argument);
        Ok(argument)
    }

    fn ensure_not_cancelled(&self, cancelled: bool, completed: usize) -> Result<(), FactoryError> {
        if !cancelled {
            return Ok(());
        }
        debug!(
            "Activation of {} cancelled after {} parameters",
            self.descriptor.target(),
            completed
        );
        Err(FactoryError::Cancelled {
            target: self.descriptor.target(),
            completed,
            total: self.descriptor.parameter_count(),
        })
    }

    fn resolution_error(
        &self,
        parameter: &ParameterDescriptor,
        source: ResolveError,
    ) -> FactoryError {
        warn!(
            target_type = %self.descriptor.target(),
            dependency = %parameter.dependency_key(),
            position = parameter.position(),
            error = %source,
            "failed to resolve constructor parameter"
        );
        ResolutionError {
            target: self.descriptor.target(),
            dependency: parameter.dependency_key(),
            position: parameter.position(),
            cardinality: parameter.cardinality(),
            source,
        }
        .into()
    }

    fn trace_resolved(&self, parameter: &ParameterDescriptor, argument: &Argument) {
        if self.log_resolutions {
            debug!(
                position = parameter.position(),
                dependency = %parameter.dependency_key(),
                instances = argument.len(),
                "resolved constructor parameter"
            );
        } else {
            trace!(
                position = parameter.position(),
                dependency = %parameter.dependency_key(),
                instances = argument.len(),
                "resolved constructor parameter"
            );
        }
    }

    fn invoke(&self, arguments: Vec<Argument>) -> Result<Instance, FactoryError> {
        let target = self.descriptor.target();

        self.descriptor.invoke(arguments).map_err(|err| {
            match err.downcast::<ArgumentError>() {
                Ok(mismatch) => FactoryError::ArgumentMismatch {
                    target,
                    position: mismatch.position,
                    expected: mismatch.expected,
                },
                Err(source) => {
                    warn!("❌ Constructor of {} failed: {}", target, source);
                    InvocationError { target, source }.into()
                }
            }
        })
    }
}
