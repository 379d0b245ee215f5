//! Constructor descriptors and the builder that validates them.
//!
//! A [`ConstructorDescriptor`] can only come out of [`FactoryBuilder::build`],
//! so holding one means the single-constructor invariant already holds and
//! every parameter has a unique position and a fixed cardinality.

use std::fmt;

use tracing::{debug, trace};

use crate::{
    cardinality::{classify, Cardinality, SequenceDetection},
    config::ActivationConfig,
    dependency::{Argument, Instance},
    error::ConfigurationError,
    type_info::{DeclaredType, Invoker, TypeInfo, TypeKey},
};

/// A captured constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    declared_type: DeclaredType,
    position: usize,
    cardinality: Cardinality,
}

impl ParameterDescriptor {
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    /// Argument slot, 0-based
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Key handed to the resolver: the element type for sequences, the declared type otherwise
    pub fn dependency_key(&self) -> TypeKey {
        match self.cardinality {
            Cardinality::Scalar => self.declared_type.key(),
            Cardinality::Sequence { element } => element,
        }
    }
}

/// The validated single constructor of a target type
#[derive(Clone)]
pub struct ConstructorDescriptor {
    target: TypeKey,
    parameters: Vec<ParameterDescriptor>,
    invoker: Invoker,
}

impl ConstructorDescriptor {
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub(crate) fn invoke(&self, arguments: Vec<Argument>) -> anyhow::Result<Instance> {
        (self.invoker)(arguments)
    }
}

/// Structural equality: same target and same parameters; the invoker is not compared
impl PartialEq for ConstructorDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.parameters == other.parameters
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("target", &self.target)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Validates type metadata into a [`ConstructorDescriptor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryBuilder {
    detection: SequenceDetection,
}

impl FactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ActivationConfig) -> Self {
        Self::with_detection(config.sequence_detection)
    }

    pub fn with_detection(detection: SequenceDetection) -> Self {
        Self { detection }
    }

    pub fn detection(&self) -> SequenceDetection {
        self.detection
    }

    /// Capture the single constructor of `info`.
    ///
    /// Pure: nothing is resolved or invoked.
    pub fn build(&self, info: &TypeInfo) -> Result<ConstructorDescriptor, ConfigurationError> {
        let target = info.key();

        let constructor = match info.constructors() {
            [] => return Err(ConfigurationError::NoConstructor { type_key: target }),
            [single] => single,
            many => {
                return Err(ConfigurationError::MultipleConstructors {
                    type_key: target,
                    count: many.len(),
                })
            }
        };

        let parameter_count = constructor.parameters().len();
        let mut seen = vec![false; parameter_count];
        let mut parameters = Vec::with_capacity(parameter_count);

        for parameter in constructor.parameters() {
            let position = parameter.position;
            match seen.get_mut(position) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(ConfigurationError::InvalidParameterPosition {
                        type_key: target,
                        position,
                        parameter_count,
                    })
                }
            }

            let cardinality = classify(&parameter.declared_type, self.detection);
            trace!(
                target_type = %target,
                position,
                declared = %parameter.declared_type.key(),
                ?cardinality,
                "captured constructor parameter"
            );

            parameters.push(ParameterDescriptor {
                declared_type: parameter.declared_type.clone(),
                position,
                cardinality,
            });
        }

        debug!("Built constructor descriptor for {} ({} parameters)", target, parameter_count);

        Ok(ConstructorDescriptor {
            target,
            parameters,
            invoker: constructor.invoker().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_info::{ConstructorInfo, GenericInterface, ParameterInfo};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    struct Target;
    struct Left;
    struct Right;

    fn constructor(parameters: Vec<ParameterInfo>, invoked: Arc<AtomicBool>) -> ConstructorInfo {
        ConstructorInfo::from_parts(parameters, move |_| {
            invoked.store(true, Ordering::SeqCst);
            anyhow::bail!("constructor must not run during build")
        })
    }

    #[test]
    fn test_single_constructor_is_captured_in_declaration_order() {
        let invoked = Arc::new(AtomicBool::new(false));
        let info = TypeInfo::new(TypeKey::of::<Target>()).with_constructor(constructor(
            vec![
                ParameterInfo::new(DeclaredType::of::<Right>(), 1),
                ParameterInfo::new(DeclaredType::of::<Left>(), 0),
            ],
            invoked.clone(),
        ));

        let descriptor = FactoryBuilder::new().build(&info).unwrap();

        assert_eq!(descriptor.target(), TypeKey::of::<Target>());
        let captured: Vec<_> = descriptor
            .parameters()
            .iter()
            .map(|p| (p.declared_type().key(), p.position()))
            .collect();
        assert_eq!(
            captured,
            vec![(TypeKey::of::<Right>(), 1), (TypeKey::of::<Left>(), 0)]
        );
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_multiple_constructors_rejected() {
        let invoked = Arc::new(AtomicBool::new(false));
        let info = TypeInfo::new(TypeKey::of::<Target>())
            .with_constructor(constructor(vec![], invoked.clone()))
            .with_constructor(constructor(
                vec![ParameterInfo::new(DeclaredType::of::<Left>(), 0)],
                invoked.clone(),
            ));

        let err = FactoryBuilder::new().build(&info).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MultipleConstructors {
                type_key: TypeKey::of::<Target>(),
                count: 2
            }
        );
        assert!(err.to_string().contains("Target"));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_no_constructor_rejected() {
        let info = TypeInfo::new(TypeKey::of::<Target>());
        let err = FactoryBuilder::new().build(&info).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoConstructor { .. }));
    }

    #[test]
    fn test_duplicate_and_out_of_range_positions_rejected() {
        let invoked = Arc::new(AtomicBool::new(false));
        for positions in [[0, 0], [0, 2]] {
            let info = TypeInfo::new(TypeKey::of::<Target>()).with_constructor(constructor(
                vec![
                    ParameterInfo::new(DeclaredType::of::<Left>(), positions[0]),
                    ParameterInfo::new(DeclaredType::of::<Right>(), positions[1]),
                ],
                invoked.clone(),
            ));

            let err = FactoryBuilder::new().build(&info).unwrap_err();
            assert!(matches!(
                err,
                ConfigurationError::InvalidParameterPosition { parameter_count: 2, .. }
            ));
        }
    }

    #[test]
    fn test_cardinality_and_dependency_key() {
        let invoked = Arc::new(AtomicBool::new(false));
        let info = TypeInfo::new(TypeKey::of::<Target>()).with_constructor(constructor(
            vec![
                ParameterInfo::new(DeclaredType::of::<Left>(), 0),
                ParameterInfo::new(
                    DeclaredType::of::<Vec<Right>>()
                        .implementing(GenericInterface::enumerable(TypeKey::of::<Right>())),
                    1,
                ),
            ],
            invoked,
        ));

        let descriptor = FactoryBuilder::new().build(&info).unwrap();
        let [scalar, sequence] = descriptor.parameters() else {
            panic!("expected two parameters");
        };
        assert_eq!(scalar.cardinality(), Cardinality::Scalar);
        assert_eq!(scalar.dependency_key(), TypeKey::of::<Left>());
        assert!(sequence.cardinality().is_sequence());
        assert_eq!(sequence.dependency_key(), TypeKey::of::<Right>());
    }

    #[test]
    fn test_build_is_idempotent() {
        let invoked = Arc::new(AtomicBool::new(false));
        let info = TypeInfo::new(TypeKey::of::<Target>()).with_constructor(constructor(
            vec![ParameterInfo::new(DeclaredType::of::<Left>(), 0)],
            invoked,
        ));

        let builder = FactoryBuilder::new();
        let first = builder.build(&info).unwrap();
        let second = builder.build(&info).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_detection_follows_config() {
        let config = ActivationConfig {
            sequence_detection: SequenceDetection::IncludeInherited,
            ..ActivationConfig::default()
        };
        assert_eq!(
            FactoryBuilder::with_config(&config).detection(),
            SequenceDetection::IncludeInherited
        );
    }
}
