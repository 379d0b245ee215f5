//! Scalar vs sequence classification of constructor parameters

use serde::{Deserialize, Serialize};

use crate::type_info::{DeclaredType, TypeKey};

/// How many instances a parameter resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one instance of the declared type
    Scalar,
    /// Every registered instance of `element`, in registration order
    Sequence { element: TypeKey },
}

impl Cardinality {
    pub fn is_sequence(&self) -> bool {
        matches!(self, Cardinality::Sequence { .. })
    }
}

/// Which implemented interfaces count when looking for the `Enumerable<E>` shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceDetection {
    /// The type's own shape and its directly implemented interfaces
    #[default]
    DirectOnly,
    /// Additionally interfaces inherited through base types
    IncludeInherited,
}

/// Classify a declared parameter type.
///
/// The first matching `Enumerable<E>` wins, checked in this order: the
/// type's own shape, its direct interfaces in declaration order, then (only
/// with [`SequenceDetection::IncludeInherited`]) inherited interfaces.
pub fn classify(declared: &DeclaredType, detection: SequenceDetection) -> Cardinality {
    let inherited = match detection {
        SequenceDetection::DirectOnly => &[][..],
        SequenceDetection::IncludeInherited => declared.inherited_interfaces(),
    };

    declared
        .shape()
        .into_iter()
        .chain(declared.interfaces())
        .chain(inherited)
        .find_map(|interface| interface.enumerable_element())
        .map_or(Cardinality::Scalar, |element| Cardinality::Sequence { element })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_info::GenericInterface;
    use rstest::rstest;

    struct Plugin;
    struct Handler;
    struct PluginList;

    fn element() -> TypeKey {
        TypeKey::of::<Plugin>()
    }

    fn plain() -> DeclaredType {
        DeclaredType::of::<Plugin>()
    }

    fn shaped() -> DeclaredType {
        DeclaredType::of::<PluginList>().with_shape(GenericInterface::enumerable(element()))
    }

    fn direct() -> DeclaredType {
        DeclaredType::of::<PluginList>()
            .implementing(GenericInterface::named("Comparable", vec![element()]))
            .implementing(GenericInterface::enumerable(element()))
    }

    fn inherited_only() -> DeclaredType {
        DeclaredType::of::<PluginList>().inheriting(GenericInterface::enumerable(element()))
    }

    fn named_only() -> DeclaredType {
        DeclaredType::of::<PluginList>()
            .implementing(GenericInterface::named("Enumerable", vec![element()]))
    }

    #[rstest]
    #[case::plain_type(plain(), SequenceDetection::DirectOnly, false)]
    #[case::own_shape(shaped(), SequenceDetection::DirectOnly, true)]
    #[case::direct_interface(direct(), SequenceDetection::DirectOnly, true)]
    #[case::inherited_ignored(inherited_only(), SequenceDetection::DirectOnly, false)]
    #[case::inherited_opt_in(inherited_only(), SequenceDetection::IncludeInherited, true)]
    #[case::lookalike_name(named_only(), SequenceDetection::IncludeInherited, false)]
    fn test_classify(
        #[case] declared: DeclaredType,
        #[case] detection: SequenceDetection,
        #[case] expect_sequence: bool,
    ) {
        let cardinality = classify(&declared, detection);
        assert_eq!(cardinality.is_sequence(), expect_sequence);
        if let Cardinality::Sequence { element: found } = cardinality {
            assert_eq!(found, element());
        }
    }

    #[test]
    fn test_first_enumerable_wins() {
        let declared = DeclaredType::of::<PluginList>()
            .implementing(GenericInterface::enumerable(TypeKey::of::<Handler>()))
            .implementing(GenericInterface::enumerable(element()));

        assert_eq!(
            classify(&declared, SequenceDetection::DirectOnly),
            Cardinality::Sequence {
                element: TypeKey::of::<Handler>()
            }
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let declared = direct();
        let first = classify(&declared, SequenceDetection::DirectOnly);
        for _ in 0..8 {
            assert_eq!(classify(&declared, SequenceDetection::DirectOnly), first);
        }
    }
}
