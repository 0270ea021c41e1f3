//! Field classification: scalar column, object reference, or multi-valued.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::corpus::{Cardinality, EntityId, TypeDictionary};
use crate::types::{StorageType, TypeMapper};

/// What a multi-valued field holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum ElementKind {
    Scalar(StorageType),
    Entity(EntityId),
}

impl ElementKind {
    pub fn target(&self) -> Option<&EntityId> {
        match self {
            ElementKind::Entity(id) => Some(id),
            ElementKind::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum RelationKind {
    Scalar(StorageType),
    ObjectReference { target: EntityId, nullable: bool },
    MultiValued(ElementKind),
}

impl RelationKind {
    /// The entity this field points at, directly or through an array.
    pub fn target(&self) -> Option<&EntityId> {
        match self {
            RelationKind::ObjectReference { target, .. } => Some(target),
            RelationKind::MultiValued(element) => element.target(),
            RelationKind::Scalar(_) => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, RelationKind::Scalar(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, RelationKind::ObjectReference { .. })
    }

    pub fn is_multi_valued(&self) -> bool {
        matches!(self, RelationKind::MultiValued(_))
    }
}

/// Result of classifying one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: RelationKind,
    /// The scalar primitive had no storage mapping and fell back to generic
    /// text.
    pub unmapped: bool,
}

/// Classify a field from its type name, cardinality and requirement alone.
///
/// `objects` is the set of embeddable entity names. A type name found there
/// is a reference even if the dictionary also declares a primitive of the
/// same name.
pub fn classify(
    type_name: &str,
    cardinality: Cardinality,
    required: bool,
    objects: &BTreeSet<String>,
    mapper: &TypeMapper,
    primitives: &TypeDictionary,
) -> Classification {
    if objects.contains(type_name) {
        let target = EntityId::object(type_name);
        let kind = match cardinality {
            Cardinality::Single => RelationKind::ObjectReference {
                target,
                nullable: !required,
            },
            Cardinality::Array => RelationKind::MultiValued(ElementKind::Entity(target)),
        };
        return Classification {
            kind,
            unmapped: false,
        };
    }

    let mapping = mapper.map(type_name, primitives);
    let storage = mapping.storage();
    let kind = match cardinality {
        Cardinality::Single => RelationKind::Scalar(storage),
        Cardinality::Array => RelationKind::MultiValued(ElementKind::Scalar(storage)),
    };
    Classification {
        kind,
        unmapped: mapping.is_fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::primitives;

    fn objects(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn run(type_name: &str, cardinality: Cardinality, required: bool) -> Classification {
        classify(
            type_name,
            cardinality,
            required,
            &objects(&["user", "group"]),
            &TypeMapper::new(),
            &primitives(),
        )
    }

    #[test]
    fn test_scalar() {
        let c = run("long_t", Cardinality::Single, true);
        assert_eq!(c.kind, RelationKind::Scalar(StorageType::BigInteger));
        assert!(!c.unmapped);
    }

    #[test]
    fn test_reference_nullable_follows_requirement() {
        assert_eq!(
            run("user", Cardinality::Single, false).kind,
            RelationKind::ObjectReference {
                target: EntityId::object("user"),
                nullable: true
            }
        );
        assert_eq!(
            run("user", Cardinality::Single, true).kind,
            RelationKind::ObjectReference {
                target: EntityId::object("user"),
                nullable: false
            }
        );
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            run("group", Cardinality::Array, false).kind,
            RelationKind::MultiValued(ElementKind::Entity(EntityId::object("group")))
        );
        assert_eq!(
            run("string_t", Cardinality::Array, false).kind,
            RelationKind::MultiValued(ElementKind::Scalar(StorageType::Text))
        );
    }

    #[test]
    fn test_entity_wins_over_primitive() {
        let c = classify(
            "json_t",
            Cardinality::Single,
            false,
            &objects(&["json_t"]),
            &TypeMapper::new(),
            &primitives(),
        );
        assert!(c.kind.is_reference());
    }

    #[test]
    fn test_unmapped_primitive_flagged() {
        let c = run("object_t", Cardinality::Single, false);
        assert_eq!(c.kind, RelationKind::Scalar(StorageType::GenericText));
        assert!(c.unmapped);
    }

    #[test]
    fn test_same_inputs_same_kind() {
        let a = run("hostname_t", Cardinality::Single, false);
        let b = run("hostname_t", Cardinality::Single, false);
        assert_eq!(a, b);
        assert_eq!(a.kind, RelationKind::Scalar(StorageType::VarChar(253)));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(RelationKind::ObjectReference {
            target: EntityId::object("user"),
            nullable: true,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "object_reference",
                "of": { "target": "object:user", "nullable": true }
            })
        );
    }
}
