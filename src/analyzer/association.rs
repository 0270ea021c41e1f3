//! Association tables synthesized from multi-valued fields.

use std::fmt;

use serde::{Serialize, Serializer};

use super::classify::ElementKind;
use crate::corpus::EntityId;

/// `(owning entity, field name)`; unique per association.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssociationKey {
    pub owner: EntityId,
    pub field: String,
}

impl AssociationKey {
    pub fn new(owner: EntityId, field: impl Into<String>) -> Self {
        Self {
            owner,
            field: field.into(),
        }
    }
}

impl fmt::Display for AssociationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.field)
    }
}

impl Serialize for AssociationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Synthetic primary key of an association row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositeKey {
    /// Owner id + referenced entity id.
    OwnerTarget { owner: EntityId, target: EntityId },
    /// Owner id + position, for ordered scalar arrays.
    OwnerOrdinal { owner: EntityId },
}

impl CompositeKey {
    /// Entities whose ids make up the key.
    pub fn references(&self) -> Vec<&EntityId> {
        match self {
            CompositeKey::OwnerTarget { owner, target } => vec![owner, target],
            CompositeKey::OwnerOrdinal { owner } => vec![owner],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationTable {
    pub owner: EntityId,
    pub field: String,
    /// Definition that declared the array field.
    pub declared_by: EntityId,
    pub element: ElementKind,
    pub key: CompositeKey,
}

impl AssociationTable {
    pub fn synthesize(
        owner: &EntityId,
        field: &str,
        declared_by: &EntityId,
        element: ElementKind,
    ) -> Self {
        let key = match &element {
            ElementKind::Entity(target) => CompositeKey::OwnerTarget {
                owner: owner.clone(),
                target: target.clone(),
            },
            ElementKind::Scalar(_) => CompositeKey::OwnerOrdinal {
                owner: owner.clone(),
            },
        };
        Self {
            owner: owner.clone(),
            field: field.to_string(),
            declared_by: declared_by.clone(),
            element,
            key,
        }
    }

    pub fn association_key(&self) -> AssociationKey {
        AssociationKey::new(self.owner.clone(), self.field.clone())
    }

    pub fn target(&self) -> Option<&EntityId> {
        self.element.target()
    }

    /// Whether the array field was inherited rather than declared by the owner.
    pub fn is_inherited(&self) -> bool {
        self.declared_by != self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StorageType;

    #[test]
    fn test_entity_element_keys_owner_and_target() {
        let device = EntityId::object("device");
        let table = AssociationTable::synthesize(
            &device,
            "groups",
            &device,
            ElementKind::Entity(EntityId::object("group")),
        );
        assert_eq!(
            table.key,
            CompositeKey::OwnerTarget {
                owner: EntityId::object("device"),
                target: EntityId::object("group"),
            }
        );
        assert_eq!(table.key.references().len(), 2);
        assert_eq!(table.association_key().to_string(), "object:device.groups");
        assert!(!table.is_inherited());
    }

    #[test]
    fn test_scalar_element_keys_owner_and_ordinal() {
        let table = AssociationTable::synthesize(
            &EntityId::object("laptop"),
            "labels",
            &EntityId::object("device"),
            ElementKind::Scalar(StorageType::Text),
        );
        assert_eq!(
            table.key,
            CompositeKey::OwnerOrdinal {
                owner: EntityId::object("laptop")
            }
        );
        assert!(table.target().is_none());
        assert!(table.is_inherited());
    }
}
