//! Detects artifacts that a naming policy would render to the same table name.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::association::AssociationKey;
use crate::corpus::EntityId;
use crate::naming::NamingPolicy;

/// Something that becomes a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Artifact {
    Entity(EntityId),
    Association(AssociationKey),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Entity(id) => write!(f, "entity {}", id),
            Artifact::Association(key) => write!(f, "association {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingCollision {
    /// The rendered name every artifact maps to.
    pub name: String,
    pub artifacts: Vec<Artifact>,
}

impl NamingCollision {
    pub fn involves(&self, artifact: &Artifact) -> bool {
        self.artifacts.contains(artifact)
    }
}

/// Group artifacts by rendered table name; every group of two or more is a
/// collision. Nothing is renamed.
pub fn detect<'a>(
    entities: impl IntoIterator<Item = &'a EntityId>,
    associations: impl IntoIterator<Item = &'a AssociationKey>,
    policy: &dyn NamingPolicy,
) -> Vec<NamingCollision> {
    let mut by_name: BTreeMap<String, Vec<Artifact>> = BTreeMap::new();

    for id in entities {
        by_name
            .entry(policy.table_name(id))
            .or_default()
            .push(Artifact::Entity(id.clone()));
    }
    for key in associations {
        by_name
            .entry(policy.association_table_name(&key.owner, &key.field))
            .or_default()
            .push(Artifact::Association(key.clone()));
    }

    by_name
        .into_iter()
        .filter(|(_, artifacts)| artifacts.len() > 1)
        .map(|(name, mut artifacts)| {
            artifacts.sort();
            NamingCollision { name, artifacts }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SnakeCasePolicy;

    #[test]
    fn test_association_collides_with_entity() {
        let entities = [EntityId::object("device"), EntityId::object("device_groups")];
        let associations = [AssociationKey::new(EntityId::object("device"), "groups")];
        let collisions = detect(&entities, &associations, &SnakeCasePolicy::default());

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].name, "ocsf_device_groups");
        assert_eq!(
            collisions[0].artifacts,
            vec![
                Artifact::Entity(EntityId::object("device_groups")),
                Artifact::Association(associations[0].clone()),
            ]
        );
    }

    #[test]
    fn test_object_and_event_share_table_namespace() {
        let entities = [EntityId::object("file"), EntityId::event("file")];
        let collisions = detect(&entities, [], &SnakeCasePolicy::default());
        assert_eq!(collisions.len(), 1);
        assert!(collisions[0].involves(&Artifact::Entity(EntityId::event("file"))));
    }

    #[test]
    fn test_snake_case_folding_collides() {
        let associations = [
            AssociationKey::new(EntityId::object("device"), "loadedModules"),
            AssociationKey::new(EntityId::object("device"), "loaded_modules"),
        ];
        let collisions = detect([], &associations, &SnakeCasePolicy::default());
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].name, "ocsf_device_loaded_modules");
    }

    #[test]
    fn test_distinct_names_do_not_collide() {
        let entities = [EntityId::object("user"), EntityId::object("group")];
        let associations = [AssociationKey::new(EntityId::object("user"), "groups")];
        assert!(detect(&entities, &associations, &SnakeCasePolicy::default()).is_empty());
    }
}
