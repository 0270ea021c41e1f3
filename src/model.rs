//! Normalized schema model: the single output of an analysis run.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::analyzer::{AssociationKey, AssociationTable, ModelEnum, NamingCollision, RelationKind};
use crate::corpus::{Category, EntityId, Namespace, Profile};
use crate::error::Warning;
use crate::resolver::FieldSpec;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub relation: RelationKind,
}

impl ClassifiedField {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntity {
    pub id: EntityId,
    pub caption: String,
    pub description: String,
    pub ancestors: Vec<String>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub profiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    pub fields: Vec<ClassifiedField>,
}

impl ModelEntity {
    pub fn parent(&self) -> Option<EntityId> {
        self.ancestors.last().map(|p| self.id.sibling(p.clone()))
    }

    pub fn field(&self, name: &str) -> Option<&ClassifiedField> {
        self.fields.iter().find(|f| f.spec.name == name)
    }

    /// Fields declared or overridden by this entity itself.
    pub fn own_fields(&self) -> impl Iterator<Item = &ClassifiedField> {
        self.fields.iter().filter(move |f| f.spec.origin == self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSchemaModel {
    pub(crate) version: String,
    pub(crate) entities: BTreeMap<EntityId, ModelEntity>,
    pub(crate) associations: BTreeMap<AssociationKey, AssociationTable>,
    pub(crate) categories: BTreeMap<String, Category>,
    pub(crate) profiles: BTreeMap<String, Profile>,
    pub(crate) profile_index: BTreeMap<String, Vec<EntityId>>,
    pub(crate) enums: BTreeMap<String, ModelEnum>,
    pub(crate) warnings: Vec<Warning>,
}

impl NormalizedSchemaModel {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entity(&self, id: &EntityId) -> Option<&ModelEntity> {
        self.entities.get(id)
    }

    pub fn object(&self, name: &str) -> Option<&ModelEntity> {
        self.entity(&EntityId::object(name))
    }

    pub fn event(&self, name: &str) -> Option<&ModelEntity> {
        self.entity(&EntityId::event(name))
    }

    pub fn entities(&self) -> impl Iterator<Item = &ModelEntity> {
        self.entities.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = &ModelEntity> {
        self.entities_in(Namespace::Object)
    }

    pub fn events(&self) -> impl Iterator<Item = &ModelEntity> {
        self.entities_in(Namespace::Event)
    }

    fn entities_in(&self, namespace: Namespace) -> impl Iterator<Item = &ModelEntity> {
        self.entities
            .values()
            .filter(move |e| e.id.namespace == namespace)
    }

    /// Every entity, ancestors before descendants, ordered by
    /// `(namespace, depth, name)`.
    pub fn topological(&self) -> Vec<&ModelEntity> {
        let mut ordered: Vec<&ModelEntity> = self.entities.values().collect();
        ordered.sort_by(|a, b| {
            (a.id.namespace, a.depth, &a.id.name).cmp(&(b.id.namespace, b.depth, &b.id.name))
        });
        ordered
    }

    pub fn roots(&self, namespace: Namespace) -> Vec<&ModelEntity> {
        self.entities_in(namespace).filter(|e| e.depth == 0).collect()
    }

    pub fn children(&self, id: &EntityId) -> Vec<&ModelEntity> {
        self.entities
            .values()
            .filter(|e| e.parent().as_ref() == Some(id))
            .collect()
    }

    /// All descendants, breadth-first.
    pub fn descendants(&self, id: &EntityId) -> Vec<&ModelEntity> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&ModelEntity> = self.children(id).into_iter().collect();
        while let Some(entity) = queue.pop_front() {
            queue.extend(self.children(&entity.id));
            out.push(entity);
        }
        out
    }

    pub fn associations(&self) -> impl Iterator<Item = &AssociationTable> {
        self.associations.values()
    }

    pub fn association(&self, owner: &EntityId, field: &str) -> Option<&AssociationTable> {
        self.associations
            .get(&AssociationKey::new(owner.clone(), field))
    }

    pub fn associations_of<'a>(
        &'a self,
        owner: &'a EntityId,
    ) -> impl Iterator<Item = &'a AssociationTable> + 'a {
        self.associations.values().filter(move |a| &a.owner == owner)
    }

    /// Objects an entity points at through reference or multi-valued fields.
    pub fn dependencies(&self, id: &EntityId) -> BTreeSet<EntityId> {
        self.entity(id)
            .map(|e| {
                e.fields
                    .iter()
                    .filter_map(|f| f.relation.target().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn categories(&self) -> &BTreeMap<String, Category> {
        &self.categories
    }

    pub fn category_members(&self, category: &str) -> Vec<&ModelEntity> {
        self.events()
            .filter(|e| e.category.as_deref() == Some(category))
            .collect()
    }

    pub fn profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    pub fn profile_members(&self, profile: &str) -> &[EntityId] {
        self.profile_index
            .get(profile)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn enums(&self) -> &BTreeMap<String, ModelEnum> {
        &self.enums
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn naming_collisions(&self) -> impl Iterator<Item = &NamingCollision> {
        self.warnings.iter().filter_map(|w| match w {
            Warning::NamingCollision(c) => Some(c),
            _ => None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::fixtures::{array, corpus, definition, field, required};
    use crate::naming::SnakeCasePolicy;
    use crate::resolver::InheritanceResolver;
    use crate::types::TypeMapper;

    fn model() -> NormalizedSchemaModel {
        let corpus = corpus(vec![
            definition(EntityId::object("_entity"), None, vec![field("name", "string_t")]),
            definition(
                EntityId::object("group"),
                Some("_entity"),
                vec![array("privileges", "string_t")],
            ),
            definition(
                EntityId::object("user"),
                Some("_entity"),
                vec![array("groups", "group")],
            ),
            definition(
                EntityId::object("admin"),
                Some("user"),
                vec![field("level", "integer_t")],
            ),
            definition(
                EntityId::object("device"),
                Some("_entity"),
                vec![required(field("owner", "user")), array("groups", "group")],
            ),
            definition(EntityId::event("base_event"), None, vec![field("time", "timestamp_t")]),
            definition(
                EntityId::event("login"),
                Some("base_event"),
                vec![field("device", "device")],
            ),
        ]);
        let resolved = InheritanceResolver::resolve_corpus(corpus).unwrap();
        Analyzer::new(&TypeMapper::new(), &SnakeCasePolicy::default())
            .analyze(resolved)
            .unwrap()
    }

    fn names(entities: &[&ModelEntity]) -> Vec<String> {
        entities.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn test_topological_order() {
        let model = model();
        let order = model.topological();
        assert_eq!(
            names(&order),
            vec![
                "object:_entity",
                "object:device",
                "object:group",
                "object:user",
                "object:admin",
                "event:base_event",
                "event:login",
            ]
        );
        for entity in &order {
            if let Some(parent) = entity.parent() {
                let at = order.iter().position(|e| e.id == parent).unwrap();
                let me = order.iter().position(|e| e.id == entity.id).unwrap();
                assert!(at < me);
            }
        }
    }

    #[test]
    fn test_tree_queries() {
        let model = model();
        assert_eq!(names(&model.roots(Namespace::Object)), vec!["object:_entity"]);
        assert_eq!(
            names(&model.children(&EntityId::object("_entity"))),
            vec!["object:device", "object:group", "object:user"]
        );
        assert_eq!(
            names(&model.descendants(&EntityId::object("_entity"))),
            vec!["object:device", "object:group", "object:user", "object:admin"]
        );
        assert!(model.children(&EntityId::object("admin")).is_empty());
    }

    #[test]
    fn test_dependencies() {
        let model = model();
        let deps = model.dependencies(&EntityId::object("device"));
        assert_eq!(
            deps.into_iter().collect::<Vec<_>>(),
            vec![EntityId::object("group"), EntityId::object("user")]
        );
        assert!(model.dependencies(&EntityId::object("_entity")).is_empty());
    }

    #[test]
    fn test_own_fields_excludes_inherited() {
        let model = model();
        let admin = model.object("admin").unwrap();
        let own: Vec<&str> = admin.own_fields().map(|f| f.name()).collect();
        assert_eq!(own, vec!["level"]);
        assert_eq!(admin.fields.len(), 3);
    }

    #[test]
    fn test_associations_of() {
        let model = model();
        let device = EntityId::object("device");
        let owned: Vec<&str> = model
            .associations_of(&device)
            .map(|a| a.field.as_str())
            .collect();
        assert_eq!(owned, vec!["groups"]);
    }

    #[test]
    fn test_json_is_stable() {
        let first = model().to_json().unwrap();
        let second = model().to_json().unwrap();
        assert_eq!(first, second);

        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["version"], "1.0.0-test");
        assert!(value["entities"]["object:device"].is_object());
        assert!(value["associations"]["object:device.groups"].is_object());
    }
}
