//! Partial models: the objects reachable from one core object within a
//! number of reference hops, plus everything their inheritance chains need.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::Artifact;
use crate::corpus::EntityId;
use crate::error::Warning;
use crate::model::{ModelEntity, NormalizedSchemaModel};

fn default_max_depth() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterConfig {
    pub core_object: String,
    /// Reference hops from the core object; 0 keeps the core object only.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub include_events: bool,
}

impl FilterConfig {
    pub fn new(core_object: impl Into<String>) -> Self {
        Self {
            core_object: core_object.into(),
            max_depth: default_max_depth(),
            include_events: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// Objects reached by traversal, with their hop distance.
    pub object_depths: BTreeMap<String, usize>,
    /// Ancestors pulled in only to complete inheritance chains.
    pub inheritance_additions: BTreeSet<EntityId>,
    pub excluded_objects: BTreeSet<String>,
    pub included_events: BTreeSet<String>,
}

impl FilterReport {
    pub fn included_objects(&self) -> impl Iterator<Item = &str> {
        self.object_depths.keys().map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("core object '{name}' not found; available objects include: {}", .available.join(", "))]
    UnknownCoreObject { name: String, available: Vec<String> },
}

pub fn extract(
    model: &NormalizedSchemaModel,
    config: &FilterConfig,
) -> Result<(NormalizedSchemaModel, FilterReport), FilterError> {
    let core = EntityId::object(config.core_object.as_str());
    if model.entity(&core).is_none() {
        return Err(FilterError::UnknownCoreObject {
            name: config.core_object.clone(),
            available: model.objects().take(10).map(|e| e.id.name.clone()).collect(),
        });
    }

    let mut report = FilterReport::default();
    let mut kept: BTreeSet<EntityId> = BTreeSet::new();

    // Breadth-first over object references.
    let mut queue = VecDeque::from([(core, 0usize)]);
    while let Some((id, depth)) = queue.pop_front() {
        if kept.contains(&id) || model.entity(&id).is_none() {
            continue;
        }
        report.object_depths.insert(id.name.clone(), depth);
        kept.insert(id.clone());
        if depth >= config.max_depth {
            continue;
        }
        for dep in model.dependencies(&id) {
            if !kept.contains(&dep) {
                queue.push_back((dep, depth + 1));
            }
        }
    }

    if config.include_events {
        for event in model.events() {
            let related = event
                .fields
                .iter()
                .filter_map(|f| f.relation.target())
                .any(|target| kept.contains(target));
            if related {
                report.included_events.insert(event.id.name.clone());
                kept.insert(event.id.clone());
            }
        }
    }

    let mut additions = BTreeSet::new();
    for id in &kept {
        if let Some(entity) = model.entity(id) {
            for ancestor in &entity.ancestors {
                let ancestor = id.sibling(ancestor.clone());
                if !kept.contains(&ancestor) && model.entity(&ancestor).is_some() {
                    additions.insert(ancestor);
                }
            }
        }
    }
    kept.extend(additions.iter().cloned());
    report.inheritance_additions = additions;

    report.excluded_objects = model
        .objects()
        .filter(|e| !kept.contains(&e.id))
        .map(|e| e.id.name.clone())
        .collect();

    debug!(
        "partial model around {}: {} kept, {} objects excluded",
        config.core_object,
        kept.len(),
        report.excluded_objects.len()
    );

    Ok((restrict(model, &kept), report))
}

fn restrict(model: &NormalizedSchemaModel, kept: &BTreeSet<EntityId>) -> NormalizedSchemaModel {
    let entities: BTreeMap<EntityId, ModelEntity> = model
        .entities
        .iter()
        .filter(|(id, _)| kept.contains(*id))
        .map(|(id, entity)| {
            let mut entity = entity.clone();
            entity
                .fields
                .retain(|f| f.relation.target().is_none_or(|t| kept.contains(t)));
            (id.clone(), entity)
        })
        .collect();

    let associations = model
        .associations
        .iter()
        .filter(|(_, a)| kept.contains(&a.owner) && a.target().is_none_or(|t| kept.contains(t)))
        .map(|(k, a)| (k.clone(), a.clone()))
        .collect();

    let enum_fields: BTreeSet<&str> = entities
        .values()
        .flat_map(|e| e.fields.iter())
        .filter(|f| f.spec.enum_spec.is_some())
        .map(|f| f.name())
        .collect();
    let enums = model
        .enums
        .iter()
        .filter(|(name, _)| enum_fields.contains(name.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let profile_index = model
        .profile_index
        .iter()
        .map(|(name, members)| {
            let members: Vec<EntityId> = members
                .iter()
                .filter(|m| kept.contains(*m))
                .cloned()
                .collect();
            (name.clone(), members)
        })
        .collect();

    let warnings = model
        .warnings
        .iter()
        .filter_map(|w| restrict_warning(w, kept))
        .collect();

    NormalizedSchemaModel {
        version: model.version.clone(),
        entities,
        associations,
        categories: model.categories.clone(),
        profiles: model.profiles.clone(),
        profile_index,
        enums,
        warnings,
    }
}

fn restrict_warning(warning: &Warning, kept: &BTreeSet<EntityId>) -> Option<Warning> {
    match warning {
        Warning::NamingCollision(collision) => {
            let mut collision = collision.clone();
            collision.artifacts.retain(|a| match a {
                Artifact::Entity(id) => kept.contains(id),
                Artifact::Association(key) => kept.contains(&key.owner),
            });
            (collision.artifacts.len() > 1).then_some(Warning::NamingCollision(collision))
        }
        Warning::UnmappedPrimitive { entity, .. } => {
            kept.contains(entity).then(|| warning.clone())
        }
        Warning::EnumConflict { first, second, .. } => {
            (kept.contains(first) && kept.contains(second)).then(|| warning.clone())
        }
    }
}
