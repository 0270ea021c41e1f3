//! Relationship and type analysis: classifies every resolved field, synthesizes
//! association tables for arrays, and assembles the normalized model.

mod association;
mod classify;
mod collision;
mod enums;

pub use association::{AssociationKey, AssociationTable, CompositeKey};
pub use classify::{classify, Classification, ElementKind, RelationKind};
pub use collision::{detect as detect_collisions, Artifact, NamingCollision};
pub use enums::ModelEnum;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::corpus::{EntityId, Namespace};
use crate::error::{SchemaError, Warning};
use crate::model::{ClassifiedField, ModelEntity, NormalizedSchemaModel};
use crate::naming::NamingPolicy;
use crate::resolver::{ResolvedCorpus, ResolvedEntity};
use crate::types::TypeMapper;

pub struct Analyzer<'a> {
    mapper: &'a TypeMapper,
    naming: &'a dyn NamingPolicy,
}

impl<'a> Analyzer<'a> {
    pub fn new(mapper: &'a TypeMapper, naming: &'a dyn NamingPolicy) -> Self {
        Self { mapper, naming }
    }

    /// Classify every field of every entity. Dangling parents and unknown
    /// field types are collected across the whole corpus before failing.
    pub fn analyze(
        &self,
        resolved: ResolvedCorpus,
    ) -> Result<NormalizedSchemaModel, Vec<SchemaError>> {
        let objects: BTreeSet<String> = resolved
            .entities
            .keys()
            .filter(|id| id.namespace == Namespace::Object)
            .map(|id| id.name.clone())
            .collect();

        let mut errors = Vec::new();
        for entity in resolved.entities.values() {
            self.validate(entity, &resolved, &objects, &mut errors);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let ResolvedCorpus {
            version,
            primitives,
            entities: resolved_entities,
            categories,
            profiles,
            profile_index,
            dictionary_enums,
        } = resolved;

        // Enums are collected root-first so the shallowest declaration wins.
        let mut ordered: Vec<&ResolvedEntity> = resolved_entities.values().collect();
        ordered.sort_by(|a, b| {
            (a.id.namespace, a.depth, &a.id.name).cmp(&(b.id.namespace, b.depth, &b.id.name))
        });
        let (mut enums, enum_warnings) =
            enums::extract(ordered.iter().flat_map(|e| e.fields.iter()));
        enums::seed_dictionary(&mut enums, dictionary_enums);

        let mut entities = BTreeMap::new();
        let mut associations = BTreeMap::new();
        let mut unmapped: BTreeSet<(EntityId, String)> = BTreeSet::new();
        let mut warnings = Vec::new();

        for (id, entity) in resolved_entities {
            let mut fields = Vec::with_capacity(entity.fields.len());
            for spec in entity.fields {
                let Classification { kind, unmapped: fallback } = classify(
                    &spec.type_name,
                    spec.cardinality,
                    spec.required,
                    &objects,
                    self.mapper,
                    &primitives,
                );

                if fallback && unmapped.insert((spec.origin.clone(), spec.name.clone())) {
                    warnings.push(Warning::UnmappedPrimitive {
                        entity: spec.origin.clone(),
                        field: spec.name.clone(),
                        type_name: spec.type_name.clone(),
                    });
                }

                if let RelationKind::MultiValued(element) = &kind {
                    let table =
                        AssociationTable::synthesize(&id, &spec.name, &spec.origin, element.clone());
                    associations.insert(table.association_key(), table);
                }

                fields.push(ClassifiedField {
                    spec,
                    relation: kind,
                });
            }

            entities.insert(
                id,
                ModelEntity {
                    id: entity.id,
                    caption: entity.caption,
                    description: entity.description,
                    ancestors: entity.ancestors,
                    depth: entity.depth,
                    category: entity.category,
                    profiles: entity.profiles,
                    uid: entity.uid,
                    fields,
                },
            );
        }

        let collisions = detect_collisions(entities.keys(), associations.keys(), self.naming);
        let mut all_warnings: Vec<Warning> = collisions
            .into_iter()
            .map(Warning::NamingCollision)
            .collect();
        all_warnings.append(&mut warnings);
        all_warnings.extend(enum_warnings);

        for warning in &all_warnings {
            warn!("{}", warning);
        }
        debug!(
            "classified {} entities, synthesized {} association tables",
            entities.len(),
            associations.len()
        );

        Ok(NormalizedSchemaModel {
            version,
            entities,
            associations,
            categories,
            profiles,
            profile_index,
            enums,
            warnings: all_warnings,
        })
    }

    fn validate(
        &self,
        entity: &ResolvedEntity,
        resolved: &ResolvedCorpus,
        objects: &BTreeSet<String>,
        errors: &mut Vec<SchemaError>,
    ) {
        if let Some(parent) = entity.parent() {
            if resolved.get(&parent).is_none() {
                errors.push(SchemaError::UnknownParent {
                    namespace: entity.id.namespace,
                    definition: entity.id.name.clone(),
                    parent: parent.name,
                });
            }
        }

        for field in &entity.fields {
            // Inherited fields are reported once, on the definition that
            // declared them.
            if field.origin != entity.id {
                continue;
            }
            let known = objects.contains(&field.type_name)
                || resolved.primitives.contains(&field.type_name);
            if !known {
                errors.push(SchemaError::UnknownType {
                    namespace: entity.id.namespace,
                    definition: entity.id.name.clone(),
                    field: field.name.clone(),
                    type_name: field.type_name.clone(),
                });
            }
        }
    }
}
