//! Inheritance resolution: flattens every definition's `extends` chain into a
//! [`ResolvedEntity`] with merged fields.
//!
//! `extends` is treated as a directed edge set over identifiers of one
//! namespace. Each definition's chain is walked iteratively with an on-path
//! set for cycle detection; finished entities are memoized for the duration of
//! one run so shared ancestors are merged once.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::corpus::{
    Cardinality, Category, Corpus, EntityId, EnumSpec, Namespace, Profile, RawDefinition,
    RawField, TypeDictionary,
};
use crate::error::SchemaError;

/// A field of a flattened entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub cardinality: Cardinality,
    pub required: bool,
    pub caption: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_spec: Option<EnumSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub deprecated: bool,
    /// Definition that declared this field, or last overrode it.
    pub origin: EntityId,
}

impl FieldSpec {
    fn declared_by(field: &RawField, origin: &EntityId) -> Self {
        Self {
            name: field.name.clone(),
            type_name: field.type_name.clone(),
            cardinality: field.cardinality,
            required: field.required,
            caption: field.caption.clone(),
            description: field.description.clone(),
            enum_spec: field.enum_spec.clone(),
            profile: field.profile.clone(),
            deprecated: field.deprecated,
            origin: origin.clone(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.cardinality == Cardinality::Array
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntity {
    pub id: EntityId,
    pub caption: String,
    pub description: String,
    /// Ancestor names, root first, excluding the entity itself.
    pub ancestors: Vec<String>,
    /// Number of ancestors; roots have depth 0.
    pub depth: usize,
    /// Inherited fields first (in ancestor declaration order), then local ones.
    pub fields: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub profiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
}

impl ResolvedEntity {
    pub fn parent(&self) -> Option<EntityId> {
        self.ancestors.last().map(|p| self.id.sibling(p.clone()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The full chain, root first, ending with this entity.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = self.ancestors.clone();
        chain.push(self.id.name.clone());
        chain
    }
}

/// Output of resolution. Carries the corpus metadata forward so the raw
/// corpus need not be retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCorpus {
    pub(crate) version: String,
    pub(crate) primitives: TypeDictionary,
    pub(crate) entities: BTreeMap<EntityId, ResolvedEntity>,
    pub(crate) categories: BTreeMap<String, Category>,
    pub(crate) profiles: BTreeMap<String, Profile>,
    pub(crate) profile_index: BTreeMap<String, Vec<EntityId>>,
    pub(crate) dictionary_enums: BTreeMap<String, EnumSpec>,
}

impl ResolvedCorpus {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn primitives(&self) -> &TypeDictionary {
        &self.primitives
    }

    pub fn get(&self, id: &EntityId) -> Option<&ResolvedEntity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &ResolvedEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Memo entry. Written once per identifier per run.
enum Memo {
    Resolved(ResolvedEntity),
    Failed,
}

/// Resolves the definitions of one namespace.
pub struct InheritanceResolver<'a> {
    namespace: Namespace,
    definitions: &'a BTreeMap<String, RawDefinition>,
    memo: HashMap<&'a str, Memo>,
    errors: Vec<SchemaError>,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(namespace: Namespace, definitions: &'a BTreeMap<String, RawDefinition>) -> Self {
        Self {
            namespace,
            definitions,
            memo: HashMap::with_capacity(definitions.len()),
            errors: Vec::new(),
        }
    }

    /// Resolve the whole corpus. Unknown parents and cycles are collected
    /// across both namespaces before failing.
    pub fn resolve_corpus(corpus: Corpus) -> Result<ResolvedCorpus, Vec<SchemaError>> {
        let profile_index = corpus
            .profile_index()
            .into_iter()
            .map(|(name, members)| (name, members.into_iter().collect()))
            .collect();

        let mut entities = BTreeMap::new();
        let mut errors = Vec::new();

        for namespace in [Namespace::Object, Namespace::Event] {
            match InheritanceResolver::new(namespace, corpus.definitions(namespace)).resolve_all() {
                Ok(resolved) => entities.extend(resolved.into_iter().map(|e| (e.id.clone(), e))),
                Err(mut errs) => errors.append(&mut errs),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let Corpus {
            version,
            primitives,
            categories,
            profiles,
            dictionary_enums,
            ..
        } = corpus;

        Ok(ResolvedCorpus {
            version,
            primitives,
            entities,
            categories,
            profiles,
            profile_index,
            dictionary_enums,
        })
    }

    /// Resolve every definition of the namespace, in identifier order.
    pub fn resolve_all(mut self) -> Result<Vec<ResolvedEntity>, Vec<SchemaError>> {
        let definitions = self.definitions;
        for name in definitions.keys() {
            self.resolve(name);
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let mut resolved: Vec<ResolvedEntity> = self
            .memo
            .into_values()
            .filter_map(|m| match m {
                Memo::Resolved(entity) => Some(entity),
                Memo::Failed => None,
            })
            .collect();
        resolved.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("resolved {} {} definitions", resolved.len(), self.namespace);
        Ok(resolved)
    }

    /// Resolve a single definition (and, transitively, its ancestors).
    pub fn resolve(&mut self, name: &'a str) -> Option<&ResolvedEntity> {
        if !self.memo.contains_key(name) {
            self.walk(name);
        }
        match self.memo.get(name) {
            Some(Memo::Resolved(entity)) => Some(entity),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    fn walk(&mut self, start: &'a str) {
        let definitions = self.definitions;
        // Climb until a root, an already-memoized ancestor, or a failure.
        let mut path: Vec<&'a str> = Vec::new();
        let mut on_path: HashMap<&'a str, usize> = HashMap::new();
        let mut cursor = start;

        let base: Option<&'a str> = loop {
            if self.memo.contains_key(cursor) {
                break Some(cursor);
            }
            if let Some(&at) = on_path.get(cursor) {
                let mut cycle: Vec<String> = path[at..].iter().map(|s| s.to_string()).collect();
                cycle.push(cursor.to_string());
                self.errors.push(SchemaError::CyclicInheritance {
                    namespace: self.namespace,
                    cycle,
                });
                self.fail(&path);
                return;
            }

            // Every name on the path is either `start` or a checked parent.
            let Some((key, def)) = definitions.get_key_value(cursor) else {
                self.fail(&path);
                return;
            };
            on_path.insert(key.as_str(), path.len());
            path.push(key.as_str());

            match def.extends.as_deref() {
                None => break None,
                Some(parent) => match definitions.get_key_value(parent) {
                    Some((parent_key, _)) => cursor = parent_key.as_str(),
                    None => {
                        self.errors.push(SchemaError::UnknownParent {
                            namespace: self.namespace,
                            definition: key.clone(),
                            parent: parent.to_string(),
                        });
                        self.fail(&path);
                        return;
                    }
                },
            }
        };

        if let Some(base) = base {
            if matches!(self.memo.get(base), Some(Memo::Failed)) {
                self.fail(&path);
                return;
            }
        }

        // Merge downward from the deepest known ancestor.
        let mut parent = base;
        for &name in path.iter().rev() {
            let def = &definitions[name];
            let resolved = {
                let parent_entity = parent.and_then(|p| match self.memo.get(p) {
                    Some(Memo::Resolved(entity)) => Some(entity),
                    _ => None,
                });
                merge(parent_entity, def)
            };
            self.memo.insert(name, Memo::Resolved(resolved));
            parent = Some(name);
        }
    }

    fn fail(&mut self, path: &[&'a str]) {
        for &name in path {
            self.memo.insert(name, Memo::Failed);
        }
    }
}

/// Flatten `def` on top of its resolved parent. Same-named fields are
/// replaced in place (last writer wins, origin recorded); new fields are
/// appended after the inherited ones.
fn merge(parent: Option<&ResolvedEntity>, def: &RawDefinition) -> ResolvedEntity {
    let (ancestors, mut fields) = match parent {
        Some(p) => (p.chain(), p.fields.clone()),
        None => (Vec::new(), Vec::new()),
    };

    let mut index: HashMap<String, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();

    for field in &def.fields {
        let spec = FieldSpec::declared_by(field, &def.id);
        match index.get(&field.name) {
            Some(&at) => fields[at] = spec,
            None => {
                index.insert(field.name.clone(), fields.len());
                fields.push(spec);
            }
        }
    }

    // Events inherit their category when they do not declare one.
    let category = def
        .category
        .clone()
        .or_else(|| parent.and_then(|p| p.category.clone()));

    ResolvedEntity {
        id: def.id.clone(),
        caption: def.caption.clone(),
        description: def.description.clone(),
        depth: ancestors.len(),
        ancestors,
        fields,
        category,
        profiles: def.profiles.clone(),
        uid: def.uid,
    }
}
