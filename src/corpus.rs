//! Raw schema definitions as ingested from the corpus, before any
//! inheritance resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::SchemaError;

/// Objects and events live in separate identifier namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Object,
    Event,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced identifier of a definition, e.g. `object:device`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    pub namespace: Namespace,
    pub name: String,
}

impl EntityId {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(Namespace::Object, name)
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::new(Namespace::Event, name)
    }

    /// Identifier of another definition in the same namespace.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.namespace, name)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

// Serialized as its display string so it can key JSON maps.
impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Array,
}

/// Enumerated values declared on an attribute: id -> caption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnumSpec {
    pub values: BTreeMap<i64, String>,
}

/// One locally declared field of a definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawField {
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
}

/// One schema source unit: an object or event definition as written.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDefinition {
    pub id: EntityId,
    pub caption: String,
    pub description: String,
    pub extends: Option<String>,
    pub fields: Vec<RawField>,
    pub category: Option<String>,
    pub profiles: Vec<String>,
    pub uid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub name: String,
    pub caption: String,
    pub description: String,
    pub uid: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub caption: String,
    pub description: String,
}

/// Entry of the primitive-type dictionary. `base` names the primitive this
/// one is derived from (`hostname_t` -> `string_t`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveType {
    pub name: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDictionary {
    types: BTreeMap<String, PrimitiveType>,
}

impl TypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, primitive: PrimitiveType) {
        self.types.insert(primitive.name.clone(), primitive);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PrimitiveType> {
        self.types.get(name)
    }

    pub fn base_of(&self, name: &str) -> Option<&str> {
        self.types.get(name).and_then(|t| t.base.as_deref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// The loaded corpus. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub(crate) version: String,
    pub(crate) primitives: TypeDictionary,
    pub(crate) objects: BTreeMap<String, RawDefinition>,
    pub(crate) events: BTreeMap<String, RawDefinition>,
    pub(crate) categories: BTreeMap<String, Category>,
    pub(crate) profiles: BTreeMap<String, Profile>,
    pub(crate) dictionary_enums: BTreeMap<String, EnumSpec>,
}

impl Corpus {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn primitives(&self) -> &TypeDictionary {
        &self.primitives
    }

    pub fn definitions(&self, namespace: Namespace) -> &BTreeMap<String, RawDefinition> {
        match namespace {
            Namespace::Object => &self.objects,
            Namespace::Event => &self.events,
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&RawDefinition> {
        self.definitions(id.namespace).get(&id.name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &RawDefinition> {
        self.objects.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &RawDefinition> {
        self.events.values()
    }

    pub fn categories(&self) -> &BTreeMap<String, Category> {
        &self.categories
    }

    pub fn profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    /// Enums declared on dictionary attributes, whether or not any definition
    /// uses the attribute.
    pub fn dictionary_enums(&self) -> &BTreeMap<String, EnumSpec> {
        &self.dictionary_enums
    }

    /// Profile name -> definitions that opt into it, either as a whole or
    /// through one of their fields.
    pub fn profile_index(&self) -> BTreeMap<String, BTreeSet<EntityId>> {
        let mut index: BTreeMap<String, BTreeSet<EntityId>> = self
            .profiles
            .keys()
            .map(|name| (name.clone(), BTreeSet::new()))
            .collect();

        for def in self.objects.values().chain(self.events.values()) {
            let field_profiles = def.fields.iter().filter_map(|f| f.profile.as_ref());
            for profile in def.profiles.iter().chain(field_profiles) {
                index
                    .entry(profile.clone())
                    .or_default()
                    .insert(def.id.clone());
            }
        }

        index
    }
}

/// Assembles a [`Corpus`], enforcing identifier uniqueness on insert and type
/// existence on build.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    version: String,
    primitives: TypeDictionary,
    objects: BTreeMap<String, RawDefinition>,
    events: BTreeMap<String, RawDefinition>,
    categories: BTreeMap<String, Category>,
    profiles: BTreeMap<String, Profile>,
    dictionary_enums: BTreeMap<String, EnumSpec>,
}

impl CorpusBuilder {
    pub fn new(version: impl Into<String>, primitives: TypeDictionary) -> Self {
        Self {
            version: version.into(),
            primitives,
            ..Self::default()
        }
    }

    pub fn category(&mut self, category: Category) {
        self.categories.insert(category.name.clone(), category);
    }

    pub fn profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn dictionary_enum(&mut self, attribute: impl Into<String>, values: EnumSpec) {
        self.dictionary_enums.insert(attribute.into(), values);
    }

    pub fn insert(&mut self, def: RawDefinition) -> Result<(), SchemaError> {
        let namespace = def.id.namespace;
        let table = match namespace {
            Namespace::Object => &mut self.objects,
            Namespace::Event => &mut self.events,
        };
        if table.contains_key(&def.id.name) {
            return Err(SchemaError::DuplicateIdentifier {
                namespace,
                name: def.id.name,
            });
        }
        table.insert(def.id.name.clone(), def);
        Ok(())
    }

    /// Check every field type against the primitive dictionary and the object
    /// namespace, reporting all unknown types together.
    pub fn build(self) -> Result<Corpus, Vec<SchemaError>> {
        let mut errors = Vec::new();

        for def in self.objects.values().chain(self.events.values()) {
            for field in &def.fields {
                let known = self.primitives.contains(&field.type_name)
                    || self.objects.contains_key(&field.type_name);
                if !known {
                    errors.push(SchemaError::UnknownType {
                        namespace: def.id.namespace,
                        definition: def.id.name.clone(),
                        field: field.name.clone(),
                        type_name: field.type_name.clone(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Corpus {
            version: self.version,
            primitives: self.primitives,
            objects: self.objects,
            events: self.events,
            categories: self.categories,
            profiles: self.profiles,
            dictionary_enums: self.dictionary_enums,
        })
    }
}
