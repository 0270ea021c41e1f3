//! Schema loader: turns the documents of a [`CorpusSource`] into a validated
//! [`Corpus`]. No inheritance resolution happens here.

mod source;

pub use source::{BundleSource, CorpusSource, DirectorySource, DocumentKind, SourceDocument};

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::corpus::{
    Cardinality, Category, Corpus, CorpusBuilder, EntityId, EnumSpec, Namespace, PrimitiveType,
    Profile, RawDefinition, RawField, TypeDictionary,
};
use crate::error::SchemaError;

/// Placeholder type naming an embedded object; the real target is carried in
/// `object_type`.
const OBJECT_TYPE: &str = "object_t";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefinitionDoc {
    name: Option<String>,
    caption: Option<String>,
    description: Option<String>,
    extends: Option<String>,
    category: Option<String>,
    uid: Option<i64>,
    profiles: Option<Vec<String>>,
    attributes: Map<String, Value>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct AttributeDoc {
    caption: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    object_type: Option<String>,
    is_array: Option<bool>,
    requirement: Option<String>,
    #[serde(rename = "enum")]
    values: Option<Map<String, Value>>,
    profile: Option<String>,
    deprecated: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DictionaryDoc {
    attributes: Map<String, Value>,
    types: TypesDoc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypesDoc {
    attributes: BTreeMap<String, TypeDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypeDoc {
    caption: Option<String>,
    #[serde(rename = "type")]
    base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoriesDoc {
    attributes: BTreeMap<String, CategoryDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryDoc {
    caption: Option<String>,
    description: Option<String>,
    uid: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileDoc {
    name: Option<String>,
    caption: Option<String>,
    description: Option<String>,
}

/// Dictionary attribute defaults, keyed by attribute name.
type AttributeDefaults = BTreeMap<String, AttributeDoc>;

pub struct Loader;

impl Loader {
    /// Load and validate a corpus. Duplicate identifiers abort immediately;
    /// field-level problems are collected and reported together.
    pub fn load(source: &dyn CorpusSource) -> Result<Corpus, Vec<SchemaError>> {
        let documents = source.documents().map_err(|e| vec![e])?;

        let mut version = None;
        let mut dictionary = None;
        let mut categories = None;
        let mut definitions = Vec::new();
        let mut profiles = Vec::new();

        for doc in documents {
            match doc.kind {
                DocumentKind::Version => version = Some(doc),
                DocumentKind::Dictionary => dictionary = Some(doc),
                DocumentKind::Categories => categories = Some(doc),
                DocumentKind::Profile => profiles.push(doc),
                DocumentKind::Object | DocumentKind::Event => definitions.push(doc),
            }
        }

        let version = version.ok_or_else(|| missing("version"))?;
        let version = parse_version(&version).map_err(|e| vec![e])?;
        let dictionary = dictionary.ok_or_else(|| missing("dictionary"))?;
        let categories = categories.ok_or_else(|| missing("categories"))?;

        let (primitives, defaults) = parse_dictionary(&dictionary).map_err(|e| vec![e])?;
        let mut builder = CorpusBuilder::new(version, primitives);
        for (attribute, doc) in &defaults {
            if let Some(values) = &doc.values {
                builder.dictionary_enum(attribute.clone(), parse_enum(values));
            }
        }

        for category in parse_categories(&categories).map_err(|e| vec![e])? {
            builder.category(category);
        }
        for doc in &profiles {
            builder.profile(parse_profile(doc).map_err(|e| vec![e])?);
        }

        let mut errors = Vec::new();
        let (mut objects, mut events) = (0usize, 0usize);
        for doc in &definitions {
            let def = match parse_definition(doc, &defaults) {
                Ok(def) => def,
                Err(mut errs) => {
                    errors.append(&mut errs);
                    continue;
                }
            };
            match def.id.namespace {
                Namespace::Object => objects += 1,
                Namespace::Event => events += 1,
            }
            builder.insert(def).map_err(|e| vec![e])?;
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let corpus = builder.build()?;
        info!(
            "loaded schema {} from {}: {} objects, {} events, {} categories",
            corpus.version(),
            source.describe(),
            objects,
            events,
            corpus.categories().len()
        );
        Ok(corpus)
    }
}

fn missing(name: &str) -> Vec<SchemaError> {
    vec![SchemaError::MissingDocument { name: name.into() }]
}

fn malformed(origin: &str, reason: impl ToString) -> SchemaError {
    SchemaError::MalformedDocument {
        origin: origin.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_version(doc: &SourceDocument) -> Result<String, SchemaError> {
    match doc.body.get("version") {
        Some(Value::String(version)) if !version.trim().is_empty() => Ok(version.clone()),
        Some(Value::String(_)) => Err(malformed(&doc.origin, "version is empty")),
        Some(other) => Err(malformed(
            &doc.origin,
            format!("version must be a string, found {}", other),
        )),
        None => Err(malformed(&doc.origin, "missing \"version\" key")),
    }
}

fn parse_dictionary(doc: &SourceDocument) -> Result<(TypeDictionary, AttributeDefaults), SchemaError> {
    let parsed: DictionaryDoc =
        serde_json::from_value(doc.body.clone()).map_err(|e| malformed(&doc.origin, e))?;

    let mut primitives = TypeDictionary::new();
    for (name, ty) in parsed.types.attributes {
        primitives.insert(PrimitiveType {
            caption: ty.caption.unwrap_or_else(|| name.clone()),
            base: ty.base.filter(|base| base != &name),
            name,
        });
    }

    let mut defaults = AttributeDefaults::new();
    for (name, value) in parsed.attributes {
        defaults.insert(name, attribute_doc(&value, &doc.origin)?);
    }

    debug!(
        "dictionary {}: {} primitive types, {} attributes",
        doc.origin,
        primitives.len(),
        defaults.len()
    );
    Ok((primitives, defaults))
}

fn parse_categories(doc: &SourceDocument) -> Result<Vec<Category>, SchemaError> {
    let parsed: CategoriesDoc =
        serde_json::from_value(doc.body.clone()).map_err(|e| malformed(&doc.origin, e))?;
    Ok(parsed
        .attributes
        .into_iter()
        .map(|(name, cat)| Category {
            caption: cat.caption.unwrap_or_else(|| name.clone()),
            description: cat.description.unwrap_or_default(),
            uid: cat.uid,
            name,
        })
        .collect())
}

fn parse_profile(doc: &SourceDocument) -> Result<Profile, SchemaError> {
    let parsed: ProfileDoc =
        serde_json::from_value(doc.body.clone()).map_err(|e| malformed(&doc.origin, e))?;
    let name = parsed
        .name
        .or_else(|| doc.default_name.clone())
        .ok_or_else(|| malformed(&doc.origin, "profile has no name"))?;
    Ok(Profile {
        caption: parsed.caption.unwrap_or_else(|| name.clone()),
        description: parsed.description.unwrap_or_default(),
        name,
    })
}

fn parse_definition(
    doc: &SourceDocument,
    defaults: &AttributeDefaults,
) -> Result<RawDefinition, Vec<SchemaError>> {
    let parsed: DefinitionDoc = serde_json::from_value(doc.body.clone())
        .map_err(|e| vec![malformed(&doc.origin, e)])?;

    let name = parsed
        .name
        .or_else(|| doc.default_name.clone())
        .ok_or_else(|| vec![malformed(&doc.origin, "definition has no name")])?;
    let id = match doc.kind {
        DocumentKind::Event => EntityId::event(name),
        _ => EntityId::object(name),
    };

    let mut fields = Vec::with_capacity(parsed.attributes.len());
    let mut errors = Vec::new();
    for (attr_name, value) in &parsed.attributes {
        if attr_name.starts_with('$') {
            debug!("{}: skipping directive {}", doc.origin, attr_name);
            continue;
        }
        match parse_field(&id, attr_name, value, defaults, &doc.origin) {
            Ok(field) => fields.push(field),
            Err(err) => errors.push(err),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let category = match id.namespace {
        Namespace::Event => doc.category.clone().or(parsed.category),
        Namespace::Object => None,
    };

    Ok(RawDefinition {
        caption: parsed.caption.unwrap_or_else(|| id.name.clone()),
        description: parsed.description.unwrap_or_default(),
        extends: parsed.extends.filter(|parent| !parent.is_empty()),
        fields,
        category,
        profiles: parsed.profiles.unwrap_or_default(),
        uid: parsed.uid,
        id,
    })
}

/// Attribute bodies that are not objects are bare references to the
/// dictionary entry of the same name.
fn attribute_doc(value: &Value, origin: &str) -> Result<AttributeDoc, SchemaError> {
    if value.is_object() {
        serde_json::from_value(value.clone()).map_err(|e| malformed(origin, e))
    } else {
        Ok(AttributeDoc::default())
    }
}

fn parse_field(
    owner: &EntityId,
    name: &str,
    value: &Value,
    defaults: &AttributeDefaults,
    origin: &str,
) -> Result<RawField, SchemaError> {
    let local = attribute_doc(value, origin)?;
    let fallback = defaults.get(name).cloned().unwrap_or_default();

    let declared = local.type_name.clone().or(fallback.type_name.clone());
    let (type_name, suffixed_array) = match declared {
        Some(t) => match t.strip_suffix("[]") {
            Some(inner) => (Some(inner.to_string()), true),
            None => (Some(t), false),
        },
        None => (None, false),
    };

    let object_type = local.object_type.clone().or(fallback.object_type.clone());
    let type_name = match (type_name, object_type) {
        (Some(t), Some(target)) if t == OBJECT_TYPE => Some(target),
        (None, Some(target)) => Some(target),
        (t, _) => t,
    };
    let type_name = type_name.ok_or_else(|| SchemaError::UntypedField {
        namespace: owner.namespace,
        definition: owner.name.clone(),
        field: name.to_string(),
    })?;

    let is_array = suffixed_array
        || local.is_array.unwrap_or(false)
        || fallback.is_array.unwrap_or(false);

    Ok(RawField {
        name: name.to_string(),
        type_name,
        cardinality: if is_array {
            Cardinality::Array
        } else {
            Cardinality::Single
        },
        required: local.requirement.as_deref() == Some("required"),
        caption: local
            .caption
            .or(fallback.caption)
            .unwrap_or_else(|| name.to_string()),
        description: local.description.or(fallback.description).unwrap_or_default(),
        enum_spec: local.values.or(fallback.values).map(|v| parse_enum(&v)),
        profile: local.profile.or(fallback.profile),
        deprecated: local.deprecated.is_some_and(|d| !d.is_null()),
    })
}

/// Enum keys are integer ids; values are either `{ "caption": .. }` objects or
/// plain captions. Non-integer keys are ignored.
fn parse_enum(values: &Map<String, Value>) -> EnumSpec {
    let values = values
        .iter()
        .filter_map(|(key, val)| {
            let id = key.trim().parse::<i64>().ok()?;
            let caption = match val {
                Value::Object(obj) => obj
                    .get("caption")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_string(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((id, caption))
        })
        .collect();
    EnumSpec { values }
}
