//! Enum extraction. Enumerations are keyed by attribute name; the first
//! declaration seen wins. Dictionary attributes come after every entity.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::corpus::{EntityId, EnumSpec};
use crate::error::Warning;
use crate::resolver::FieldSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEnum {
    pub attribute: String,
    /// `None` when only the attribute dictionary declares the enum.
    pub declared_by: Option<EntityId>,
    pub values: EnumSpec,
}

/// Collect enums from `fields`, which must arrive in a stable root-first
/// order. A later declaration with a different value set is reported and
/// ignored.
pub fn extract<'a>(
    fields: impl IntoIterator<Item = &'a FieldSpec>,
) -> (BTreeMap<String, ModelEnum>, Vec<Warning>) {
    let mut enums: BTreeMap<String, ModelEnum> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut reported: BTreeSet<(String, EntityId)> = BTreeSet::new();

    for field in fields {
        let Some(values) = &field.enum_spec else {
            continue;
        };
        match enums.get(&field.name) {
            None => {
                enums.insert(
                    field.name.clone(),
                    ModelEnum {
                        attribute: field.name.clone(),
                        declared_by: Some(field.origin.clone()),
                        values: values.clone(),
                    },
                );
            }
            Some(existing) if existing.values != *values => {
                let Some(first) = &existing.declared_by else {
                    continue;
                };
                if reported.insert((field.name.clone(), field.origin.clone())) {
                    warnings.push(Warning::EnumConflict {
                        attribute: field.name.clone(),
                        first: first.clone(),
                        second: field.origin.clone(),
                    });
                }
            }
            Some(_) => {}
        }
    }

    (enums, warnings)
}

/// Add dictionary enums for attributes no entity declared an enum on.
pub fn seed_dictionary(
    enums: &mut BTreeMap<String, ModelEnum>,
    dictionary: BTreeMap<String, EnumSpec>,
) {
    for (attribute, values) in dictionary {
        enums.entry(attribute.clone()).or_insert(ModelEnum {
            attribute,
            declared_by: None,
            values,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Cardinality;

    fn enum_field(name: &str, origin: EntityId, values: &[(i64, &str)]) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            type_name: "integer_t".into(),
            cardinality: Cardinality::Single,
            required: false,
            caption: name.into(),
            description: String::new(),
            enum_spec: Some(EnumSpec {
                values: values.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            }),
            profile: None,
            deprecated: false,
            origin,
        }
    }

    #[test]
    fn test_identical_declarations_merge() {
        let base = EntityId::event("base_event");
        let fields = [
            enum_field("activity_id", base.clone(), &[(0, "Unknown"), (1, "Open")]),
            enum_field("activity_id", base.clone(), &[(0, "Unknown"), (1, "Open")]),
        ];
        let (enums, warnings) = extract(&fields);
        assert_eq!(enums.len(), 1);
        assert_eq!(enums["activity_id"].declared_by, Some(base));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_conflict_keeps_first() {
        let fields = [
            enum_field("status_id", EntityId::object("a"), &[(0, "Unknown")]),
            enum_field("status_id", EntityId::object("b"), &[(0, "Unknown"), (1, "Ok")]),
            enum_field("status_id", EntityId::object("b"), &[(0, "Unknown"), (1, "Ok")]),
        ];
        let (enums, warnings) = extract(&fields);
        assert_eq!(enums["status_id"].values.values.len(), 1);
        assert_eq!(
            warnings,
            vec![Warning::EnumConflict {
                attribute: "status_id".into(),
                first: EntityId::object("a"),
                second: EntityId::object("b"),
            }]
        );
    }

    #[test]
    fn test_dictionary_only_enum_seeded_after_entities() {
        let fields = [enum_field("status_id", EntityId::object("a"), &[(0, "Unknown")])];
        let (mut enums, _) = extract(&fields);
        let dictionary: BTreeMap<String, EnumSpec> = [
            ("status_id", vec![(0, "Unknown"), (1, "Ok")]),
            ("severity_id", vec![(0, "Unknown"), (6, "Fatal")]),
        ]
        .into_iter()
        .map(|(name, values)| {
            let values = values.into_iter().map(|(k, v)| (k, v.to_string())).collect();
            (name.to_string(), EnumSpec { values })
        })
        .collect();

        seed_dictionary(&mut enums, dictionary);
        assert_eq!(enums.len(), 2);
        assert_eq!(enums["status_id"].declared_by, Some(EntityId::object("a")));
        assert_eq!(enums["status_id"].values.values.len(), 1);
        assert_eq!(enums["severity_id"].declared_by, None);
        assert_eq!(enums["severity_id"].values.values[&6], "Fatal");
    }
}
