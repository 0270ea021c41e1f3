//! Small in-memory corpora shared by the unit tests.

use serde_json::{json, Value};

use crate::corpus::{
    Cardinality, Corpus, CorpusBuilder, EntityId, PrimitiveType, RawDefinition, RawField,
    TypeDictionary,
};

const PRIMITIVES: &[(&str, Option<&str>)] = &[
    ("string_t", None),
    ("integer_t", None),
    ("long_t", None),
    ("float_t", None),
    ("boolean_t", None),
    ("timestamp_t", None),
    ("datetime_t", None),
    ("json_t", None),
    ("ip_t", None),
    ("mac_t", None),
    ("uuid_t", None),
    ("subnet_t", None),
    ("port_t", Some("integer_t")),
    ("hostname_t", Some("string_t")),
    ("process_name_t", Some("string_t")),
    ("object_t", None),
];

pub fn primitives() -> TypeDictionary {
    let mut dict = TypeDictionary::new();
    for (name, base) in PRIMITIVES {
        dict.insert(PrimitiveType {
            name: name.to_string(),
            caption: name.to_string(),
            base: base.map(str::to_string),
        });
    }
    dict
}

pub fn field(name: &str, type_name: &str) -> RawField {
    RawField {
        name: name.into(),
        type_name: type_name.into(),
        cardinality: Cardinality::Single,
        required: false,
        caption: name.into(),
        description: String::new(),
        enum_spec: None,
        profile: None,
        deprecated: false,
    }
}

pub fn array(name: &str, type_name: &str) -> RawField {
    RawField {
        cardinality: Cardinality::Array,
        ..field(name, type_name)
    }
}

pub fn required(mut field: RawField) -> RawField {
    field.required = true;
    field
}

pub fn definition(id: EntityId, extends: Option<&str>, fields: Vec<RawField>) -> RawDefinition {
    RawDefinition {
        caption: id.name.clone(),
        description: String::new(),
        extends: extends.map(str::to_string),
        fields,
        category: None,
        profiles: Vec::new(),
        uid: None,
        id,
    }
}

pub fn corpus(defs: Vec<RawDefinition>) -> Corpus {
    corpus_with(primitives(), defs)
}

pub fn corpus_with(primitives: TypeDictionary, defs: Vec<RawDefinition>) -> Corpus {
    let mut builder = CorpusBuilder::new("1.0.0-test", primitives);
    for def in defs {
        builder.insert(def).unwrap();
    }
    builder.build().unwrap()
}

/// A miniature OCSF export in bundle form: a device/user/group object graph
/// and a two-level event hierarchy.
pub fn sample_bundle() -> Value {
    json!({
        "version": "1.3.0",
        "types": {
            "string_t": { "caption": "String" },
            "integer_t": { "caption": "Integer" },
            "long_t": { "caption": "Long" },
            "timestamp_t": { "caption": "Timestamp", "type": "long_t" },
            "ip_t": { "caption": "IP Address", "type": "string_t" },
            "mac_t": { "caption": "MAC Address", "type": "string_t" },
            "hostname_t": { "caption": "Hostname", "type": "string_t" },
            "object_t": { "caption": "Object" }
        },
        "dictionary": {
            "name": { "caption": "Name", "type": "string_t", "description": "The name." },
            "uid": { "caption": "Unique ID", "type": "string_t" },
            "time": { "caption": "Event Time", "type": "timestamp_t" },
            "hostname": { "caption": "Hostname", "type": "hostname_t" },
            "ip": { "caption": "IP Address", "type": "ip_t" },
            "groups": { "caption": "Groups", "type": "group", "is_array": true },
            "owner": { "caption": "Owner", "type": "object_t", "object_type": "user" },
            "device": { "caption": "Device", "type": "object_t", "object_type": "device" },
            "labels": { "caption": "Labels", "type": "string_t", "is_array": true },
            "activity_id": {
                "caption": "Activity ID",
                "type": "integer_t",
                "enum": {
                    "0": { "caption": "Unknown" },
                    "1": { "caption": "Launch" },
                    "99": { "caption": "Other" }
                }
            }
        },
        "categories": {
            "system": { "caption": "System Activity", "uid": 1 },
            "network": { "caption": "Network Activity", "uid": 4 }
        },
        "profiles": {
            "host": { "caption": "Host", "description": "Host profile." }
        },
        "objects": {
            "_entity": {
                "caption": "Entity",
                "attributes": { "name": {}, "uid": {} }
            },
            "group": {
                "caption": "Group",
                "extends": "_entity",
                "attributes": { "privileges": { "type": "string_t", "is_array": true } }
            },
            "user": {
                "caption": "User",
                "extends": "_entity",
                "attributes": { "groups": {}, "$include": ["profiles/host.json"] }
            },
            "device": {
                "caption": "Device",
                "extends": "_entity",
                "attributes": {
                    "hostname": { "requirement": "required" },
                    "ip": {},
                    "owner": {},
                    "groups": {},
                    "labels": {}
                }
            }
        },
        "events": {
            "base_event": {
                "caption": "Base Event",
                "attributes": {
                    "time": { "requirement": "required" },
                    "activity_id": {}
                }
            },
            "process_activity": {
                "caption": "Process Activity",
                "extends": "base_event",
                "category": "system",
                "uid": 1007,
                "profiles": ["host"],
                "attributes": {
                    "device": { "requirement": "required" },
                    "activity_id": { "requirement": "required" }
                }
            },
            "network_activity": {
                "caption": "Network Activity",
                "extends": "base_event",
                "category": "network",
                "uid": 4001,
                "attributes": { "device": {} }
            }
        }
    })
}
