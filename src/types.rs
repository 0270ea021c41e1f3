//! OCSF primitive to storage type mapping.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::corpus::TypeDictionary;

/// Backend-neutral storage category of a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageType {
    Text,
    VarChar(u16),
    Integer,
    BigInteger,
    Float,
    Boolean,
    /// Milliseconds since the Unix epoch.
    EpochMillis,
    DateTime,
    Inet,
    Cidr,
    Uuid,
    Binary,
    Json,
    /// Declared primitive with no known mapping.
    GenericText,
}

impl StorageType {
    /// Plain identifier used in ERD column declarations.
    pub fn erd_name(&self) -> String {
        match self {
            StorageType::VarChar(n) => format!("varchar{}", n),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Text => write!(f, "text"),
            StorageType::VarChar(n) => write!(f, "varchar({})", n),
            StorageType::Integer => write!(f, "integer"),
            StorageType::BigInteger => write!(f, "bigint"),
            StorageType::Float => write!(f, "float"),
            StorageType::Boolean => write!(f, "boolean"),
            StorageType::EpochMillis => write!(f, "epoch_millis"),
            StorageType::DateTime => write!(f, "datetime"),
            StorageType::Inet => write!(f, "inet"),
            StorageType::Cidr => write!(f, "cidr"),
            StorageType::Uuid => write!(f, "uuid"),
            StorageType::Binary => write!(f, "binary"),
            StorageType::Json => write!(f, "json"),
            StorageType::GenericText => write!(f, "generic_text"),
        }
    }
}

impl Serialize for StorageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage type '{0}'")]
pub struct ParseStorageTypeError(pub String);

impl FromStr for StorageType {
    type Err = ParseStorageTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let base = lower.split('(').next().unwrap_or(&lower).trim();

        let parsed = match base {
            "text" | "string" => StorageType::Text,
            "varchar" => {
                let len = lower
                    .strip_prefix("varchar(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|n| n.trim().parse::<u16>().ok())
                    .ok_or_else(|| ParseStorageTypeError(s.to_string()))?;
                StorageType::VarChar(len)
            }
            "integer" | "int" => StorageType::Integer,
            "bigint" | "biginteger" => StorageType::BigInteger,
            "float" | "double" => StorageType::Float,
            "boolean" | "bool" => StorageType::Boolean,
            "epoch_millis" => StorageType::EpochMillis,
            "datetime" | "timestamp" => StorageType::DateTime,
            "inet" => StorageType::Inet,
            "cidr" => StorageType::Cidr,
            "uuid" => StorageType::Uuid,
            "binary" | "blob" => StorageType::Binary,
            "json" => StorageType::Json,
            "generic_text" => StorageType::GenericText,
            _ => return Err(ParseStorageTypeError(s.to_string())),
        };
        Ok(parsed)
    }
}

/// How a primitive found its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// The primitive itself is in the table.
    Direct(StorageType),
    /// Found by following the dictionary's base type chain.
    Base(StorageType),
    /// Nothing matched; the value is stored as generic text.
    Fallback,
}

impl Mapping {
    pub fn storage(self) -> StorageType {
        match self {
            Mapping::Direct(t) | Mapping::Base(t) => t,
            Mapping::Fallback => StorageType::GenericText,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Mapping::Fallback)
    }
}

/// Built-in table for the standard OCSF primitives.
pub fn builtin_storage(primitive: &str) -> Option<StorageType> {
    let storage = match primitive {
        // Strings
        "string_t" | "url_t" | "path_t" | "resource_uid_t" | "username_t" => StorageType::Text,
        "mac_t" => StorageType::VarChar(17),
        "hostname_t" => StorageType::VarChar(253),
        "email_t" => StorageType::VarChar(254),
        "file_hash_t" => StorageType::VarChar(128),

        // Numbers
        "integer_t" | "port_t" => StorageType::Integer,
        "long_t" => StorageType::BigInteger,
        "float_t" => StorageType::Float,
        "boolean_t" => StorageType::Boolean,

        // Time
        "timestamp_t" => StorageType::EpochMillis,
        "datetime_t" => StorageType::DateTime,

        // Network
        "ip_t" => StorageType::Inet,
        "subnet_t" => StorageType::Cidr,

        "uuid_t" => StorageType::Uuid,
        "json_t" => StorageType::Json,
        "bytestring_t" => StorageType::Binary,

        _ => return None,
    };
    Some(storage)
}

/// Maps primitive type names to [`StorageType`]s. Overrides take precedence
/// over the built-in table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMapper {
    overrides: BTreeMap<String, StorageType>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, primitive: impl Into<String>, storage: StorageType) -> Self {
        self.overrides.insert(primitive.into(), storage);
        self
    }

    pub fn overrides(&self) -> &BTreeMap<String, StorageType> {
        &self.overrides
    }

    fn lookup(&self, primitive: &str) -> Option<StorageType> {
        self.overrides
            .get(primitive)
            .copied()
            .or_else(|| builtin_storage(primitive))
    }

    /// Map a primitive, walking the dictionary's base chain for derived
    /// primitives (`process_name_t` -> `string_t`).
    pub fn map(&self, primitive: &str, dictionary: &TypeDictionary) -> Mapping {
        if let Some(storage) = self.lookup(primitive) {
            return Mapping::Direct(storage);
        }

        let mut seen = HashSet::new();
        seen.insert(primitive);
        let mut cursor = dictionary.base_of(primitive);
        while let Some(base) = cursor {
            if !seen.insert(base) {
                break;
            }
            if let Some(storage) = self.lookup(base) {
                return Mapping::Base(storage);
            }
            cursor = dictionary.base_of(base);
        }
        Mapping::Fallback
    }

    pub fn storage_of(&self, primitive: &str, dictionary: &TypeDictionary) -> StorageType {
        self.map(primitive, dictionary).storage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::PrimitiveType;
    use crate::fixtures::primitives;

    #[test]
    fn test_builtin_table() {
        let mapper = TypeMapper::new();
        let dict = primitives();
        assert_eq!(mapper.storage_of("string_t", &dict), StorageType::Text);
        assert_eq!(mapper.storage_of("long_t", &dict), StorageType::BigInteger);
        assert_eq!(mapper.storage_of("timestamp_t", &dict), StorageType::EpochMillis);
        assert_eq!(mapper.storage_of("mac_t", &dict), StorageType::VarChar(17));
        assert_eq!(mapper.storage_of("ip_t", &dict), StorageType::Inet);
        assert_eq!(mapper.storage_of("port_t", &dict), StorageType::Integer);
        assert_eq!(mapper.storage_of("uuid_t", &dict), StorageType::Uuid);
        assert_eq!(mapper.storage_of("subnet_t", &dict), StorageType::Cidr);
    }

    #[test]
    fn test_derived_primitive_uses_base() {
        let mapper = TypeMapper::new();
        let dict = primitives();
        assert_eq!(
            mapper.map("process_name_t", &dict),
            Mapping::Base(StorageType::Text)
        );
    }

    #[test]
    fn test_unknown_primitive_falls_back() {
        let mapper = TypeMapper::new();
        let dict = primitives();
        let mapping = mapper.map("object_t", &dict);
        assert!(mapping.is_fallback());
        assert_eq!(mapping.storage(), StorageType::GenericText);
    }

    #[test]
    fn test_base_chain_cycle_terminates() {
        let mut dict = TypeDictionary::new();
        dict.insert(PrimitiveType {
            name: "a_t".into(),
            caption: "A".into(),
            base: Some("b_t".into()),
        });
        dict.insert(PrimitiveType {
            name: "b_t".into(),
            caption: "B".into(),
            base: Some("a_t".into()),
        });
        assert!(TypeMapper::new().map("a_t", &dict).is_fallback());
    }

    #[test]
    fn test_override_wins() {
        let mapper = TypeMapper::new()
            .with_override("timestamp_t", StorageType::DateTime)
            .with_override("process_name_t", StorageType::VarChar(64));
        let dict = primitives();
        assert_eq!(mapper.storage_of("timestamp_t", &dict), StorageType::DateTime);
        assert_eq!(
            mapper.map("process_name_t", &dict),
            Mapping::Direct(StorageType::VarChar(64))
        );
    }

    #[test]
    fn test_parse_storage_type() {
        assert_eq!("TEXT".parse::<StorageType>().unwrap(), StorageType::Text);
        assert_eq!("varchar(64)".parse::<StorageType>().unwrap(), StorageType::VarChar(64));
        assert_eq!("bigint".parse::<StorageType>().unwrap(), StorageType::BigInteger);
        assert!("varchar".parse::<StorageType>().is_err());
        assert!("money".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for storage in [StorageType::VarChar(17), StorageType::EpochMillis, StorageType::Cidr] {
            assert_eq!(storage.to_string().parse::<StorageType>().unwrap(), storage);
        }
        assert_eq!(StorageType::VarChar(17).erd_name(), "varchar17");
    }
}
