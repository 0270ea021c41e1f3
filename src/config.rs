//! Analysis configuration, read from a JSON file and overridden by CLI flags.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::filter::FilterConfig;
use crate::naming::SnakeCasePolicy;
use crate::types::{StorageType, TypeMapper};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("type override for '{primitive}': {reason}")]
    TypeOverride { primitive: String, reason: String },
}

/// ```json
/// {
///   "naming": { "table_prefix": "sec_", "table_suffix": "" },
///   "type_overrides": { "timestamp_t": "datetime", "file_hash_t": "varchar(64)" },
///   "filter": { "core_object": "device", "max_depth": 2, "include_events": true }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub naming: SnakeCasePolicy,
    #[serde(deserialize_with = "deserialize_overrides")]
    pub type_overrides: BTreeMap<String, StorageType>,
    pub filter: Option<FilterConfig>,
}

fn deserialize_overrides<'de, D>(deserializer: D) -> Result<BTreeMap<String, StorageType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(primitive, storage)| {
            storage
                .parse::<StorageType>()
                .map(|t| (primitive, t))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Add an override given as `primitive=storage`, as passed on the
    /// command line.
    pub fn set_override(&mut self, spec: &str) -> Result<(), ConfigError> {
        let (primitive, storage) = spec.split_once('=').ok_or_else(|| ConfigError::TypeOverride {
            primitive: spec.to_string(),
            reason: "expected <primitive>=<storage type>".into(),
        })?;
        let storage = storage
            .parse::<StorageType>()
            .map_err(|e| ConfigError::TypeOverride {
                primitive: primitive.to_string(),
                reason: e.to_string(),
            })?;
        self.type_overrides.insert(primitive.trim().to_string(), storage);
        Ok(())
    }

    pub fn type_mapper(&self) -> TypeMapper {
        self.type_overrides
            .iter()
            .fold(TypeMapper::new(), |mapper, (primitive, storage)| {
                mapper.with_override(primitive.clone(), *storage)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::primitives;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::from_json("{}").unwrap();
        assert_eq!(config.naming.table_prefix, "ocsf_");
        assert!(config.type_overrides.is_empty());
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = AnalysisConfig::from_json(
            r#"{
                "naming": { "table_prefix": "sec_" },
                "type_overrides": { "timestamp_t": "datetime", "file_hash_t": "varchar(64)" },
                "filter": { "core_object": "device", "max_depth": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.naming.table_prefix, "sec_");
        assert_eq!(config.naming.table_suffix, "");
        assert_eq!(config.type_overrides["file_hash_t"], StorageType::VarChar(64));

        let filter = config.filter.as_ref().unwrap();
        assert_eq!(filter.core_object, "device");
        assert_eq!(filter.max_depth, 2);
        assert!(!filter.include_events);

        let mapper = config.type_mapper();
        assert_eq!(
            mapper.storage_of("timestamp_t", &primitives()),
            StorageType::DateTime
        );
    }

    #[test]
    fn test_bad_override_rejected() {
        let err = AnalysisConfig::from_json(r#"{ "type_overrides": { "ip_t": "money" } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_set_override() {
        let mut config = AnalysisConfig::default();
        config.set_override("uuid_t=text").unwrap();
        assert_eq!(config.type_overrides["uuid_t"], StorageType::Text);
        assert!(matches!(
            config.set_override("uuid_t"),
            Err(ConfigError::TypeOverride { .. })
        ));
        assert!(config.set_override("uuid_t=nope").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "naming": {{ "table_suffix": "_v1" }} }}"#).unwrap();
        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.naming.table_suffix, "_v1");
        assert_eq!(config.naming.table_prefix, "ocsf_");

        let missing = AnalysisConfig::load(Path::new("/nonexistent/ocsfrel.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
