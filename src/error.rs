//! Error and warning taxonomy shared by every stage of an analysis run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::analyzer::NamingCollision;
use crate::corpus::{EntityId, Namespace};

/// A structured analysis error. Every variant names the offending identifiers
/// so callers can report several issues at once.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("required document not found: {name}")]
    MissingDocument { name: String },
    #[error("malformed document {origin}: {reason}")]
    MalformedDocument { origin: String, reason: String },
    #[error("duplicate {namespace} identifier: {name}")]
    DuplicateIdentifier { namespace: Namespace, name: String },
    #[error("{namespace} '{definition}' field '{field}' has unknown type '{type_name}'")]
    UnknownType {
        namespace: Namespace,
        definition: String,
        field: String,
        type_name: String,
    },
    #[error("{namespace} '{definition}' field '{field}' declares no type")]
    UntypedField {
        namespace: Namespace,
        definition: String,
        field: String,
    },
    #[error("{namespace} '{definition}' extends unknown parent '{parent}'")]
    UnknownParent {
        namespace: Namespace,
        definition: String,
        parent: String,
    },
    #[error("cyclic {namespace} inheritance: {}", .cycle.join(" -> "))]
    CyclicInheritance {
        namespace: Namespace,
        cycle: Vec<String>,
    },
}

impl SchemaError {
    /// The identifiers this error is about, used for grouping diagnostics.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::Io { .. } | Self::Json { .. } | Self::MalformedDocument { .. } => Vec::new(),
            Self::MissingDocument { name } | Self::DuplicateIdentifier { name, .. } => {
                vec![name.as_str()]
            }
            Self::UnknownType {
                definition, field, ..
            }
            | Self::UntypedField {
                definition, field, ..
            } => vec![definition.as_str(), field.as_str()],
            Self::UnknownParent {
                definition, parent, ..
            } => vec![definition.as_str(), parent.as_str()],
            Self::CyclicInheritance { cycle, .. } => cycle.iter().map(String::as_str).collect(),
        }
    }
}

/// Pipeline stage in which a run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    Resolving,
    Analyzing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Resolving => "resolving",
            Self::Analyzing => "analyzing",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a failed run: the stage that aborted and every error
/// collected in it.
#[derive(Debug)]
pub struct RunFailure {
    pub stage: Stage,
    pub errors: Vec<SchemaError>,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analysis failed while {} ({} error{})",
            self.stage,
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" }
        )?;
        for err in &self.errors {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {}

/// Non-fatal finding attached to a successfully produced model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Two synthesized artifacts would receive the same rendered name.
    NamingCollision(NamingCollision),
    /// A scalar primitive with no storage mapping; classified as generic text.
    UnmappedPrimitive {
        entity: EntityId,
        field: String,
        type_name: String,
    },
    /// Two fields share an attribute name but declare different enum values.
    EnumConflict {
        attribute: String,
        first: EntityId,
        second: EntityId,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamingCollision(collision) => write!(
                f,
                "naming collision on '{}': {}",
                collision.name,
                collision
                    .artifacts
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::UnmappedPrimitive {
                entity,
                field,
                type_name,
            } => write!(
                f,
                "{}.{} uses unmapped primitive '{}', stored as generic text",
                entity, field, type_name
            ),
            Self::EnumConflict {
                attribute,
                first,
                second,
            } => write!(
                f,
                "enum '{}' declared differently by {} and {}; keeping {}",
                attribute, first, second, first
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_failure_lists_every_error() {
        let failure = RunFailure {
            stage: Stage::Resolving,
            errors: vec![
                SchemaError::UnknownParent {
                    namespace: Namespace::Object,
                    definition: "device".into(),
                    parent: "ghost".into(),
                },
                SchemaError::CyclicInheritance {
                    namespace: Namespace::Event,
                    cycle: vec!["a".into(), "b".into(), "a".into()],
                },
            ],
        };
        let text = failure.to_string();
        assert!(text.starts_with("analysis failed while resolving (2 errors)"));
        assert!(text.contains("object 'device' extends unknown parent 'ghost'"));
        assert!(text.contains("cyclic event inheritance: a -> b -> a"));
    }

    #[test]
    fn test_identifiers() {
        let err = SchemaError::UnknownType {
            namespace: Namespace::Object,
            definition: "device".into(),
            field: "owner".into(),
            type_name: "person".into(),
        };
        assert_eq!(err.identifiers(), vec!["device", "owner"]);
    }
}
