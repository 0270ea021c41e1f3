//! Renderer naming policy. The model never stores rendered names; the
//! analyzer only asks a policy whether two artifacts would collide.

use serde::Deserialize;

use crate::corpus::EntityId;

/// How a renderer turns entity identifiers and field names into table and
/// column names.
pub trait NamingPolicy {
    fn table_name(&self, entity: &EntityId) -> String;

    fn association_table_name(&self, owner: &EntityId, field: &str) -> String;

    fn column_name(&self, field: &str) -> String {
        to_snake_case(field)
    }

    fn foreign_key_column(&self, field: &str) -> String {
        format!("{}_id", to_snake_case(field))
    }
}

/// `ocsf_` prefixed snake_case table names. Objects and events share one
/// table namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SnakeCasePolicy {
    pub table_prefix: String,
    pub table_suffix: String,
}

impl Default for SnakeCasePolicy {
    fn default() -> Self {
        Self {
            table_prefix: "ocsf_".into(),
            table_suffix: String::new(),
        }
    }
}

impl SnakeCasePolicy {
    pub fn new(table_prefix: impl Into<String>, table_suffix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
            table_suffix: table_suffix.into(),
        }
    }
}

impl NamingPolicy for SnakeCasePolicy {
    fn table_name(&self, entity: &EntityId) -> String {
        format!(
            "{}{}{}",
            self.table_prefix,
            to_snake_case(&entity.name),
            self.table_suffix
        )
    }

    fn association_table_name(&self, owner: &EntityId, field: &str) -> String {
        format!(
            "{}{}_{}",
            self.table_prefix,
            to_snake_case(&owner.name),
            to_snake_case(field)
        )
    }
}

/// `ProcessActivity`, `processActivity` and `process-activity` all become
/// `process_activity`; runs of capitals stay together (`HTTPServer` ->
/// `http_server`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }

        out.extend(c.to_lowercase());
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
