//! Display labels for variable codes.
//!
//! The catalog is an optional `var_names.json` shaped as
//! `{"surface": {code: label}, "upper_air": {code: label}}`, where a label is
//! either a string or an object with a `label` field. A missing or malformed
//! catalog behaves as an empty one.
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default catalog file name, resolved against the base directory.
pub const LABEL_CATALOG_FILE: &str = "var_names.json";
/// Variable keys with this prefix are upper-air (vertical) quantities.
pub const UPPER_AIR_PREFIX: &str = "temp_";

/// Label group a variable code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelGroup {
    Surface,
    UpperAir,
}

impl LabelGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelGroup::Surface => "surface",
            LabelGroup::UpperAir => "upper_air",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    groups: BTreeMap<String, Map<String, Value>>,
}

impl LabelCatalog {
    /// Load the catalog from `path`; never fails.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no label catalog");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::from_value(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring malformed label catalog");
                Self::default()
            }
        }
    }

    /// Build a catalog from parsed JSON, dropping groups that are not objects.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(top) = value else {
            return Self::default();
        };
        let groups = top
            .into_iter()
            .filter_map(|(group, entries)| match entries {
                Value::Object(entries) => Some((group, entries)),
                _ => None,
            })
            .collect();
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|entries| entries.is_empty())
    }

    /// Resolve a label only when the catalog has a usable entry.
    pub fn lookup(&self, variable: &str) -> Option<String> {
        let entry = self
            .groups
            .get(group_of(variable).as_str())?
            .get(code_of(variable))?;
        match entry {
            Value::String(label) => Some(label.clone()),
            Value::Object(fields) => fields
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// Group implied by the variable key prefix.
pub fn group_of(variable: &str) -> LabelGroup {
    if variable.starts_with(UPPER_AIR_PREFIX) {
        LabelGroup::UpperAir
    } else {
        LabelGroup::Surface
    }
}

/// Catalog code for a variable key (`temp_TT` → `TT`).
pub fn code_of(variable: &str) -> &str {
    variable.strip_prefix(UPPER_AIR_PREFIX).unwrap_or(variable)
}
