// Raw, serde-facing shape of the dependency pattern document.
//
// The document is a small nested DSL whose inner keys are data (relation
// labels, attachment qualifiers, POS tags), so entries are kept as JSON values
// here and validated key by key in `compiler.rs`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEP_SECTION: &str = "dep";
pub const WORD_SECTION: &str = "word";

pub const ENHANCED_KEY: &str = "enhanced";
pub const MEASUREMENT_TYPES_KEY: &str = "measurement_types";
pub const POS_IN_KEY: &str = "pos_in";
pub const POS_EQUALS_KEY: &str = "pos_equals";
pub const POS_NOT_KEY: &str = "pos_not";
pub const ELSE_KEY: &str = "else";
pub const ELSE_ALWAYS: &str = "always";
/// Legacy spelling of a terminal action.
pub const ADD_SIBLING: &str = "add_sibling";

/// Word-list key under `word` naming coordinating operators.
pub const OPERATOR_KEY: &str = "or";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternDocument {
    /// Relation label → rule entry.
    #[serde(default)]
    pub dep: BTreeMap<String, Value>,
    /// Word-list name → words.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub word: BTreeMap<String, Value>,
}

impl PatternDocument {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = &value else {
            return Err(ConfigError::InvalidShape {
                rule: "<document>".to_string(),
                expected: "a JSON object with `dep` and `word` sections".to_string(),
            });
        };
        if let Some(key) = map
            .keys()
            .find(|k| k.as_str() != DEP_SECTION && k.as_str() != WORD_SECTION)
        {
            return Err(ConfigError::UnknownSection(key.clone()));
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, ConfigError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
