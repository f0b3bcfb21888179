use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_hops() -> usize {
    3
}

fn default_cousin_accept_pos() -> Vec<String> {
    vec!["NN".to_string(), "PR".to_string()]
}

fn default_operator_relations() -> Vec<String> {
    vec!["nsubj".to_string()]
}

fn default_descriptor_depth() -> usize {
    1
}

fn default_descriptor_pos() -> Vec<String> {
    vec!["JJ".to_string()]
}

fn default_descriptor_relations() -> Vec<String> {
    vec!["amod".to_string(), "compound".to_string()]
}

fn default_expand_relations() -> Vec<String> {
    vec!["nmod".to_string()]
}

fn default_adverb_relation() -> String {
    "advmod".to_string()
}

/// Engine settings. Every field has a default, so an empty YAML file is a
/// valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub descriptors: DescriptorConfig,
    #[serde(default)]
    pub adverbs: AdverbConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Maximum continuation steps taken from one matched neighbor
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// POS tags (substring match) accepted for operator-word and descriptor
    /// expansion cousins
    #[serde(default = "default_cousin_accept_pos")]
    pub cousin_accept_pos: Vec<String>,
    /// Relations followed from an operator word to its subject
    #[serde(default = "default_operator_relations")]
    pub operator_relations: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            cousin_accept_pos: default_cousin_accept_pos(),
            operator_relations: default_operator_relations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    #[serde(default = "default_descriptor_depth")]
    pub depth: usize,
    /// Exact POS tags that make a neighbor a descriptor
    #[serde(default = "default_descriptor_pos")]
    pub pos: Vec<String>,
    /// Relations that make a neighbor a descriptor regardless of POS
    #[serde(default = "default_descriptor_relations")]
    pub relations: Vec<String>,
    /// Relations followed from a noun descriptor to extra related entities
    #[serde(default = "default_expand_relations")]
    pub expand_relations: Vec<String>,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            depth: default_descriptor_depth(),
            pos: default_descriptor_pos(),
            relations: default_descriptor_relations(),
            expand_relations: default_expand_relations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdverbConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_adverb_relation")]
    pub relation: String,
}

impl Default for AdverbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            relation: default_adverb_relation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Drop related entities that just repeat the value, unit or quantified
    /// substance
    #[serde(default = "default_true")]
    pub drop_measurement_echoes: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            drop_measurement_echoes: true,
        }
    }
}

impl ExtractorConfig {
    /// Load config from a YAML (or JSON, by extension) file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_json = Path::new(path)
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let config: ExtractorConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("⚠️  Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matching.max_hops == 0 {
            return Err(ConfigError::Settings(
                "matching.max_hops must be at least 1".to_string(),
            ));
        }
        if self.adverbs.enabled && self.adverbs.relation.trim().is_empty() {
            return Err(ConfigError::Settings(
                "adverbs.relation must name a relation when adverbs are enabled".to_string(),
            ));
        }
        Ok(())
    }
}
