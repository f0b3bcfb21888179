use crate::config::ExtractorConfig;
use crate::graphs::DependencyGraph;
use crate::types::*;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::matcher::{PatternMatcher, RelatedMatch};
use super::relation_builder::RelationBuilder;
use super::rule_set::RuleSet;

#[derive(Debug, Clone)]
enum TextFilter {
    Pattern(Regex),
    Contains(String),
}

// Debug configuration for traversal tracing
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub filter_patterns: Vec<String>,
    filters: Vec<TextFilter>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        // Try regex first, fall back to simple string contains
        let filters = filter_patterns
            .iter()
            .map(|pattern| match Regex::new(pattern) {
                Ok(regex) => TextFilter::Pattern(regex),
                Err(_) => TextFilter::Contains(pattern.clone()),
            })
            .collect();

        Self {
            enabled,
            filter_patterns,
            filters,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, Vec::new())
    }

    pub fn matches(&self, text: &str) -> bool {
        self.enabled
            && self.filters.iter().any(|filter| match filter {
                TextFilter::Pattern(regex) => regex.is_match(text),
                TextFilter::Contains(needle) => text.contains(needle.as_str()),
            })
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Debug utility function to trace tokens through the traversal
pub fn debug_traversal(stage: &str, token: &Token, rule: &str, debug_config: &DebugConfig) {
    if debug_config.matches(&token.text) {
        debug!(
            "🔍 [{}] token {} \"{}\" ({}) rule: {}",
            stage, token.index, token.text, token.pos, rule
        );
    } else {
        tracing::trace!(stage, token = token.index, rule, "traversal step");
    }
}

/// Applies a compiled rule set to bound measurements. Cheap to share across
/// threads: the rule set is behind an `Arc` and nothing is mutated per call.
pub struct RuleEngine {
    rules: Arc<RuleSet>,
    config: ExtractorConfig,
    debug_config: DebugConfig,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>, config: ExtractorConfig) -> Self {
        Self {
            rules,
            config,
            debug_config: DebugConfig::disabled(),
        }
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn matcher(&self) -> PatternMatcher<'_> {
        PatternMatcher::new(&self.rules, &self.config.matching, &self.debug_config)
    }

    pub fn relation_builder(&self) -> RelationBuilder<'_> {
        RelationBuilder::new(&self.config.descriptors, &self.config.matching.cousin_accept_pos)
    }

    /// Full output record for one measurement.
    pub fn relate(&self, graph: &DependencyGraph, measurement: &Measurement) -> MeasurementRecord {
        let matches = self.matcher().find_related(graph, measurement, &measurement.anchors());
        let mut related = self.build_related(graph, measurement, &matches);
        let adverbs = self.find_adverbs(graph, measurement);
        let mut quantified = self.quantified_entity(graph, measurement);

        if self.config.filter.drop_measurement_echoes {
            related = drop_echoes(measurement, related, &mut quantified);
        }

        debug!(
            measurement = measurement.position,
            value = %measurement.quantity.raw_value,
            form = %measurement.form,
            related = related.len(),
            adverbs = adverbs.len(),
            "related measurement"
        );

        let mut quantity = measurement.quantity.clone();
        quantity.quantified = None;

        MeasurementRecord {
            adverbs,
            kind: measurement.quantity.kind.clone(),
            quantity,
            quantified,
            related,
        }
    }

    fn build_related(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        matches: &[RelatedMatch],
    ) -> Vec<RelatedEntity> {
        let builder = self.relation_builder();
        let mut related: Vec<RelatedEntity> = matches
            .iter()
            .filter_map(|m| builder.build(graph, measurement, m))
            .collect();

        // Expansions are built but not expanded again.
        let direct = related.len();
        for i in 0..direct {
            for extra in builder.expand(graph, measurement, &related[i]) {
                if related.iter().any(|r| r.token_index == extra.token_index) {
                    continue;
                }
                if let Some(entity) = builder.build(graph, measurement, &extra) {
                    related.push(entity);
                }
            }
        }

        related
    }

    fn find_adverbs(&self, graph: &DependencyGraph, measurement: &Measurement) -> Vec<Adverb> {
        if !self.config.adverbs.enabled {
            return Vec::new();
        }

        self.matcher()
            .find_related(graph, measurement, &[measurement.value_token])
            .into_iter()
            .filter(|m| split_label(&m.relation_form).0 == self.config.adverbs.relation)
            .filter_map(|m| {
                let token = graph.token(m.token_index)?;
                Some(Adverb {
                    raw_name: token.text.clone(),
                    relation_form: m.relation_form,
                    offset_start: token.offset_start,
                    offset_end: token.offset_end,
                    token_index: token.index,
                })
            })
            .collect()
    }

    fn quantified_entity(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
    ) -> Option<QuantifiedEntity> {
        let span = measurement.quantity.quantified.as_ref()?;
        let mut entity = QuantifiedEntity::from(span);

        if let Some(token) = measurement.quantified_token.and_then(|i| graph.token(i)) {
            entity.token_index = Some(token.index);
            entity.offset_start = Some(token.offset_start);
            entity.offset_end = Some(token.offset_end);
            entity.descriptors = self.relation_builder().descriptors(graph, measurement, token.index);
        }
        Some(entity)
    }
}

/// Remove related entities that merely repeat the measurement. An entity equal
/// to the quantified substance fills in whatever the quantified record lacks.
fn drop_echoes(
    measurement: &Measurement,
    related: Vec<RelatedEntity>,
    quantified: &mut Option<QuantifiedEntity>,
) -> Vec<RelatedEntity> {
    let values = measurement.quantity.raw_values();
    let unit = measurement.unit_name().unwrap_or_default();
    let value_units: Vec<String> = values.iter().map(|v| format!("{v}{unit}")).collect();
    let quantified_name = measurement.quantified_name().unwrap_or_default().to_string();

    related
        .into_iter()
        .filter(|entity| {
            let name = entity.raw_name.as_str();

            if !quantified_name.is_empty() && name == quantified_name {
                if let Some(q) = quantified.as_mut() {
                    q.raw_name.get_or_insert_with(|| entity.raw_name.clone());
                    q.token_index.get_or_insert(entity.token_index);
                    q.offset_start.get_or_insert(entity.offset_start);
                    q.offset_end.get_or_insert(entity.offset_end);
                    if q.descriptors.is_empty() {
                        q.descriptors = entity.descriptors.clone();
                    }
                }
                return false;
            }

            let echo = values.iter().any(|v| *v == name)
                || (!unit.is_empty() && name == unit)
                || value_units.iter().any(|vu| vu == name)
                || (!quantified_name.is_empty() && name.contains(quantified_name.as_str()));
            if echo {
                tracing::trace!(name, "dropping measurement echo");
            }
            !echo
        })
        .collect()
}
