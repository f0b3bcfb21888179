use crate::config::MatchingConfig;
use crate::graphs::{DependencyGraph, Neighbor};
use crate::types::*;
use serde::Serialize;
use std::collections::HashSet;

use super::engine::{debug_traversal, DebugConfig};
use super::rule_set::{Fallback, PatternRule, PosAction, RuleSet};

/// Relation form reported for entities reached through an operator word.
pub const OPERATOR_FORM: &str = "operator";

/// A token found to be related to a measurement, before it is expanded into a
/// full `RelatedEntity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedMatch {
    pub token_index: TokenIndex,
    pub relation_form: String,
    /// Text of the node a continuation started from; empty for direct hits.
    pub connector: String,
}

/// Ordered, de-duplicated collection of matches. The first match for a token
/// wins.
#[derive(Debug, Default)]
pub struct MatchSet {
    matches: Vec<RelatedMatch>,
    seen: HashSet<TokenIndex>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the token was already present.
    pub fn push(&mut self, token_index: TokenIndex, relation_form: &str, connector: &str) -> bool {
        if !self.seen.insert(token_index) {
            return false;
        }
        self.matches.push(RelatedMatch {
            token_index,
            relation_form: relation_form.to_string(),
            connector: connector.to_string(),
        });
        true
    }

    pub fn contains(&self, token_index: TokenIndex) -> bool {
        self.seen.contains(&token_index)
    }

    pub fn into_vec(self) -> Vec<RelatedMatch> {
        self.matches
    }
}

/// Tokens one step from `from` over `relations` whose POS contains one of
/// `accept_pos`. Measurement tokens and `from` itself are skipped.
pub fn cousins_with_pos<'g>(
    graph: &'g DependencyGraph,
    measurement: &Measurement,
    from: TokenIndex,
    relations: &[String],
    accept_pos: &[String],
) -> Vec<Neighbor<'g>> {
    graph
        .neighbors_matching(from, Direction::Both, relations)
        .into_iter()
        .filter(|n| n.token.index != from && !measurement.is_own_token(n.token.index))
        .filter(|n| accept_pos.iter().any(|p| n.token.pos.contains(p.as_str())))
        .collect()
}

/// Walks the dependency graph around a measurement and applies the pattern
/// rules to decide which tokens are related to it.
pub struct PatternMatcher<'a> {
    rules: &'a RuleSet,
    settings: &'a MatchingConfig,
    debug_config: &'a DebugConfig,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(rules: &'a RuleSet, settings: &'a MatchingConfig, debug_config: &'a DebugConfig) -> Self {
        Self {
            rules,
            settings,
            debug_config,
        }
    }

    /// Related tokens for `measurement`, starting from `anchors`. Finding
    /// nothing is a normal outcome.
    pub fn find_related(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        anchors: &[TokenIndex],
    ) -> Vec<RelatedMatch> {
        let mut found = MatchSet::new();

        for &anchor in anchors {
            for neighbor in graph.neighbors(anchor, Direction::Both) {
                if measurement.is_own_token(neighbor.token.index) {
                    continue;
                }

                self.match_edge(graph, measurement, anchor, neighbor, &mut found);

                if self.rules.is_operator_word(&neighbor.token.text) {
                    self.match_operator(graph, measurement, neighbor, &mut found);
                }
            }
        }

        found.into_vec()
    }

    fn match_edge(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        anchor: TokenIndex,
        neighbor: Neighbor<'_>,
        found: &mut MatchSet,
    ) {
        let Some(rule) = self.rules.lookup(neighbor.edge) else {
            tracing::trace!(edge = %neighbor.edge.label(), "no rule for relation");
            return;
        };
        if !rule.allows(measurement.form) {
            tracing::trace!(rule = %rule.label(), form = %measurement.form, "rule excludes measurement form");
            return;
        }

        let mut path = vec![anchor, neighbor.token.index];
        self.apply_tests(graph, measurement, rule, neighbor.token, "", 0, &mut path, found);
    }

    /// Run the rule's POS tests against `node`. Returns whether anything was
    /// accepted at or beyond this node.
    #[allow(clippy::too_many_arguments)]
    fn apply_tests(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        rule: &PatternRule,
        node: &Token,
        connector: &str,
        hops: usize,
        path: &mut Vec<TokenIndex>,
        found: &mut MatchSet,
    ) -> bool {
        let label = rule.label();
        let mut any = false;

        for test in rule.matching_tests(&node.pos) {
            match &test.action {
                PosAction::Accept => {
                    debug_traversal("accept", node, &label, self.debug_config);
                    found.push(node.index, &label, connector);
                    any = true;
                }
                PosAction::Continue {
                    step,
                    relations,
                    fallback,
                } => {
                    let mut reached = false;

                    if hops < self.settings.max_hops {
                        debug_traversal(step.name(), node, &label, self.debug_config);
                        for next in graph.neighbors_matching(node.index, step.direction(), relations) {
                            let index = next.token.index;
                            if path.contains(&index) || measurement.is_own_token(index) {
                                continue;
                            }
                            path.push(index);
                            reached |= self.apply_tests(
                                graph,
                                measurement,
                                rule,
                                next.token,
                                &node.text,
                                hops + 1,
                                path,
                                found,
                            );
                            path.pop();
                        }
                    } else {
                        tracing::trace!(rule = %label, token = node.index, "hop bound reached");
                    }

                    let keep_node = match fallback {
                        Fallback::Always => true,
                        Fallback::IfEmpty => !reached,
                        Fallback::Never => false,
                    };
                    if keep_node {
                        found.push(node.index, &label, connector);
                    }
                    any |= reached || keep_node;
                }
            }
        }

        any
    }

    fn match_operator(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        operator: Neighbor<'_>,
        found: &mut MatchSet,
    ) {
        debug_traversal(OPERATOR_FORM, operator.token, "", self.debug_config);
        let cousins = cousins_with_pos(
            graph,
            measurement,
            operator.token.index,
            &self.settings.operator_relations,
            &self.settings.cousin_accept_pos,
        );
        for cousin in cousins {
            found.push(cousin.token.index, OPERATOR_FORM, "");
        }
    }
}
