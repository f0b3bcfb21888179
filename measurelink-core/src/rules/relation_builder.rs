use crate::config::DescriptorConfig;
use crate::graphs::DependencyGraph;
use crate::types::*;
use std::collections::HashSet;

use super::matcher::{cousins_with_pos, RelatedMatch};

/// Turns matched tokens into `RelatedEntity` records and collects their
/// descriptors.
pub struct RelationBuilder<'a> {
    settings: &'a DescriptorConfig,
    cousin_accept_pos: &'a [String],
}

impl<'a> RelationBuilder<'a> {
    pub fn new(settings: &'a DescriptorConfig, cousin_accept_pos: &'a [String]) -> Self {
        Self {
            settings,
            cousin_accept_pos,
        }
    }

    /// Returns `None` only when the match points at a token the graph does
    /// not have.
    pub fn build(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        related: &RelatedMatch,
    ) -> Option<RelatedEntity> {
        let token = graph.token(related.token_index)?;
        Some(RelatedEntity {
            raw_name: token.text.clone(),
            connector: related.connector.clone(),
            relation_form: related.relation_form.clone(),
            offset_start: token.offset_start,
            offset_end: token.offset_end,
            token_index: token.index,
            descriptors: self.descriptors(graph, measurement, token.index),
        })
    }

    /// Modifiers of `start` up to the configured depth, ordered by token
    /// index.
    pub fn descriptors(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        start: TokenIndex,
    ) -> Vec<Descriptor> {
        let mut visited = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut descriptors = Vec::new();

        for _ in 0..self.settings.depth {
            let mut next = Vec::new();
            for node in frontier {
                for neighbor in graph.neighbors(node, Direction::Both) {
                    let index = neighbor.token.index;
                    if visited.contains(&index) || measurement.is_own_token(index) {
                        continue;
                    }
                    if self.is_descriptor(&neighbor.token.pos, &neighbor.edge.relation) {
                        visited.insert(index);
                        descriptors.push(Descriptor {
                            raw_name: neighbor.token.text.clone(),
                            token_index: index,
                        });
                        next.push(index);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        descriptors.sort_by_key(|d| d.token_index);
        descriptors
    }

    fn is_descriptor(&self, pos: &str, relation: &str) -> bool {
        self.settings.pos.iter().any(|p| p == pos) || self.settings.relations.iter().any(|r| r == relation)
    }

    /// Extra related entities reached through noun modifiers of `entity`:
    /// for "the mean weight of a mouse", `weight` modifying the related token
    /// leads on to `mouse`.
    pub fn expand(
        &self,
        graph: &DependencyGraph,
        measurement: &Measurement,
        entity: &RelatedEntity,
    ) -> Vec<RelatedMatch> {
        let mut extra = Vec::new();

        for neighbor in graph.neighbors(entity.token_index, Direction::Both) {
            let modifier = neighbor.token;
            if neighbor.edge.relation != "amod"
                || !modifier.pos.contains("NN")
                || measurement.is_own_token(modifier.index)
            {
                continue;
            }

            let cousins = cousins_with_pos(
                graph,
                measurement,
                modifier.index,
                &self.settings.expand_relations,
                self.cousin_accept_pos,
            );
            for cousin in cousins {
                if cousin.token.index == entity.token_index {
                    continue;
                }
                extra.push(RelatedMatch {
                    token_index: cousin.token.index,
                    relation_form: cousin.edge.relation.clone(),
                    connector: modifier.text.clone(),
                });
            }
        }

        extra
    }
}
