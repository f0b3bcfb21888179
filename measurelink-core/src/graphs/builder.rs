use crate::error::GraphBuildError;
use crate::types::*;
use std::collections::HashMap;
use tracing::trace;

use super::graph::DependencyGraph;

pub struct GraphBuilder;

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a graph straight from parser output.
    pub fn build_parsed(&self, parse: &ParsedSentence) -> Result<DependencyGraph, GraphBuildError> {
        let edges = parse
            .edges
            .iter()
            .map(|raw| match &raw.qualifier {
                Some(q) => DependencyEdge {
                    governor: raw.governor,
                    dependent: raw.dependent,
                    relation: raw.relation.clone(),
                    qualifier: Some(q.clone()),
                },
                None => DependencyEdge::new(raw.governor, raw.dependent, &raw.relation),
            })
            .collect();

        self.build(parse.tokens.clone(), edges)
    }

    /// Validate tokens and edges and index them for neighbor lookup.
    ///
    /// The parser's pseudo-edge from token 0 is recorded as the sentence root
    /// rather than stored.
    pub fn build(
        &self,
        mut tokens: Vec<Token>,
        edges: Vec<DependencyEdge>,
    ) -> Result<DependencyGraph, GraphBuildError> {
        tokens.sort_by_key(|t| t.index);

        let mut positions = HashMap::with_capacity(tokens.len());
        for (pos, token) in tokens.iter().enumerate() {
            if token.index == 0 {
                return Err(GraphBuildError::ZeroIndex(token.text.clone()));
            }
            if positions.insert(token.index, pos).is_some() {
                return Err(GraphBuildError::DuplicateToken(token.index));
            }
        }

        let mut root = None;
        let mut kept = Vec::with_capacity(edges.len());
        let mut incident: HashMap<TokenIndex, Vec<usize>> = HashMap::new();

        for (edge_no, edge) in edges.into_iter().enumerate() {
            let unknown = |token: TokenIndex| GraphBuildError::UnknownToken {
                edge: edge_no,
                token,
                relation: edge.label(),
            };

            if edge.governor == 0 && edge.relation.eq_ignore_ascii_case(ROOT_RELATION) {
                if !positions.contains_key(&edge.dependent) {
                    return Err(unknown(edge.dependent));
                }
                root = Some(edge.dependent);
                continue;
            }
            for end in [edge.governor, edge.dependent] {
                if !positions.contains_key(&end) {
                    return Err(unknown(end));
                }
            }

            let pos = kept.len();
            incident.entry(edge.governor).or_default().push(pos);
            if edge.dependent != edge.governor {
                incident.entry(edge.dependent).or_default().push(pos);
            }
            kept.push(edge);
        }

        trace!(tokens = tokens.len(), edges = kept.len(), "built dependency graph");

        Ok(DependencyGraph {
            tokens,
            positions,
            edges: kept,
            incident,
            root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<Token> {
        vec![
            Token::new(1, "28", "CD", 0, 2, " "),
            Token::new(2, "weeks", "NNS", 3, 8, ""),
        ]
    }

    #[test]
    fn rejects_edges_to_unknown_tokens() {
        let err = GraphBuilder::new()
            .build(tokens(), vec![DependencyEdge::new(2, 7, "nummod")])
            .unwrap_err();
        assert_eq!(
            err,
            GraphBuildError::UnknownToken {
                edge: 0,
                token: 7,
                relation: "nummod".to_string()
            }
        );
    }

    #[test]
    fn rejects_duplicate_and_zero_indices() {
        let mut dup = tokens();
        dup.push(Token::new(2, "again", "RB", 9, 14, ""));
        assert_eq!(
            GraphBuilder::new().build(dup, vec![]).unwrap_err(),
            GraphBuildError::DuplicateToken(2)
        );

        let zero = vec![Token::new(0, "ROOT", "", 0, 0, "")];
        assert!(matches!(
            GraphBuilder::new().build(zero, vec![]),
            Err(GraphBuildError::ZeroIndex(_))
        ));
    }

    #[test]
    fn root_edge_is_not_stored() {
        let graph = GraphBuilder::new()
            .build(
                tokens(),
                vec![
                    DependencyEdge::new(0, 2, "ROOT"),
                    DependencyEdge::new(2, 1, "nummod"),
                ],
            )
            .unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.root().map(|t| t.index), Some(2));
    }

    #[test]
    fn parsed_edges_split_combined_labels() {
        let parse: ParsedSentence = serde_json::from_str(
            r#"{
                "tokens": [
                    {"index": 1, "word": "28", "pos": "CD", "characterOffsetBegin": 0, "characterOffsetEnd": 2, "after": " "},
                    {"index": 2, "word": "weeks", "pos": "NNS", "characterOffsetBegin": 3, "characterOffsetEnd": 8, "after": ""}
                ],
                "edges": [
                    {"governor": 2, "dependent": 1, "dep": "nmod:tmod"},
                    {"governor": 1, "dependent": 2, "relation": "nmod", "qualifier": "of"}
                ]
            }"#,
        )
        .unwrap();

        let graph = GraphBuilder::new().build_parsed(&parse).unwrap();
        let labels: Vec<_> = graph.edges().iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["nmod:tmod", "nmod:of"]);
        assert_eq!(graph.edges()[0].qualifier.as_deref(), Some("tmod"));
    }
}
