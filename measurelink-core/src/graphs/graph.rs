use crate::types::*;
use std::collections::HashMap;

/// One step away from a token: the edge taken and the token at its other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor<'g> {
    pub edge: &'g DependencyEdge,
    pub token: &'g Token,
}

/// Tokens and typed dependency edges of a single sentence.
///
/// Built once by `GraphBuilder` and never mutated afterwards. Neighbor lookups
/// always return edges in the order the parser supplied them, which is what
/// makes matching deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub(crate) tokens: Vec<Token>,
    pub(crate) positions: HashMap<TokenIndex, usize>,
    pub(crate) edges: Vec<DependencyEdge>,
    /// Token index → positions in `edges` of every edge touching it.
    pub(crate) incident: HashMap<TokenIndex, Vec<usize>>,
    pub(crate) root: Option<TokenIndex>,
}

impl DependencyGraph {
    pub fn token(&self, index: TokenIndex) -> Option<&Token> {
        self.positions.get(&index).map(|&pos| &self.tokens[pos])
    }

    pub fn contains(&self, index: TokenIndex) -> bool {
        self.positions.contains_key(&index)
    }

    /// Tokens ordered by index.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn root(&self) -> Option<&Token> {
        self.root.and_then(|index| self.token(index))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token that follows `index` in sentence order.
    pub fn next_token(&self, index: TokenIndex) -> Option<&Token> {
        let pos = *self.positions.get(&index)?;
        self.tokens.get(pos + 1)
    }

    pub fn neighbors(&self, index: TokenIndex, direction: Direction) -> Vec<Neighbor<'_>> {
        let Some(edge_positions) = self.incident.get(&index) else {
            return Vec::new();
        };

        edge_positions
            .iter()
            .filter_map(|&pos| {
                let edge = &self.edges[pos];
                let other = match direction {
                    Direction::Outgoing if edge.governor == index => edge.dependent,
                    Direction::Incoming if edge.dependent == index => edge.governor,
                    Direction::Both => edge.other_end(index)?,
                    _ => return None,
                };
                self.token(other).map(|token| Neighbor { edge, token })
            })
            .collect()
    }

    /// Neighbors in both directions whose edge carries `relation` and, when
    /// given, exactly `qualifier`.
    pub fn neighbors_by_relation(
        &self,
        index: TokenIndex,
        relation: &str,
        qualifier: Option<&str>,
    ) -> Vec<Neighbor<'_>> {
        self.neighbors(index, Direction::Both)
            .into_iter()
            .filter(|n| {
                n.edge.relation == relation
                    && qualifier.map_or(true, |q| n.edge.qualifier.as_deref() == Some(q))
            })
            .collect()
    }

    /// Neighbors in `direction` whose edge passes any of the relation filters
    /// (see `DependencyEdge::matches_filter`). An empty filter list keeps
    /// every neighbor.
    pub fn neighbors_matching(
        &self,
        index: TokenIndex,
        direction: Direction,
        filters: &[String],
    ) -> Vec<Neighbor<'_>> {
        self.neighbors(index, direction)
            .into_iter()
            .filter(|n| filters.is_empty() || filters.iter().any(|f| n.edge.matches_filter(f)))
            .collect()
    }

    /// Tokens whose character span overlaps `[start, end)`, in index order.
    pub fn tokens_overlapping(&self, start: usize, end: usize) -> Vec<&Token> {
        self.tokens.iter().filter(|t| t.overlaps(start, end)).collect()
    }

    /// Rebuild the sentence text. The parser keeps no raw sentence, so gaps
    /// between token offsets are filled with spaces.
    pub fn text(&self) -> String {
        let mut text = String::new();
        let mut previous: Option<&Token> = None;

        for token in &self.tokens {
            if let Some(prev) = previous {
                let gap = token.offset_start.saturating_sub(prev.offset_end);
                text.push_str(&" ".repeat(gap));
            }
            text.push_str(&token.text);
            previous = Some(token);
        }

        text
    }
}
