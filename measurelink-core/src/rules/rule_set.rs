use crate::types::{DependencyEdge, MeasurementForm};
use std::collections::BTreeMap;
use std::fmt;

/// How a POS test compares its tag(s) against a token's POS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PosMode {
    /// Tag is a substring of the POS (`NN` matches `NNS`, `NNP`).
    In,
    /// Tag equals the POS.
    Equals,
    /// POS equals none of the tags.
    Not,
}

impl PosMode {
    pub fn key(&self) -> &'static str {
        match self {
            PosMode::In => super::schema::POS_IN_KEY,
            PosMode::Equals => super::schema::POS_EQUALS_KEY,
            PosMode::Not => super::schema::POS_NOT_KEY,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            super::schema::POS_IN_KEY => Some(PosMode::In),
            super::schema::POS_EQUALS_KEY => Some(PosMode::Equals),
            super::schema::POS_NOT_KEY => Some(PosMode::Not),
            _ => None,
        }
    }
}

/// Named move from one token to adjacent ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalStep {
    /// Incident edges in both directions.
    Cousin,
    /// Outgoing edges.
    Child,
    /// Incoming edges.
    Parent,
}

impl TraversalStep {
    pub const ALL: [TraversalStep; 3] = [
        TraversalStep::Cousin,
        TraversalStep::Child,
        TraversalStep::Parent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TraversalStep::Cousin => "get_cousin",
            TraversalStep::Child => "get_child",
            TraversalStep::Parent => "get_parent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.name() == name)
    }

    pub fn direction(&self) -> crate::types::Direction {
        use crate::types::Direction;
        match self {
            TraversalStep::Cousin => Direction::Both,
            TraversalStep::Child => Direction::Outgoing,
            TraversalStep::Parent => Direction::Incoming,
        }
    }
}

impl fmt::Display for TraversalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens to the token a continuation started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    Never,
    /// `"else": true`: keep it when the continuation found nothing.
    IfEmpty,
    /// `"else": "always"`
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PosAction {
    Accept,
    Continue {
        step: TraversalStep,
        /// Relation filters for the step; empty means any relation.
        relations: Vec<String>,
        fallback: Fallback,
    },
}

impl PosAction {
    pub fn is_terminal(&self) -> bool {
        match self {
            PosAction::Accept => true,
            PosAction::Continue { fallback, .. } => *fallback != Fallback::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PosTest {
    pub mode: PosMode,
    /// A single tag for `In`/`Equals`; every listed tag for `Not`.
    pub tags: Vec<String>,
    pub action: PosAction,
}

impl PosTest {
    pub fn matches(&self, pos: &str) -> bool {
        match self.mode {
            PosMode::In => self.tags.iter().any(|tag| pos.contains(tag.as_str())),
            PosMode::Equals => self.tags.iter().any(|tag| pos == tag),
            PosMode::Not => !self.tags.iter().any(|tag| pos == tag),
        }
    }
}

/// One variant of a relation's rule: bare (`qualifier == None`) or tied to
/// one enhanced attachment qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRule {
    pub relation: String,
    pub qualifier: Option<String>,
    pub measurement_types: Vec<MeasurementForm>,
    pub tests: Vec<PosTest>,
}

impl PatternRule {
    /// Label reported as a related entity's relation form.
    pub fn label(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}:{}", self.relation, q),
            None => self.relation.clone(),
        }
    }

    pub fn allows(&self, form: MeasurementForm) -> bool {
        self.measurement_types.contains(&form)
    }

    /// Tests whose tag check passes for `pos`, in declaration order.
    pub fn matching_tests<'a>(&'a self, pos: &'a str) -> impl Iterator<Item = &'a PosTest> + 'a {
        self.tests.iter().filter(move |t| t.matches(pos))
    }
}

/// Compiled, validated pattern rules. Immutable once built; share it as
/// `Arc<RuleSet>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    /// Relation → variants, qualified ones first (sorted by qualifier), the
    /// bare variant last.
    pub(crate) rules: BTreeMap<String, Vec<PatternRule>>,
    pub(crate) operator_words: Vec<String>,
    pub(crate) fingerprint: String,
}

impl RuleSet {
    /// Variant that governs `edge`: the one for its qualifier when declared,
    /// otherwise the bare variant.
    pub fn lookup(&self, edge: &DependencyEdge) -> Option<&PatternRule> {
        let variants = self.rules.get(&edge.relation)?;
        if let Some(q) = &edge.qualifier {
            if let Some(rule) = variants.iter().find(|r| r.qualifier.as_ref() == Some(q)) {
                return Some(rule);
            }
        }
        variants.iter().find(|r| r.qualifier.is_none())
    }

    pub fn variants(&self, relation: &str) -> &[PatternRule] {
        self.rules.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn operator_words(&self) -> &[String] {
        &self.operator_words
    }

    pub fn is_operator_word(&self, text: &str) -> bool {
        self.operator_words.iter().any(|w| w == text)
    }

    /// SHA-256 (hex) of the canonical pattern document.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
