use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AlignmentError;

/// 1-based position of a token inside its sentence, as assigned by the parser.
pub type TokenIndex = usize;

/// Relation label the parser uses for the pseudo-edge from token 0 to the
/// sentence head.
pub const ROOT_RELATION: &str = "ROOT";

// ===== PARSER INPUT TYPES =====
// Produced by the external dependency/POS parser. Field aliases accept the
// CoreNLP JSON spelling so parser output can be passed through unchanged.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub index: TokenIndex,
    #[serde(alias = "word")]
    pub text: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(alias = "characterOffsetBegin")]
    pub offset_start: usize,
    #[serde(alias = "characterOffsetEnd")]
    pub offset_end: usize,
    /// Separator text that follows the token in the source ("" when the next
    /// token is glued to this one).
    #[serde(default)]
    pub after: String,
}

impl Token {
    pub fn new(
        index: TokenIndex,
        text: &str,
        pos: &str,
        offset_start: usize,
        offset_end: usize,
        after: &str,
    ) -> Self {
        Self {
            index,
            text: text.to_string(),
            pos: pos.to_string(),
            lemma: None,
            offset_start,
            offset_end,
            after: after.to_string(),
        }
    }

    /// Half-open overlap test against a character span.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.offset_start < end && start < self.offset_end
    }
}

/// Edge as the parser emits it. `relation` may still carry the enhanced
/// qualifier (`nmod:of`); `GraphBuilder` splits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEdge {
    pub governor: TokenIndex,
    pub dependent: TokenIndex,
    #[serde(alias = "dep")]
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// One parsed sentence: tokens plus the (enhanced) dependency edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSentence {
    pub tokens: Vec<Token>,
    #[serde(alias = "enhancedPlusPlusDependencies", alias = "dependencies")]
    pub edges: Vec<ParsedEdge>,
}

/// Typed dependency edge, governor → dependent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub governor: TokenIndex,
    pub dependent: TokenIndex,
    pub relation: String,
    /// Enhanced attachment qualifier, e.g. the `of` in `nmod:of`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl DependencyEdge {
    /// Build an edge from a combined label, splitting `nmod:of` into relation
    /// `nmod` and qualifier `of`.
    pub fn new(governor: TokenIndex, dependent: TokenIndex, label: &str) -> Self {
        let (relation, qualifier) = split_label(label);
        Self {
            governor,
            dependent,
            relation: relation.to_string(),
            qualifier: qualifier.map(str::to_string),
        }
    }

    /// Combined label as the parser spells it.
    pub fn label(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}:{}", self.relation, q),
            None => self.relation.clone(),
        }
    }

    /// The token at the other end of this edge, if `index` is one of its ends.
    pub fn other_end(&self, index: TokenIndex) -> Option<TokenIndex> {
        if self.governor == index {
            Some(self.dependent)
        } else if self.dependent == index {
            Some(self.governor)
        } else {
            None
        }
    }

    /// Relation filter used by traversal steps: `nmod` accepts `nmod` with any
    /// qualifier, `nmod:to` accepts only that qualifier.
    pub fn matches_filter(&self, filter: &str) -> bool {
        let (relation, qualifier) = split_label(filter);
        if relation != self.relation {
            return false;
        }
        match qualifier {
            Some(q) => self.qualifier.as_deref() == Some(q),
            None => true,
        }
    }
}

/// Split `nmod:of` into (`nmod`, Some(`of`)). Labels without a colon have no
/// qualifier.
pub fn split_label(label: &str) -> (&str, Option<&str>) {
    match label.split_once(':') {
        Some((relation, qualifier)) if !qualifier.is_empty() => (relation, Some(qualifier)),
        Some((relation, _)) => (relation, None),
        None => (label, None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges where the token is the governor.
    Outgoing,
    /// Edges where the token is the dependent.
    Incoming,
    Both,
}

// ===== MEASUREMENT INPUT TYPES =====
// Produced by the external measurement extractor. Read-only to the engine.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSpan {
    /// Extraction type as supplied (`value`, `interval`, `value-range`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_value: Option<f64>,
    pub raw_value: String,
    #[serde(default, alias = "rawUnit", skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitSpan>,
    #[serde(
        default,
        alias = "quantifiedSubstance",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantified: Option<QuantifiedSpan>,
    pub offset_start: usize,
    pub offset_end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_index: Option<TokenIndex>,
    /// Lower bound of an interval ("5 to 10 m").
    #[serde(default, alias = "quantityLeast", skip_serializing_if = "Option::is_none")]
    pub least: Option<QuantityBound>,
    /// Upper bound of an interval.
    #[serde(default, alias = "quantityMost", skip_serializing_if = "Option::is_none")]
    pub most: Option<QuantityBound>,
}

impl MeasurementSpan {
    /// The bound the value token is aligned on: the lower bound of an
    /// interval, else its upper bound, else the span itself.
    pub fn value_offsets(&self) -> (usize, usize) {
        match self.least.as_ref().or(self.most.as_ref()) {
            Some(bound) => (bound.offset_start, bound.offset_end),
            None => (self.offset_start, self.offset_end),
        }
    }

    /// Raw value texts a related word must not repeat: the span's own value
    /// and those of any interval bounds.
    pub fn raw_values(&self) -> Vec<&str> {
        std::iter::once(self.raw_value.as_str())
            .chain(self.least.iter().map(|b| b.raw_value.as_str()))
            .chain(self.most.iter().map(|b| b.raw_value.as_str()))
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// One end of an interval measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityBound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_value: Option<f64>,
    pub raw_value: String,
    pub offset_start: usize,
    pub offset_end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_index: Option<TokenIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpan {
    pub name: String,
    #[serde(default)]
    pub token_indices: Vec<TokenIndex>,
    pub offset_start: usize,
    pub offset_end: usize,
    #[serde(default)]
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantifiedSpan {
    #[serde(rename = "normalizedName", alias = "name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_index: Option<TokenIndex>,
}

/// How value and unit sit next to each other in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementForm {
    /// "10m"
    Attached,
    /// "28 weeks"
    SpaceBetween,
    /// "10-m"
    Hyphenated,
}

impl MeasurementForm {
    pub const ALL: [MeasurementForm; 3] = [
        MeasurementForm::Attached,
        MeasurementForm::SpaceBetween,
        MeasurementForm::Hyphenated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementForm::Attached => "attached",
            MeasurementForm::SpaceBetween => "space_between",
            MeasurementForm::Hyphenated => "hyphenated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|form| form.as_str() == value)
    }
}

impl fmt::Display for MeasurementForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measurement span tied to graph tokens. Built by `MeasurementBinder`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Position of the span in the extractor's list for this sentence.
    pub position: usize,
    /// The supplied span, with token indices rewritten to the aligned ones.
    pub quantity: MeasurementSpan,
    /// Primary token: the token carrying the value.
    pub value_token: TokenIndex,
    pub unit_tokens: Vec<TokenIndex>,
    pub quantified_token: Option<TokenIndex>,
    pub form: MeasurementForm,
}

impl Measurement {
    pub fn is_own_token(&self, index: TokenIndex) -> bool {
        self.value_token == index || self.unit_tokens.contains(&index)
    }

    /// Where relation matching starts: the unit, else the quantified
    /// substance, else the value itself.
    pub fn anchors(&self) -> Vec<TokenIndex> {
        if !self.unit_tokens.is_empty() {
            self.unit_tokens.clone()
        } else if let Some(q) = self.quantified_token {
            vec![q]
        } else {
            vec![self.value_token]
        }
    }

    pub fn unit_name(&self) -> Option<&str> {
        self.quantity.unit.as_ref().map(|u| u.name.as_str())
    }

    pub fn quantified_name(&self) -> Option<&str> {
        self.quantity.quantified.as_ref().map(|q| q.name.as_str())
    }
}

// ===== RELATION OUTPUT TYPES =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub raw_name: String,
    pub token_index: TokenIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntity {
    pub raw_name: String,
    /// Text of the node the relation was reached through ("" when direct).
    pub connector: String,
    pub relation_form: String,
    pub offset_start: usize,
    pub offset_end: usize,
    pub token_index: TokenIndex,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adverb {
    pub raw_name: String,
    pub relation_form: String,
    pub offset_start: usize,
    pub offset_end: usize,
    pub token_index: TokenIndex,
}

/// Quantified substance as reported in the output, enriched with graph
/// position and descriptors when the engine resolved it to a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantifiedEntity {
    #[serde(rename = "normalizedName", alias = "name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_index: Option<TokenIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptors: Vec<Descriptor>,
}

impl From<&QuantifiedSpan> for QuantifiedEntity {
    fn from(span: &QuantifiedSpan) -> Self {
        Self {
            name: span.name.clone(),
            raw_name: span.raw_name.clone(),
            token_index: span.token_index,
            offset_start: span.offset_start,
            offset_end: span.offset_end,
            descriptors: Vec::new(),
        }
    }
}

/// Full output record, one per bound measurement. Field order is the
/// serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adverbs: Vec<Adverb>,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: MeasurementSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantified: Option<QuantifiedEntity>,
    pub related: Vec<RelatedEntity>,
}

impl MeasurementRecord {
    pub fn related_names(&self) -> Vec<&str> {
        self.related.iter().map(|r| r.raw_name.as_str()).collect()
    }
}

// ===== EXTRACTION TYPES =====

/// One unit of work: a parsed sentence and the measurement spans found in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceInput {
    #[serde(flatten)]
    pub parse: ParsedSentence,
    #[serde(default)]
    pub measurements: Vec<MeasurementSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedMeasurement {
    pub position: usize,
    pub raw_value: String,
    pub reason: String,
}

impl DroppedMeasurement {
    pub fn from_error(raw_value: &str, error: &AlignmentError) -> Self {
        Self {
            position: error.measurement(),
            raw_value: raw_value.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Result for one sentence. Dropped measurements are listed separately and
/// never appear in `records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceExtraction {
    /// 1-based sentence number within the batch.
    pub sentence: usize,
    pub text: String,
    pub records: Vec<MeasurementRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DroppedMeasurement>,
}
