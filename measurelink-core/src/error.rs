use thiserror::Error;

/// Raised while compiling a pattern document. Always fatal: no partial rule
/// set is ever published.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pattern document is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("failed to read pattern file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pattern document: unknown top-level key `{0}`")]
    UnknownSection(String),

    #[error("rule `{rule}`: unknown key `{key}`")]
    UnknownKey { rule: String, key: String },

    #[error("rule `{rule}`: expected {expected}")]
    InvalidShape { rule: String, expected: String },

    #[error("rule `{rule}`: unsupported `{field}` entry for tag `{tag}`: {reason}")]
    UnsupportedPos {
        rule: String,
        field: String,
        tag: String,
        reason: String,
    },

    #[error("rule `{rule}`: unknown traversal step `{step}`")]
    UnknownStep { rule: String, step: String },

    #[error("rule `{rule}`: unknown measurement type `{value}`")]
    UnknownMeasurementType { rule: String, value: String },

    #[error("rule `{rule}`: `measurement_types` must list at least one form")]
    EmptyMeasurementTypes { rule: String },

    #[error("rule `{rule}`: enhanced rule declares no attachment qualifiers and no bare fallback")]
    MissingQualifiers { rule: String },

    #[error("rule `{rule}`: attachment `{qualifier}` nests another attachment map under `{key}`")]
    NestedAttachment {
        rule: String,
        qualifier: String,
        key: String,
    },

    #[error("rule `{rule}`: continuation chain can never accept a token")]
    UnterminatedChain { rule: String },

    #[error("rule `{rule}`: no POS tests declared")]
    NoPosTests { rule: String },

    #[error("invalid extractor settings: {0}")]
    Settings(String),
}

/// Raised when parser output cannot form a consistent graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphBuildError {
    #[error("edge #{edge} ({relation}) references unknown token {token}")]
    UnknownToken {
        edge: usize,
        token: usize,
        relation: String,
    },

    #[error("token index {0} appears more than once")]
    DuplicateToken(usize),

    #[error("token indices are 1-based; found token 0 (`{0}`)")]
    ZeroIndex(String),
}

/// A measurement span that could not be tied to the graph's tokens.
/// Recoverable: the measurement is dropped and the rest of the sentence is
/// still processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error(
        "measurement #{measurement} (`{raw_value}`): no token overlaps offsets {offset_start}..{offset_end}"
    )]
    Value {
        measurement: usize,
        raw_value: String,
        offset_start: usize,
        offset_end: usize,
    },

    #[error(
        "measurement #{measurement}: unit `{unit}` matches no token at offsets {offset_start}..{offset_end}"
    )]
    Unit {
        measurement: usize,
        unit: String,
        offset_start: usize,
        offset_end: usize,
    },
}

impl AlignmentError {
    /// Position of the offending span in the sentence's measurement list.
    pub fn measurement(&self) -> usize {
        match self {
            Self::Value { measurement, .. } | Self::Unit { measurement, .. } => *measurement,
        }
    }
}

/// Per-sentence failure surfaced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("sentence {sentence}: {source}")]
    Graph {
        sentence: usize,
        #[source]
        source: GraphBuildError,
    },
}
