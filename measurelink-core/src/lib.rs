// MeasureLink Core Library
//
// Links measurements found in a sentence to the words they describe by
// walking the sentence's dependency graph under declarative pattern rules.
// Main interface for turning parsed sentences into measurement records.

pub mod types;
pub mod error;
pub mod graphs;
pub mod rules;
pub mod binder;
pub mod processor;
pub mod cache;
pub mod config;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{AlignmentError, ConfigError, ExtractError, GraphBuildError};
pub use graphs::{DependencyGraph, GraphBuilder, SimplifiedRecord};
pub use rules::{DebugConfig, PatternDocument, RuleEngine, RuleSet};
pub use binder::MeasurementBinder;
pub use processor::{BatchExtraction, ExtractionStages, ExtractionStats, MeasurementExtractor};
pub use cache::RuleSetCache;
pub use config::ExtractorConfig;
