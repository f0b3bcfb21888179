// Main rules module - delegates to semantic sub-modules
// - schema.rs: raw pattern document shape
// - compiler.rs: document validation and compilation into a RuleSet
// - rule_set.rs: compiled rule model and lookup
// - matcher.rs: graph traversal driven by the rules
// - relation_builder.rs: related entities and descriptors
// - engine.rs: RuleEngine and shared debug utilities

pub mod compiler;
pub mod engine;
pub mod matcher;
pub mod relation_builder;
pub mod rule_set;
pub mod schema;

pub use engine::*;
pub use matcher::{PatternMatcher, RelatedMatch};
pub use relation_builder::RelationBuilder;
pub use rule_set::*;
pub use schema::PatternDocument;
