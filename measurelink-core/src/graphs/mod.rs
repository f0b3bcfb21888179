
pub mod serialization;
pub mod builder;
pub mod graph;
// Re-export for easy access
pub use builder::GraphBuilder;
pub use graph::{DependencyGraph, Neighbor};
pub use serialization::SimplifiedRecord;
