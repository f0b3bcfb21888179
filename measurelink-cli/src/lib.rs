// All extraction logic is in measurelink-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod output;

// Re-export core types for convenience
pub use measurelink_core::*;

// Re-export CLI utilities
pub use output::OutputFormat;
