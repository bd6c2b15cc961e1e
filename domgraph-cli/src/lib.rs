// All core functionality is in domgraph-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod fetcher;

// Re-export core types for convenience
pub use domgraph_core::*;

// Re-export CLI utilities
pub use fetcher::{FetchError, PageFetcher};
