pub mod analytics;
pub mod builder;
pub mod graph;
pub mod identity;
pub mod serialization;
// Re-export for easy access
pub use analytics::{GraphAnalytics, GraphSummary, NodeCentrality};
pub use builder::GraphBuilder;
pub use graph::GraphStore;
pub use identity::IdAllocator;
