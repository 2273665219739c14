pub mod builders;

// Re-export commonly used test utilities
pub use builders::{story_catalog, EntityBuilder};
