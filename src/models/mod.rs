pub mod concept;
pub mod context;
pub mod entity;

pub use concept::{Concept, ConceptMatch};
pub use context::{
    CollectionMethod, ContextCollectionResult, ContextSegment, ContextType, ExtractedContext,
    RagQuery,
};
pub use entity::{ConfidenceLevel, DetectedReference, Entity, EntityType};
