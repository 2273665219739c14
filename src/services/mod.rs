pub mod auto_replace;
pub mod collector;
pub mod completion;
pub mod concept;
pub mod extractor;
pub mod filters;
pub mod matching;
pub mod reference;
pub mod retrieval;

pub use auto_replace::{AutoReplaceEngine, ReplaceKind, ReplaceRule};
pub use collector::{is_story_element, CollectorSettings, CollectorUpdate, ContextCollector};
pub use completion::{
    CompletionDriver, CompletionOutcome, CompletionPrompt, CompletionProvider, RejectReason,
};
pub use concept::{CacheInfo, ConceptDetector, ConceptStatistics};
pub use extractor::{ContextExtractor, ContextWindows};
pub use filters::{ExclusionFilters, ExpressionSpan, FilterCounts, FilterKind};
pub use reference::{DetectionStatistics, ReferenceDetector};
pub use retrieval::{
    NoopRetrievalService, RetrievalGateway, RetrievalOutcome, RetrievalService, RetrievedPassage,
};
