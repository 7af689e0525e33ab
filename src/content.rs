//! Content generation: typed items, prompt construction, site context, internal
//! linking, and the pipeline that runs one generation cycle end to end.

pub mod context;
pub mod item;
pub mod links;
pub mod pipeline;
pub mod prompt;

pub use context::{CategoryFact, ContextResolver, PromptContext, RecentItem};
pub use item::{slugify, GeneratedItem};
pub use links::{inject_links, LinkCandidate, LinkCandidateSource, LinkSubject, LinkSuggestion};
pub use pipeline::{ContentPipeline, PipelineOutcome, PipelineSettings};
pub use prompt::ItemRequest;
