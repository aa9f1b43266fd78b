pub mod cache;
pub mod engine;
pub mod registry;

pub use cache::{CacheCounters, PageKey, RenderCache, RenderedPage, ThumbKey};
pub use engine::RenderEngine;
pub use registry::{DocumentId, DocumentInfo, DocumentRegistry};
