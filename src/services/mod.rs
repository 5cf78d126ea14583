//! 服务模块

pub mod attachments;
pub mod cache;
pub mod cache_key;
pub mod query_builder;
pub mod resolution;
pub mod selection;

pub use attachments::AttachmentResolver;
pub use cache::{CacheStats, Clock, ManualClock, ResponseCache, SystemClock};
pub use cache_key::{CacheKey, CacheKeyDeriver, CacheProjection};
pub use query_builder::{QuerySynthesizer, attachment_query};
pub use resolution::{ResolutionCoordinator, ResolutionService, create_resolution_service};
pub use selection::ResultSelector;
