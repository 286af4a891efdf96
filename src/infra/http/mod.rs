//! Public HTTP surface: collection pages, statistics and a liveness check.

pub mod cache_control;
mod error;
mod middleware;
mod public;

pub use cache_control::{annotate, apply_cache_tier};
pub use error::{ApiError, codes};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
