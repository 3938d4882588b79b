//! HTTP API layer for CommunityWatch.
//!
//! - **Endpoints**: the JSON routes, mounted flat at the root
//! - **Extractors**: authenticated user, optional user and moderator
//! - **Middleware**: shared [`AppState`](middleware::AppState) and bearer-token authentication
//!
//! Built on Axum 0.8 with a Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
