//! Request middleware: the [`Middleware`] hook trait, the JSON body parser
//! mounted in front of every route, and request logging.
mod body;
mod core;
mod tracing;

pub use body::{is_json_content_type, JsonBody, DEFAULT_BODY_LIMIT};
pub use core::{Middleware, MiddlewareStage};
pub use tracing::TracingMiddleware;
