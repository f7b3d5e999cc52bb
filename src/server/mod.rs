//! # Server Module
//!
//! Assembles the route table from a document and serves it.
//!
//! - [`AppService::build`] validates the document, compiles body validators,
//!   mounts every operation (validate, then dispatch) with a [`MethodGuard`]
//!   per path, and threads `pre`/`post` middleware around the routes.
//! - [`AppService::handle`] runs one [`HandlerRequest`](crate::dispatcher::HandlerRequest)
//!   through the table; every failure is rendered by the one [`ErrorHandler`].
//! - [`HttpServer`] serves an [`AppService`] over may_minihttp.

mod error_handler;
mod http_server;
mod request;
mod response;
pub mod routes;
mod service;

pub use error_handler::{ErrorHandler, JsonErrorHandler};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_query_params, parse_request, read_body};
pub use response::write_handler_response;
pub use routes::{compile_validators, mount_path, MethodGuard};
pub use service::{AppService, RouterOptions};
