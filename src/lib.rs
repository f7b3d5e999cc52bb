//! # specrouter
//!
//! **specrouter** builds an HTTP route table from a Swagger 2.0 document and
//! serves it on the `may` coroutine runtime.
//!
//! ## Overview
//!
//! Every operation in the document's `paths` becomes a route under its
//! `basePath`. Requests are matched against the document's path templates,
//! their JSON bodies are parsed and validated against the operation's body
//! schema, and the controller registered for the `operationId` produces the
//! response. Failures of any stage are rendered as JSON error documents.
//!
//! ## Architecture
//!
//! - **[`spec`]** - document loading and structural validation into route metadata
//! - **[`router`]** - ordered layers of path patterns and handler stages
//! - **[`validator_cache`]** - compiled request-body schemas
//! - **[`dispatcher`]** - request/response types and controller registry
//! - **[`middleware`]** - body parsing and request tracing
//! - **[`server`]** - route table assembly, error rendering and the HTTP service
//! - **[`cli`]** - the `specrouter` binary (`check`, `serve`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use specrouter::dispatcher::{Controllers, HandlerResponse};
//! use specrouter::server::{AppService, HttpServer, RouterOptions};
//! use specrouter::spec::load_spec;
//! use serde_json::json;
//!
//! let doc = load_spec("petstore.yaml")?;
//! let controllers = Controllers::new()
//!     .with_sync("listPets", |_req| Ok(HandlerResponse::ok(json!([]))))
//!     .with("showPetById", |req| async move {
//!         let id = req.get_path_param("petId").unwrap_or_default().to_string();
//!         Ok(HandlerResponse::ok(json!({ "id": id })))
//!     });
//!
//! let service = AppService::build(&doc, &controllers, RouterOptions::default())?;
//! let handle = HttpServer(service).start("127.0.0.1:8080")?;
//! handle.join().ok();
//! ```
//!
//! ## Configuration
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SPECROUTER_LOG_LEVEL` | `info` | Log level |
//! | `SPECROUTER_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `SPECROUTER_STACK_SIZE` | `0x4000` | Coroutine stack size |
//! | `SPECROUTER_BODY_LIMIT` | `102400` | Largest JSON body in bytes |

pub mod cli;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod validator;
pub mod validator_cache;

pub use dispatcher::{Controllers, HandlerRequest, HandlerResponse, HandlerResult};
pub use error::{BuildError, HttpError};
pub use server::{AppService, RouterOptions};
pub use spec::{load_spec, load_spec_str, ApiDocument, RouteMeta};
pub use validator::ValidationIssue;
