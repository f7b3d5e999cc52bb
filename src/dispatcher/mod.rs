//! # Dispatcher Module
//!
//! Binds `operationId`s to application controllers and runs them.
//!
//! ## Overview
//!
//! - [`HandlerRequest`] / [`HandlerResponse`] are the request and response
//!   values every stage, middleware and controller works with.
//! - [`Controllers`] is the `operationId` to [`Controller`] registry the
//!   application hands to [`AppService::build`](crate::server::AppService::build).
//!   Every declared operation must have an entry; this is checked when the
//!   route table is built, not when a request arrives.
//! - [`AsyncDispatch`] is the last stage of every operation route. It
//!   normalises sync returns, async results and panics into one
//!   [`HandlerResult`], so a controller failure reaches the error handler
//!   exactly once.
//!
//! ## Registering controllers
//!
//! ```rust,ignore
//! use specrouter::dispatcher::{Controllers, HandlerRequest, HandlerResponse, HandlerResult};
//!
//! async fn show_pet(req: HandlerRequest) -> HandlerResult {
//!     let id = req.get_path_param("petId").unwrap_or_default();
//!     Ok(HandlerResponse::ok(serde_json::json!({ "id": id })))
//! }
//!
//! let mut controllers = Controllers::new();
//! controllers.register("showPetById", show_pet);
//! controllers.register_sync("listPets", |_req| Ok(HandlerResponse::ok(serde_json::json!([]))));
//! ```

mod core;

pub use core::{
    AsyncDispatch, AsyncFn, Controller, Controllers, HandlerRequest,
    HandlerResponse, HandlerResult, HeaderVec, SyncFn, MAX_INLINE_HEADERS,
};
