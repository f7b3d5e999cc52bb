//! # Router Module
//!
//! The routing primitive the route table is built on: an ordered list of
//! layers, each a path pattern, a method filter and a chain of stages.
//!
//! ## Overview
//!
//! - Document templates (`/pets/{petId}`) are translated to router syntax
//!   (`/pets/:petId`) by [`translate_path`].
//! - Patterns compile to anchored regexes. `:name` captures one segment and is
//!   percent-decoded; a single trailing slash is tolerated.
//! - Layers are tried in insertion order; the first stage that responds or
//!   fails ends dispatch. A request no layer answers comes back as `Ok(None)`.
//! - Sub-routers are mounted with [`Router::nest`], which re-roots their
//!   patterns under a prefix.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specrouter::router::{translate_path, Router};
//!
//! let mut router = Router::new();
//! router.route(Method::GET, &translate_path("/pets/{petId}"), vec![show_pet])?;
//! router.all("/pets/:petId", vec![method_guard])?;
//! let res = router.dispatch(req).await?;
//! ```

mod core;
mod pattern;

pub use core::{
    MethodFilter, ParamVec, RouteHandler, Router, Step, StepResult, MAX_INLINE_PARAMS,
};
pub use pattern::{join_paths, translate_path, PathPattern};
