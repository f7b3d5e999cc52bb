use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::HttpError;
use futures::future::BoxFuture;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

use super::pattern::PathPattern;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for the request path.
///
/// Names are `Arc<str>` shared with the compiled pattern; values are
/// per-request data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Outcome of one stage of a layer.
#[derive(Debug)]
pub enum Step {
    /// Hand the (possibly modified) request to the next stage or layer.
    Next(HandlerRequest),
    /// Stop here and answer with this response.
    Respond(HandlerResponse),
}

pub type StepResult = Result<Step, HttpError>;

/// One step of a layer's handler chain.
///
/// Returning `Err` stops dispatch and sends the error to the error handler.
pub trait RouteHandler: Send + Sync {
    fn handle<'a>(&'a self, req: HandlerRequest) -> BoxFuture<'a, StepResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    fn allows(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(m) => m == method,
        }
    }
}

#[derive(Clone)]
struct Layer {
    pattern: PathPattern,
    method: MethodFilter,
    stages: Vec<Arc<dyn RouteHandler>>,
}

/// Ordered list of layers, walked first to last on every request.
///
/// A layer applies when its method filter accepts the request method and its
/// pattern matches the path. Its stages then run in order until one responds,
/// fails, or all of them pass the request on, in which case dispatch moves to
/// the next layer. Exact layers replace `path_params` with their captures;
/// prefix layers (middleware) leave them alone.
#[derive(Clone, Default)]
pub struct Router {
    layers: Vec<Layer>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `stages` on an exact `:name` path for one method.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        stages: Vec<Arc<dyn RouteHandler>>,
    ) -> Result<&mut Self, regex::Error> {
        self.push(PathPattern::exact(path)?, MethodFilter::Only(method), stages);
        Ok(self)
    }

    /// Mount `stages` on an exact path for every method.
    pub fn all(
        &mut self,
        path: &str,
        stages: Vec<Arc<dyn RouteHandler>>,
    ) -> Result<&mut Self, regex::Error> {
        self.push(PathPattern::exact(path)?, MethodFilter::Any, stages);
        Ok(self)
    }

    /// Mount a stage for every method on `prefix` and everything below it.
    pub fn use_stage(
        &mut self,
        prefix: &str,
        stage: Arc<dyn RouteHandler>,
    ) -> Result<&mut Self, regex::Error> {
        self.push(PathPattern::prefix(prefix)?, MethodFilter::Any, vec![stage]);
        Ok(self)
    }

    /// Append the layers of `router`, re-rooted under `prefix`.
    pub fn nest(&mut self, prefix: &str, router: Router) -> Result<&mut Self, regex::Error> {
        for layer in router.layers {
            let pattern = layer.pattern.nested(prefix)?;
            self.push(pattern, layer.method, layer.stages);
        }
        Ok(self)
    }

    fn push(
        &mut self,
        pattern: PathPattern,
        method: MethodFilter,
        stages: Vec<Arc<dyn RouteHandler>>,
    ) {
        self.layers.push(Layer {
            pattern,
            method,
            stages,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(method filter, pattern)` of every layer, in dispatch order.
    #[must_use]
    pub fn describe(&self) -> Vec<(MethodFilter, String)> {
        self.layers
            .iter()
            .map(|l| (l.method.clone(), l.pattern.source().to_string()))
            .collect()
    }

    /// Walk the layers for `req`.
    ///
    /// Returns `Ok(None)` when every layer passed the request on; the caller
    /// decides what an unanswered request means.
    pub async fn dispatch(
        &self,
        mut req: HandlerRequest,
    ) -> Result<Option<HandlerResponse>, HttpError> {
        for layer in &self.layers {
            if !layer.method.allows(&req.method) {
                continue;
            }
            let Some(params) = layer.pattern.matches(&req.path) else {
                continue;
            };
            debug!(
                method = %req.method,
                path = %req.path,
                pattern = %layer.pattern.source(),
                "Layer matched"
            );
            if !layer.pattern.is_prefix() {
                req.path_params = params;
            }
            for stage in &layer.stages {
                match stage.handle(req).await? {
                    Step::Next(next) => req = next,
                    Step::Respond(res) => return Ok(Some(res)),
                }
            }
        }
        Ok(None)
    }
}
