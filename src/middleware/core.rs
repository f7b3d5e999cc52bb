use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::HttpError;
use crate::router::{RouteHandler, Step, StepResult};

/// Cross-cutting request hook.
///
/// `before` runs when the middleware's layer is reached. Returning a response
/// ends dispatch with it; returning an error hands it to the error handler.
/// `after` runs for `pre` middleware once the final response is known, in
/// reverse registration order.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HttpError> {
        Ok(None)
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}

/// Runs a [`Middleware`]'s `before` hook as a router stage.
pub struct MiddlewareStage(pub Arc<dyn Middleware>);

impl RouteHandler for MiddlewareStage {
    fn handle<'a>(&'a self, mut req: HandlerRequest) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            match self.0.before(&mut req)? {
                Some(res) => Ok(Step::Respond(res)),
                None => Ok(Step::Next(req)),
            }
        })
    }
}
