use crate::error::HttpError;
use crate::ids::RequestId;
use crate::router::{ParamVec, RouteHandler, Step, StepResult};
use crate::server::parse_query_params;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage. Names keep the case they arrived with; lookups are
/// case-insensitive.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A request as seen by middleware, stages and controllers.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// `operationId` of the controller handling the request, set on dispatch
    pub handler_name: String,
    /// Captures of the matched route, e.g. `petId` for `/pets/:petId`
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    /// Body bytes as received
    pub raw_body: Vec<u8>,
    /// Parsed JSON body, filled by the body parser
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Build a request from a method and a request target (`/pets?limit=2`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            handler_name: String::new(),
            path_params: ParamVec::new(),
            query_params: parse_query_params(query),
            headers: HeaderVec::new(),
            raw_body: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Attach raw body bytes.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = body.into();
        self
    }

    /// Attach a serialized JSON body and a JSON content type.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// Get a path parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by a controller, a stage or the error handler.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    /// `Null` is written as an empty body, a string as `text/plain`, anything
    /// else as JSON.
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with a JSON content type
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, HeaderVec::new(), Value::Null)
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }
}

/// What a controller produces: a response, or an error for the error handler.
pub type HandlerResult = Result<HandlerResponse, HttpError>;

/// A request handler bound to one `operationId`.
///
/// Sync and async handlers both end up here; see [`Controllers::register`]
/// and [`Controllers::register_sync`].
pub trait Controller: Send + Sync + 'static {
    fn call(&self, req: HandlerRequest) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter for `async fn(HandlerRequest) -> HandlerResult`.
pub struct AsyncFn<F>(pub F);

impl<F, Fut> Controller for AsyncFn<F>
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: HandlerRequest) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(req))
    }
}

/// Adapter for `fn(HandlerRequest) -> HandlerResult`. The function runs inside
/// [`Controller::call`], so a panic surfaces there, before any future exists.
pub struct SyncFn<F>(pub F);

impl<F> Controller for SyncFn<F>
where
    F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, req: HandlerRequest) -> BoxFuture<'static, HandlerResult> {
        Box::pin(future::ready((self.0)(req)))
    }
}

/// `operationId` to controller mapping supplied by the application.
#[derive(Clone, Default)]
pub struct Controllers {
    entries: HashMap<String, Arc<dyn Controller>>,
}

impl Controllers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async controller.
    pub fn register<F, Fut>(&mut self, operation_id: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_controller(operation_id, Arc::new(AsyncFn(handler)))
    }

    /// Register a plain function controller.
    pub fn register_sync<F>(&mut self, operation_id: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_controller(operation_id, Arc::new(SyncFn(handler)))
    }

    pub fn register_controller(
        &mut self,
        operation_id: impl Into<String>,
        controller: Arc<dyn Controller>,
    ) -> &mut Self {
        let operation_id = operation_id.into();
        if self.entries.insert(operation_id.clone(), controller).is_some() {
            warn!(operation_id = %operation_id, "Controller replaced");
        }
        self
    }

    /// Builder form of [`Controllers::register`].
    #[must_use]
    pub fn with<F, Fut>(mut self, operation_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(operation_id, handler);
        self
    }

    /// Builder form of [`Controllers::register_sync`].
    #[must_use]
    pub fn with_sync<F>(mut self, operation_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_sync(operation_id, handler);
        self
    }

    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<Arc<dyn Controller>> {
        self.entries.get(operation_id).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.entries.contains_key(operation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Terminal stage that runs a controller and turns every way it can fail
/// into exactly one `HttpError`.
///
/// - a panic while the controller is called becomes a 500;
/// - a panic while its future is polled becomes a 500;
/// - `Err(e)` is forwarded as is, keeping its status;
/// - `Ok(res)` is the response, nothing is forwarded.
pub struct AsyncDispatch {
    operation_id: Arc<str>,
    controller: Arc<dyn Controller>,
}

impl AsyncDispatch {
    #[must_use]
    pub fn new(operation_id: &str, controller: Arc<dyn Controller>) -> Self {
        Self {
            operation_id: Arc::from(operation_id),
            controller,
        }
    }

    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub async fn invoke(&self, mut req: HandlerRequest) -> HandlerResult {
        req.handler_name = self.operation_id.to_string();
        let request_id = req.request_id;
        debug!(%request_id, operation_id = %self.operation_id, "Dispatching to controller");

        let fut = match catch_unwind(AssertUnwindSafe(|| self.controller.call(req))) {
            Ok(fut) => fut,
            Err(payload) => return Err(self.panicked(request_id, payload.as_ref())),
        };
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(self.panicked(request_id, payload.as_ref())),
        }
    }

    fn panicked(&self, request_id: RequestId, payload: &(dyn Any + Send)) -> HttpError {
        let message = panic_message(payload);
        error!(
            %request_id,
            operation_id = %self.operation_id,
            panic = %message,
            "Controller panicked"
        );
        HttpError::internal(format!("controller {} panicked: {message}", self.operation_id))
    }
}

impl RouteHandler for AsyncDispatch {
    fn handle<'a>(&'a self, req: HandlerRequest) -> BoxFuture<'a, StepResult> {
        Box::pin(async move { self.invoke(req).await.map(Step::Respond) })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use http::StatusCode;
    use serde_json::json;

    fn dispatch(controller: Arc<dyn Controller>) -> HandlerResult {
        let stage = AsyncDispatch::new("op", controller);
        block_on(stage.invoke(HandlerRequest::new(Method::GET, "/x")))
    }

    #[test]
    fn request_target_splits_query() {
        let req = HandlerRequest::new(Method::GET, "/pets?limit=2&tag=a%20b");
        assert_eq!(req.path, "/pets");
        assert_eq!(req.get_query_param("limit"), Some("2"));
        assert_eq!(req.get_query_param("tag"), Some("a b"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HandlerRequest::new(Method::GET, "/").with_header("X-Trace", "1");
        assert_eq!(req.get_header("x-trace"), Some("1"));
    }

    #[test]
    fn ok_result_is_the_response() {
        let res = dispatch(Arc::new(SyncFn(|req: HandlerRequest| -> HandlerResult {
            Ok(HandlerResponse::ok(json!({ "op": req.handler_name })))
        })))
        .unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "op": "op" }));
    }

    #[test]
    fn sync_panic_becomes_internal_error() {
        let err = dispatch(Arc::new(SyncFn(|_req: HandlerRequest| -> HandlerResult {
            panic!("sync failure")
        })))
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("sync failure"));
    }

    #[test]
    fn async_panic_becomes_internal_error() {
        async fn boom(_req: HandlerRequest) -> HandlerResult {
            panic!("async failure")
        }
        let err = dispatch(Arc::new(AsyncFn(boom))).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn async_error_keeps_its_status() {
        async fn conflict(_req: HandlerRequest) -> HandlerResult {
            Err(HttpError::from_status(409, "already exists"))
        }
        let err = dispatch(Arc::new(AsyncFn(conflict))).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn registry_lookup() {
        let controllers = Controllers::new()
            .with_sync("b", |_req| Ok(HandlerResponse::no_content()))
            .with("a", |_req| async { Ok::<_, HttpError>(HandlerResponse::no_content()) });
        assert_eq!(controllers.operation_ids(), vec!["a", "b"]);
        assert!(controllers.contains("a"));
        assert!(controllers.get("missing").is_none());
    }
}
