use super::error_handler::{ErrorHandler, JsonErrorHandler};
use super::request::parse_request;
use super::response::write_handler_response;
use super::routes::{compile_validators, mount_path};
use crate::dispatcher::{Controllers, HandlerRequest, HandlerResponse};
use crate::error::{BuildError, HttpError};
use crate::ids::RequestId;
use crate::middleware::{JsonBody, Middleware, MiddlewareStage, DEFAULT_BODY_LIMIT};
use crate::router::Router;
use crate::spec::{build_routes, ApiDocument, RouteMeta};
use crate::validator::fail_if_issues;
use crate::validator_cache::ValidatorCache;
use may_minihttp::{HttpService, Request, Response};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Construction options for [`AppService::build`].
#[derive(Clone)]
pub struct RouterOptions {
    /// Run before anything else, body parsing included, for every request.
    pub pre: Vec<Arc<dyn Middleware>>,
    /// Run only for requests no route answered.
    pub post: Vec<Arc<dyn Middleware>>,
    pub error_handler: Arc<dyn ErrorHandler>,
    /// Largest JSON body accepted, in bytes.
    pub body_limit: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
            error_handler: Arc::new(JsonErrorHandler),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pre(mut self, middleware: impl Middleware + 'static) -> Self {
        self.pre.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn with_post(mut self, middleware: impl Middleware + 'static) -> Self {
        self.post.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// The assembled route table, ready to serve.
///
/// Layer order: `pre` middleware, then the document's routes mounted under
/// its `basePath` (JSON body parser first, then paths in specificity order),
/// then `post` middleware. Cloning is cheap; clones share the table.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    pre: Arc<[Arc<dyn Middleware>]>,
    error_handler: Arc<dyn ErrorHandler>,
    routes: Arc<[RouteMeta]>,
    base_path: Arc<str>,
}

impl AppService {
    /// Build the route table for `doc`.
    ///
    /// All or nothing: structural validation and schema compilation run
    /// before any route is mounted, and no service is returned if any step
    /// fails.
    ///
    /// # Errors
    ///
    /// - [`BuildError::InvalidSpec`] with every structural issue found;
    /// - [`BuildError::MissingOperationId`] for an operation without one;
    /// - [`BuildError::MissingController`] for an id with no controller.
    pub fn build(
        doc: &ApiDocument,
        controllers: &Controllers,
        options: RouterOptions,
    ) -> Result<Self, BuildError> {
        let groups = build_routes(doc)?;

        let mut cache = ValidatorCache::new(&doc.definitions);
        let mut compiled = Vec::with_capacity(groups.len());
        let mut issues = Vec::new();
        for group in &groups {
            match compile_validators(group, &mut cache) {
                Ok(validators) => compiled.push(validators),
                Err(found) => issues.extend(found),
            }
        }
        fail_if_issues(issues)?;

        let mut api = Router::new();
        api.use_stage(
            "/",
            Arc::new(MiddlewareStage(Arc::new(JsonBody::new(options.body_limit)))),
        )?;
        for (group, validators) in groups.iter().zip(&compiled) {
            mount_path(&mut api, group, validators, controllers)?;
        }

        let mut router = Router::new();
        for middleware in &options.pre {
            router.use_stage("/", Arc::new(MiddlewareStage(Arc::clone(middleware))))?;
        }
        router.nest(doc.base_path(), api)?;
        for middleware in &options.post {
            router.use_stage("/", Arc::new(MiddlewareStage(Arc::clone(middleware))))?;
        }

        let routes: Vec<RouteMeta> = groups.into_iter().flat_map(|g| g.routes).collect();
        let declared: HashSet<&str> = routes
            .iter()
            .filter_map(|r| r.handler_name.as_deref())
            .collect();
        for operation_id in controllers.operation_ids() {
            if !declared.contains(operation_id) {
                warn!(
                    operation_id = %operation_id,
                    "Controller registered for an unknown operationId"
                );
            }
        }

        info!(
            base_path = %doc.base_path(),
            routes = routes.len(),
            layers = router.len(),
            validators = cache.len(),
            pre = options.pre.len(),
            post = options.post.len(),
            "Router ready"
        );

        Ok(Self {
            router: Arc::new(router),
            pre: options.pre.into(),
            error_handler: options.error_handler,
            routes: routes.into(),
            base_path: Arc::from(doc.base_path()),
        })
    }

    /// Run one request through the route table.
    ///
    /// Unanswered requests become `404 Cannot <METHOD> <path>`. Every failure
    /// is rendered by the error handler. `pre` middleware `after` hooks run
    /// last, in reverse order.
    pub async fn handle(&self, req: HandlerRequest) -> HandlerResponse {
        let start = Instant::now();
        let snapshot = (!self.pre.is_empty()).then(|| req.clone());
        let request_id = req.request_id;
        let method = req.method.clone();
        let path = req.path.clone();

        let mut res = match self.router.dispatch(req).await {
            Ok(Some(res)) => res,
            Ok(None) => {
                let err = HttpError::not_found(format!("Cannot {method} {path}"));
                self.render_error(request_id, &method, &path, &err)
            }
            Err(err) => self.render_error(request_id, &method, &path, &err),
        };

        if let Some(req) = snapshot {
            let latency = start.elapsed();
            for middleware in self.pre.iter().rev() {
                middleware.after(&req, &mut res, latency);
            }
        }
        res
    }

    fn render_error(
        &self,
        request_id: RequestId,
        method: &http::Method,
        path: &str,
        err: &HttpError,
    ) -> HandlerResponse {
        if err.status().is_server_error() {
            error!(
                %request_id,
                %method,
                path = %path,
                status = err.status().as_u16(),
                error = %err,
                "Request failed"
            );
        } else {
            warn!(
                %request_id,
                %method,
                path = %path,
                status = err.status().as_u16(),
                error = %err,
                "Request rejected"
            );
        }
        self.error_handler.render(err)
    }

    /// Every mounted (path, verb) route, in mounting order.
    #[must_use]
    pub fn routes(&self) -> &[RouteMeta] {
        &self.routes
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match parse_request(req) {
            Ok(request) => futures::executor::block_on(self.handle(request)),
            Err(err) => self.error_handler.render(&err),
        };
        write_handler_response(res, response);
        Ok(())
    }
}
