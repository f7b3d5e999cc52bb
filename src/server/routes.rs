use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use tracing::{debug, info};

use crate::dispatcher::{AsyncDispatch, Controllers, HandlerRequest};
use crate::error::{BuildError, HttpError};
use crate::router::{RouteHandler, Router, StepResult};
use crate::spec::{PathRoutes, RouteMeta};
use crate::validator::ValidationIssue;
use crate::validator_cache::{BodyValidator, ValidateBody, ValidatorCache};

/// Catch-all mounted after the declared verbs of a path. Reaching it means
/// the path exists but the method does not.
pub struct MethodGuard {
    allow: String,
}

impl MethodGuard {
    #[must_use]
    pub fn new(methods: &[Method]) -> Self {
        Self {
            allow: methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Value of the `Allow` header sent with the 405.
    #[must_use]
    pub fn allow(&self) -> &str {
        &self.allow
    }
}

impl RouteHandler for MethodGuard {
    fn handle<'a>(&'a self, req: HandlerRequest) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            debug!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                allow = %self.allow,
                "Method not allowed"
            );
            Err(HttpError::method_not_allowed().with_header("Allow", self.allow.clone()))
        })
    }
}

/// Mount every operation of one path on `router`, then its [`MethodGuard`].
///
/// Each operation gets two stages: body validation with its precompiled
/// validator (`validators[i]` belongs to `group.routes[i]`), then the
/// controller. Fails on the first operation without an `operationId` or
/// without a registered controller.
pub fn mount_path(
    router: &mut Router,
    group: &PathRoutes,
    validators: &[Arc<BodyValidator>],
    controllers: &Controllers,
) -> Result<(), BuildError> {
    for (route, validator) in group.routes.iter().zip(validators) {
        let operation_id = route.handler_name.as_deref().ok_or_else(|| {
            BuildError::MissingOperationId {
                method: route.method.clone(),
                path: route.spec_path.clone(),
            }
        })?;
        let controller = controllers.get(operation_id).ok_or_else(|| {
            BuildError::MissingController {
                operation_id: operation_id.to_string(),
            }
        })?;

        let stages = vec![
            Arc::new(ValidateBody::new(operation_id, Arc::clone(validator)))
                as Arc<dyn RouteHandler>,
            Arc::new(AsyncDispatch::new(operation_id, controller)) as Arc<dyn RouteHandler>,
        ];
        router.route(route.method.clone(), &group.path_pattern, stages)?;
        info!(
            method = %route.method,
            path = %route.spec_path,
            pattern = %group.path_pattern,
            operation_id = %operation_id,
            "Route mounted"
        );
    }

    let guard = Arc::new(MethodGuard::new(&group.methods())) as Arc<dyn RouteHandler>;
    router.all(&group.path_pattern, vec![guard])?;
    Ok(())
}

/// `paths./pets.post`, the location used in validation issues.
#[must_use]
pub fn route_location(route: &RouteMeta) -> String {
    format!(
        "paths.{}.{}",
        route.spec_path,
        route.method.as_str().to_ascii_lowercase()
    )
}

/// Compile the body validator of every route of `group`, in route order.
///
/// # Errors
///
/// One `InvalidSchema` issue per schema that does not compile.
pub fn compile_validators(
    group: &PathRoutes,
    cache: &mut ValidatorCache,
) -> Result<Vec<Arc<BodyValidator>>, Vec<ValidationIssue>> {
    let mut validators = Vec::with_capacity(group.routes.len());
    let mut issues = Vec::new();
    for route in &group.routes {
        match cache.compile(route.request_schema.as_ref()) {
            Ok(validator) => validators.push(validator),
            Err(message) => issues.push(ValidationIssue::new(
                route_location(route),
                "InvalidSchema",
                message,
            )),
        }
    }
    if issues.is_empty() {
        Ok(validators)
    } else {
        Err(issues)
    }
}
