//! Echo controllers, used by `specrouter serve` to run a document without
//! application code.

use serde_json::json;

use crate::dispatcher::{Controllers, HandlerRequest, HandlerResponse, HandlerResult};
use crate::spec::ApiDocument;

/// Answer with what the router saw: operation, method, path, captures,
/// query and parsed body.
pub async fn echo_handler(req: HandlerRequest) -> HandlerResult {
    Ok(HandlerResponse::ok(json!({
        "handler": req.handler_name,
        "method": req.method.as_str(),
        "path": req.path,
        "params": req.path_params_map(),
        "query": req.query_params_map(),
        "body": req.body,
    })))
}

/// One [`echo_handler`] per `operationId` declared in `doc`.
#[must_use]
pub fn echo_controllers(doc: &ApiDocument) -> Controllers {
    let mut controllers = Controllers::new();
    for item in doc.paths.values() {
        for (_, operation) in item.operations() {
            if let Some(id) = operation.operation_id.as_deref().filter(|id| !id.is_empty()) {
                controllers.register(id, echo_handler);
            }
        }
    }
    controllers
}
