use serde_json::{Map, Value};

use crate::dispatcher::HandlerResponse;
use crate::error::HttpError;

/// Turns every request failure into the response the client sees.
///
/// [`AppService`](super::AppService) calls exactly one error handler per
/// failed request, whichever gate failed.
pub trait ErrorHandler: Send + Sync {
    fn render(&self, err: &HttpError) -> HandlerResponse;
}

/// Renders `{ name, message?, status, statusCode, expose, ...fields }` as JSON
/// with the error's status and headers.
///
/// `message` is only included when the error is exposable (4xx), so 5xx
/// responses never carry internal error text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn render(&self, err: &HttpError) -> HandlerResponse {
        let status = err.status().as_u16();
        let mut body = Map::new();
        body.insert("name".into(), Value::from(err.name()));
        if err.expose() {
            body.insert("message".into(), Value::from(err.message()));
        }
        body.insert("status".into(), Value::from(status));
        body.insert("statusCode".into(), Value::from(status));
        body.insert("expose".into(), Value::from(err.expose()));
        for (key, value) in err.fields() {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let mut res = HandlerResponse::json(status, Value::Object(body));
        for (name, value) in err.headers() {
            res.set_header(name, value.clone());
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_client_errors_with_message() {
        let err = HttpError::bad_request("body/name: 123 is not of type \"string\"")
            .with_field("operationId", "createPets");
        let res = JsonErrorHandler.render(&err);
        assert_eq!(res.status, 400);
        assert_eq!(
            res.body,
            json!({
                "name": "BadRequestError",
                "message": "body/name: 123 is not of type \"string\"",
                "status": 400,
                "statusCode": 400,
                "expose": true,
                "operationId": "createPets"
            })
        );
    }

    #[test]
    fn hides_server_error_messages() {
        let res = JsonErrorHandler.render(&HttpError::internal("db password is hunter2"));
        assert_eq!(res.status, 500);
        assert_eq!(res.body["name"], "InternalServerError");
        assert!(res.body.get("message").is_none());
    }

    #[test]
    fn fields_do_not_override_reserved_keys() {
        let err = HttpError::from_status(409, "taken").with_field("status", 200);
        let res = JsonErrorHandler.render(&err);
        assert_eq!(res.body["status"], 409);
    }

    #[test]
    fn copies_error_headers() {
        let err = HttpError::method_not_allowed().with_header("Allow", "GET, POST");
        let res = JsonErrorHandler.render(&err);
        assert_eq!(res.status, 405);
        assert_eq!(res.get_header("allow"), Some("GET, POST"));
    }
}
