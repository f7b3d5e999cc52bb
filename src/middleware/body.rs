use serde_json::Value;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::HttpError;

/// Default body size limit, 100 KiB.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// Parses JSON request bodies into [`HandlerRequest::body`].
///
/// Only bodies declared as JSON (`application/json` or a `+json` suffix) are
/// parsed; anything else is left as raw bytes with `body` unset.
pub struct JsonBody {
    limit: usize,
}

impl JsonBody {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for JsonBody {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LIMIT)
    }
}

impl Middleware for JsonBody {
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HttpError> {
        if req.body.is_some() || req.raw_body.is_empty() {
            return Ok(None);
        }
        if !req.get_header("content-type").is_some_and(is_json_content_type) {
            return Ok(None);
        }
        if req.raw_body.len() > self.limit {
            return Err(HttpError::payload_too_large(format!(
                "request entity too large: {} bytes exceeds the {} byte limit",
                req.raw_body.len(),
                self.limit
            )));
        }
        let value: Value = serde_json::from_slice(&req.raw_body)
            .map_err(|e| HttpError::bad_request(format!("malformed JSON body: {e}")))?;
        req.body = Some(value);
        Ok(None)
    }
}

/// `application/json`, `application/json; charset=utf-8`, `application/merge-patch+json`.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media == "application/json" || media.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use serde_json::json;

    fn post(body: &str, content_type: &str) -> HandlerRequest {
        HandlerRequest::new(Method::POST, "/pets")
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    #[test]
    fn parses_json_bodies() {
        let mut req = post(r#"{"name":"Rex"}"#, "application/json; charset=utf-8");
        JsonBody::default().before(&mut req).unwrap();
        assert_eq!(req.body, Some(json!({ "name": "Rex" })));
    }

    #[test]
    fn ignores_other_content_types() {
        let mut req = post("name=Rex", "application/x-www-form-urlencoded");
        JsonBody::default().before(&mut req).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let mut req = post("{not json", "application/json");
        let err = JsonBody::default().before(&mut req).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversized_body_is_rejected() {
        let mut req = post(r#"{"name":"a long name"}"#, "application/json");
        let err = JsonBody::new(8).before(&mut req).unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn json_suffix_types() {
        assert!(is_json_content_type("application/merge-patch+json"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(!is_json_content_type("text/plain"));
    }
}
