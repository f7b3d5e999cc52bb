use std::io::Read;
use std::sync::Arc;

use http::Method;
use may_minihttp::Request;
use tracing::{debug, warn};

use crate::dispatcher::{HandlerRequest, HeaderVec};
use crate::error::HttpError;
use crate::ids::RequestId;
use crate::router::ParamVec;

/// Decode an `application/x-www-form-urlencoded` query string.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// Read a request body to the end.
///
/// A body that cannot be read in full is a client error: the request is not
/// routed with a truncated body.
pub fn read_body(mut body: impl Read) -> Result<Vec<u8>, HttpError> {
    let mut raw_body = Vec::new();
    body.read_to_end(&mut raw_body)
        .map_err(|e| HttpError::bad_request(format!("failed to read request body: {e}")))?;
    Ok(raw_body)
}

/// Convert a may_minihttp request into a [`HandlerRequest`].
///
/// The body is read as raw bytes; JSON parsing happens in the body parser
/// stage so malformed bodies fail through the error handler. An
/// `x-request-id` header carrying a valid ULID is reused as the request id.
///
/// # Errors
///
/// Returns a `400` when the body cannot be read.
pub fn parse_request(req: Request) -> Result<HandlerRequest, HttpError> {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or_else(|_| {
        warn!(method = %req.method(), "Unparseable request method, treating as GET");
        Method::GET
    });
    let mut request = HandlerRequest::new(method, req.path());

    let mut headers = HeaderVec::new();
    for h in req.headers() {
        headers.push((
            Arc::from(h.name),
            String::from_utf8_lossy(h.value).into_owned(),
        ));
    }
    request.headers = headers;
    request.request_id = RequestId::from_header_or_new(request.get_header("x-request-id"));

    request.raw_body = read_body(req.body()).map_err(|err| {
        warn!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            error = %err,
            "Failed to read request body"
        );
        err
    })?;

    debug!(
        request_id = %request.request_id,
        method = %request.method,
        path = %request.path,
        header_count = request.headers.len(),
        query_count = request.query_params.len(),
        body_bytes = request.raw_body.len(),
        "HTTP request parsed"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("x=1&y=two%20words&x=3");
        assert_eq!(q.len(), 3);
        assert_eq!(q[1].1, "two words");
        let last_x = q.iter().rfind(|(k, _)| k.as_ref() == "x").map(|(_, v)| v.as_str());
        assert_eq!(last_x, Some("3"));
    }

    #[test]
    fn empty_query_has_no_params() {
        assert!(parse_query_params("").is_empty());
    }

    struct BrokenBody;

    impl Read for BrokenBody {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    #[test]
    fn read_body_returns_all_bytes() {
        let body = read_body(&b"{\"name\":\"Rex\"}"[..]).unwrap();
        assert_eq!(body, b"{\"name\":\"Rex\"}");
    }

    #[test]
    fn unreadable_body_is_bad_request() {
        let err = read_body(BrokenBody).unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
        assert!(err.message().contains("reset by peer"), "{}", err.message());
    }
}
