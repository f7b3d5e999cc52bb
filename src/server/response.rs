use std::collections::HashSet;
use std::sync::Mutex;

use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, error};

use crate::dispatcher::HandlerResponse;
use crate::middleware::is_json_content_type;

/// Upper bound on distinct header lines kept in the intern table.
const MAX_INTERNED_HEADERS: usize = 4096;

/// may_minihttp takes header lines as `&'static str`. Lines are interned so
/// each distinct `Name: value` is allocated once, up to a fixed number of
/// lines. Past that, new lines are leaked per response instead of shared, so
/// no header is ever lost.
struct HeaderLines {
    lines: Mutex<HashSet<&'static str>>,
    capacity: usize,
}

impl HeaderLines {
    fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    fn line(&self, name: &str, value: &str) -> &'static str {
        let line = format!("{name}: {value}");
        let Ok(mut lines) = self.lines.lock() else {
            return Box::leak(line.into_boxed_str());
        };
        if let Some(existing) = lines.get(line.as_str()) {
            return existing;
        }
        let leaked: &'static str = Box::leak(line.into_boxed_str());
        if lines.len() < self.capacity {
            lines.insert(leaked);
        } else {
            debug!(header = %name, "Header intern table full, line not shared");
        }
        leaked
    }
}

static HEADER_LINES: Lazy<HeaderLines> = Lazy::new(|| HeaderLines::new(MAX_INTERNED_HEADERS));

fn header_line(name: &str, value: &str) -> &'static str {
    HEADER_LINES.line(name, value)
}

fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Write a [`HandlerResponse`] to the wire.
///
/// `Null` bodies are empty. String bodies go out as `text/plain` unless the
/// response declares a JSON content type; everything else is JSON.
pub fn write_handler_response(res: &mut Response, response: HandlerResponse) {
    res.status_code(usize::from(response.status), status_reason(response.status));

    let content_type = response.get_header("content-type").map(str::to_string);
    for (name, value) in &response.headers {
        res.header(header_line(name, value));
    }

    let declared_json = content_type.as_deref().is_some_and(is_json_content_type);
    match response.body {
        Value::Null => {}
        Value::String(s) if !declared_json => {
            if content_type.is_none() {
                res.header("Content-Type: text/plain");
            }
            res.body_vec(s.into_bytes());
        }
        other => {
            if content_type.is_none() {
                res.header("Content-Type: application/json");
            }
            match serde_json::to_vec(&other) {
                Ok(bytes) => {
                    res.body_vec(bytes);
                }
                Err(e) => error!(error = %e, "Failed to serialize response body"),
            }
        }
    }
}
