//! Path templates: `{name}` to `:name` translation and compiled matchers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use super::core::ParamVec;

#[allow(clippy::expect_used)]
static BRACE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.+?)\}").expect("brace parameter regex is valid"));

#[allow(clippy::expect_used)]
static COLON_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([^/.:]+)").expect("colon parameter regex is valid"));

/// Translate a document path template into router syntax.
///
/// `/pets/{petId}/toys/{toyId}` becomes `/pets/:petId/toys/:toyId`. Text
/// outside braces is left untouched.
#[must_use]
pub fn translate_path(template: &str) -> String {
    BRACE_PARAM.replace_all(template, ":${1}").into_owned()
}

/// Join a mount prefix and a path without doubling or dropping slashes.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.trim_start_matches('/');
    match (prefix.is_empty(), rest.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => prefix.to_string(),
        _ => format!("{prefix}/{rest}"),
    }
}

/// A compiled `:name` path pattern.
///
/// Exact patterns match the whole path and tolerate one trailing slash.
/// Prefix patterns match the path itself and anything below it on a segment
/// boundary (`/v1` matches `/v1` and `/v1/pets`, not `/v1pets`). Matching is
/// case-sensitive.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    params: Vec<Arc<str>>,
    prefix: bool,
}

impl PathPattern {
    pub fn exact(path: &str) -> Result<Self, regex::Error> {
        Self::compile(path, false)
    }

    pub fn prefix(path: &str) -> Result<Self, regex::Error> {
        Self::compile(path, true)
    }

    fn compile(path: &str, prefix: bool) -> Result<Self, regex::Error> {
        let body = path.trim_end_matches('/');
        let mut pattern = String::with_capacity(body.len() + 16);
        let mut params = Vec::new();
        pattern.push('^');

        let mut last = 0;
        for caps in COLON_PARAM.captures_iter(body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            pattern.push_str(&regex::escape(&body[last..whole.start()]));
            pattern.push_str("([^/]+?)");
            params.push(Arc::from(name.as_str()));
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&body[last..]));
        pattern.push_str(if prefix { "(?:/.*)?$" } else { "/?$" });

        Ok(Self {
            source: path.to_string(),
            regex: Regex::new(&pattern)?,
            params,
            prefix,
        })
    }

    /// Re-compile this pattern under a mount prefix.
    pub fn nested(&self, mount: &str) -> Result<Self, regex::Error> {
        Self::compile(&join_paths(mount, &self.source), self.prefix)
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.params
    }

    /// Match `path`, returning the percent-decoded captures in pattern order.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut out = ParamVec::new();
        for (i, name) in self.params.iter().enumerate() {
            let Some(raw) = caps.get(i + 1) else {
                continue;
            };
            let value = urlencoding::decode(raw.as_str())
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.as_str().to_string());
            out.push((Arc::clone(name), value));
        }
        Some(out)
    }
}
