use http::Method;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A parsed Swagger 2.0 document, restricted to what routing needs.
///
/// Unknown keys (`info` details, `responses`, `securityDefinitions`, `x-*`
/// extensions) are ignored on deserialization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
    #[serde(default, deserialize_with = "de_version")]
    pub swagger: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
}

impl ApiDocument {
    /// Declared `basePath`, `/` when absent.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or("/")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_version")]
    pub version: String,
}

/// Version fields are often written unquoted in YAML (`swagger: 2.0`), which
/// parses as a number. Accept both.
fn de_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;

    impl<'de> Visitor<'de> for V {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a version string or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(format!("{v:?}"))
        }
    }

    deserializer.deserialize_any(V)
}

/// Operations declared on one path template.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// Parameters shared by every operation of this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Declared operations in mounting order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpVerb, &Operation)> {
        HttpVerb::ALL
            .into_iter()
            .filter_map(move |verb| self.operation(verb).map(|op| (verb, op)))
    }

    #[must_use]
    pub fn operation(&self, verb: HttpVerb) -> Option<&Operation> {
        match verb {
            HttpVerb::Get => self.get.as_ref(),
            HttpVerb::Put => self.put.as_ref(),
            HttpVerb::Post => self.post.as_ref(),
            HttpVerb::Delete => self.delete.as_ref(),
            HttpVerb::Options => self.options.as_ref(),
            HttpVerb::Head => self.head.as_ref(),
            HttpVerb::Patch => self.patch.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

/// A parameter as written in the document. Either inline or a `$ref` to
/// `#/parameters/<name>`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Parameter {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// HTTP verbs a Swagger 2.0 path item can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Put,
        HttpVerb::Post,
        HttpVerb::Delete,
        HttpVerb::Options,
        HttpVerb::Head,
        HttpVerb::Patch,
    ];

    #[must_use]
    pub fn as_method(self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Post => Method::POST,
            HttpVerb::Delete => Method::DELETE,
            HttpVerb::Options => Method::OPTIONS,
            HttpVerb::Head => Method::HEAD,
            HttpVerb::Patch => Method::PATCH,
        }
    }

    /// Lower-case key used in the document.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Put => "put",
            HttpVerb::Post => "post",
            HttpVerb::Delete => "delete",
            HttpVerb::Options => "options",
            HttpVerb::Head => "head",
            HttpVerb::Patch => "patch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Body,
    Query,
    Path,
    Header,
    FormData,
}

impl ParameterLocation {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "body" => Some(ParameterLocation::Body),
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "formData" => Some(ParameterLocation::FormData),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterLocation::Body => "body",
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::FormData => "formData",
        };
        write!(f, "{s}")
    }
}

/// One resolved parameter of a route.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
}

/// One (path, verb) entry of the route table.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Template as written in the document, e.g. `/pets/{petId}`.
    pub spec_path: String,
    /// Template in router syntax, e.g. `/pets/:petId`.
    pub path_pattern: String,
    /// The operation's `operationId`; `None` when the document omits it.
    pub handler_name: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    /// Schema of the `in: body` parameter, if one is declared.
    pub request_schema: Option<Value>,
    pub base_path: String,
}

/// All routes declared on one path template, in mounting order.
#[derive(Debug, Clone)]
pub struct PathRoutes {
    pub spec_path: String,
    pub path_pattern: String,
    pub routes: Vec<RouteMeta>,
}

impl PathRoutes {
    /// Methods declared on this path, in mounting order.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.routes.iter().map(|r| r.method.clone()).collect()
    }
}
