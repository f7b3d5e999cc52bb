//! # Schema Validator Cache Module
//!
//! Request-body validators compiled once, while the route table is built, and
//! shared read-only by every request afterwards.
//!
//! ## Overview
//!
//! - The schema of an operation's `in: body` parameter is compiled into a
//!   [`BodyValidator`]. No body parameter, or an empty schema, gives a
//!   permissive validator that accepts anything.
//! - The document's `definitions` are attached to each schema before
//!   compiling, so `#/definitions/Pet` references resolve.
//! - Identical schemas compile once. The cache belongs to one
//!   [`AppService::build`](crate::server::AppService::build) call; two routers
//!   built in the same process never share it.
//! - [`ValidateBody`] is the route stage that runs the validator and turns a
//!   failure into a single `400` listing every violation.

use crate::dispatcher::HandlerRequest;
use crate::error::HttpError;
use crate::router::{RouteHandler, Step, StepResult};
use futures::future::BoxFuture;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A compiled request-body schema.
#[derive(Debug)]
pub struct BodyValidator {
    schema: Option<JSONSchema>,
}

impl BodyValidator {
    /// A validator that accepts every body.
    #[must_use]
    pub fn permissive() -> Self {
        Self { schema: None }
    }

    #[must_use]
    pub fn is_permissive(&self) -> bool {
        self.schema.is_none()
    }

    /// Check a parsed body. A body the client did not send is checked as `{}`.
    ///
    /// On failure the message lists every violation as
    /// `body<instance path>: <message>`, joined by `, `.
    pub fn check(&self, body: Option<&Value>) -> Result<(), String> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        let empty = Value::Object(Map::new());
        let instance = body.unwrap_or(&empty);
        schema.validate(instance).map_err(|errors| {
            errors
                .map(|e| format!("body{}: {}", e.instance_path, e))
                .collect::<Vec<_>>()
                .join(", ")
        })
    }
}

/// Compiles body schemas for one route table, reusing identical ones.
pub struct ValidatorCache {
    definitions: Map<String, Value>,
    compiled: HashMap<String, Arc<BodyValidator>>,
    permissive: Arc<BodyValidator>,
}

impl ValidatorCache {
    #[must_use]
    pub fn new(definitions: &BTreeMap<String, Value>) -> Self {
        Self {
            definitions: definitions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            compiled: HashMap::new(),
            permissive: Arc::new(BodyValidator::permissive()),
        }
    }

    /// Compile `schema`, or return the validator already built for an equal one.
    pub fn compile(&mut self, schema: Option<&Value>) -> Result<Arc<BodyValidator>, String> {
        let Some(schema) = schema.filter(|s| !is_empty_schema(s)) else {
            return Ok(Arc::clone(&self.permissive));
        };
        let schema = self.with_definitions(schema);
        let key = schema.to_string();
        if let Some(existing) = self.compiled.get(&key) {
            debug!(schema = %key, "Schema validator cache hit");
            return Ok(Arc::clone(existing));
        }

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft4)
            .compile(&schema)
            .map_err(|e| e.to_string())?;
        let validator = Arc::new(BodyValidator {
            schema: Some(compiled),
        });
        self.compiled.insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    /// Number of distinct compiled schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    fn with_definitions(&self, schema: &Value) -> Value {
        let mut schema = self.resolve_root_ref(schema).clone();
        if self.definitions.is_empty() {
            return schema;
        }
        if let Value::Object(obj) = &mut schema {
            obj.entry("definitions")
                .or_insert_with(|| Value::Object(self.definitions.clone()));
        }
        schema
    }

    /// Follow a top-level `{"$ref": "#/definitions/X"}` to its definition.
    /// Draft 4 ignores keywords next to `$ref`.
    fn resolve_root_ref<'a>(&'a self, mut schema: &'a Value) -> &'a Value {
        for _ in 0..8 {
            let Some(target) = schema
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| self.definitions.get(name))
            else {
                break;
            };
            schema = target;
        }
        schema
    }
}

fn is_empty_schema(schema: &Value) -> bool {
    schema.as_object().is_some_and(Map::is_empty)
}

/// Route stage that validates the parsed body of one operation.
pub struct ValidateBody {
    operation_id: Arc<str>,
    validator: Arc<BodyValidator>,
}

impl ValidateBody {
    #[must_use]
    pub fn new(operation_id: &str, validator: Arc<BodyValidator>) -> Self {
        Self {
            operation_id: Arc::from(operation_id),
            validator,
        }
    }
}

impl RouteHandler for ValidateBody {
    fn handle<'a>(&'a self, req: HandlerRequest) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            match self.validator.check(req.body.as_ref()) {
                Ok(()) => Ok(Step::Next(req)),
                Err(message) => {
                    debug!(
                        request_id = %req.request_id,
                        operation_id = %self.operation_id,
                        errors = %message,
                        "Request body failed validation"
                    );
                    Err(HttpError::bad_request(message))
                }
            }
        })
    }
}
