use super::types::{
    ApiDocument, Operation, Parameter, ParameterLocation, ParameterMeta, PathItem, PathRoutes,
    RouteMeta,
};
use crate::error::BuildError;
use crate::router::translate_path;
use crate::validator::{fail_if_issues, ValidationIssue};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

const SUPPORTED_VERSION: &str = "2.0";
const PARAMETER_REF_PREFIX: &str = "#/parameters/";

/// Project a document into per-path route groups.
///
/// Runs the structural checks first and reports every issue found, not just
/// the first one. Groups come back in mounting order: at the first segment
/// where two templates differ a literal segment sorts before a `{param}`
/// segment, otherwise templates sort lexically.
///
/// An operation without `operationId` is not a structural issue here; it
/// yields a [`RouteMeta`] with `handler_name: None` and fails later, when the
/// route is mounted.
pub fn build_routes(doc: &ApiDocument) -> Result<Vec<PathRoutes>, BuildError> {
    let mut issues = Vec::new();

    if doc.swagger != SUPPORTED_VERSION {
        issues.push(ValidationIssue::new(
            "swagger",
            "UnsupportedVersion",
            format!(
                "expected swagger version \"{SUPPORTED_VERSION}\", found \"{}\"",
                doc.swagger
            ),
        ));
    }

    let base_path = doc.base_path();
    if !base_path.starts_with('/') {
        issues.push(ValidationIssue::new(
            "basePath",
            "InvalidBasePath",
            format!("basePath must start with '/': {base_path}"),
        ));
    }

    let mut seen_ids: HashMap<&str, String> = HashMap::new();
    let mut groups = Vec::with_capacity(doc.paths.len());

    for (spec_path, item) in &doc.paths {
        let location = format!("paths.{spec_path}");
        if !spec_path.starts_with('/') {
            issues.push(ValidationIssue::new(
                &location,
                "InvalidPath",
                "path must start with '/'",
            ));
            continue;
        }
        let template_params = match template_params(spec_path) {
            Ok(names) => names,
            Err(message) => {
                issues.push(ValidationIssue::new(&location, "InvalidPathTemplate", message));
                continue;
            }
        };

        let path_pattern = translate_path(spec_path);
        let mut routes = Vec::new();
        for (verb, operation) in item.operations() {
            let op_location = format!("{location}.{}", verb.as_str());
            let handler_name = operation
                .operation_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            if let Some(id) = operation.operation_id.as_deref().filter(|id| !id.is_empty()) {
                if let Some(first) = seen_ids.get(id) {
                    issues.push(ValidationIssue::new(
                        &op_location,
                        "DuplicateOperationId",
                        format!("operationId `{id}` is already used by {first}"),
                    ));
                } else {
                    seen_ids.insert(id, op_location.clone());
                }
            }

            let parameters = resolve_parameters(doc, item, operation, &op_location, &mut issues);
            check_path_parameters(&template_params, &parameters, &op_location, &mut issues);
            let request_schema = check_body_parameters(&parameters, &op_location, &mut issues);

            routes.push(RouteMeta {
                method: verb.as_method(),
                spec_path: spec_path.clone(),
                path_pattern: path_pattern.clone(),
                handler_name,
                parameters,
                request_schema,
                base_path: base_path.to_string(),
            });
        }

        groups.push(PathRoutes {
            spec_path: spec_path.clone(),
            path_pattern,
            routes,
        });
    }

    fail_if_issues(issues)?;
    groups.sort_by(|a, b| compare_specificity(&a.spec_path, &b.spec_path));
    Ok(groups)
}

/// Names of the `{param}` segments of a template, in order.
///
/// Fails on unbalanced or nested braces and on empty names.
pub fn template_params(template: &str) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    let mut current: Option<String> = None;
    for ch in template.chars() {
        match (ch, current.as_mut()) {
            ('{', None) => current = Some(String::new()),
            ('{', Some(_)) => return Err(format!("nested '{{' in {template}")),
            ('}', None) => return Err(format!("unmatched '}}' in {template}")),
            ('}', Some(name)) => {
                if name.is_empty() {
                    return Err(format!("empty parameter name in {template}"));
                }
                names.push(std::mem::take(name));
                current = None;
            }
            (c, Some(name)) => name.push(c),
            (_, None) => {}
        }
    }
    if current.is_some() {
        return Err(format!("unclosed '{{' in {template}"));
    }
    Ok(names)
}

/// Literal segments sort before `{param}` segments at the first difference.
pub fn compare_specificity(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/');
    let mut right = b.split('/');
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) if l == r => continue,
            (Some(l), Some(r)) => {
                return match (is_param_segment(l), is_param_segment(r)) {
                    (false, true) => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    _ => l.cmp(r),
                };
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn is_param_segment(segment: &str) -> bool {
    segment.contains('{')
}

/// Merge path-level and operation-level parameters, resolving `$ref`s.
/// Operation-level entries replace path-level ones with the same `(name, in)`.
fn resolve_parameters(
    doc: &ApiDocument,
    item: &PathItem,
    operation: &Operation,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = Vec::new();
    let declared = item.parameters.iter().chain(operation.parameters.iter());

    for (index, raw) in declared.enumerate() {
        let param_location = format!("{location}.parameters[{index}]");
        let Some(param) = resolve_parameter_ref(doc, raw, &param_location, issues) else {
            continue;
        };
        let Some(name) = param.name.as_deref().filter(|n| !n.is_empty()) else {
            issues.push(ValidationIssue::new(
                &param_location,
                "MissingParameterName",
                "parameter has no name",
            ));
            continue;
        };
        let raw_in = param.location.as_deref().unwrap_or("");
        let Some(param_in) = ParameterLocation::parse(raw_in) else {
            issues.push(ValidationIssue::new(
                &param_location,
                "InvalidParameterLocation",
                format!("unknown parameter location `{raw_in}` for `{name}`"),
            ));
            continue;
        };

        let meta = ParameterMeta {
            name: name.to_string(),
            location: param_in,
            required: param.required,
            schema: param.schema.clone(),
        };
        match merged
            .iter_mut()
            .find(|m| m.name == meta.name && m.location == meta.location)
        {
            Some(existing) => *existing = meta,
            None => merged.push(meta),
        }
    }
    merged
}

fn resolve_parameter_ref<'a>(
    doc: &'a ApiDocument,
    param: &'a Parameter,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a Parameter> {
    let Some(reference) = param.reference.as_deref() else {
        return Some(param);
    };
    let resolved = reference
        .strip_prefix(PARAMETER_REF_PREFIX)
        .and_then(|name| doc.parameters.get(name));
    if resolved.is_none() {
        issues.push(ValidationIssue::new(
            location,
            "UnresolvedReference",
            format!("cannot resolve parameter reference `{reference}`"),
        ));
    }
    resolved
}

fn check_path_parameters(
    template_params: &[String],
    parameters: &[ParameterMeta],
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for name in template_params {
        let declared = parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Path && &p.name == name);
        match declared {
            None => issues.push(ValidationIssue::new(
                location,
                "MissingPathParameter",
                format!("path parameter `{name}` is not declared"),
            )),
            Some(p) if !p.required => issues.push(ValidationIssue::new(
                location,
                "MissingPathParameter",
                format!("path parameter `{name}` must be required"),
            )),
            Some(_) => {}
        }
    }
    for p in parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
    {
        if !template_params.contains(&p.name) {
            issues.push(ValidationIssue::new(
                location,
                "UnknownPathParameter",
                format!("path parameter `{}` does not appear in the path", p.name),
            ));
        }
    }
}

/// Returns the schema of the single `in: body` parameter, if any.
fn check_body_parameters(
    parameters: &[ParameterMeta],
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let bodies: Vec<&ParameterMeta> = parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Body)
        .collect();

    if bodies.len() > 1 {
        issues.push(ValidationIssue::new(
            location,
            "MultipleBodyParameters",
            format!("{} body parameters declared, at most one is allowed", bodies.len()),
        ));
    }
    if !bodies.is_empty()
        && parameters
            .iter()
            .any(|p| p.location == ParameterLocation::FormData)
    {
        issues.push(ValidationIssue::new(
            location,
            "BodyAndFormData",
            "body and formData parameters cannot be combined",
        ));
    }

    let body = bodies.first()?;
    if body.schema.is_none() {
        issues.push(ValidationIssue::new(
            location,
            "MissingBodySchema",
            format!("body parameter `{}` has no schema", body.name),
        ));
    }
    body.schema.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::load_spec_from_value;
    use http::Method;
    use serde_json::json;

    fn doc(value: Value) -> ApiDocument {
        load_spec_from_value(value).unwrap()
    }

    fn kinds(err: &BuildError) -> Vec<&str> {
        err.issues().iter().map(|i| i.kind.as_str()).collect()
    }

    #[test]
    fn projects_operations_in_verb_order() {
        let d = doc(json!({
            "swagger": "2.0",
            "basePath": "/v1",
            "paths": {
                "/pets": {
                    "post": {
                        "operationId": "createPets",
                        "parameters": [
                            { "in": "body", "name": "pet", "schema": { "type": "object" } }
                        ]
                    },
                    "get": { "operationId": "listPets" }
                }
            }
        }));
        let groups = build_routes(&d).unwrap();
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.methods(), vec![Method::GET, Method::POST]);
        assert_eq!(group.routes[0].handler_name.as_deref(), Some("listPets"));
        assert!(group.routes[0].request_schema.is_none());
        assert_eq!(group.routes[1].request_schema, Some(json!({ "type": "object" })));
        assert_eq!(group.routes[1].base_path, "/v1");
    }

    #[test]
    fn translates_path_templates() {
        let d = doc(json!({
            "swagger": "2.0",
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "showPetById",
                        "parameters": [{ "in": "path", "name": "petId", "required": true }]
                    }
                }
            }
        }));
        let groups = build_routes(&d).unwrap();
        assert_eq!(groups[0].path_pattern, "/pets/:petId");
        assert_eq!(groups[0].routes[0].spec_path, "/pets/{petId}");
    }

    #[test]
    fn missing_operation_id_is_left_for_mounting() {
        let d = doc(json!({ "swagger": "2.0", "paths": { "/pets": { "get": {} } } }));
        let groups = build_routes(&d).unwrap();
        assert!(groups[0].routes[0].handler_name.is_none());
    }

    #[test]
    fn operation_parameters_override_path_parameters() {
        let d = doc(json!({
            "swagger": "2.0",
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        { "in": "path", "name": "petId", "required": true },
                        { "in": "query", "name": "verbose", "required": false }
                    ],
                    "get": {
                        "operationId": "showPetById",
                        "parameters": [{ "in": "query", "name": "verbose", "required": true }]
                    }
                }
            }
        }));
        let groups = build_routes(&d).unwrap();
        let params = &groups[0].routes[0].parameters;
        assert_eq!(params.len(), 2);
        let verbose = params.iter().find(|p| p.name == "verbose").unwrap();
        assert!(verbose.required);
    }

    #[test]
    fn resolves_shared_parameter_refs() {
        let d = doc(json!({
            "swagger": "2.0",
            "parameters": {
                "petId": { "in": "path", "name": "petId", "required": true }
            },
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "showPetById",
                        "parameters": [{ "$ref": "#/parameters/petId" }]
                    }
                }
            }
        }));
        let groups = build_routes(&d).unwrap();
        assert_eq!(groups[0].routes[0].parameters[0].name, "petId");
    }

    #[test]
    fn literal_segments_sort_before_params() {
        let d = doc(json!({
            "swagger": "2.0",
            "paths": {
                "/pets/{id}": {
                    "get": {
                        "operationId": "showPet",
                        "parameters": [{ "in": "path", "name": "id", "required": true }]
                    }
                },
                "/pets/~archive": { "get": { "operationId": "archive" } },
                "/pets": { "get": { "operationId": "listPets" } }
            }
        }));
        let order: Vec<String> = build_routes(&d)
            .unwrap()
            .into_iter()
            .map(|g| g.spec_path)
            .collect();
        assert_eq!(order, vec!["/pets", "/pets/~archive", "/pets/{id}"]);
    }

    #[test]
    fn reports_every_issue() {
        let d = doc(json!({
            "swagger": "3.0",
            "basePath": "v1",
            "paths": {
                "pets": { "get": { "operationId": "a" } },
                "/pets/{id": { "get": { "operationId": "b" } },
                "/owners/{ownerId}": {
                    "get": {
                        "operationId": "c",
                        "parameters": [{ "in": "path", "name": "other", "required": true }]
                    }
                },
                "/things": {
                    "get": { "operationId": "c" },
                    "post": {
                        "operationId": "d",
                        "parameters": [
                            { "in": "body", "name": "one", "schema": {} },
                            { "in": "body", "name": "two" },
                            { "in": "formData", "name": "f" },
                            { "in": "cookie", "name": "session" },
                            { "$ref": "#/parameters/nope" }
                        ]
                    }
                }
            }
        }));
        let err = build_routes(&d).unwrap_err();
        let kinds = kinds(&err);
        for expected in [
            "UnsupportedVersion",
            "InvalidBasePath",
            "InvalidPath",
            "InvalidPathTemplate",
            "MissingPathParameter",
            "UnknownPathParameter",
            "DuplicateOperationId",
            "MultipleBodyParameters",
            "BodyAndFormData",
            "InvalidParameterLocation",
            "UnresolvedReference",
        ] {
            assert!(kinds.contains(&expected), "missing {expected} in {kinds:?}");
        }
    }

    #[test]
    fn body_parameter_needs_schema() {
        let d = doc(json!({
            "swagger": "2.0",
            "paths": {
                "/pets": {
                    "post": {
                        "operationId": "createPets",
                        "parameters": [{ "in": "body", "name": "pet" }]
                    }
                }
            }
        }));
        let err = build_routes(&d).unwrap_err();
        assert_eq!(kinds(&err), vec!["MissingBodySchema"]);
    }

    #[test]
    fn template_param_parsing() {
        assert_eq!(template_params("/a/{x}/b/{y}").unwrap(), vec!["x", "y"]);
        assert!(template_params("/a/{}").is_err());
        assert!(template_params("/a/{x").is_err());
        assert!(template_params("/a/x}").is_err());
        assert!(template_params("/a/{{x}}").is_err());
    }
}
