use super::types::ApiDocument;
use anyhow::Context;
use std::path::Path;

/// Load a Swagger 2.0 document from a `.yaml`, `.yml` or `.json` file.
pub fn load_spec(file_path: impl AsRef<Path>) -> anyhow::Result<ApiDocument> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read spec file {}", file_path.display()))?;
    let is_json = file_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let doc = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON spec {}", file_path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML spec {}", file_path.display()))?
    };
    Ok(doc)
}

/// Parse a document held in memory. YAML is a superset of JSON, so both work.
pub fn load_spec_str(content: &str) -> anyhow::Result<ApiDocument> {
    serde_yaml::from_str(content).context("failed to parse spec")
}

/// Build a document from an already parsed JSON value.
pub fn load_spec_from_value(value: serde_json::Value) -> anyhow::Result<ApiDocument> {
    serde_json::from_value(value).context("spec does not match the Swagger 2.0 document shape")
}
