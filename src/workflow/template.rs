//! On-disk job-description template
//!
//! The job description submitted to the engine is a JSON object mapping
//! node-id strings to node records (`{class_type, inputs}`). The node
//! classes belong to the engine, not to this service, so the graph stays
//! dynamic JSON; only the handful of patched fields are addressed by name.

use crate::error::AppError;
use serde_json::{Map, Value};
use std::path::Path;

/// A parsed job-description template, loaded once at startup and cloned
/// per request before patching.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    nodes: Map<String, Value>,
}

impl WorkflowTemplate {
    /// Read and parse the template file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::TemplateInvalid(format!(
                "Failed to read template {}: {}",
                path.display(),
                e
            ))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            AppError::TemplateInvalid(format!(
                "Template {} is not valid JSON: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_value(value)
    }

    /// Build a template from an already-parsed JSON value.
    ///
    /// The top level must be an object keyed by node-id.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(nodes) => Ok(Self { nodes }),
            other => Err(AppError::TemplateInvalid(format!(
                "Template top level must be an object of nodes, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Whether a node with this id exists in the template.
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Clone the node graph for per-request patching.
    pub fn instantiate(&self) -> Map<String, Value> {
        self.nodes.clone()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
