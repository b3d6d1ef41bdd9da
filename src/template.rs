//! # SQL Templates
//!
//! Transformation scripts under `snowflake/sql/` are templates rendered against
//! one flat parameter mapping (`template_params.json`), loaded once at start.
//!
//! Rendering uses `tera` with autoescaping off, so parameter values land in the SQL
//! exactly as configured.

use crate::error::{EtlError, Result};
use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateParams(serde_json::Map<String, serde_json::Value>);

impl TemplateParams {
    pub fn new(params: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(params)
    }

    /// Parse the parameter file; anything but a JSON object is rejected
    pub fn from_json(raw: &str) -> Result<Self> {
        match serde_json::from_str(raw) {
            Ok(serde_json::Value::Object(map)) => Ok(Self::new(map)),
            Ok(other) => Err(EtlError::configuration(
                "template_params",
                format!("expected a JSON object, found {}", json_kind(&other)),
            )),
            Err(e) => Err(EtlError::configuration("template_params", e.to_string())),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| EtlError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        for (key, value) in &self.0 {
            context.insert(key.as_str(), value);
        }
        context
    }

    /// Render template source; `name` only labels errors
    pub fn render(&self, name: &str, source: &str) -> Result<String> {
        Tera::one_off(source, &self.context(), false)
            .map_err(|e| EtlError::template(name, error_chain(&e)))
    }

    /// Read and render a template file
    pub fn render_file(&self, path: &Path) -> Result<String> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| EtlError::io(format!("read template {}", path.display()), e))?;
        self.render(&path.display().to_string(), &source)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// tera keeps the useful part of a failure in the source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
