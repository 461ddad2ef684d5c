//! Structured operation requests from agent or tooling layers.

use crate::error::{UrpcError, UrpcResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static OPERATION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("operation name pattern is valid")
});

/// `{entity, source?, operation, args}` executed by `Urpc::dispatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub args: Value,
}

impl Intent {
    pub fn new(entity: impl Into<String>, operation: impl Into<String>, args: Value) -> Self {
        Self {
            entity: entity.into(),
            source: None,
            operation: operation.into(),
            args,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn from_json_str(text: &str) -> UrpcResult<Self> {
        let intent: Self = serde_json::from_str(text)
            .map_err(|err| UrpcError::bad_request(format!("invalid intent: {err}")))?;
        intent.validate()?;
        Ok(intent)
    }

    pub fn validate(&self) -> UrpcResult<()> {
        if self.entity.trim().is_empty() {
            return Err(UrpcError::bad_request("intent entity must not be blank"));
        }
        if !OPERATION_NAME.is_match(&self.operation) {
            return Err(UrpcError::bad_request(format!(
                "intent operation is invalid: `{}`",
                self.operation
            )));
        }
        if matches!(&self.source, Some(source) if source.trim().is_empty()) {
            return Err(UrpcError::bad_request("intent source must not be blank"));
        }
        Ok(())
    }
}
