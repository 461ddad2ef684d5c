//! Field metadata declarations.

use crate::error::{UrpcError, UrpcResult};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::sync::Arc;

static TRAILING_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\W*$").expect("trailing identifier pattern is valid")
});

/// Semantic field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Record,
    /// Named operation declared on the entity, not a data field.
    Action,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Array => "array",
            Self::Record => "record",
            Self::Action => "action",
        }
    }

    /// Whether the kind may carry a related entity target.
    pub fn is_relation(self) -> bool {
        matches!(self, Self::Array | Self::Record)
    }
}

impl FromStr for FieldKind {
    type Err = UrpcError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "array" => Ok(Self::Array),
            "record" => Ok(Self::Record),
            "action" => Ok(Self::Action),
            other => Err(UrpcError::bad_request(format!(
                "unknown field type `{other}`; expected string|number|boolean|date|array|record|action"
            ))),
        }
    }
}

/// Lazily resolved reference to a related entity.
///
/// The resolver runs only when a schema is generated, so entity definitions
/// may reference each other in cycles.
#[derive(Clone)]
pub struct RelationTarget {
    source_text: String,
    resolve: Arc<dyn Fn() -> UrpcResult<String> + Send + Sync>,
}

impl RelationTarget {
    /// `source_text` is the declaration text used as a fallback type name
    /// when `resolve` fails.
    pub fn new<F>(source_text: impl Into<String>, resolve: F) -> Self
    where
        F: Fn() -> UrpcResult<String> + Send + Sync + 'static,
    {
        Self {
            source_text: source_text.into(),
            resolve: Arc::new(resolve),
        }
    }

    /// Target known by name up front.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let resolved = name.clone();
        Self::new(name, move || Ok(resolved.clone()))
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Resolves the related entity name.
    ///
    /// Falls back to the trailing identifier of the declaration text when the
    /// resolver fails; the raw text is used when no identifier is present.
    pub fn resolve_name(&self) -> String {
        match (self.resolve)() {
            Ok(name) => name,
            Err(err) => {
                let fallback = trailing_identifier(&self.source_text)
                    .unwrap_or_else(|| self.source_text.trim().to_string());
                warn!(
                    "event=relation_resolve_fallback module=schema status=error fallback={} error={}",
                    fallback, err
                );
                fallback
            }
        }
    }
}

impl Debug for RelationTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationTarget")
            .field("source_text", &self.source_text)
            .finish_non_exhaustive()
    }
}

/// Declares a lazy relation to an [`Entity`](crate::schema::Entity) type.
#[macro_export]
macro_rules! relation {
    ($target:ty) => {
        $crate::schema::RelationTarget::new(stringify!($target), || {
            Ok(<$target as $crate::schema::Entity>::NAME.to_string())
        })
    };
}

pub(crate) fn trailing_identifier(text: &str) -> Option<String> {
    TRAILING_IDENTIFIER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

/// Metadata declared for one entity property.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub kind: FieldKind,
    pub optional: bool,
    pub description: Option<String>,
    /// Related entity for array/record fields.
    pub target: Option<RelationTarget>,
    /// Parameter schema for action fields.
    pub params: Option<Value>,
    /// Return descriptor for action fields.
    pub returns: Option<Value>,
}

impl FieldMetadata {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: false,
            description: None,
            target: None,
            params: None,
            returns: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::of(FieldKind::Date)
    }

    pub fn array(target: RelationTarget) -> Self {
        Self {
            target: Some(target),
            ..Self::of(FieldKind::Array)
        }
    }

    pub fn record(target: RelationTarget) -> Self {
        Self {
            target: Some(target),
            ..Self::of(FieldKind::Record)
        }
    }

    /// Array of plain values with no related entity.
    pub fn list() -> Self {
        Self::of(FieldKind::Array)
    }

    /// Free-form object with no related entity.
    pub fn object() -> Self {
        Self::of(FieldKind::Record)
    }

    pub fn action(params: Value, returns: Value) -> Self {
        Self {
            params: Some(params),
            returns: Some(returns),
            ..Self::of(FieldKind::Action)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks kind-specific invariants.
    pub fn validate(&self) -> UrpcResult<()> {
        if self.target.is_some() && !self.kind.is_relation() {
            return Err(UrpcError::bad_request(format!(
                "field type `{}` cannot declare a relation target",
                self.kind.as_str()
            )));
        }
        if (self.params.is_some() || self.returns.is_some()) && self.kind != FieldKind::Action {
            return Err(UrpcError::bad_request(format!(
                "field type `{}` cannot declare params/returns",
                self.kind.as_str()
            )));
        }
        Ok(())
    }
}

/// Untyped declaration options for [`declare_field`].
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub optional: bool,
    pub description: Option<String>,
    pub target: Option<RelationTarget>,
    pub params: Option<Value>,
    pub returns: Option<Value>,
}

/// Builds field metadata from a type name, failing fast on malformed input.
pub fn declare_field(kind: &str, options: FieldOptions) -> UrpcResult<FieldMetadata> {
    let metadata = FieldMetadata {
        kind: kind.parse()?,
        optional: options.optional,
        description: options.description,
        target: options.target,
        params: options.params,
        returns: options.returns,
    };
    metadata.validate()?;
    Ok(metadata)
}
