//! Locale resolution for translatable fields.

use crate::error::UrpcResult;
use crate::middleware::context::MiddlewareContext;
use crate::middleware::manager::{Middleware, Next};
use async_trait::async_trait;
use serde_json::Value;

/// Replaces locale-keyed objects such as `{"en": "Hi", "fr": "Salut"}` in
/// fields marked `i18n` with the string for the request locale, else the
/// default locale. Values without a matching key stay untouched.
#[derive(Debug, Clone, Default)]
pub struct I18nMiddleware {
    default_locale: Option<String>,
}

impl I18nMiddleware {
    pub const NAME: &'static str = "i18n";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_locale(locale: impl Into<String>) -> Self {
        Self {
            default_locale: Some(locale.into()),
        }
    }
}

fn localize_field(value: &mut Value, locales: &[&str]) {
    let Value::Object(translations) = value else {
        return;
    };
    let picked = locales
        .iter()
        .find_map(|locale| translations.get(*locale))
        .cloned();
    if let Some(picked) = picked {
        *value = picked;
    }
}

fn localize_row(row: &mut Value, fields: &[String], locales: &[&str]) {
    let Value::Object(map) = row else {
        return;
    };
    for field in fields {
        if let Some(value) = map.get_mut(field) {
            localize_field(value, locales);
        }
    }
}

#[async_trait]
impl Middleware for I18nMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        let mut value = next.run(ctx).await?;

        let fields: Vec<String> = ctx
            .entity_config()
            .map(|config| config.i18n_fields().map(str::to_string).collect())
            .unwrap_or_default();
        if fields.is_empty() {
            return Ok(value);
        }

        let mut locales: Vec<&str> = Vec::new();
        if let Some(locale) = ctx.metadata.locale() {
            locales.push(locale);
        }
        if let Some(locale) = self.default_locale.as_deref() {
            locales.push(locale);
        }
        if locales.is_empty() {
            return Ok(value);
        }

        match &mut value {
            Value::Array(rows) => rows
                .iter_mut()
                .for_each(|row| localize_row(row, &fields, &locales)),
            row => localize_row(row, &fields, &locales),
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::localize_row;
    use serde_json::json;

    #[test]
    fn falls_back_through_locales() {
        let mut row = json!({"title": {"en": "Hello", "fr": "Bonjour"}, "id": 1});
        localize_row(&mut row, &["title".to_string()], &["de", "en"]);
        assert_eq!(row, json!({"title": "Hello", "id": 1}));
    }

    #[test]
    fn plain_strings_stay_untouched() {
        let mut row = json!({"title": "Hello"});
        localize_row(&mut row, &["title".to_string()], &["fr"]);
        assert_eq!(row, json!({"title": "Hello"}));
    }
}
