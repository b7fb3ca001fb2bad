// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANGUAGE;

/// Idioma das mensagens de erro, tirado do `Accept-Language`.
#[derive(Debug, Clone)]
pub struct Locale(pub String);

/// "pt-BR,pt;q=0.9" -> "pt". O `I18nStore` cai para inglês se não conhecer o idioma.
pub fn primary_language(header_value: &str) -> Option<String> {
    accept_language::parse(header_value)
        .first()
        .and_then(|tag| tag.split('-').next())
        .filter(|lang| !lang.is_empty())
        .map(|lang| lang.to_ascii_lowercase())
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(primary_language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(Locale(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_dropped_and_weight_respected() {
        assert_eq!(primary_language("pt-BR,pt;q=0.9,en;q=0.8").as_deref(), Some("pt"));
        assert_eq!(primary_language("en;q=0.5, DE-de").as_deref(), Some("de"));
        assert_eq!(primary_language(""), None);
    }
}
