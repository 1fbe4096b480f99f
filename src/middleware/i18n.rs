// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::{I18nStore, DEFAULT_LANGUAGE};

// O idioma negociado a partir do Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANGUAGE.to_string())
    }
}

impl Locale {
    /// Escolhe o primeiro idioma do cabeçalho que temos traduzido ("pt-BR" -> "pt").
    pub fn negotiate(header_value: &str, supported: &[&str]) -> Self {
        accept_language::parse(header_value)
            .iter()
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| supported.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(|value| Locale::negotiate(value, &I18nStore::global().languages()))
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_strips_region() {
        let locale = Locale::negotiate("pt-BR,pt;q=0.9,en;q=0.8", &["en", "pt"]);
        assert_eq!(locale.0, "pt");
    }

    #[test]
    fn test_negotiate_skips_unsupported() {
        let locale = Locale::negotiate("de-DE,fr;q=0.9,pt;q=0.5", &["en", "pt"]);
        assert_eq!(locale.0, "pt");
    }

    #[test]
    fn test_negotiate_defaults_to_english() {
        assert_eq!(Locale::negotiate("ja", &["en", "pt"]).0, "en");
    }
}
