// src/common/i18n.rs

use std::{collections::HashMap, sync::LazyLock};

pub const DEFAULT_LANGUAGE: &str = "en";

// Os pacotes de mensagens vão embutidos no binário
const BUNDLES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

static GLOBAL: LazyLock<I18nStore> = LazyLock::new(I18nStore::load);

/// Mensagens de erro traduzidas, indexadas por idioma e pelo código do `AppError`.
#[derive(Debug, Default)]
pub struct I18nStore {
    bundles: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn global() -> &'static I18nStore {
        &GLOBAL
    }

    fn load() -> Self {
        let mut bundles = HashMap::new();
        for (lang, raw) in BUNDLES {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(messages) => {
                    bundles.insert(lang.to_string(), messages);
                }
                Err(e) => tracing::error!("🔥 Pacote de idioma '{}' inválido: {}", lang, e),
            }
        }
        Self { bundles }
    }

    pub fn languages(&self) -> Vec<&str> {
        self.bundles.keys().map(String::as_str).collect()
    }

    /// Renderiza a mensagem `code` em `lang`, caindo para o inglês e por fim no próprio código.
    pub fn message(&self, lang: &str, code: &str, detail: &str) -> String {
        let template = self
            .bundles
            .get(lang)
            .and_then(|b| b.get(code))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE).and_then(|b| b.get(code)));

        match template {
            Some(t) => t.replace("{detail}", detail),
            None => code.to_string(),
        }
    }
}
