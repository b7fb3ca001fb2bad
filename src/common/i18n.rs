// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Catálogo de mensagens de erro por idioma.
/// Fica no `AppState` e é consultado por `AppError::to_api_error`.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();

        messages.insert(
            "pt",
            HashMap::from([
                ("validation", "Um ou mais campos são inválidos"),
                ("not_found", "Recurso não encontrado"),
                ("out_of_range", "Valor fora do intervalo permitido"),
                ("mode_mismatch", "Modo de preço incompatível com a oferta"),
                ("import_format", "Formato de importação inválido"),
                ("offer_locked", "Oferta aceita, preços somente leitura"),
                ("invalid_transition", "Transição de status inválida"),
                ("internal", "Ocorreu um erro inesperado"),
            ]),
        );

        messages.insert(
            "en",
            HashMap::from([
                ("validation", "One or more fields are invalid"),
                ("not_found", "Resource not found"),
                ("out_of_range", "Value out of allowed range"),
                ("mode_mismatch", "Pricing mode does not match the offer"),
                ("import_format", "Invalid import format"),
                ("offer_locked", "Offer accepted, prices are read-only"),
                ("invalid_transition", "Invalid status transition"),
                ("internal", "An unexpected error occurred"),
            ]),
        );

        Self { messages }
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.messages.contains_key(lang)
    }

    /// Idioma desconhecido cai para inglês; chave desconhecida volta como está.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANGUAGE).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
