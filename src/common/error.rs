// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::offers::{OfferStatus, PricingMode},
};

// Erros de domínio e de infraestrutura. Os handlers nunca devolvem isso direto:
// passam por `to_api_error`, que escolhe o status HTTP e traduz a mensagem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entrada numérica/texto obrigatória ausente ou malformada (ex: faixa sem preço)
    #[error("Campo inválido '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    // Índice de faixa ou configuração de casas decimais fora dos limites
    #[error("Valor fora do intervalo: {0}")]
    OutOfRange(String),

    #[error("Modo de preço incompatível: a oferta usa {expected}, a escrita pediu {requested}")]
    ModeMismatch {
        expected: PricingMode,
        requested: PricingMode,
    },

    // Texto colado da planilha sem nenhuma linha aproveitável
    #[error("Formato de importação inválido: {0}")]
    ImportFormat(String),

    #[error("A oferta {0} foi aceita e seus preços são somente leitura")]
    OfferLocked(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: OfferStatus, to: OfferStatus },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` guarda o contexto do erro inesperado para o log.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Chave usada no `I18nStore`.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "validation",
            AppError::ResourceNotFound(_) => "not_found",
            AppError::OutOfRange(_) => "out_of_range",
            AppError::ModeMismatch { .. } => "mode_mismatch",
            AppError::ImportFormat(_) => "import_format",
            AppError::OfferLocked(_) => "offer_locked",
            AppError::InvalidStatusTransition { .. } => "invalid_transition",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::OutOfRange(_) | AppError::ImportFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ModeMismatch { .. }
            | AppError::OfferLocked(_)
            | AppError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status_code();
        let title = i18n.translate(&locale.0, self.message_key());

        match self {
            // Detalhes campo a campo, igual ao que o frontend já consome
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                                .into()
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                ApiError {
                    status,
                    message: title,
                    details: Some(Value::Object(details)),
                }
            }
            AppError::InvalidField { field, reason } => {
                let mut details = serde_json::Map::new();
                details.insert(field.clone(), json!([reason]));
                ApiError {
                    status,
                    message: title,
                    details: Some(Value::Object(details)),
                }
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                // O detalhe fica só no log, nunca na resposta
                tracing::error!("Erro Interno do Servidor: {:?}", self);
                ApiError::new(status, title)
            }
            other => ApiError::new(status, format!("{}: {}", title, other)),
        }
    }
}

/// Erro pronto para sair pela API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
