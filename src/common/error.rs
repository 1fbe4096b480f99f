// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// A taxonomia de erros do domínio + os erros de infraestrutura.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Identidade ausente ou inválida")]
    Unauthorized,

    #[error("Capacidade '{0}' negada")]
    Forbidden(String),

    #[error("Usuário sem organização")]
    NoOrganization,

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Transição ilegal de '{from}' para '{to}'")]
    IllegalTransition { from: String, to: String },

    #[error("Ações obrigatórias pendentes: {0:?}")]
    MissingRequiredAction(Vec<String>),

    #[error("Operação '{operation}' inválida no status '{status}'")]
    InvalidState { operation: String, status: String },

    #[error("Slug já em uso: {0}")]
    DuplicateSlug(String),

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    // Perdeu a corrida do compare-and-swap no avanço de etapa
    #[error("Item {item_id} não está mais na etapa '{expected_stage_id}'")]
    StaleStage { item_id: Uuid, expected_stage_id: String },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Erro de validação de um único campo, fora do `#[derive(Validate)]`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            field,
            validator::ValidationError::new("invalid").with_message(message.into().into()),
        );
        AppError::ValidationError(errors)
    }

    /// Código estável usado pelo frontend e como chave das mensagens traduzidas.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NoOrganization => "NO_ORGANIZATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            AppError::MissingRequiredAction(_) => "MISSING_REQUIRED_ACTION",
            AppError::InvalidState { .. } => "INVALID_STATE",
            AppError::DuplicateSlug(_) => "DUPLICATE_SLUG",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Conflict(_) => "CONFLICT",
            AppError::StaleStage { .. } => "STALE_STAGE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NoOrganization => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IllegalTransition { .. }
            | AppError::MissingRequiredAction(_)
            | AppError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateSlug(_) | AppError::Conflict(_) | AppError::StaleStage { .. } => {
                StatusCode::CONFLICT
            }
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // O trecho variável que entra no "{detail}" das mensagens.
    fn detail(&self) -> String {
        match self {
            AppError::Forbidden(capability) => capability.clone(),
            AppError::NotFound(what) => what.clone(),
            AppError::IllegalTransition { from, to } => format!("{} → {}", from, to),
            AppError::MissingRequiredAction(ids) => ids.join(", "),
            AppError::InvalidState { operation, status } => format!("{} ({})", operation, status),
            AppError::DuplicateSlug(slug) => slug.clone(),
            AppError::InvalidInput(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::StaleStage { expected_stage_id, .. } => expected_stage_id.clone(),
            _ => String::new(),
        }
    }

    /// Converte o erro na resposta da API, com a mensagem no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        let code = self.code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe técnico fica só no log
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut fields: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), messages);
                }
                Some(json!(fields))
            }
            AppError::MissingRequiredAction(ids) => Some(json!({ "actionIds": ids })),
            _ => None,
        };

        ApiError {
            status,
            code,
            error: i18n.message(&locale.0, code, &self.detail()),
            details,
        }
    }
}

// Fora dos handlers (extratores, middlewares) respondemos no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

// O corpo de erro que o cliente recebe.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
