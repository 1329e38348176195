// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::project::ProjectProgress;

// Erros do domínio de matching. "Não encontrado" é distinto de "zero resultados".
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{entity} não encontrado: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Projeto {0} não tem categoria")]
    ProjectWithoutCategory(Uuid),

    #[error("Empresa {0} não tem categoria")]
    CompanyWithoutCategory(Uuid),

    #[error("Projeto {id} está em {found:?}, esperado um de {expected:?}")]
    InvalidProgress {
        id: Uuid,
        expected: &'static [ProjectProgress],
        found: ProjectProgress,
    },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn project_not_found(id: Uuid) -> Self {
        AppError::NotFound { entity: "Projeto", id }
    }

    pub fn company_not_found(id: Uuid) -> Self {
        AppError::NotFound { entity: "Empresa", id }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ProjectWithoutCategory(_) | AppError::CompanyWithoutCategory(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::InvalidProgress { .. } => (StatusCode::CONFLICT, self.to_string()),

            // DatabaseError e InternalServerError viram 500; o detalhe fica só no log.
            AppError::DatabaseError(e) => {
                tracing::error!("Erro de banco de dados: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

// Falhas dos colaboradores de notificação. Nunca sobem pelo fan-out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("transporte indisponível: {0}")]
    Transport(String),

    #[error("tempo esgotado após {0} ms")]
    Timeout(u64),

    #[error("empresa {0} sem contato administrativo")]
    MissingContact(Uuid),

    #[error("projeto {0} sem cliente")]
    MissingCustomer(Uuid),

    #[error("link de convite inválido: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::project_not_found(Uuid::new_v4()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_category_is_a_bad_request() {
        let response = AppError::ProjectWithoutCategory(Uuid::new_v4()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_progress_is_a_conflict() {
        let response = AppError::InvalidProgress {
            id: Uuid::new_v4(),
            expected: &[ProjectProgress::Active],
            found: ProjectProgress::Created,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
