// src/models/quote.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Resumo de uma quote usado pelo filtro de elegibilidade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRef {
    pub company_id: Uuid,
    pub is_accepted: bool,
    pub is_interested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTimes {
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Registro durável de "a empresa X recebeu o projeto Y", único por par.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSendRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
}
