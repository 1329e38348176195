// src/db/send_request_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

#[async_trait]
pub trait SendRequestRepository: Send + Sync {
    /// Upsert idempotente de um registro por par (empresa, projeto).
    /// Retorna quantos pares eram novos.
    async fn upsert_many(&self, project_id: Uuid, company_ids: &[Uuid]) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgSendRequestRepository {
    pool: PgPool,
}

impl PgSendRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SendRequestRepository for PgSendRequestRepository {
    async fn upsert_many(&self, project_id: Uuid, company_ids: &[Uuid]) -> Result<u64, AppError> {
        if company_ids.is_empty() {
            return Ok(0);
        }

        // ON CONFLICT DO NOTHING: concorrentes no mesmo par colapsam em uma linha
        let result = sqlx::query(
            r#"
            INSERT INTO project_send_requests (company_id, project_id)
            SELECT DISTINCT company_id, $2
            FROM UNNEST($1::uuid[]) AS t(company_id)
            ON CONFLICT (company_id, project_id) DO NOTHING
            "#,
        )
        .bind(company_ids)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
