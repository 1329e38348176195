// src/db/message_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::NotifyError,
    models::notification::NewMessage,
    services::notifications::MessageSink,
};

// Mensagens internas (in-app) persistidas na tabela 'messages'
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageSink for PgMessageRepository {
    async fn create_bulk(&self, messages: Vec<NewMessage>) -> Result<usize, NotifyError> {
        if messages.is_empty() {
            return Ok(0);
        }

        let user_ids: Vec<Uuid> = messages.iter().map(|m| m.user_id).collect();
        let project_ids: Vec<Uuid> = messages.iter().map(|m| m.from_project_id).collect();
        let from_types: Vec<&str> = messages.iter().map(|m| m.from_type.as_str()).collect();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO messages (user_id, from_project_id, from_type, text)
            SELECT m.user_id, m.project_id, m.from_type::message_from_type, m.text
            FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[])
                AS m(user_id, project_id, from_type, text)
            "#,
        )
        .bind(&user_ids)
        .bind(&project_ids)
        .bind(&from_types)
        .bind(&texts)
        .execute(&self.pool)
        .await
        .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
