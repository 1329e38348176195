// src/db/geography_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

/// Os três caminhos de junção entre uma empresa e os CEPs que ela atende.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoPath {
    Province,
    Municipality,
    City,
}

impl GeoPath {
    pub const ALL: [GeoPath; 3] = [GeoPath::Province, GeoPath::Municipality, GeoPath::City];
}

#[async_trait]
pub trait GeographyRepository: Send + Sync {
    async fn company_exists(&self, company_id: Uuid) -> Result<bool, AppError>;

    /// Pares `(company_id, zip_code_id)` alcançáveis por um caminho.
    async fn zip_codes_by_path(
        &self,
        path: GeoPath,
        company_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, AppError>;
}

#[derive(Clone)]
pub struct PgGeographyRepository {
    pool: PgPool,
}

impl PgGeographyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeographyRepository for PgGeographyRepository {
    async fn company_exists(&self, company_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn zip_codes_by_path(
        &self,
        path: GeoPath,
        company_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, AppError> {
        let sql = match path {
            GeoPath::Province => {
                r#"
                SELECT cp.company_id, zp.zip_code_id
                FROM company_provinces cp
                JOIN zip_code_provinces zp ON zp.province_id = cp.province_id
                WHERE cp.company_id = ANY($1)
                "#
            }
            GeoPath::Municipality => {
                r#"
                SELECT cm.company_id, zm.zip_code_id
                FROM company_municipalities cm
                JOIN zip_code_municipalities zm ON zm.municipality_id = cm.municipality_id
                WHERE cm.company_id = ANY($1)
                "#
            }
            GeoPath::City => {
                r#"
                SELECT cc.company_id, z.id
                FROM company_cities cc
                JOIN zip_codes z ON z.city_id = cc.city_id
                WHERE cc.company_id = ANY($1)
                "#
            }
        };

        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(sql)
            .bind(company_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(pairs)
    }
}
