// src/services/geography.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::geography_repo::{GeoPath, GeographyRepository},
};

/// Resolve a área atendida por uma empresa em um conjunto de CEPs.
#[derive(Clone)]
pub struct GeographyIndex {
    repo: Arc<dyn GeographyRepository>,
}

impl GeographyIndex {
    pub fn new(repo: Arc<dyn GeographyRepository>) -> Self {
        Self { repo }
    }

    /// União dos CEPs alcançados por província, município e cidade.
    /// Conjunto vazio significa que a empresa só recebe envios direcionados.
    pub async fn resolve_zip_codes(&self, company_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
        if !self.repo.company_exists(company_id).await? {
            return Err(AppError::company_not_found(company_id));
        }

        let mut resolved = self.resolve_many(&[company_id]).await?;
        Ok(resolved.remove(&company_id).unwrap_or_default())
    }

    /// Versão em lote: um mapa empresa → CEPs. Empresas sem área ficam de fora do mapa.
    pub async fn resolve_many(
        &self,
        company_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, HashSet<Uuid>>, AppError> {
        if company_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let per_path = try_join_all(
            GeoPath::ALL
                .iter()
                .map(|path| self.repo.zip_codes_by_path(*path, company_ids)),
        )
        .await?;

        let mut resolved: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (company_id, zip_code_id) in per_path.into_iter().flatten() {
            resolved.entry(company_id).or_default().insert(zip_code_id);
        }

        tracing::debug!(
            companies = company_ids.len(),
            with_area = resolved.len(),
            "🗺️ Geografia resolvida"
        );
        Ok(resolved)
    }
}
