// src/services/requests.rs

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        company_repo::{CompanyRepository, CompanySpec},
        project_repo::{ProjectRepository, ProjectSpec},
    },
    models::{
        company::{AvailableCompany, CompanyProfile, QuoteFlags},
        project::Project,
    },
    services::{
        eligibility::{EligibilityFilter, EligibilityOptions},
        geography::GeographyIndex,
        interest::{apply_interest_filter, InterestMode},
        triggers::TriggersService,
    },
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestFeedQuery {
    #[serde(default)]
    pub show_answered: bool,
    #[serde(default)]
    pub interest: InterestMode,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanySearchQuery {
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct RequestService {
    projects: Arc<dyn ProjectRepository>,
    companies: Arc<dyn CompanyRepository>,
    geography: GeographyIndex,
    triggers: Arc<TriggersService>,
}

impl RequestService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        companies: Arc<dyn CompanyRepository>,
        geography: GeographyIndex,
        triggers: Arc<TriggersService>,
    ) -> Self {
        Self {
            projects,
            companies,
            geography,
            triggers,
        }
    }

    /// Feed da empresa: projetos que ela pode ver, mais novos primeiro.
    pub async fn company_requests(
        &self,
        company_id: Uuid,
        query: RequestFeedQuery,
    ) -> Result<Vec<Project>, AppError> {
        let company = self
            .companies
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::company_not_found(company_id))?;

        if company.category_ids.is_empty() {
            return Err(AppError::CompanyWithoutCategory(company_id));
        }

        let profile = CompanyProfile {
            company_id,
            categories: company.category_ids.iter().copied().collect(),
            zip_codes: self.geography.resolve_zip_codes(company_id).await?,
        };

        let spec = if query.show_answered {
            ProjectSpec::QuotedBy {
                company_id,
                accepted: false,
            }
        } else {
            ProjectSpec::InCategories(company.category_ids.clone())
        };
        let facts = self.projects.find_facts_by_spec(&spec).await?;

        let filter = EligibilityFilter::new(EligibilityOptions {
            show_answered: query.show_answered,
            exclude_quoted: !query.show_answered,
            interest: query.interest,
        });
        let visible = filter.visible_projects(&profile, &facts);

        let interested = self.companies.interested_projects(company_id).await?;
        let visible = apply_interest_filter(visible, &interested, query.interest);

        tracing::debug!(
            company_id = %company_id,
            candidates = facts.len(),
            visible = visible.len(),
            "📋 Feed da empresa calculado"
        );

        let projects = try_join_all(visible.iter().map(|id| self.projects.find_by_id(*id))).await?;
        Ok(projects.into_iter().flatten().collect())
    }

    /// Visão admin: empresas que podem receber o projeto, com o estado de
    /// quote/envio de cada uma.
    pub async fn available_companies(
        &self,
        project_id: Uuid,
        query: CompanySearchQuery,
    ) -> Result<Vec<AvailableCompany>, AppError> {
        let facts = self
            .projects
            .find_facts_by_spec(&ProjectSpec::ById(project_id))
            .await?
            .pop()
            .ok_or_else(|| AppError::project_not_found(project_id))?;

        let category_id = facts
            .category_id
            .ok_or(AppError::ProjectWithoutCategory(project_id))?;

        let spec = CompanySpec {
            category_id: Some(category_id),
            require_email: true,
            name_search: query.search.filter(|s| !s.trim().is_empty()),
            ..CompanySpec::default()
        };
        let pool = self.companies.find_by_spec(&spec).await?;

        let ids: Vec<Uuid> = pool.iter().map(|c| c.id()).collect();
        let zips = self.geography.resolve_many(&ids).await?;

        Ok(pool
            .into_iter()
            .filter(|c| {
                facts
                    .zip_code_id
                    .zip(zips.get(&c.id()))
                    .is_some_and(|(zip, area)| area.contains(&zip))
            })
            .map(|c| {
                let quote = facts.quote_by(c.id());
                AvailableCompany {
                    id: c.id(),
                    quote: QuoteFlags {
                        is_accepted: quote.is_some_and(|q| q.is_accepted),
                        is_interested: quote.is_some_and(|q| q.is_interested),
                        is_quote: quote.is_some(),
                        send_request: facts.offered.contains(&c.id()),
                    },
                    name: c.company.name,
                }
            })
            .collect())
    }

    /// Registra o interesse da empresa. Retorna `false` se já estava registrado,
    /// e nesse caso o cliente não é avisado de novo.
    pub async fn show_interest(&self, project_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        let company = self
            .companies
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::company_not_found(company_id))?;
        let ctx = self
            .projects
            .find_match_context(project_id)
            .await?
            .ok_or_else(|| AppError::project_not_found(project_id))?;

        let added = self.projects.add_interest(project_id, company_id).await?;
        if added {
            tracing::info!(project_id = %project_id, company_id = %company_id, "👀 Empresa demonstrou interesse");
            let report = self.triggers.company_shows_interest(&ctx, &company).await;
            if !report.failures.is_empty() {
                tracing::warn!(project_id = %project_id, "⚠️ Cliente não foi avisado do interesse");
            }
        }

        Ok(added)
    }
}
