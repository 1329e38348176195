// src/services/matching.rs

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        company_repo::{CompanyRepository, CompanySpec},
        project_repo::{ProjectRepository, ProjectSpec},
        send_request_repo::SendRequestRepository,
    },
    models::{
        company::{CompanyProfile, CompanyWithMembers},
        notification::FanOutReport,
        project::{MatchContext, ProjectProgress},
    },
    services::{
        eligibility::{EligibilityFilter, EligibilityOptions},
        geography::GeographyIndex,
        interest::{apply_interest_filter, interested_companies, InterestMode},
        partition::partition_by_membership,
        triggers::TriggersService,
    },
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    /// Envio direcionado: ignora categoria e geografia para estas empresas.
    #[serde(default)]
    pub explicit_company_ids: Option<Vec<Uuid>>,
    #[serde(default = "default_true")]
    pub notify_only_opted_in: bool,
    #[serde(default)]
    pub interest: InterestMode,
}

impl Default for MatchRequest {
    fn default() -> Self {
        Self {
            explicit_company_ids: None,
            notify_only_opted_in: true,
            interest: InterestMode::Disabled,
        }
    }
}

impl MatchRequest {
    pub fn directed(company_ids: Vec<Uuid>) -> Self {
        Self {
            explicit_company_ids: Some(company_ids),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub project_id: Uuid,
    pub directed: bool,
    /// Empresas candidatas antes do filtro de opt-in, ordenadas por nome
    pub matched: Vec<Uuid>,
    pub with_members: usize,
    pub admin_only: usize,
    pub skipped_opted_out: usize,
    pub send_requests_created: u64,
    pub notifications: FanOutReport,
}

#[derive(Clone)]
pub struct MatchService {
    projects: Arc<dyn ProjectRepository>,
    companies: Arc<dyn CompanyRepository>,
    send_requests: Arc<dyn SendRequestRepository>,
    geography: GeographyIndex,
    triggers: Arc<TriggersService>,
}

impl MatchService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        companies: Arc<dyn CompanyRepository>,
        send_requests: Arc<dyn SendRequestRepository>,
        geography: GeographyIndex,
        triggers: Arc<TriggersService>,
    ) -> Self {
        Self {
            projects,
            companies,
            send_requests,
            geography,
            triggers,
        }
    }

    pub async fn match_project(
        &self,
        project_id: Uuid,
        request: MatchRequest,
    ) -> Result<MatchReport, AppError> {
        let ctx = self
            .projects
            .find_match_context(project_id)
            .await?
            .ok_or_else(|| AppError::project_not_found(project_id))?;

        // Lista explícita vazia vale como broadcast
        let explicit_ids = request
            .explicit_company_ids
            .as_deref()
            .filter(|ids| !ids.is_empty())
            .map(dedup);
        let candidates = match &explicit_ids {
            Some(ids) => self.directed_candidates(ids).await?,
            None => self.broadcast_candidates(&ctx, request.interest).await?,
        };

        let mut has_members = partition_by_membership(&candidates, true);
        let mut admin_only = partition_by_membership(&candidates, false);

        let before = has_members.len() + admin_only.len();
        if request.notify_only_opted_in {
            has_members.retain(|c| c.company.is_notification);
            admin_only.retain(|c| c.company.is_notification);
        }
        let skipped_opted_out = before - has_members.len() - admin_only.len();

        let notifications = self
            .triggers
            .quote_matched(&ctx, &has_members, &admin_only)
            .await;

        // Registro idempotente das ofertas direcionadas
        let send_requests_created = match &explicit_ids {
            Some(ids) => self.send_requests.upsert_many(project_id, ids).await?,
            None => 0,
        };

        tracing::info!(
            project_id = %project_id,
            directed = explicit_ids.is_some(),
            matched = candidates.len(),
            with_members = has_members.len(),
            admin_only = admin_only.len(),
            delivered = notifications.delivered,
            failures = notifications.failures.len(),
            send_requests_created,
            "🤝 Match concluído"
        );

        Ok(MatchReport {
            project_id,
            directed: explicit_ids.is_some(),
            matched: candidates.iter().map(|c| c.id()).collect(),
            with_members: has_members.len(),
            admin_only: admin_only.len(),
            skipped_opted_out,
            send_requests_created,
            notifications,
        })
    }

    /// Todas as empresas nomeadas precisam existir; nada é enviado caso contrário.
    async fn directed_candidates(&self, ids: &[Uuid]) -> Result<Vec<CompanyWithMembers>, AppError> {
        let found = self
            .companies
            .find_by_spec(&CompanySpec::by_ids(ids.to_vec()))
            .await?;

        let found_ids: HashSet<Uuid> = found.iter().map(|c| c.id()).collect();
        if let Some(missing) = ids.iter().find(|id| !found_ids.contains(id)) {
            return Err(AppError::company_not_found(*missing));
        }

        Ok(found)
    }

    async fn broadcast_candidates(
        &self,
        ctx: &MatchContext,
        interest: InterestMode,
    ) -> Result<Vec<CompanyWithMembers>, AppError> {
        let project = &ctx.project;
        let category_id = project
            .category_id
            .ok_or(AppError::ProjectWithoutCategory(project.id))?;

        if project.progress != ProjectProgress::Moderated {
            return Err(AppError::InvalidProgress {
                id: project.id,
                expected: &[ProjectProgress::Moderated],
                found: project.progress,
            });
        }

        let facts = self
            .projects
            .find_facts_by_spec(&ProjectSpec::ById(project.id))
            .await?
            .pop()
            .ok_or_else(|| AppError::project_not_found(project.id))?;

        let pool = self
            .companies
            .find_by_spec(&CompanySpec::by_category(category_id))
            .await?;
        let ids: Vec<Uuid> = pool.iter().map(|c| c.id()).collect();
        let mut zips = self.geography.resolve_many(&ids).await?;

        let profiles: Vec<CompanyProfile> = pool
            .iter()
            .map(|c| CompanyProfile {
                company_id: c.id(),
                categories: c.category_ids.iter().copied().collect(),
                zip_codes: zips.remove(&c.id()).unwrap_or_default(),
            })
            .collect();

        let filter = EligibilityFilter::new(EligibilityOptions {
            show_answered: false,
            exclude_quoted: true,
            interest,
        });
        let eligible = filter.filter_eligible(&facts, &profiles)?;
        let eligible: BTreeSet<Uuid> =
            apply_interest_filter(eligible, &interested_companies(&facts), interest)
                .into_iter()
                .collect();

        Ok(pool
            .into_iter()
            .filter(|c| eligible.contains(&c.id()))
            .collect())
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
