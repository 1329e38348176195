// src/services/finish.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{company_repo::CompanyRepository, project_repo::ProjectRepository},
    models::project::{FinishOutcome, FinishSide, FinishTransition},
    services::triggers::TriggersService,
};

/// Máquina de estados da confirmação de fim: ACTIVE → FINISHED quando os dois
/// lados confirmaram. A serialização por projeto fica no repositório.
#[derive(Clone)]
pub struct FinishService {
    projects: Arc<dyn ProjectRepository>,
    companies: Arc<dyn CompanyRepository>,
    triggers: Arc<TriggersService>,
}

impl FinishService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        companies: Arc<dyn CompanyRepository>,
        triggers: Arc<TriggersService>,
    ) -> Self {
        Self {
            projects,
            companies,
            triggers,
        }
    }

    pub async fn confirm_finish_by_company(&self, project_id: Uuid) -> Result<FinishTransition, AppError> {
        self.confirm(project_id, FinishSide::Company).await
    }

    pub async fn confirm_finish_by_customer(&self, project_id: Uuid) -> Result<FinishTransition, AppError> {
        self.confirm(project_id, FinishSide::Customer).await
    }

    async fn confirm(&self, project_id: Uuid, side: FinishSide) -> Result<FinishTransition, AppError> {
        let transition = self
            .projects
            .confirm_finish(project_id, side, Utc::now())
            .await?;

        tracing::info!(
            project_id = %project_id,
            side = ?side,
            outcome = ?transition.outcome,
            progress = transition.state.progress.as_str(),
            "🏁 Confirmação de fim registrada"
        );

        // Repetir a própria confirmação não avisa a outra parte de novo
        if transition.outcome != FinishOutcome::AlreadyConfirmed {
            self.notify(project_id, side).await;
        }
        Ok(transition)
    }

    // Best-effort: a confirmação já foi gravada, falhas aqui só vão para o log
    async fn notify(&self, project_id: Uuid, side: FinishSide) {
        let ctx = match self.projects.find_match_context(project_id).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "⚠️ Contexto do projeto indisponível");
                return;
            }
        };

        let company = match ctx.project.company_id {
            Some(company_id) => match self.companies.find_by_id(company_id).await {
                Ok(company) => company,
                Err(e) => {
                    tracing::warn!(company_id = %company_id, error = %e, "⚠️ Empresa do projeto indisponível");
                    None
                }
            },
            None => None,
        };

        let report = match side {
            FinishSide::Company => self.triggers.finish_company(&ctx, company.as_ref()).await,
            FinishSide::Customer => self.triggers.finish_customer(&ctx, company.as_ref()).await,
        };

        if !report.failures.is_empty() {
            tracing::warn!(
                project_id = %project_id,
                failures = report.failures.len(),
                "⚠️ Notificação de fim não entregue"
            );
        }
    }
}
