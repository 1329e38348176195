// src/models/project.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::quote::{QuoteRef, QuoteTimes};
use crate::models::user::Customer;

// --- Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "project_progress", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectProgress {
    #[default]
    Created,
    Moderated,
    QuotaChosen,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    Ready,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "desired_start_date", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredStartDate {
    Asap,
    OneMonth,
    ThreeMonths,
    Flexible,
}

impl ProjectProgress {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectProgress::Created => "CREATED",
            ProjectProgress::Moderated => "MODERATED",
            ProjectProgress::QuotaChosen => "QUOTA_CHOSEN",
            ProjectProgress::Active => "ACTIVE",
            ProjectProgress::Finished => "FINISHED",
        }
    }
}

// --- Projeto ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[schema(example = "17493a7c-f40d-4c47-8139-cd9c483e4584")]
    pub id: Uuid,
    #[schema(example = "Kitchen renovation")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub progress: ProjectProgress,
    pub desired_start_date: Option<DesiredStartDate>,
    pub category_id: Option<Uuid>,
    pub zip_code_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    // Empresa atribuída quando uma quote é aceita
    pub company_id: Option<Uuid>,
    pub is_company_confirmed_finish: bool,
    pub is_customer_confirmed_finish: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn finish_state(&self) -> FinishState {
        FinishState {
            progress: self.progress,
            company_confirmed: self.is_company_confirmed_finish,
            customer_confirmed: self.is_customer_confirmed_finish,
            finished_at: self.finished_at,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[validate(length(min = 1, message = "O nome do projeto é obrigatório"))]
    #[schema(example = "Kitchen renovation")]
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub category_id: Uuid,
    pub zip_code_id: Uuid,
    pub desired_start_date: Option<DesiredStartDate>,
    pub user_id: Option<Uuid>,
}

/// Projeto carregado com o contexto de categoria, CEP e cliente usado nos triggers.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub project: Project,
    pub category_name: Option<String>,
    pub zip_code: Option<String>,
    pub city_name: Option<String>,
    pub customer: Option<Customer>,
}

impl MatchContext {
    pub fn address(&self) -> String {
        self.city_name.clone().unwrap_or_default()
    }
}

/// Fatos de um projeto necessários para decidir elegibilidade.
///
/// Os conjuntos guardam ids de empresas: `rejected` é a blacklist do projeto,
/// `interested` as empresas que marcaram interesse e `offered` as que já
/// receberam um envio direcionado (`ProjectSendRequest`).
#[derive(Debug, Clone, Default)]
pub struct ProjectFacts {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub zip_code_id: Option<Uuid>,
    pub progress: ProjectProgress,
    pub created_at: DateTime<Utc>,
    pub rejected: HashSet<Uuid>,
    pub interested: HashSet<Uuid>,
    pub offered: HashSet<Uuid>,
    pub quotes: Vec<QuoteRef>,
}

impl ProjectFacts {
    pub fn is_moderated(&self) -> bool {
        self.progress == ProjectProgress::Moderated
    }

    pub fn accepted_quote_by(&self, company_id: Uuid) -> bool {
        self.quotes
            .iter()
            .any(|q| q.company_id == company_id && q.is_accepted)
    }

    pub fn pending_quote_by(&self, company_id: Uuid) -> bool {
        self.quotes
            .iter()
            .any(|q| q.company_id == company_id && !q.is_accepted)
    }

    pub fn quote_by(&self, company_id: Uuid) -> Option<&QuoteRef> {
        self.quotes.iter().find(|q| q.company_id == company_id)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTimeline {
    pub progress: ProjectProgress,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub is_company_confirmed_finish: bool,
    pub is_customer_confirmed_finish: bool,
    pub quotes: Vec<QuoteTimes>,
}

// =========================================================================
//  CONFIRMAÇÃO DE FIM
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishSide {
    Company,
    Customer,
}

/// Estados a partir dos quais uma confirmação de fim é aceita.
pub const FINISHABLE: &[ProjectProgress] = &[ProjectProgress::Active, ProjectProgress::Finished];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishState {
    pub progress: ProjectProgress,
    pub company_confirmed: bool,
    pub customer_confirmed: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishOutcome {
    /// Este lado confirmou, o outro ainda não.
    AwaitingCounterpart,
    /// Esta confirmação foi a segunda: o projeto passou para FINISHED.
    Finished,
    /// Este lado já tinha confirmado; nada mudou.
    AlreadyConfirmed,
    /// O projeto já estava FINISHED; apenas a flag deste lado foi travada.
    AlreadyFinished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishTransition {
    pub project_id: Uuid,
    pub side: FinishSide,
    pub outcome: FinishOutcome,
    pub state: FinishState,
}

impl FinishState {
    /// Aplica a confirmação de um lado. Deve ser avaliada sobre uma leitura
    /// travada das duas flags; `finished_at` só é gravado uma vez.
    ///
    /// Retorna `Err(progress)` quando o projeto não está ACTIVE nem FINISHED.
    pub fn confirm(
        &self,
        side: FinishSide,
        now: DateTime<Utc>,
    ) -> Result<(FinishState, FinishOutcome), ProjectProgress> {
        if !FINISHABLE.contains(&self.progress) {
            return Err(self.progress);
        }

        let mut next = self.clone();
        let (already, counterpart) = match side {
            FinishSide::Company => {
                next.company_confirmed = true;
                (self.company_confirmed, self.customer_confirmed)
            }
            FinishSide::Customer => {
                next.customer_confirmed = true;
                (self.customer_confirmed, self.company_confirmed)
            }
        };

        let outcome = match (self.progress, already, counterpart) {
            (_, true, _) => FinishOutcome::AlreadyConfirmed,
            (ProjectProgress::Finished, false, _) => FinishOutcome::AlreadyFinished,
            (_, false, true) => {
                next.progress = ProjectProgress::Finished;
                if next.finished_at.is_none() {
                    next.finished_at = Some(now);
                }
                FinishOutcome::Finished
            }
            (_, false, false) => FinishOutcome::AwaitingCounterpart,
        };

        Ok((next, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn active() -> FinishState {
        FinishState {
            progress: ProjectProgress::Active,
            company_confirmed: false,
            customer_confirmed: false,
            finished_at: None,
        }
    }

    #[test]
    fn first_confirmation_waits_for_counterpart() {
        let now = Utc::now();
        let (state, outcome) = active().confirm(FinishSide::Company, now).unwrap();
        assert_eq!(outcome, FinishOutcome::AwaitingCounterpart);
        assert_eq!(state.progress, ProjectProgress::Active);
        assert!(state.company_confirmed);
        assert!(state.finished_at.is_none());
    }

    #[test]
    fn second_confirmation_finishes_once() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::minutes(5);
        let (state, _) = active().confirm(FinishSide::Company, t1).unwrap();
        let (state, outcome) = state.confirm(FinishSide::Customer, t2).unwrap();
        assert_eq!(outcome, FinishOutcome::Finished);
        assert_eq!(state.progress, ProjectProgress::Finished);
        assert_eq!(state.finished_at, Some(t2));

        let (again, outcome) = state
            .confirm(FinishSide::Company, t2 + Duration::hours(1))
            .unwrap();
        assert_eq!(outcome, FinishOutcome::AlreadyConfirmed);
        assert_eq!(again, state);
    }

    #[test]
    fn order_of_confirmations_does_not_matter() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(30);

        let (a, _) = active().confirm(FinishSide::Company, t1).unwrap();
        let (a, _) = a.confirm(FinishSide::Customer, t2).unwrap();

        let (b, _) = active().confirm(FinishSide::Customer, t1).unwrap();
        let (b, _) = b.confirm(FinishSide::Company, t2).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn rejects_projects_that_never_started() {
        let mut state = active();
        state.progress = ProjectProgress::Moderated;
        assert_eq!(
            state.confirm(FinishSide::Customer, Utc::now()),
            Err(ProjectProgress::Moderated)
        );
    }

    #[test]
    fn finished_project_keeps_its_timestamp() {
        let stamped = Utc::now() - Duration::days(2);
        let state = FinishState {
            progress: ProjectProgress::Finished,
            company_confirmed: false,
            customer_confirmed: true,
            finished_at: Some(stamped),
        };
        let (next, outcome) = state.confirm(FinishSide::Company, Utc::now()).unwrap();
        assert_eq!(outcome, FinishOutcome::AlreadyFinished);
        assert_eq!(next.finished_at, Some(stamped));
        assert!(next.company_confirmed);
    }
}
