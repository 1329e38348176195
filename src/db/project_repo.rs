// src/db/project_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        project::{
            FinishSide, FinishState, FinishTransition, MatchContext, FINISHABLE, NewProject, Project,
            ProjectFacts, ProjectProgress, ProjectTimeline,
        },
        quote::{QuoteRef, QuoteTimes},
        user::{Customer, Language},
    },
};

/// Seleção de projetos por conjunto, usada pelo feed das empresas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSpec {
    ById(Uuid),
    InCategories(Vec<Uuid>),
    QuotedBy { company_id: Uuid, accepted: bool },
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError>;

    async fn find_match_context(&self, id: Uuid) -> Result<Option<MatchContext>, AppError>;

    async fn find_facts_by_spec(&self, spec: &ProjectSpec) -> Result<Vec<ProjectFacts>, AppError>;

    async fn insert(&self, new_project: &NewProject) -> Result<Project, AppError>;

    /// Atualização condicional de progresso. Entrar em ACTIVE grava `started_at`
    /// e zera as duas flags de confirmação de fim.
    async fn transition_progress(
        &self,
        id: Uuid,
        from: &'static [ProjectProgress],
        to: ProjectProgress,
        now: DateTime<Utc>,
    ) -> Result<Project, AppError>;

    /// Leitura-modificação-escrita das flags de fim, serializada por projeto.
    async fn confirm_finish(
        &self,
        id: Uuid,
        side: FinishSide,
        now: DateTime<Utc>,
    ) -> Result<FinishTransition, AppError>;

    async fn timeline(&self, id: Uuid) -> Result<Option<ProjectTimeline>, AppError>;

    /// Marca o projeto no conjunto de interesse da empresa. Retorna `false` se já estava.
    async fn add_interest(&self, project_id: Uuid, company_id: Uuid) -> Result<bool, AppError>;
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FACTS_SELECT: &str = r#"
    SELECT
        p.id, p.category_id, p.zip_code_id, p.progress, p.created_at,
        ARRAY(SELECT r.company_id FROM project_rejected r WHERE r.project_id = p.id) AS rejected,
        ARRAY(SELECT i.company_id FROM company_interested_projects i WHERE i.project_id = p.id) AS interested,
        ARRAY(SELECT s.company_id FROM project_send_requests s WHERE s.project_id = p.id) AS offered,
        COALESCE(
            (SELECT json_agg(json_build_object(
                'companyId', q.company_id,
                'isAccepted', q.is_accepted,
                'isInterested', q.is_interested))
             FROM quotes q WHERE q.project_id = p.id),
            '[]'::json
        ) AS quotes
    FROM projects p
"#;

#[derive(FromRow)]
struct FactsRow {
    id: Uuid,
    category_id: Option<Uuid>,
    zip_code_id: Option<Uuid>,
    progress: ProjectProgress,
    created_at: DateTime<Utc>,
    rejected: Vec<Uuid>,
    interested: Vec<Uuid>,
    offered: Vec<Uuid>,
    quotes: Json<Vec<QuoteRef>>,
}

impl From<FactsRow> for ProjectFacts {
    fn from(row: FactsRow) -> Self {
        ProjectFacts {
            id: row.id,
            category_id: row.category_id,
            zip_code_id: row.zip_code_id,
            progress: row.progress,
            created_at: row.created_at,
            rejected: row.rejected.into_iter().collect(),
            interested: row.interested.into_iter().collect(),
            offered: row.offered.into_iter().collect(),
            quotes: row.quotes.0,
        }
    }
}

#[derive(FromRow)]
struct MatchContextRow {
    #[sqlx(flatten)]
    project: Project,
    category_name: Option<String>,
    zip_code: Option<String>,
    city_name: Option<String>,
    customer_id: Option<Uuid>,
    customer_name: Option<String>,
    customer_surname: Option<String>,
    customer_email: Option<String>,
    customer_language: Option<Language>,
}

impl From<MatchContextRow> for MatchContext {
    fn from(row: MatchContextRow) -> Self {
        let customer = match (row.customer_id, row.customer_name, row.customer_email) {
            (Some(id), Some(name), Some(email)) => Some(Customer {
                id,
                name,
                surname: row.customer_surname,
                email,
                language: row.customer_language.unwrap_or_default(),
            }),
            _ => None,
        };

        MatchContext {
            project: row.project,
            category_name: row.category_name,
            zip_code: row.zip_code,
            city_name: row.city_name,
            customer,
        }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    async fn find_match_context(&self, id: Uuid) -> Result<Option<MatchContext>, AppError> {
        let row = sqlx::query_as::<_, MatchContextRow>(
            r#"
            SELECT
                p.*,
                c.name AS category_name,
                z.code AS zip_code,
                ci.name AS city_name,
                u.id AS customer_id,
                u.name AS customer_name,
                u.surname AS customer_surname,
                u.email AS customer_email,
                u.language AS customer_language
            FROM projects p
            LEFT JOIN categories c ON c.id = p.category_id
            LEFT JOIN zip_codes z ON z.id = p.zip_code_id
            LEFT JOIN cities ci ON ci.id = z.city_id
            LEFT JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MatchContext::from))
    }

    async fn find_facts_by_spec(&self, spec: &ProjectSpec) -> Result<Vec<ProjectFacts>, AppError> {
        let rows = match spec {
            ProjectSpec::ById(id) => {
                sqlx::query_as::<_, FactsRow>(&format!("{FACTS_SELECT} WHERE p.id = $1"))
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            ProjectSpec::InCategories(categories) => {
                sqlx::query_as::<_, FactsRow>(&format!(
                    "{FACTS_SELECT} WHERE p.category_id = ANY($1) ORDER BY p.created_at DESC"
                ))
                .bind(categories)
                .fetch_all(&self.pool)
                .await?
            }
            ProjectSpec::QuotedBy {
                company_id,
                accepted,
            } => {
                sqlx::query_as::<_, FactsRow>(&format!(
                    r#"{FACTS_SELECT}
                    WHERE EXISTS (
                        SELECT 1 FROM quotes q
                        WHERE q.project_id = p.id AND q.company_id = $1 AND q.is_accepted = $2
                    )
                    ORDER BY p.created_at DESC"#
                ))
                .bind(company_id)
                .bind(accepted)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(ProjectFacts::from).collect())
    }

    async fn insert(&self, new_project: &NewProject) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                name, description, status, category_id, zip_code_id, desired_start_date, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&new_project.name)
        .bind(&new_project.description)
        .bind(new_project.status)
        .bind(new_project.category_id)
        .bind(new_project.zip_code_id)
        .bind(new_project.desired_start_date)
        .bind(new_project.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(project)
    }

    async fn transition_progress(
        &self,
        id: Uuid,
        from: &'static [ProjectProgress],
        to: ProjectProgress,
        now: DateTime<Utc>,
    ) -> Result<Project, AppError> {
        let allowed: Vec<&str> = from.iter().map(|p| p.as_str()).collect();

        // O WHERE sobre o progresso atual torna a transição atômica
        let updated = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET
                progress = $3,
                started_at = CASE WHEN $3 = 'ACTIVE'::project_progress THEN $4 ELSE started_at END,
                is_company_confirmed_finish = CASE WHEN $3 = 'ACTIVE'::project_progress
                    THEN FALSE ELSE is_company_confirmed_finish END,
                is_customer_confirmed_finish = CASE WHEN $3 = 'ACTIVE'::project_progress
                    THEN FALSE ELSE is_customer_confirmed_finish END
            WHERE id = $1 AND progress::text = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&allowed)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(project) = updated {
            return Ok(project);
        }

        // Nada atualizado: projeto inexistente ou em outro estado
        let current = sqlx::query_scalar::<_, ProjectProgress>(
            "SELECT progress FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match current {
            None => Err(AppError::project_not_found(id)),
            Some(found) => Err(AppError::InvalidProgress {
                id,
                expected: from,
                found,
            }),
        }
    }

    async fn confirm_finish(
        &self,
        id: Uuid,
        side: FinishSide,
        now: DateTime<Utc>,
    ) -> Result<FinishTransition, AppError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE serializa confirmações concorrentes do mesmo projeto
        let current = sqlx::query_as::<_, FinishState>(
            r#"
            SELECT
                progress,
                is_company_confirmed_finish AS company_confirmed,
                is_customer_confirmed_finish AS customer_confirmed,
                finished_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::project_not_found(id))?;

        let (next, outcome) = current.confirm(side, now).map_err(|found| AppError::InvalidProgress {
            id,
            expected: FINISHABLE,
            found,
        })?;

        if next != current {
            sqlx::query(
                r#"
                UPDATE projects
                SET
                    progress = $2,
                    is_company_confirmed_finish = $3,
                    is_customer_confirmed_finish = $4,
                    finished_at = $5
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(next.progress)
            .bind(next.company_confirmed)
            .bind(next.customer_confirmed)
            .bind(next.finished_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(FinishTransition {
            project_id: id,
            side,
            outcome,
            state: next,
        })
    }

    async fn timeline(&self, id: Uuid) -> Result<Option<ProjectTimeline>, AppError> {
        let Some(project) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let quotes = sqlx::query_as::<_, QuoteTimes>(
            "SELECT created_at, accepted_at FROM quotes WHERE project_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProjectTimeline {
            progress: project.progress,
            created_at: project.created_at,
            started_at: project.started_at,
            finished_at: project.finished_at,
            is_company_confirmed_finish: project.is_company_confirmed_finish,
            is_customer_confirmed_finish: project.is_customer_confirmed_finish,
            quotes,
        }))
    }

    async fn add_interest(&self, project_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO company_interested_projects (company_id, project_id)
            VALUES ($1, $2)
            ON CONFLICT (company_id, project_id) DO NOTHING
            "#,
        )
        .bind(company_id)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
