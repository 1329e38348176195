// src/db/company_repo.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{Company, CompanyMember, CompanyWithMembers},
};

type CompanyPredicate = Box<dyn Fn(&CompanyWithMembers) -> bool + Send + Sync>;

/// Filtros opcionais sobre empresas. Cada campo preenchido vira um predicado
/// independente; todos precisam ser satisfeitos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanySpec {
    pub ids: Option<Vec<Uuid>>,
    pub category_id: Option<Uuid>,
    pub require_email: bool,
    pub name_search: Option<String>,
}

impl CompanySpec {
    pub fn by_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn by_category(category_id: Uuid) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn predicates(&self) -> Vec<CompanyPredicate> {
        let mut predicates: Vec<CompanyPredicate> = Vec::new();

        if let Some(ids) = &self.ids {
            let ids: HashSet<Uuid> = ids.iter().copied().collect();
            predicates.push(Box::new(move |c: &CompanyWithMembers| ids.contains(&c.id())));
        }
        if let Some(category_id) = self.category_id {
            predicates.push(Box::new(move |c: &CompanyWithMembers| {
                c.category_ids.contains(&category_id)
            }));
        }
        if self.require_email {
            predicates.push(Box::new(|c: &CompanyWithMembers| c.company.contact_email().is_some()));
        }
        if let Some(search) = &self.name_search {
            let needle = search.to_lowercase();
            predicates.push(Box::new(move |c: &CompanyWithMembers| {
                c.company.name.to_lowercase().contains(&needle)
            }));
        }

        predicates
    }

    pub fn matches(&self, company: &CompanyWithMembers) -> bool {
        self.predicates().iter().all(|p| p(company))
    }
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CompanyWithMembers>, AppError>;

    /// Empresas que satisfazem o filtro, ordenadas por nome.
    async fn find_by_spec(&self, spec: &CompanySpec) -> Result<Vec<CompanyWithMembers>, AppError>;

    /// Projetos MODERATED em que a empresa marcou interesse.
    async fn interested_projects(&self, company_id: Uuid) -> Result<HashSet<Uuid>, AppError>;
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn members_of(&self, company_ids: &[Uuid]) -> Result<Vec<CompanyMember>, AppError> {
        let members = sqlx::query_as::<_, CompanyMember>(
            r#"
            SELECT id, company_id, name, surname, email, role, language, is_notification
            FROM users
            WHERE company_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}

#[derive(FromRow)]
struct CompanyRow {
    #[sqlx(flatten)]
    company: Company,
    category_ids: Vec<Uuid>,
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CompanyWithMembers>, AppError> {
        let mut found = self.find_by_spec(&CompanySpec::by_ids(vec![id])).await?;
        Ok(found.pop())
    }

    async fn find_by_spec(&self, spec: &CompanySpec) -> Result<Vec<CompanyWithMembers>, AppError> {
        // Parâmetros nulos desligam o respectivo filtro
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT
                c.id, c.name, c.email, c.email2, c.phone, c.is_notification, c.created_at,
                ARRAY(
                    SELECT cc.category_id FROM company_categories cc WHERE cc.company_id = c.id
                ) AS category_ids
            FROM companies c
            WHERE ($1::uuid[] IS NULL OR c.id = ANY($1))
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM company_categories cc
                    WHERE cc.company_id = c.id AND cc.category_id = $2
              ))
              AND (NOT $3 OR (c.email IS NOT NULL AND btrim(c.email) <> ''))
              AND ($4::text IS NULL OR c.name ILIKE '%' || $4 || '%')
            ORDER BY c.name ASC
            "#,
        )
        .bind(spec.ids.as_deref())
        .bind(spec.category_id)
        .bind(spec.require_email)
        .bind(spec.name_search.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.company.id).collect();
        let mut members_by_company: HashMap<Uuid, Vec<CompanyMember>> = HashMap::new();
        for member in self.members_of(&ids).await? {
            members_by_company
                .entry(member.company_id)
                .or_default()
                .push(member);
        }

        Ok(rows
            .into_iter()
            .map(|row| CompanyWithMembers {
                members: members_by_company.remove(&row.company.id).unwrap_or_default(),
                company: row.company,
                category_ids: row.category_ids,
            })
            .collect())
    }

    async fn interested_projects(&self, company_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT i.project_id
            FROM company_interested_projects i
            JOIN projects p ON p.id = i.project_id
            WHERE i.company_id = $1 AND p.progress = 'MODERATED'
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn company(name: &str, email: Option<&str>, categories: Vec<Uuid>) -> CompanyWithMembers {
        CompanyWithMembers {
            company: Company {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.map(str::to_string),
                email2: None,
                phone: None,
                is_notification: true,
                created_at: Utc::now(),
            },
            members: Vec::new(),
            category_ids: categories,
        }
    }

    #[test]
    fn empty_spec_matches_everything() {
        let c = company("Rör AB", None, vec![]);
        assert!(CompanySpec::default().matches(&c));
    }

    #[test]
    fn predicates_are_conjunctive() {
        let plumbing = Uuid::new_v4();
        let spec = CompanySpec {
            category_id: Some(plumbing),
            require_email: true,
            name_search: Some("rör".to_string()),
            ..CompanySpec::default()
        };

        assert!(spec.matches(&company("Rör AB", Some("info@ror.se"), vec![plumbing])));
        assert!(!spec.matches(&company("Rör AB", Some("  "), vec![plumbing])));
        assert!(!spec.matches(&company("Rör AB", Some("info@ror.se"), vec![])));
        assert!(!spec.matches(&company("Måleri AB", Some("info@m.se"), vec![plumbing])));
    }
}
