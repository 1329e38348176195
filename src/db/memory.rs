// src/db/memory.rs

// Repositório em memória que implementa todos os traits de persistência.
// Usado pelos testes e pelos cenários de integração em `tests/`.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        company_repo::{CompanyRepository, CompanySpec},
        geography_repo::{GeoPath, GeographyRepository},
        project_repo::{ProjectRepository, ProjectSpec},
        send_request_repo::SendRequestRepository,
    },
    models::{
        company::{Company, CompanyMember, CompanyWithMembers},
        project::{
            FinishSide, FinishTransition, MatchContext, NewProject, Project, ProjectFacts,
            ProjectProgress, ProjectTimeline, FINISHABLE,
        },
        quote::{ProjectSendRequest, QuoteRef, QuoteTimes},
        user::{Customer, Language, UserRole},
    },
};

#[derive(Debug, Clone)]
struct ZipRecord {
    code: String,
    city_id: Uuid,
    provinces: HashSet<Uuid>,
    municipalities: HashSet<Uuid>,
}

impl ZipRecord {
    fn reached_by(&self, path: GeoPath, region_id: &Uuid) -> bool {
        match path {
            GeoPath::Province => self.provinces.contains(region_id),
            GeoPath::Municipality => self.municipalities.contains(region_id),
            GeoPath::City => self.city_id == *region_id,
        }
    }
}

#[derive(Debug, Clone)]
struct QuoteRecord {
    project_id: Uuid,
    company_id: Uuid,
    is_accepted: bool,
    is_interested: bool,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    sequence: i64,
    projects: HashMap<Uuid, Project>,
    companies: HashMap<Uuid, CompanyWithMembers>,
    customers: HashMap<Uuid, Customer>,
    categories: HashMap<Uuid, String>,
    cities: HashMap<Uuid, String>,
    zip_codes: HashMap<Uuid, ZipRecord>,
    company_provinces: HashMap<Uuid, HashSet<Uuid>>,
    company_municipalities: HashMap<Uuid, HashSet<Uuid>>,
    company_cities: HashMap<Uuid, HashSet<Uuid>>,
    quotes: Vec<QuoteRecord>,
    rejected: HashSet<(Uuid, Uuid)>,
    interested: HashSet<(Uuid, Uuid)>,
    send_requests: Vec<ProjectSendRequest>,
}

impl State {
    // Relógio monotônico para que a ordenação por created_at seja determinística
    fn tick(&mut self) -> DateTime<Utc> {
        self.sequence += 1;
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000) + Duration::seconds(self.sequence)
    }

    fn facts(&self, project: &Project) -> ProjectFacts {
        let id = project.id;
        ProjectFacts {
            id,
            category_id: project.category_id,
            zip_code_id: project.zip_code_id,
            progress: project.progress,
            created_at: project.created_at,
            rejected: self
                .rejected
                .iter()
                .filter(|(p, _)| *p == id)
                .map(|(_, c)| *c)
                .collect(),
            interested: self
                .interested
                .iter()
                .filter(|(_, p)| *p == id)
                .map(|(c, _)| *c)
                .collect(),
            offered: self
                .send_requests
                .iter()
                .filter(|r| r.project_id == id)
                .map(|r| r.company_id)
                .collect(),
            quotes: self
                .quotes
                .iter()
                .filter(|q| q.project_id == id)
                .map(|q| QuoteRef {
                    company_id: q.company_id,
                    is_accepted: q.is_accepted,
                    is_interested: q.is_interested,
                })
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    //  SEMENTES (dados de referência e cenários)
    // =========================================================================

    pub fn add_category(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().categories.insert(id, name.to_string());
        id
    }

    pub fn add_city(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().cities.insert(id, name.to_string());
        id
    }

    pub fn add_zip_code(
        &self,
        code: &str,
        city_id: Uuid,
        provinces: &[Uuid],
        municipalities: &[Uuid],
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.state().zip_codes.insert(
            id,
            ZipRecord {
                code: code.to_string(),
                city_id,
                provinces: provinces.iter().copied().collect(),
                municipalities: municipalities.iter().copied().collect(),
            },
        );
        id
    }

    pub fn add_company(&self, name: &str, email: Option<&str>, categories: &[Uuid]) -> Uuid {
        let mut state = self.state();
        let created_at = state.tick();
        let id = Uuid::new_v4();
        state.companies.insert(
            id,
            CompanyWithMembers {
                company: Company {
                    id,
                    name: name.to_string(),
                    email: email.map(str::to_string),
                    email2: None,
                    phone: None,
                    is_notification: true,
                    created_at,
                },
                members: Vec::new(),
                category_ids: categories.to_vec(),
            },
        );
        id
    }

    pub fn set_notification(&self, company_id: Uuid, enabled: bool) {
        if let Some(c) = self.state().companies.get_mut(&company_id) {
            c.company.is_notification = enabled;
        }
    }

    pub fn add_member(&self, company_id: Uuid, name: &str, email: &str, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        if let Some(c) = self.state().companies.get_mut(&company_id) {
            c.members.push(CompanyMember {
                id,
                company_id,
                name: name.to_string(),
                surname: None,
                email: email.to_string(),
                role,
                language: Language::Swedish,
                is_notification: true,
            });
        }
        id
    }

    pub fn serve_provinces(&self, company_id: Uuid, provinces: &[Uuid]) {
        self.state()
            .company_provinces
            .entry(company_id)
            .or_default()
            .extend(provinces.iter().copied());
    }

    pub fn serve_municipalities(&self, company_id: Uuid, municipalities: &[Uuid]) {
        self.state()
            .company_municipalities
            .entry(company_id)
            .or_default()
            .extend(municipalities.iter().copied());
    }

    pub fn serve_cities(&self, company_id: Uuid, cities: &[Uuid]) {
        self.state()
            .company_cities
            .entry(company_id)
            .or_default()
            .extend(cities.iter().copied());
    }

    pub fn add_customer(&self, name: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().customers.insert(
            id,
            Customer {
                id,
                name: name.to_string(),
                surname: None,
                email: email.to_string(),
                language: Language::Swedish,
            },
        );
        id
    }

    pub fn add_project(
        &self,
        name: &str,
        category_id: Option<Uuid>,
        zip_code_id: Option<Uuid>,
        progress: ProjectProgress,
    ) -> Uuid {
        let mut state = self.state();
        let created_at = state.tick();
        let id = Uuid::new_v4();
        state.projects.insert(
            id,
            Project {
                id,
                name: Some(name.to_string()),
                description: None,
                status: None,
                progress,
                desired_start_date: None,
                category_id,
                zip_code_id,
                user_id: None,
                company_id: None,
                is_company_confirmed_finish: false,
                is_customer_confirmed_finish: false,
                started_at: None,
                finished_at: None,
                created_at,
            },
        );
        id
    }

    pub fn set_customer(&self, project_id: Uuid, customer_id: Uuid) {
        if let Some(p) = self.state().projects.get_mut(&project_id) {
            p.user_id = Some(customer_id);
        }
    }

    pub fn assign_company(&self, project_id: Uuid, company_id: Uuid) {
        if let Some(p) = self.state().projects.get_mut(&project_id) {
            p.company_id = Some(company_id);
        }
    }

    pub fn add_quote(&self, project_id: Uuid, company_id: Uuid, accepted: bool) {
        let mut state = self.state();
        let created_at = state.tick();
        state.quotes.push(QuoteRecord {
            project_id,
            company_id,
            is_accepted: accepted,
            is_interested: false,
            created_at,
            accepted_at: accepted.then_some(created_at),
        });
    }

    pub fn reject(&self, project_id: Uuid, company_id: Uuid) {
        self.state().rejected.insert((project_id, company_id));
    }

    pub fn project(&self, project_id: Uuid) -> Option<Project> {
        self.state().projects.get(&project_id).cloned()
    }

    pub fn send_requests(&self) -> Vec<ProjectSendRequest> {
        self.state().send_requests.clone()
    }
}

// =========================================================================
//  PROJETOS
// =========================================================================

#[async_trait]
impl ProjectRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        Ok(self.state().projects.get(&id).cloned())
    }

    async fn find_match_context(&self, id: Uuid) -> Result<Option<MatchContext>, AppError> {
        let state = self.state();
        let Some(project) = state.projects.get(&id).cloned() else {
            return Ok(None);
        };

        let zip = project.zip_code_id.and_then(|z| state.zip_codes.get(&z));
        Ok(Some(MatchContext {
            category_name: project
                .category_id
                .and_then(|c| state.categories.get(&c).cloned()),
            zip_code: zip.map(|z| z.code.clone()),
            city_name: zip.and_then(|z| state.cities.get(&z.city_id).cloned()),
            customer: project.user_id.and_then(|u| state.customers.get(&u).cloned()),
            project,
        }))
    }

    async fn find_facts_by_spec(&self, spec: &ProjectSpec) -> Result<Vec<ProjectFacts>, AppError> {
        let state = self.state();
        let mut facts: Vec<ProjectFacts> = state
            .projects
            .values()
            .filter(|p| match spec {
                ProjectSpec::ById(id) => p.id == *id,
                ProjectSpec::InCategories(categories) => p
                    .category_id
                    .map(|c| categories.contains(&c))
                    .unwrap_or(false),
                ProjectSpec::QuotedBy {
                    company_id,
                    accepted,
                } => state.quotes.iter().any(|q| {
                    q.project_id == p.id && q.company_id == *company_id && q.is_accepted == *accepted
                }),
            })
            .map(|p| state.facts(p))
            .collect();

        facts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(facts)
    }

    async fn insert(&self, new_project: &NewProject) -> Result<Project, AppError> {
        let mut state = self.state();
        let created_at = state.tick();
        let project = Project {
            id: Uuid::new_v4(),
            name: Some(new_project.name.clone()),
            description: new_project.description.clone(),
            status: new_project.status,
            progress: ProjectProgress::Created,
            desired_start_date: new_project.desired_start_date,
            category_id: Some(new_project.category_id),
            zip_code_id: Some(new_project.zip_code_id),
            user_id: new_project.user_id,
            company_id: None,
            is_company_confirmed_finish: false,
            is_customer_confirmed_finish: false,
            started_at: None,
            finished_at: None,
            created_at,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn transition_progress(
        &self,
        id: Uuid,
        from: &'static [ProjectProgress],
        to: ProjectProgress,
        now: DateTime<Utc>,
    ) -> Result<Project, AppError> {
        let mut state = self.state();
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| AppError::project_not_found(id))?;

        if !from.contains(&project.progress) {
            return Err(AppError::InvalidProgress {
                id,
                expected: from,
                found: project.progress,
            });
        }

        project.progress = to;
        if to == ProjectProgress::Active {
            project.started_at = Some(now);
            project.is_company_confirmed_finish = false;
            project.is_customer_confirmed_finish = false;
        }
        Ok(project.clone())
    }

    async fn confirm_finish(
        &self,
        id: Uuid,
        side: FinishSide,
        now: DateTime<Utc>,
    ) -> Result<FinishTransition, AppError> {
        // O lock do estado cobre leitura e escrita, como o FOR UPDATE no Postgres
        let mut state = self.state();
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| AppError::project_not_found(id))?;

        let (next, outcome) = project
            .finish_state()
            .confirm(side, now)
            .map_err(|found| AppError::InvalidProgress {
                id,
                expected: FINISHABLE,
                found,
            })?;

        project.progress = next.progress;
        project.is_company_confirmed_finish = next.company_confirmed;
        project.is_customer_confirmed_finish = next.customer_confirmed;
        project.finished_at = next.finished_at;

        Ok(FinishTransition {
            project_id: id,
            side,
            outcome,
            state: next,
        })
    }

    async fn timeline(&self, id: Uuid) -> Result<Option<ProjectTimeline>, AppError> {
        let state = self.state();
        Ok(state.projects.get(&id).map(|p| ProjectTimeline {
            progress: p.progress,
            created_at: p.created_at,
            started_at: p.started_at,
            finished_at: p.finished_at,
            is_company_confirmed_finish: p.is_company_confirmed_finish,
            is_customer_confirmed_finish: p.is_customer_confirmed_finish,
            quotes: state
                .quotes
                .iter()
                .filter(|q| q.project_id == id)
                .map(|q| QuoteTimes {
                    created_at: q.created_at,
                    accepted_at: q.accepted_at,
                })
                .collect(),
        }))
    }

    async fn add_interest(&self, project_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().interested.insert((company_id, project_id)))
    }
}

// =========================================================================
//  EMPRESAS
// =========================================================================

#[async_trait]
impl CompanyRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CompanyWithMembers>, AppError> {
        Ok(self.state().companies.get(&id).cloned())
    }

    async fn find_by_spec(&self, spec: &CompanySpec) -> Result<Vec<CompanyWithMembers>, AppError> {
        let predicates = spec.predicates();
        let mut companies: Vec<CompanyWithMembers> = self
            .state()
            .companies
            .values()
            .filter(|c| predicates.iter().all(|p| p(c)))
            .cloned()
            .collect();

        companies.sort_by(|a, b| a.company.name.cmp(&b.company.name));
        Ok(companies)
    }

    async fn interested_projects(&self, company_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
        let state = self.state();
        Ok(state
            .interested
            .iter()
            .filter(|(c, _)| *c == company_id)
            .map(|(_, p)| *p)
            .filter(|p| {
                state
                    .projects
                    .get(p)
                    .is_some_and(|p| p.progress == ProjectProgress::Moderated)
            })
            .collect())
    }
}

// =========================================================================
//  GEOGRAFIA
// =========================================================================

#[async_trait]
impl GeographyRepository for InMemoryStore {
    async fn company_exists(&self, company_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().companies.contains_key(&company_id))
    }

    async fn zip_codes_by_path(
        &self,
        path: GeoPath,
        company_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, AppError> {
        let state = self.state();
        let mut pairs = Vec::new();

        for company_id in company_ids {
            let memberships = match path {
                GeoPath::Province => state.company_provinces.get(company_id),
                GeoPath::Municipality => state.company_municipalities.get(company_id),
                GeoPath::City => state.company_cities.get(company_id),
            };
            let Some(memberships) = memberships else {
                continue;
            };

            for (zip_id, zip) in &state.zip_codes {
                if memberships.iter().any(|m| zip.reached_by(path, m)) {
                    pairs.push((*company_id, *zip_id));
                }
            }
        }

        Ok(pairs)
    }
}

// =========================================================================
//  ENVIOS DIRECIONADOS
// =========================================================================

#[async_trait]
impl SendRequestRepository for InMemoryStore {
    async fn upsert_many(&self, project_id: Uuid, company_ids: &[Uuid]) -> Result<u64, AppError> {
        let mut state = self.state();
        let mut inserted = 0;

        for company_id in company_ids {
            let exists = state
                .send_requests
                .iter()
                .any(|r| r.project_id == project_id && r.company_id == *company_id);
            if !exists {
                let created_at = state.tick();
                state.send_requests.push(ProjectSendRequest {
                    id: Uuid::new_v4(),
                    company_id: *company_id,
                    project_id,
                    created_at,
                });
                inserted += 1;
            }
        }

        Ok(inserted)
    }
}
