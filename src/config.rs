// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use url::Url;

use crate::{
    db::{
        memory::InMemoryStore, CompanyRepository, GeographyRepository, PgCompanyRepository,
        PgGeographyRepository, PgMessageRepository, PgProjectRepository, PgSendRequestRepository,
        ProjectRepository, SendRequestRepository,
    },
    services::{
        finish::FinishService,
        geography::GeographyIndex,
        matching::MatchService,
        notifications::{BaseUrlInviteIssuer, InviteIssuer, Mailer, MessageSink, TracingMailer},
        project_service::ProjectService,
        requests::RequestService,
        triggers::{NotificationSettings, TriggersService},
    },
};

// =========================================================================
//  VARIÁVEIS DE AMBIENTE
// =========================================================================

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub base_url: Url,
    pub db_max_connections: u32,
    pub admin_emails: Vec<String>,
    pub notify_concurrency: usize,
    pub notify_timeout: Duration,
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} tem um valor inválido: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let base_url = env::var("BASE_URL").context("BASE_URL deve ser definida")?;
        let base_url = Url::parse(&base_url).context("BASE_URL não é uma URL válida")?;

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            base_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            admin_emails,
            notify_concurrency: var_or("NOTIFY_CONCURRENCY", 8)?,
            notify_timeout: Duration::from_millis(var_or("NOTIFY_TIMEOUT_MS", 5_000)?),
        })
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            base_url: self.base_url.clone(),
            admin_emails: self.admin_emails.clone(),
            concurrency: self.notify_concurrency,
            dispatch_timeout: self.notify_timeout,
        }
    }
}

pub async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&settings.database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// =========================================================================
//  GRAFO DE DEPENDÊNCIAS
// =========================================================================

#[derive(Clone)]
pub struct Repositories {
    pub projects: Arc<dyn ProjectRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub geography: Arc<dyn GeographyRepository>,
    pub send_requests: Arc<dyn SendRequestRepository>,
}

impl Repositories {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            projects: Arc::new(PgProjectRepository::new(pool.clone())),
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            geography: Arc::new(PgGeographyRepository::new(pool.clone())),
            send_requests: Arc::new(PgSendRequestRepository::new(pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            projects: store.clone(),
            companies: store.clone(),
            geography: store.clone(),
            send_requests: store,
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub mailer: Arc<dyn Mailer>,
    pub invites: Arc<dyn InviteIssuer>,
    pub messages: Arc<dyn MessageSink>,
}

#[derive(Clone)]
pub struct AppState {
    pub project_service: Arc<ProjectService>,
    pub match_service: Arc<MatchService>,
    pub finish_service: Arc<FinishService>,
    pub request_service: Arc<RequestService>,
}

impl AppState {
    pub fn new(settings: &Settings, pool: &PgPool) -> Self {
        let collaborators = Collaborators {
            mailer: Arc::new(TracingMailer),
            invites: Arc::new(BaseUrlInviteIssuer::new(settings.base_url.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
        };

        Self::from_parts(
            Repositories::postgres(pool),
            collaborators,
            settings.notification_settings(),
        )
    }

    pub fn from_parts(
        repos: Repositories,
        collaborators: Collaborators,
        notification: NotificationSettings,
    ) -> Self {
        let triggers = Arc::new(TriggersService::new(
            collaborators.mailer,
            collaborators.invites,
            collaborators.messages,
            notification,
        ));
        let geography = GeographyIndex::new(repos.geography.clone());

        let match_service = Arc::new(MatchService::new(
            repos.projects.clone(),
            repos.companies.clone(),
            repos.send_requests.clone(),
            geography.clone(),
            triggers.clone(),
        ));
        let project_service = Arc::new(ProjectService::new(
            repos.projects.clone(),
            match_service.clone(),
            triggers.clone(),
        ));
        let finish_service = Arc::new(FinishService::new(
            repos.projects.clone(),
            repos.companies.clone(),
            triggers.clone(),
        ));
        let request_service = Arc::new(RequestService::new(
            repos.projects,
            repos.companies,
            geography,
            triggers,
        ));

        Self {
            project_service,
            match_service,
            finish_service,
            request_service,
        }
    }
}
