// src/services/project_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::project_repo::ProjectRepository,
    models::project::{NewProject, Project, ProjectProgress, ProjectTimeline},
    services::{
        matching::{MatchReport, MatchRequest, MatchService},
        triggers::TriggersService,
    },
};

#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    matcher: Arc<MatchService>,
    triggers: Arc<TriggersService>,
}

impl ProjectService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        matcher: Arc<MatchService>,
        triggers: Arc<TriggersService>,
    ) -> Self {
        Self {
            projects,
            matcher,
            triggers,
        }
    }

    pub async fn create_project(&self, payload: NewProject) -> Result<Project, AppError> {
        payload.validate()?;

        let project = self.projects.insert(&payload).await?;
        tracing::info!(project_id = %project.id, "🏗️ Projeto criado");

        if let Some(ctx) = self.projects.find_match_context(project.id).await? {
            let report = self.triggers.new_project(&ctx).await;
            if !report.failures.is_empty() {
                tracing::warn!(project_id = %project.id, "⚠️ Aviso de novo projeto não entregue");
            }
        }

        Ok(project)
    }

    /// CREATED → MODERATED e dispara o match em broadcast.
    /// Repetir sobre um projeto já MODERATED apenas refaz o match.
    pub async fn mark_as_moderated(&self, project_id: Uuid) -> Result<MatchReport, AppError> {
        let transition = self
            .projects
            .transition_progress(
                project_id,
                &[ProjectProgress::Created],
                ProjectProgress::Moderated,
                Utc::now(),
            )
            .await;

        match transition {
            Ok(_) => tracing::info!(project_id = %project_id, "✅ Projeto moderado"),
            // Já moderado (inclusive por uma chamada concorrente): só refaz o match
            Err(AppError::InvalidProgress {
                found: ProjectProgress::Moderated,
                ..
            }) => {}
            Err(e) => return Err(e),
        }

        self.matcher
            .match_project(project_id, MatchRequest::default())
            .await
    }

    pub async fn start_project(&self, project_id: Uuid) -> Result<Project, AppError> {
        let project = self
            .projects
            .transition_progress(
                project_id,
                &[ProjectProgress::Moderated, ProjectProgress::QuotaChosen],
                ProjectProgress::Active,
                Utc::now(),
            )
            .await?;

        tracing::info!(project_id = %project_id, "🚧 Projeto iniciado");
        Ok(project)
    }

    pub async fn timeline(&self, project_id: Uuid) -> Result<ProjectTimeline, AppError> {
        self.projects
            .timeline(project_id)
            .await?
            .ok_or_else(|| AppError::project_not_found(project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryStore;
    use crate::models::notification::EventTrigger;
    use crate::services::{geography::GeographyIndex, triggers::NotificationSettings};
    use crate::testing::{RecordingMailer, RecordingMessageSink, StaticInviteIssuer};
    use assert_matches::assert_matches;
    use std::time::Duration;
    use url::Url;

    fn service(store: Arc<InMemoryStore>, mailer: Arc<RecordingMailer>) -> ProjectService {
        let triggers = Arc::new(TriggersService::new(
            mailer,
            Arc::new(StaticInviteIssuer::new()),
            Arc::new(RecordingMessageSink::new()),
            NotificationSettings {
                base_url: Url::parse("https://bygg.example").unwrap(),
                admin_emails: vec!["ops@bygg.example".to_string()],
                concurrency: 2,
                dispatch_timeout: Duration::from_secs(1),
            },
        ));
        let matcher = Arc::new(MatchService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            GeographyIndex::new(store.clone()),
            triggers.clone(),
        ));
        ProjectService::new(store, matcher, triggers)
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: None,
            status: None,
            category_id: Uuid::new_v4(),
            zip_code_id: Uuid::new_v4(),
            desired_start_date: None,
            user_id: None,
        }
    }

    #[tokio::test]
    async fn creation_validates_and_alerts_admins() {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let projects = service(store, mailer.clone());

        assert_matches!(
            projects.create_project(new_project("")).await,
            Err(AppError::ValidationError(_))
        );

        let project = projects.create_project(new_project("Altan")).await.unwrap();
        assert_eq!(project.progress, ProjectProgress::Created);
        assert_eq!(mailer.sent_with(EventTrigger::AdminNewProject).len(), 1);
    }

    #[tokio::test]
    async fn moderation_is_idempotent_and_runs_the_match() {
        let store = Arc::new(InMemoryStore::new());
        let projects = service(store.clone(), Arc::new(RecordingMailer::new()));
        let category = store.add_category("Måleri");
        let project = store.add_project("Fasad", Some(category), None, ProjectProgress::Created);

        let report = projects.mark_as_moderated(project).await.unwrap();
        assert!(!report.directed);
        assert_eq!(store.project(project).map(|p| p.progress), Some(ProjectProgress::Moderated));

        assert!(projects.mark_as_moderated(project).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_moderation_both_succeed() {
        let store = Arc::new(InMemoryStore::new());
        let projects = service(store.clone(), Arc::new(RecordingMailer::new()));
        let category = store.add_category("Måleri");
        let project = store.add_project("Fasad", Some(category), None, ProjectProgress::Created);

        let (first, second) = tokio::join!(
            projects.mark_as_moderated(project),
            projects.mark_as_moderated(project)
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(store.project(project).map(|p| p.progress), Some(ProjectProgress::Moderated));
    }

    #[tokio::test]
    async fn moderating_an_unknown_project_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let projects = service(store, Arc::new(RecordingMailer::new()));

        assert_matches!(
            projects.mark_as_moderated(Uuid::new_v4()).await,
            Err(AppError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn moderation_of_an_active_project_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let projects = service(store.clone(), Arc::new(RecordingMailer::new()));
        let project = store.add_project("Fasad", None, None, ProjectProgress::Active);

        assert_matches!(
            projects.mark_as_moderated(project).await,
            Err(AppError::InvalidProgress { found: ProjectProgress::Active, .. })
        );
    }

    #[tokio::test]
    async fn starting_resets_the_finish_flags() {
        let store = Arc::new(InMemoryStore::new());
        let projects = service(store.clone(), Arc::new(RecordingMailer::new()));
        let project = store.add_project("Kök", None, None, ProjectProgress::QuotaChosen);

        let started = projects.start_project(project).await.unwrap();
        assert_eq!(started.progress, ProjectProgress::Active);
        assert!(started.started_at.is_some());
        assert!(!started.is_company_confirmed_finish && !started.is_customer_confirmed_finish);

        let timeline = projects.timeline(project).await.unwrap();
        assert_eq!(timeline.started_at, started.started_at);
        assert!(timeline.finished_at.is_none());
    }
}
