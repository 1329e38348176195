// src/services/triggers.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use serde_json::json;
use url::Url;
use uuid::Uuid;

use crate::{
    common::error::NotifyError,
    models::{
        company::{CompanyWithMembers, MatchableCompany, MembershipGroup},
        notification::{EventTrigger, FanOutReport, MessageFromType, NewMessage, TemplateEmail},
        project::{DesiredStartDate, MatchContext},
        user::Language,
    },
    services::notifications::{InviteIssuer, Mailer, MessageSink},
};

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub base_url: Url,
    pub admin_emails: Vec<String>,
    /// Máximo de despachos simultâneos no fan-out
    pub concurrency: usize,
    pub dispatch_timeout: Duration,
}

// =========================================================================
//  TEXTOS LOCALIZADOS
// =========================================================================

pub fn start_date_label(date: DesiredStartDate, language: Language) -> &'static str {
    match (language, date) {
        (Language::Swedish, DesiredStartDate::Asap) => "Så snart som möjligt",
        (Language::Swedish, DesiredStartDate::OneMonth) => "Inom en månad",
        (Language::Swedish, DesiredStartDate::ThreeMonths) => "Inom tre månader",
        (Language::Swedish, DesiredStartDate::Flexible) => "Flexibelt",
        (Language::English, DesiredStartDate::Asap) => "As soon as possible",
        (Language::English, DesiredStartDate::OneMonth) => "Within a month",
        (Language::English, DesiredStartDate::ThreeMonths) => "Within three months",
        (Language::English, DesiredStartDate::Flexible) => "Flexible",
    }
}

pub fn matched_message(language: Language, project_name: &str) -> String {
    match language {
        Language::Swedish => format!("Nytt projekt som matchar ditt företag: {project_name}"),
        Language::English => format!("New project matching your company: {project_name}"),
    }
}

/// Uma mensagem por funcionário registrado das empresas com conta.
fn in_app_messages(ctx: &MatchContext, has_members: &[MatchableCompany]) -> Vec<NewMessage> {
    has_members
        .iter()
        .filter(|company| company.group == MembershipGroup::HasMembers)
        .flat_map(|company| company.contacts.iter())
        .filter_map(|contact| {
            contact.user_id().map(|user_id| NewMessage {
                user_id,
                from_project_id: ctx.project.id,
                from_type: MessageFromType::Project,
                text: matched_message(contact.language(), ctx.project.display_name()),
            })
        })
        .collect()
}

// =========================================================================
//  SERVIÇO
// =========================================================================

/// Dispara os e-mails e mensagens internas dos eventos do core.
/// Toda falha vira uma entrada no `FanOutReport`; nada aqui retorna erro.
#[derive(Clone)]
pub struct TriggersService {
    mailer: Arc<dyn Mailer>,
    invites: Arc<dyn InviteIssuer>,
    messages: Arc<dyn MessageSink>,
    settings: NotificationSettings,
}

impl TriggersService {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        invites: Arc<dyn InviteIssuer>,
        messages: Arc<dyn MessageSink>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            mailer,
            invites,
            messages,
            settings,
        }
    }

    fn link(&self, path: &str) -> Result<Url, NotifyError> {
        self.settings
            .base_url
            .join(path)
            .map_err(|e| NotifyError::InvalidUrl(e.to_string()))
    }

    async fn bounded<T, F>(&self, dispatch: F) -> Result<T, NotifyError>
    where
        F: Future<Output = Result<T, NotifyError>>,
    {
        let limit = self.settings.dispatch_timeout;
        tokio::time::timeout(limit, dispatch)
            .await
            .unwrap_or_else(|_| Err(NotifyError::Timeout(limit.as_millis() as u64)))
    }

    async fn deliver_one(
        &self,
        company_id: Option<Uuid>,
        email: Result<TemplateEmail, NotifyError>,
    ) -> FanOutReport {
        let mut report = FanOutReport {
            attempted: 1,
            ..FanOutReport::default()
        };

        let outcome = match email {
            Ok(email) => {
                let alias = email.template_alias.alias();
                self.bounded(self.mailer.send_template(email))
                    .await
                    .map(|_| alias)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(alias) => {
                report.delivered = 1;
                tracing::info!(template = alias, "📨 Notificação enviada");
            }
            Err(e) => {
                tracing::warn!(company_id = ?company_id, error = %e, "⚠️ Falha ao enviar notificação");
                report.record_failure(company_id, e);
            }
        }
        report
    }

    // --- Novo projeto (lote para os administradores) ---

    pub async fn new_project(&self, ctx: &MatchContext) -> FanOutReport {
        let project = &ctx.project;
        let mut report = FanOutReport {
            attempted: self.settings.admin_emails.len(),
            ..FanOutReport::default()
        };
        if self.settings.admin_emails.is_empty() {
            return report;
        }

        let project_url = match self.link(&format!("/admin/projects/{}", project.id)) {
            Ok(url) => url,
            Err(e) => {
                report.record_failure(None, e);
                return report;
            }
        };

        let model = json!({
            "projectName": project.display_name(),
            "category": ctx.category_name,
            "zipCode": ctx.zip_code,
            "city": ctx.city_name,
            "startDate": project
                .desired_start_date
                .map(|d| start_date_label(d, Language::Swedish)),
            "projectUrl": project_url.as_str(),
        });

        let batch = self
            .settings
            .admin_emails
            .iter()
            .map(|to| TemplateEmail {
                to: to.clone(),
                template_alias: EventTrigger::AdminNewProject,
                template_model: model.clone(),
            })
            .collect();

        match self.bounded(self.mailer.send_batch(batch)).await {
            Ok(sent) => report.delivered = sent,
            Err(e) => {
                tracing::warn!(project_id = %project.id, error = %e, "⚠️ Falha no lote de novo projeto");
                report.record_failure(None, e);
            }
        }
        report
    }

    // --- Match: e-mail para as duas turmas, mensagem interna para quem tem conta ---

    async fn send_match_email(
        &self,
        ctx: &MatchContext,
        company: &MatchableCompany,
    ) -> Result<(), NotifyError> {
        let project = &ctx.project;
        let admin = company
            .admin_contact()
            .or_else(|| company.contacts.first())
            .ok_or(NotifyError::MissingContact(company.company.id))?;

        let return_path = format!("/company/requests/{}", project.id);
        let request_url = self
            .invites
            .invite_url(company.company.id, admin.email(), Some(&return_path))
            .await?;
        let register_url = self
            .invites
            .invite_url(company.company.id, admin.email(), None)
            .await?;

        let template_alias = match company.group {
            MembershipGroup::HasMembers => EventTrigger::QuoteMatchedWithMembers,
            MembershipGroup::AdminOnly => EventTrigger::QuoteMatchedWithoutMembers,
        };
        let language = admin.language();

        self.mailer
            .send_template(TemplateEmail {
                to: admin.email().to_string(),
                template_alias,
                template_model: json!({
                    "companyName": company.company.name,
                    "contactName": admin.name(),
                    "projectName": project.display_name(),
                    "category": ctx.category_name,
                    "zipCode": ctx.zip_code,
                    "city": ctx.city_name,
                    "startDate": project
                        .desired_start_date
                        .map(|d| start_date_label(d, language)),
                    "requestUrl": request_url.as_str(),
                    "registerUrl": register_url.as_str(),
                    "language": language.code(),
                }),
            })
            .await
    }

    async fn tagged_dispatch(
        &self,
        ctx: &MatchContext,
        company: &MatchableCompany,
    ) -> (Uuid, Result<(), NotifyError>) {
        let outcome = self.bounded(self.send_match_email(ctx, company)).await;
        (company.company.id, outcome)
    }

    /// Fan-out com concorrência limitada e timeout por despacho.
    /// Uma empresa que falha não interrompe as demais.
    pub async fn quote_matched(
        &self,
        ctx: &MatchContext,
        has_members: &[MatchableCompany],
        admin_only: &[MatchableCompany],
    ) -> FanOutReport {
        let mut report = FanOutReport {
            attempted: has_members.len() + admin_only.len(),
            ..FanOutReport::default()
        };

        // Canal interno independe do e-mail: sai mesmo se a caixa do admin falhar
        let messages = in_app_messages(ctx, has_members);

        let dispatches: Vec<_> = has_members
            .iter()
            .chain(admin_only)
            .map(|company| self.tagged_dispatch(ctx, company))
            .collect();
        let outcomes: Vec<(Uuid, Result<(), NotifyError>)> = stream::iter(dispatches)
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (company_id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        project_id = %ctx.project.id,
                        company_id = %company_id,
                        error = %e,
                        "⚠️ Falha ao notificar empresa"
                    );
                    report.record_failure(Some(company_id), e);
                }
            }
        }

        if !messages.is_empty() {
            match self.bounded(self.messages.create_bulk(messages)).await {
                Ok(created) => report.messages_created = created,
                Err(e) => {
                    tracing::warn!(project_id = %ctx.project.id, error = %e, "⚠️ Falha ao criar mensagens internas");
                    report.record_failure(None, e);
                }
            }
        }

        report
    }

    // --- Confirmação de fim ---

    /// A empresa confirmou: avisa o cliente.
    pub async fn finish_company(
        &self,
        ctx: &MatchContext,
        company: Option<&CompanyWithMembers>,
    ) -> FanOutReport {
        let project = &ctx.project;
        let email = ctx
            .customer
            .as_ref()
            .ok_or(NotifyError::MissingCustomer(project.id))
            .and_then(|customer| {
                let project_url = self.link(&format!("/customer/projects/{}", project.id))?;
                Ok(TemplateEmail {
                    to: customer.email.clone(),
                    template_alias: EventTrigger::CompanyMarkedFinish,
                    template_model: json!({
                        "customerName": customer.name,
                        "projectName": project.display_name(),
                        "companyName": company.map(|c| c.company.name.as_str()),
                        "projectUrl": project_url.as_str(),
                        "language": customer.language.code(),
                    }),
                })
            });

        self.deliver_one(company.map(|c| c.id()), email).await
    }

    /// O cliente confirmou: avisa o admin da empresa, com os links de avaliação.
    pub async fn finish_customer(
        &self,
        ctx: &MatchContext,
        company: Option<&CompanyWithMembers>,
    ) -> FanOutReport {
        let project = &ctx.project;
        let email = company
            .and_then(|c| {
                c.admin()
                    .map(|admin| (admin.email.clone(), admin.language))
                    .or_else(|| {
                        c.company
                            .contact_email()
                            .map(|e| (e.to_string(), Language::Swedish))
                    })
                    .map(|target| (c, target))
            })
            .ok_or(NotifyError::MissingContact(project.company_id.unwrap_or(project.id)))
            .and_then(|(c, (to, language))| {
                let rate_company_url =
                    self.link(&format!("/customer/projects/{}/rate-company/", project.id))?;
                let project_url = self.link(&format!("/company/projects/{}", project.id))?;
                Ok(TemplateEmail {
                    to,
                    template_alias: EventTrigger::CustomerMarkedFinish,
                    template_model: json!({
                        "companyName": c.company.name,
                        "customerName": ctx.customer.as_ref().map(|u| u.name.as_str()),
                        "projectName": project.display_name(),
                        "projectUrl": project_url.as_str(),
                        "rateCompanyUrl": rate_company_url.as_str(),
                        "language": language.code(),
                    }),
                })
            });

        self.deliver_one(company.map(|c| c.id()), email).await
    }

    // --- Interesse ---

    pub async fn company_shows_interest(
        &self,
        ctx: &MatchContext,
        company: &CompanyWithMembers,
    ) -> FanOutReport {
        let project = &ctx.project;
        let email = ctx
            .customer
            .as_ref()
            .map(|customer| TemplateEmail {
                to: customer.email.clone(),
                template_alias: EventTrigger::CompanyShowsInterest,
                template_model: json!({
                    "customerName": customer.name,
                    "projectName": project.display_name(),
                    "companyName": company.company.name,
                    "companyPhone": company.company.phone,
                    "companyEmail": company.company.contact_email(),
                    "area": ctx.address(),
                    "language": customer.language.code(),
                }),
            })
            .ok_or(NotifyError::MissingCustomer(project.id));

        self.deliver_one(Some(company.id()), email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::{Company, CompanyMember, ContactTarget, SyntheticAdmin};
    use crate::models::user::UserRole;
    use crate::models::project::{Project, ProjectProgress};
    use crate::models::user::Customer;
    use crate::testing::{RecordingMailer, RecordingMessageSink, StaticInviteIssuer};
    use chrono::Utc;

    fn settings() -> NotificationSettings {
        NotificationSettings {
            base_url: Url::parse("https://bygg.example").unwrap(),
            admin_emails: vec!["ops@bygg.example".to_string()],
            concurrency: 4,
            dispatch_timeout: Duration::from_millis(200),
        }
    }

    fn context() -> MatchContext {
        MatchContext {
            project: Project {
                id: Uuid::new_v4(),
                name: Some("Nytt badrum".to_string()),
                description: None,
                status: None,
                progress: ProjectProgress::Moderated,
                desired_start_date: Some(DesiredStartDate::OneMonth),
                category_id: Some(Uuid::new_v4()),
                zip_code_id: Some(Uuid::new_v4()),
                user_id: None,
                company_id: None,
                is_company_confirmed_finish: false,
                is_customer_confirmed_finish: false,
                started_at: None,
                finished_at: None,
                created_at: Utc::now(),
            },
            category_name: Some("VVS".to_string()),
            zip_code: Some("0180".to_string()),
            city_name: Some("Stockholm".to_string()),
            customer: Some(Customer {
                id: Uuid::new_v4(),
                name: "Kund".to_string(),
                surname: None,
                email: "kund@example.se".to_string(),
                language: Language::Swedish,
            }),
        }
    }

    fn admin_only(email: &str) -> MatchableCompany {
        let id = Uuid::new_v4();
        MatchableCompany {
            company: Company {
                id,
                name: format!("AB {email}"),
                email: Some(email.to_string()),
                email2: None,
                phone: None,
                is_notification: true,
                created_at: Utc::now(),
            },
            group: MembershipGroup::AdminOnly,
            contacts: vec![ContactTarget::SyntheticAdminContact(SyntheticAdmin {
                company_id: id,
                name: "Admin".to_string(),
                email: email.to_string(),
                email2: None,
                is_notification: true,
                language: Language::Swedish,
            })],
        }
    }

    fn service(mailer: Arc<RecordingMailer>, sink: Arc<RecordingMessageSink>) -> TriggersService {
        TriggersService::new(mailer, Arc::new(StaticInviteIssuer::new()), sink, settings())
    }

    #[tokio::test]
    async fn one_failing_company_does_not_stop_the_others() {
        let mailer = Arc::new(RecordingMailer::failing_for(&["down@b.se"]));
        let triggers = service(mailer.clone(), Arc::new(RecordingMessageSink::new()));

        let companies = vec![admin_only("a@a.se"), admin_only("down@b.se"), admin_only("c@c.se")];
        let report = triggers.quote_matched(&context(), &[], &companies).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].company_id, Some(companies[1].company.id));

        let mut recipients = mailer.recipients();
        recipients.sort();
        assert_eq!(recipients, vec!["a@a.se", "c@c.se"]);
    }

    #[tokio::test]
    async fn slow_dispatch_is_cut_by_the_timeout() {
        let mailer = Arc::new(RecordingMailer::slow(Duration::from_secs(5)));
        let triggers = service(mailer, Arc::new(RecordingMessageSink::new()));

        let report = triggers
            .quote_matched(&context(), &[], &[admin_only("a@a.se")])
            .await;
        assert_eq!(report.delivered, 0);
        assert!(report.failures[0].reason.contains("200 ms"));
    }

    #[tokio::test]
    async fn bounced_admin_mail_still_creates_staff_messages() {
        let mailer = Arc::new(RecordingMailer::failing_for(&["anna@ror.se"]));
        let sink = Arc::new(RecordingMessageSink::new());
        let triggers = service(mailer.clone(), sink.clone());

        let company = admin_only("anna@ror.se").company;
        let member = |name: &str, email: &str, role| {
            ContactTarget::RegisteredMember(CompanyMember {
                id: Uuid::new_v4(),
                company_id: company.id,
                name: name.to_string(),
                surname: None,
                email: email.to_string(),
                role,
                language: Language::Swedish,
                is_notification: true,
            })
        };
        let staffed = MatchableCompany {
            contacts: vec![
                member("Anna", "anna@ror.se", UserRole::CompanyAdmin),
                member("Bo", "bo@ror.se", UserRole::CompanyMember),
            ],
            company: company.clone(),
            group: MembershipGroup::HasMembers,
        };

        let report = triggers.quote_matched(&context(), &[staffed], &[]).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].company_id, Some(company.id));
        assert_eq!(report.messages_created, 2);
        assert_eq!(sink.created().len(), 2);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn company_without_contact_is_reported() {
        let mailer = Arc::new(RecordingMailer::new());
        let triggers = service(mailer.clone(), Arc::new(RecordingMessageSink::new()));

        let mut silent = admin_only("x@x.se");
        silent.contacts.clear();
        let report = triggers.quote_matched(&context(), &[], &[silent]).await;

        assert_eq!(report.failures.len(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn customer_finish_mail_carries_rate_link() {
        let mailer = Arc::new(RecordingMailer::new());
        let triggers = service(mailer.clone(), Arc::new(RecordingMessageSink::new()));
        let ctx = context();
        let company = CompanyWithMembers {
            company: admin_only("rör@ror.se").company,
            members: Vec::new(),
            category_ids: Vec::new(),
        };

        let report = triggers.finish_customer(&ctx, Some(&company)).await;
        assert_eq!(report.delivered, 1);

        let sent = mailer.sent_with(EventTrigger::CustomerMarkedFinish);
        assert_eq!(sent[0].to, "rör@ror.se");
        assert_eq!(
            sent[0].template_model["rateCompanyUrl"],
            format!("https://bygg.example/customer/projects/{}/rate-company/", ctx.project.id)
        );
    }

    #[tokio::test]
    async fn admin_batch_goes_to_every_admin() {
        let mailer = Arc::new(RecordingMailer::new());
        let triggers = service(mailer.clone(), Arc::new(RecordingMessageSink::new()));

        let report = triggers.new_project(&context()).await;
        assert_eq!(report.delivered, 1);
        let sent = mailer.sent_with(EventTrigger::AdminNewProject);
        assert_eq!(sent[0].template_model["startDate"], "Inom en månad");
    }

    #[test]
    fn labels_follow_the_recipient_language() {
        assert_eq!(
            start_date_label(DesiredStartDate::Asap, Language::English),
            "As soon as possible"
        );
        assert_eq!(
            start_date_label(DesiredStartDate::Flexible, Language::Swedish),
            "Flexibelt"
        );
        assert!(matched_message(Language::English, "Kök").ends_with("Kök"));
    }
}
