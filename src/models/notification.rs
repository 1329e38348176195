// src/models/notification.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Aliases dos templates de e-mail disparados pelo core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EventTrigger {
    AdminNewProject,
    CompanyMarkedFinish,
    CustomerMarkedFinish,
    QuoteMatchedWithMembers,
    QuoteMatchedWithoutMembers,
    CompanyShowsInterest,
}

impl EventTrigger {
    pub fn alias(self) -> &'static str {
        match self {
            EventTrigger::AdminNewProject => "admin-new-project",
            EventTrigger::CompanyMarkedFinish => "company-marked-finish",
            EventTrigger::CustomerMarkedFinish => "customer-marked-finish",
            EventTrigger::QuoteMatchedWithMembers => "quote-matched-with-members",
            EventTrigger::QuoteMatchedWithoutMembers => "quote-matched-without-members",
            EventTrigger::CompanyShowsInterest => "company-shows-interest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEmail {
    pub to: String,
    pub template_alias: EventTrigger,
    pub template_model: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_from_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageFromType {
    Project,
}

impl MessageFromType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageFromType::Project => "PROJECT",
        }
    }
}

// Mensagem interna (in-app) para um usuário registrado
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub user_id: Uuid,
    pub from_project_id: Uuid,
    pub from_type: MessageFromType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    pub company_id: Option<Uuid>,
    pub reason: String,
}

/// Resultado de um fan-out: falhas são coletadas, nunca propagadas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReport {
    pub attempted: usize,
    pub delivered: usize,
    pub messages_created: usize,
    pub failures: Vec<DispatchFailure>,
}

impl FanOutReport {
    pub fn record_failure(&mut self, company_id: Option<Uuid>, reason: impl ToString) {
        self.failures.push(DispatchFailure {
            company_id,
            reason: reason.to_string(),
        });
    }
}
