// src/testing.rs

// Colaboradores falsos para testes: gravam o que receberam ou falham sob demanda.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::{
    common::error::NotifyError,
    models::notification::{EventTrigger, NewMessage, TemplateEmail},
    services::notifications::{InviteIssuer, Mailer, MessageSink},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mailer que grava tudo e pode falhar para endereços específicos ou demorar.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<TemplateEmail>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<TemplateEmail> {
        lock(&self.sent).clone()
    }

    pub fn sent_with(&self, trigger: EventTrigger) -> Vec<TemplateEmail> {
        self.sent()
            .into_iter()
            .filter(|e| e.template_alias == trigger)
            .collect()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_template(&self, email: TemplateEmail) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&email.to) {
            return Err(NotifyError::Transport(format!("caixa indisponível: {}", email.to)));
        }
        lock(&self.sent).push(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMessageSink {
    created: Mutex<Vec<NewMessage>>,
    fail: bool,
}

impl RecordingMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<NewMessage> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl MessageSink for RecordingMessageSink {
    async fn create_bulk(&self, messages: Vec<NewMessage>) -> Result<usize, NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("messages indisponível".to_string()));
        }
        let count = messages.len();
        lock(&self.created).extend(messages);
        Ok(count)
    }
}

/// Emissor de links determinístico; pode recusar empresas específicas.
#[derive(Default)]
pub struct StaticInviteIssuer {
    refused: HashSet<Uuid>,
}

impl StaticInviteIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(company_ids: &[Uuid]) -> Self {
        Self {
            refused: company_ids.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl InviteIssuer for StaticInviteIssuer {
    async fn invite_url(
        &self,
        company_id: Uuid,
        contact_email: &str,
        return_path: Option<&str>,
    ) -> Result<Url, NotifyError> {
        if self.refused.contains(&company_id) {
            return Err(NotifyError::Transport(format!(
                "convite recusado para {company_id}"
            )));
        }

        let mut url = Url::parse(&format!("https://invite.test/{company_id}"))
            .map_err(|e| NotifyError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("email", contact_email)
            .append_pair("redirect", return_path.unwrap_or("/"));
        Ok(url)
    }
}
