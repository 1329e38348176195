// src/services/notifications.rs

// Contratos dos colaboradores externos de notificação. O core só conversa com
// eles por estes traits; o transporte real de e-mail fica fora deste serviço.

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::{
    common::error::NotifyError,
    models::notification::{NewMessage, TemplateEmail},
};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_template(&self, email: TemplateEmail) -> Result<(), NotifyError>;

    /// Envio em lote. A implementação padrão envia um por um e para no primeiro erro.
    async fn send_batch(&self, emails: Vec<TemplateEmail>) -> Result<usize, NotifyError> {
        let mut sent = 0;
        for email in emails {
            self.send_template(email).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

#[async_trait]
pub trait InviteIssuer: Send + Sync {
    /// Link de convite/registro, idempotente por par (empresa, contato).
    async fn invite_url(
        &self,
        company_id: Uuid,
        contact_email: &str,
        return_path: Option<&str>,
    ) -> Result<Url, NotifyError>;
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn create_bulk(&self, messages: Vec<NewMessage>) -> Result<usize, NotifyError>;
}

// =========================================================================
//  IMPLEMENTAÇÕES PADRÃO
// =========================================================================

/// Mailer que apenas registra o envio no log estruturado.
#[derive(Clone, Default)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_template(&self, email: TemplateEmail) -> Result<(), NotifyError> {
        tracing::info!(
            to = %email.to,
            template = email.template_alias.alias(),
            "📧 E-mail de template despachado"
        );
        Ok(())
    }
}

/// Gera links estáveis a partir do `BASE_URL`: o mesmo par (empresa, contato)
/// sempre produz o mesmo link.
#[derive(Clone)]
pub struct BaseUrlInviteIssuer {
    base_url: Url,
}

impl BaseUrlInviteIssuer {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl InviteIssuer for BaseUrlInviteIssuer {
    async fn invite_url(
        &self,
        company_id: Uuid,
        contact_email: &str,
        return_path: Option<&str>,
    ) -> Result<Url, NotifyError> {
        let mut url = self
            .base_url
            .join(&format!("/invite/company/{company_id}"))
            .map_err(|e| NotifyError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("email", contact_email);
            if let Some(path) = return_path {
                query.append_pair("redirect", path);
            }
        }

        Ok(url)
    }
}
