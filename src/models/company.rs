// src/models/company.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::user::{Language, UserRole};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Bygg & Rör AB")]
    pub name: String,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub phone: Option<String>,
    pub is_notification: bool,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}

// Funcionário registrado de uma empresa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMember {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub language: Language,
    pub is_notification: bool,
}

/// Empresa com seus funcionários e categorias, como carregada pelo repositório.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyWithMembers {
    pub company: Company,
    pub members: Vec<CompanyMember>,
    pub category_ids: Vec<Uuid>,
}

impl CompanyWithMembers {
    pub fn id(&self) -> Uuid {
        self.company.id
    }

    pub fn has_members(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn admin(&self) -> Option<&CompanyMember> {
        self.members
            .iter()
            .find(|m| m.role == UserRole::CompanyAdmin)
    }
}

/// Contato administrativo sintetizado a partir dos dados da própria empresa,
/// usado quando ela ainda não tem funcionários registrados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticAdmin {
    pub company_id: Uuid,
    pub name: String,
    pub email: String,
    pub email2: Option<String>,
    pub is_notification: bool,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContactTarget {
    RegisteredMember(CompanyMember),
    SyntheticAdminContact(SyntheticAdmin),
}

impl ContactTarget {
    pub fn email(&self) -> &str {
        match self {
            ContactTarget::RegisteredMember(m) => &m.email,
            ContactTarget::SyntheticAdminContact(a) => &a.email,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ContactTarget::RegisteredMember(m) => &m.name,
            ContactTarget::SyntheticAdminContact(a) => &a.name,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            ContactTarget::RegisteredMember(m) => m.language,
            ContactTarget::SyntheticAdminContact(a) => a.language,
        }
    }

    /// Id do usuário para mensagens internas; contatos sintéticos não têm conta.
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            ContactTarget::RegisteredMember(m) => Some(m.id),
            ContactTarget::SyntheticAdminContact(_) => None,
        }
    }

    pub fn role(&self) -> UserRole {
        match self {
            ContactTarget::RegisteredMember(m) => m.role,
            ContactTarget::SyntheticAdminContact(_) => UserRole::CompanyAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipGroup {
    /// Empresa com funcionários registrados: recebe e-mail e mensagem interna.
    HasMembers,
    /// Empresa sem conta: recebe e-mail com link de convite.
    AdminOnly,
}

/// Empresa pronta para o fan-out de notificações.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchableCompany {
    pub company: Company,
    pub group: MembershipGroup,
    pub contacts: Vec<ContactTarget>,
}

impl MatchableCompany {
    pub fn admin_contact(&self) -> Option<&ContactTarget> {
        self.contacts
            .iter()
            .find(|c| c.role() == UserRole::CompanyAdmin)
    }
}

/// Fatos de uma empresa necessários para decidir elegibilidade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    pub company_id: Uuid,
    pub categories: HashSet<Uuid>,
    /// CEPs resolvidos pelo índice geográfico (províncias ∪ municípios ∪ cidades)
    pub zip_codes: HashSet<Uuid>,
}

// =========================================================================
//  VISÃO ADMIN: EMPRESAS DISPONÍVEIS
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFlags {
    pub is_accepted: bool,
    pub is_interested: bool,
    pub is_quote: bool,
    pub send_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCompany {
    pub id: Uuid,
    pub name: String,
    pub quote: QuoteFlags,
}
