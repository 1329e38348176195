// src/services/partition.rs

use crate::models::company::{
    CompanyWithMembers, ContactTarget, MatchableCompany, MembershipGroup, SyntheticAdmin,
};
use crate::models::user::Language;

fn contacts_of(company: &CompanyWithMembers) -> Vec<ContactTarget> {
    if company.has_members() {
        return company
            .members
            .iter()
            .cloned()
            .map(ContactTarget::RegisteredMember)
            .collect();
    }

    // Sem funcionários: o próprio cadastro da empresa vira o contato admin
    company
        .company
        .contact_email()
        .map(|email| {
            ContactTarget::SyntheticAdminContact(SyntheticAdmin {
                company_id: company.id(),
                name: company.company.name.clone(),
                email: email.to_string(),
                email2: company.company.email2.clone(),
                is_notification: company.company.is_notification,
                language: Language::Swedish,
            })
        })
        .into_iter()
        .collect()
}

/// Separa as empresas em "com funcionários" (`require_members = true`) ou
/// "só admin" (`false`). As duas chamadas sobre o mesmo conjunto são disjuntas
/// e juntas cobrem todas as empresas.
pub fn partition_by_membership(
    companies: &[CompanyWithMembers],
    require_members: bool,
) -> Vec<MatchableCompany> {
    companies
        .iter()
        .filter(|c| c.has_members() == require_members)
        .map(|c| MatchableCompany {
            company: c.company.clone(),
            group: if c.has_members() {
                MembershipGroup::HasMembers
            } else {
                MembershipGroup::AdminOnly
            },
            contacts: contacts_of(c),
        })
        .collect()
}
