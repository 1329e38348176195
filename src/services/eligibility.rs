// src/services/eligibility.rs

// Decisão "esta empresa pode ver este projeto?", montada como uma lista de
// predicados independentes que precisam ser todos satisfeitos.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{company::CompanyProfile, project::ProjectFacts},
    services::interest::InterestMode,
};

type EligibilityPredicate = Box<dyn Fn(&ProjectFacts, &CompanyProfile) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityOptions {
    /// Restringe às quotes pendentes (não aceitas) da própria empresa.
    /// Neste modo a geografia não é avaliada.
    pub show_answered: bool,
    /// Não mostrar de novo projetos em que a empresa já tem quote.
    pub exclude_quoted: bool,
    pub interest: InterestMode,
}

pub struct EligibilityFilter {
    predicates: Vec<(&'static str, EligibilityPredicate)>,
}

impl EligibilityFilter {
    pub fn new(options: EligibilityOptions) -> Self {
        let mut predicates: Vec<(&'static str, EligibilityPredicate)> = vec![(
            "category",
            Box::new(|p: &ProjectFacts, c: &CompanyProfile| {
                p.category_id.is_some_and(|cat| c.categories.contains(&cat))
            }),
        )];

        if options.show_answered {
            predicates.push((
                "pending_quote",
                Box::new(|p: &ProjectFacts, c: &CompanyProfile| p.pending_quote_by(c.company_id)),
            ));
            return Self { predicates };
        }

        predicates.push((
            "moderated",
            Box::new(|p: &ProjectFacts, _: &CompanyProfile| p.is_moderated()),
        ));
        predicates.push((
            "not_engaged",
            Box::new(|p: &ProjectFacts, c: &CompanyProfile| !p.accepted_quote_by(c.company_id)),
        ));
        // Um envio direcionado anterior dispensa a geografia
        predicates.push((
            "geography",
            Box::new(|p: &ProjectFacts, c: &CompanyProfile| {
                p.offered.contains(&c.company_id)
                    || p.zip_code_id.is_some_and(|zip| c.zip_codes.contains(&zip))
            }),
        ));
        predicates.push((
            "not_rejected",
            Box::new(|p: &ProjectFacts, c: &CompanyProfile| !p.rejected.contains(&c.company_id)),
        ));

        if options.exclude_quoted && options.interest != InterestMode::InterestedOnly {
            predicates.push((
                "not_quoted",
                Box::new(|p: &ProjectFacts, c: &CompanyProfile| p.quote_by(c.company_id).is_none()),
            ));
        }

        Self { predicates }
    }

    /// Nome do primeiro predicado que reprova o par, ou `None` se elegível.
    pub fn first_failure(&self, project: &ProjectFacts, company: &CompanyProfile) -> Option<&'static str> {
        self.predicates
            .iter()
            .find(|(_, predicate)| !predicate(project, company))
            .map(|(name, _)| *name)
    }

    pub fn is_eligible(&self, project: &ProjectFacts, company: &CompanyProfile) -> bool {
        self.first_failure(project, company).is_none()
    }

    /// Lado do projeto: quais candidatas podem receber a oferta.
    /// Projeto sem categoria é violação de pré-condição, não "zero resultados".
    pub fn filter_eligible(
        &self,
        project: &ProjectFacts,
        candidates: &[CompanyProfile],
    ) -> Result<BTreeSet<Uuid>, AppError> {
        if project.category_id.is_none() {
            return Err(AppError::ProjectWithoutCategory(project.id));
        }

        let mut eligible = BTreeSet::new();
        for company in candidates {
            match self.first_failure(project, company) {
                None => {
                    eligible.insert(company.company_id);
                }
                Some(reason) => tracing::debug!(
                    project_id = %project.id,
                    company_id = %company.company_id,
                    reason,
                    "Empresa descartada"
                ),
            }
        }

        Ok(eligible)
    }

    /// Lado da empresa: quais projetos ela pode ver, na ordem recebida.
    pub fn visible_projects(&self, company: &CompanyProfile, projects: &[ProjectFacts]) -> Vec<Uuid> {
        projects
            .iter()
            .filter(|p| self.is_eligible(p, company))
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::ProjectProgress;
    use crate::models::quote::QuoteRef;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    struct World {
        plumbing: Uuid,
        zip_0180: Uuid,
        project: ProjectFacts,
    }

    fn world() -> World {
        let plumbing = Uuid::new_v4();
        let zip_0180 = Uuid::new_v4();
        World {
            plumbing,
            zip_0180,
            project: ProjectFacts {
                id: Uuid::new_v4(),
                category_id: Some(plumbing),
                zip_code_id: Some(zip_0180),
                progress: ProjectProgress::Moderated,
                ..ProjectFacts::default()
            },
        }
    }

    fn profile(categories: &[Uuid], zips: &[Uuid]) -> CompanyProfile {
        CompanyProfile {
            company_id: Uuid::new_v4(),
            categories: categories.iter().copied().collect(),
            zip_codes: zips.iter().copied().collect(),
        }
    }

    fn broadcast() -> EligibilityFilter {
        EligibilityFilter::new(EligibilityOptions {
            exclude_quoted: true,
            ..EligibilityOptions::default()
        })
    }

    #[test]
    fn only_category_and_area_match_survive() {
        let w = world();
        let a = profile(&[w.plumbing], &[w.zip_0180]);
        let b = profile(&[Uuid::new_v4()], &[w.zip_0180]);
        let c = profile(&[w.plumbing], &[Uuid::new_v4()]);

        let eligible = broadcast()
            .filter_eligible(&w.project, &[a.clone(), b, c])
            .unwrap();
        assert_eq!(eligible, BTreeSet::from([a.company_id]));
    }

    #[test]
    fn project_must_be_moderated() {
        let mut w = world();
        w.project.progress = ProjectProgress::Created;
        let a = profile(&[w.plumbing], &[w.zip_0180]);

        assert!(broadcast().filter_eligible(&w.project, &[a]).unwrap().is_empty());
    }

    #[test]
    fn blacklisted_company_is_excluded() {
        let mut w = world();
        let a = profile(&[w.plumbing], &[w.zip_0180]);
        w.project.rejected = HashSet::from([a.company_id]);

        assert_eq!(broadcast().first_failure(&w.project, &a), Some("not_rejected"));
    }

    #[test]
    fn explicit_offer_overrides_geography() {
        let mut w = world();
        let far_away = profile(&[w.plumbing], &[]);
        assert_eq!(broadcast().first_failure(&w.project, &far_away), Some("geography"));

        w.project.offered = HashSet::from([far_away.company_id]);
        assert!(broadcast().is_eligible(&w.project, &far_away));
    }

    #[test]
    fn quoted_companies_are_not_shown_again_unless_interested_only() {
        let mut w = world();
        let a = profile(&[w.plumbing], &[w.zip_0180]);
        w.project.quotes = vec![QuoteRef {
            company_id: a.company_id,
            is_accepted: false,
            is_interested: false,
        }];

        assert_eq!(broadcast().first_failure(&w.project, &a), Some("not_quoted"));

        let interested_only = EligibilityFilter::new(EligibilityOptions {
            exclude_quoted: true,
            interest: InterestMode::InterestedOnly,
            ..EligibilityOptions::default()
        });
        assert!(interested_only.is_eligible(&w.project, &a));
    }

    #[test]
    fn engaged_company_is_excluded_and_show_answered_sees_only_pending() {
        let mut w = world();
        let engaged = profile(&[w.plumbing], &[w.zip_0180]);
        let pending = profile(&[w.plumbing], &[]);
        w.project.quotes = vec![
            QuoteRef {
                company_id: engaged.company_id,
                is_accepted: true,
                is_interested: false,
            },
            QuoteRef {
                company_id: pending.company_id,
                is_accepted: false,
                is_interested: false,
            },
        ];

        let plain = EligibilityFilter::new(EligibilityOptions::default());
        assert_eq!(plain.first_failure(&w.project, &engaged), Some("not_engaged"));

        let answered = EligibilityFilter::new(EligibilityOptions {
            show_answered: true,
            ..EligibilityOptions::default()
        });
        assert!(answered.is_eligible(&w.project, &pending));
        assert!(!answered.is_eligible(&w.project, &engaged));
    }

    #[test]
    fn project_without_category_is_an_error() {
        let mut w = world();
        w.project.category_id = None;
        let result = broadcast().filter_eligible(&w.project, &[]);
        assert_matches!(result, Err(AppError::ProjectWithoutCategory(id)) if id == w.project.id);
    }

    #[test]
    fn company_view_keeps_project_order() {
        let w = world();
        let a = profile(&[w.plumbing], &[w.zip_0180]);
        let newer = ProjectFacts {
            id: Uuid::new_v4(),
            ..w.project.clone()
        };
        let foreign = ProjectFacts {
            id: Uuid::new_v4(),
            category_id: Some(Uuid::new_v4()),
            ..w.project.clone()
        };

        let visible = broadcast().visible_projects(&a, &[newer.clone(), foreign, w.project.clone()]);
        assert_eq!(visible, vec![newer.id, w.project.id]);
    }
}
