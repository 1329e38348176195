// src/services/interest.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::project::ProjectFacts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestMode {
    #[default]
    Disabled,
    InterestedOnly,
    ExcludeInterested,
}

/// Empresas interessadas no projeto. Só vale enquanto ele está MODERATED.
pub fn interested_companies(facts: &ProjectFacts) -> HashSet<Uuid> {
    if facts.is_moderated() {
        facts.interested.clone()
    } else {
        HashSet::new()
    }
}

/// Filtro de interesse, aplicado sempre depois da elegibilidade.
///
/// A ordem dos candidatos é preservada. Com `InterestedOnly` e nenhum
/// interessado o resultado é vazio, nunca a lista inteira.
pub fn apply_interest_filter<I>(
    candidates: I,
    interested: &HashSet<Uuid>,
    mode: InterestMode,
) -> Vec<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    match mode {
        InterestMode::Disabled => candidates.into_iter().collect(),
        InterestMode::InterestedOnly => candidates
            .into_iter()
            .filter(|id| interested.contains(id))
            .collect(),
        InterestMode::ExcludeInterested => candidates
            .into_iter()
            .filter(|id| !interested.contains(id))
            .collect(),
    }
}
