//! Super-witnesses: entities deposing in many distinct trials.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::{CanonicalEntity, CanonicalId, Gender, Role};
use crate::resolution::WITNESS_TO_ACCUSED;

/// Attribute set by extraction when a witness voiced a personal suspicion.
pub const PERSONAL_SUSPICION: &str = "personal_suspicion";

/// One super-witness row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperWitness {
    pub canonical_id: CanonicalId,
    pub canonical_name: String,
    /// Distinct trials with a witness appearance.
    pub num_trials: usize,
    /// Those trials, first-seen order.
    pub trial_ids: Vec<String>,
    /// Distinct years of the witness appearances, ascending.
    pub years_active: Vec<i32>,
    pub gender: Gender,
    pub locations: Vec<String>,
    pub became_accused: bool,
    pub personal_suspicion: bool,
}

impl SuperWitness {
    fn from_entity(entity: &CanonicalEntity, trial_ids: Vec<String>) -> Self {
        let years_active: BTreeSet<i32> = entity
            .appearances_as(&Role::Witness)
            .filter_map(|a| a.year)
            .collect();

        Self {
            canonical_id: entity.canonical_id.clone(),
            canonical_name: entity.canonical_name.clone(),
            num_trials: trial_ids.len(),
            trial_ids,
            years_active: years_active.into_iter().collect(),
            gender: entity.gender,
            locations: entity.locations.iter().cloned().collect(),
            became_accused: entity.has_flag(WITNESS_TO_ACCUSED),
            personal_suspicion: entity.has_flag(PERSONAL_SUSPICION),
        }
    }
}

/// Distinct witness trials of an entity, first-seen order.
#[must_use]
pub fn witness_trials(entity: &CanonicalEntity) -> Vec<String> {
    let mut seen = BTreeSet::new();
    entity
        .appearances_as(&Role::Witness)
        .filter(|a| seen.insert(a.trial_id.as_str()))
        .map(|a| a.trial_id.clone())
        .collect()
}

/// Entities with witness appearances in at least `min_trials` distinct
/// trials, most trials first. Equal counts keep entity order.
#[must_use]
pub fn identify_super_witnesses(entities: &[CanonicalEntity], min_trials: usize) -> Vec<SuperWitness> {
    let mut rows: Vec<SuperWitness> = entities
        .iter()
        .filter_map(|entity| {
            let trials = witness_trials(entity);
            (trials.len() >= min_trials).then(|| SuperWitness::from_entity(entity, trials))
        })
        .collect();

    rows.sort_by(|a, b| b.num_trials.cmp(&a.num_trials));
    rows
}
