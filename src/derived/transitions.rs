//! Witness-to-accused transitions.

use serde::{Deserialize, Serialize};

use crate::entity::{CanonicalEntity, CanonicalId, Role, TrialAppearance};

/// An entity seen as a witness and, in some trial, as an accused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub canonical_id: CanonicalId,
    pub canonical_name: String,
    pub first_witness_trial: String,
    pub first_witness_year: i32,
    pub first_accused_trial: String,
    pub first_accused_year: i32,
    /// `first_accused_year - first_witness_year`. Negative when the
    /// accusation predates the first deposition; such rows are reported
    /// as found.
    pub years_between: i32,
    /// Dated witness appearances.
    pub total_witness_appearances: usize,
    pub outcome: Option<String>,
}

/// Earliest dated appearance in `role`; ties keep appearance order.
fn earliest<'a>(entity: &'a CanonicalEntity, role: &'a Role) -> (Option<(&'a TrialAppearance, i32)>, usize) {
    let mut best: Option<(&TrialAppearance, i32)> = None;
    let mut dated = 0;
    for appearance in entity.appearances_as(role) {
        let Some(year) = appearance.year else {
            continue;
        };
        dated += 1;
        if best.map_or(true, |(_, y)| year < y) {
            best = Some((appearance, year));
        }
    }
    (best, dated)
}

/// Builds the transition row of one entity.
///
/// Returns `None` unless the entity is flagged witness-to-accused and has
/// at least one dated appearance on each side.
#[must_use]
pub fn detect_transition(entity: &CanonicalEntity) -> Option<Transition> {
    if !entity.witness_to_accused {
        return None;
    }

    let (witness, witness_count) = earliest(entity, &Role::Witness);
    let (accused, _) = earliest(entity, &Role::Accused);
    let ((witness, witness_year), (accused, accused_year)) = (witness?, accused?);

    Some(Transition {
        canonical_id: entity.canonical_id.clone(),
        canonical_name: entity.canonical_name.clone(),
        first_witness_trial: witness.trial_id.clone(),
        first_witness_year: witness_year,
        first_accused_trial: accused.trial_id.clone(),
        first_accused_year: accused_year,
        years_between: accused_year - witness_year,
        total_witness_appearances: witness_count,
        outcome: entity.outcome.clone(),
    })
}

/// Transition rows for all entities, in entity order.
#[must_use]
pub fn find_transitions(entities: &[CanonicalEntity]) -> Vec<Transition> {
    entities.iter().filter_map(detect_transition).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::entity::{EntityType, Gender};

    use super::*;

    fn appearance(trial_id: &str, role: Role, year: Option<i32>) -> TrialAppearance {
        TrialAppearance {
            trial_id: trial_id.to_string(),
            role,
            year,
            raw_name: "Mengeon Didier".to_string(),
        }
    }

    fn entity(appearances: Vec<TrialAppearance>, flagged: bool) -> CanonicalEntity {
        CanonicalEntity {
            canonical_id: CanonicalId::sequential("E", 5, 1),
            canonical_name: "mengeon didier".to_string(),
            variants: vec!["Mengeon Didier".to_string()],
            entity_type: EntityType::Accused,
            gender: Gender::Male,
            locations: BTreeSet::new(),
            roles_in_trials: appearances
                .iter()
                .map(|a| (a.trial_id.clone(), a.role.clone()))
                .collect::<BTreeMap<_, _>>(),
            trial_appearances: appearances,
            outcome: Some("death_sentence".to_string()),
            witness_to_accused: flagged,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn reports_years_between() {
        let e = entity(
            vec![
                appearance("trial_1", Role::Witness, Some(1590)),
                appearance("trial_2", Role::Accused, Some(1598)),
            ],
            true,
        );
        let t = detect_transition(&e).unwrap();
        assert_eq!(t.first_witness_trial, "trial_1");
        assert_eq!(t.first_accused_year, 1598);
        assert_eq!(t.years_between, 8);
        assert_eq!(t.total_witness_appearances, 1);
        assert_eq!(t.outcome.as_deref(), Some("death_sentence"));
    }

    #[test]
    fn earliest_dated_appearance_wins() {
        let e = entity(
            vec![
                appearance("T5", Role::Witness, Some(1595)),
                appearance("T3", Role::Witness, None),
                appearance("T2", Role::Witness, Some(1591)),
                appearance("T4", Role::Witness, Some(1591)),
                appearance("T9", Role::Accused, Some(1589)),
            ],
            true,
        );
        let t = detect_transition(&e).unwrap();
        assert_eq!(t.first_witness_trial, "T2");
        assert_eq!(t.total_witness_appearances, 3);
        // Not validated: the accusation may predate the deposition.
        assert_eq!(t.years_between, -2);
    }

    #[test]
    fn earliest_counts_dated_appearances_in_role() {
        let e = entity(
            vec![
                appearance("T1", Role::Witness, Some(1592)),
                appearance("T2", Role::Witness, None),
                appearance("T3", Role::Accused, Some(1598)),
            ],
            true,
        );
        let role = Role::from("witness");
        let (first, dated) = earliest(&e, &role);
        assert_eq!(first.map(|(a, year)| (a.trial_id.as_str(), year)), Some(("T1", 1592)));
        assert_eq!(dated, 1);
    }

    #[test]
    fn requires_flag_and_dates_on_both_sides() {
        let undated = entity(
            vec![
                appearance("T1", Role::Witness, None),
                appearance("T2", Role::Accused, Some(1598)),
            ],
            true,
        );
        assert!(detect_transition(&undated).is_none());

        let unflagged = entity(
            vec![
                appearance("T1", Role::Witness, Some(1590)),
                appearance("T2", Role::Accused, Some(1598)),
            ],
            false,
        );
        assert!(detect_transition(&unflagged).is_none());
        assert!(find_transitions(&[undated, unflagged]).is_empty());
    }
}
