//! Attachment of family-name-only references.
//!
//! Village records often name a woman by her family name alone (`la
//! Thieriat`, `le Masson`). Such a key shares only one token with the full
//! name and never reaches the fuzzy-merge threshold, so it is matched here
//! against the family names of the surviving full-name clusters instead.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::cluster::Cluster;
use super::log::{ResolutionAction, ResolutionLog};
use super::merge::MergeOutcome;
use crate::normalize::family_name;
use crate::similarity::ratio;

static SURNAME_REFERENCE: OnceLock<Regex> = OnceLock::new();

/// Returns the surname of a `la X` / `le X` key, `None` for any other key.
///
/// # Examples
///
/// ```
/// use personae::resolution::attach::surname_reference;
///
/// assert_eq!(surname_reference("la thieriat"), Some("thieriat"));
/// assert_eq!(surname_reference("odille thieriat"), None);
/// ```
#[must_use]
pub fn surname_reference(key: &str) -> Option<&str> {
    SURNAME_REFERENCE
        .get_or_init(|| Regex::new(r"^(?:la|le)\s+(\S+)$").expect("static surname pattern compiles"))
        .captures(key)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_full_name(cluster: &Cluster) -> bool {
    surname_reference(&cluster.key).is_none() && cluster.key.split_whitespace().nth(1).is_some()
}

/// Attaches each surname reference to the unique compatible full-name
/// cluster whose family name scores at least `threshold`.
///
/// A reference matching several clusters is left alone and every candidate
/// is logged as ambiguous. Cluster order is preserved; attached references
/// disappear from the list.
#[must_use]
pub fn attach_surname_references(clusters: Vec<Cluster>, threshold: f64) -> MergeOutcome {
    let reference_slots: Vec<usize> = clusters
        .iter()
        .enumerate()
        .filter(|(_, c)| surname_reference(&c.key).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut slots: Vec<Option<Cluster>> = clusters.into_iter().map(Some).collect();
    let mut log = ResolutionLog::new();

    for r in reference_slots {
        let Some(reference) = slots[r].as_ref() else {
            continue;
        };
        let Some(surname) = surname_reference(&reference.key) else {
            continue;
        };

        let candidates: Vec<(usize, f64)> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let candidate = slot.as_ref()?;
                if !is_full_name(candidate) {
                    return None;
                }
                let score = ratio(family_name(&candidate.key), surname);
                (score >= threshold && candidate.is_location_compatible(reference)).then_some((i, score))
            })
            .collect();

        match candidates.as_slice() {
            [] => {}
            [(target, score)] => {
                let (target, score) = (*target, *score);
                if let Some(absorbed) = slots[r].take() {
                    if let Some(full) = slots[target].as_mut() {
                        debug!(into = %full.key, from = %absorbed.key, score, "Surname reference attached");
                        log.record(ResolutionAction::SurnameAttach, &full.key, &absorbed.key, score);
                        full.absorb(absorbed);
                    }
                }
            }
            many => {
                debug!(key = %reference.key, candidates = many.len(), "Surname reference is ambiguous");
                for &(i, score) in many {
                    if let Some(candidate) = slots[i].as_ref() {
                        log.record(ResolutionAction::SurnameAmbiguous, &candidate.key, &reference.key, score);
                    }
                }
            }
        }
    }

    MergeOutcome {
        clusters: slots.into_iter().flatten().collect(),
        log,
    }
}
