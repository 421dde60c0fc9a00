//! Summary metrics of a resolution run.
//!
//! [`ResolutionStatistics`] is a pure function of the canonical entity set.
//! [`RunSummary`] carries the data-quality counts gathered along the way
//! (skipped records, unresolved references) that are reported rather than
//! raised.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{CanonicalEntity, EntityMapping};

/// Distribution metrics over canonical entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStatistics {
    /// Raw names mapped to a canonical entity.
    pub total_raw_entities: usize,
    pub total_canonical_entities: usize,
    /// `total_raw_entities / total_canonical_entities`, 0 when there are no
    /// canonical entities.
    pub compression_ratio: f64,
    pub entity_types: BTreeMap<String, usize>,
    pub genders: BTreeMap<String, usize>,
    /// Entities appearing in more than one distinct trial.
    pub multi_trial_entities: usize,
    /// Entities flagged witness-to-accused.
    pub witness_to_accused_transitions: usize,
}

impl ResolutionStatistics {
    /// Computes the statistics of a canonical entity set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(entities: &[CanonicalEntity], mapping: &EntityMapping) -> Self {
        let total_raw_entities = mapping.len();
        let total_canonical_entities = entities.len();
        let compression_ratio = if total_canonical_entities == 0 {
            0.0
        } else {
            total_raw_entities as f64 / total_canonical_entities as f64
        };

        let mut entity_types = BTreeMap::new();
        let mut genders = BTreeMap::new();
        for entity in entities {
            *entity_types
                .entry(entity.entity_type.as_str().to_string())
                .or_insert(0) += 1;
            *genders.entry(entity.gender.as_str().to_string()).or_insert(0) += 1;
        }

        Self {
            total_raw_entities,
            total_canonical_entities,
            compression_ratio,
            entity_types,
            genders,
            multi_trial_entities: entities
                .iter()
                .filter(|e| e.distinct_trials().len() > 1)
                .count(),
            witness_to_accused_transitions: entities.iter().filter(|e| e.witness_to_accused).count(),
        }
    }
}

/// Data-quality counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Raw-entity records skipped at load time.
    pub malformed_records: usize,
    /// Trial rows skipped at load time.
    pub malformed_trials: usize,
    /// Raw names with an empty normalization key.
    pub manual_review: usize,
    pub initial_clusters: usize,
    /// Clusters left after fuzzy merging and surname attachment.
    pub merged_clusters: usize,
    pub fuzzy_merges: usize,
    pub surname_attachments: usize,
    /// Appearances referencing a trial missing from the trial table.
    pub unresolved_trial_refs: usize,
}

impl RunSummary {
    /// Adds the load-time skip counts.
    #[must_use]
    pub const fn with_input_issues(mut self, malformed_records: usize, malformed_trials: usize) -> Self {
        self.malformed_records = malformed_records;
        self.malformed_trials = malformed_trials;
        self
    }

    /// True when nothing was skipped, flagged or left unresolved.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.malformed_records == 0
            && self.malformed_trials == 0
            && self.manual_review == 0
            && self.unresolved_trial_refs == 0
    }
}
