//! Canonical entity construction.
//!
//! Turns each surviving cluster into one [`CanonicalEntity`], resolving the
//! conflicts between its constituent raw records with the policies in
//! [`super::policies`].

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::warn;

use super::cluster::Cluster;
use super::policies::{merge_attributes, resolve_entity_type, select_outcome, vote_gender};
use crate::entity::{
    CanonicalEntity, CanonicalId, EntityMapping, EntityType, RawEntity, RawEntityTable, Role,
    TrialAppearance,
};
use crate::trial::TrialTable;

/// Attribute key set on entities that were both witness and accused.
pub const WITNESS_TO_ACCUSED: &str = "witness_to_accused";

/// Canonical entities plus the raw-name mapping onto them.
#[derive(Debug, Clone, Default)]
pub struct Canonicalization {
    /// Entities in id order.
    pub entities: Vec<CanonicalEntity>,
    pub mapping: EntityMapping,
    /// Appearances whose trial id is missing from the trial table.
    pub unresolved_trial_refs: usize,
}

/// Builds canonical entities from merged clusters.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalEntityBuilder<'a> {
    entities: &'a RawEntityTable,
    trials: &'a TrialTable,
    id_prefix: &'a str,
    id_width: usize,
}

impl<'a> CanonicalEntityBuilder<'a> {
    #[must_use]
    pub fn new(entities: &'a RawEntityTable, trials: &'a TrialTable) -> Self {
        Self {
            entities,
            trials,
            id_prefix: "E",
            id_width: 5,
        }
    }

    /// Overrides the canonical id format (`{prefix}{sequence:0width}`).
    #[must_use]
    pub fn with_id_format(mut self, prefix: &'a str, width: usize) -> Self {
        self.id_prefix = prefix;
        self.id_width = width;
        self
    }

    /// Allocates ids in cluster order, starting at 1.
    #[must_use]
    pub fn build(&self, clusters: &[Cluster]) -> Canonicalization {
        let mut result = Canonicalization::default();

        for (index, cluster) in clusters.iter().enumerate() {
            let id = CanonicalId::sequential(self.id_prefix, self.id_width, index + 1);
            let (entity, unresolved) = self.build_one(id, cluster);

            for variant in &entity.variants {
                if let Some(previous) = result.mapping.assign(variant.clone(), entity.canonical_id.clone()) {
                    warn!(raw_name = %variant, kept = %previous, "Raw name already mapped");
                }
            }
            result.unresolved_trial_refs += unresolved;
            result.entities.push(entity);
        }

        result
    }

    fn build_one(&self, canonical_id: CanonicalId, cluster: &Cluster) -> (CanonicalEntity, usize) {
        let members: Vec<&RawEntity> = cluster
            .members
            .iter()
            .filter_map(|name| self.entities.get(name))
            .collect();

        let mut locations = BTreeSet::new();
        let mut trial_appearances = Vec::new();
        let mut roles_in_trials: BTreeMap<String, Role> = BTreeMap::new();
        let mut attributes: BTreeMap<String, Value> = BTreeMap::new();
        let mut unresolved = 0;

        for raw in &members {
            if let Some(loc) = raw.recorded_location() {
                locations.insert(loc.to_string());
            }

            let mut seen = BTreeSet::new();
            for trial_id in raw.trial_ids.iter().filter(|t| seen.insert(t.as_str())) {
                if !self.trials.contains(trial_id) {
                    warn!(raw_name = %raw.raw_name, trial_id = %trial_id, "Trial not found in trial table");
                    unresolved += 1;
                }
                let role = raw.role_in(trial_id);
                // Last constituent wins on conflicting roles.
                roles_in_trials.insert(trial_id.clone(), role.clone());
                trial_appearances.push(TrialAppearance {
                    trial_id: trial_id.clone(),
                    role,
                    year: self.trials.year_of(trial_id),
                    raw_name: raw.raw_name.clone(),
                });
            }

            merge_attributes(&mut attributes, &raw.attributes);
        }

        let entity_type = resolve_entity_type(members.iter().map(|raw| raw.entity_type));
        let gender = vote_gender(members.iter().filter_map(|raw| raw.gender));

        let outcome = if entity_type == EntityType::Accused {
            let accused_trials: BTreeSet<&str> = trial_appearances
                .iter()
                .filter(|a| a.role == Role::Accused)
                .map(|a| a.trial_id.as_str())
                .collect();
            select_outcome(self.trials, &accused_trials)
        } else {
            None
        };

        let has_role = |wanted: &Role| roles_in_trials.values().any(|role| role == wanted);
        let witness_to_accused = has_role(&Role::Witness) && has_role(&Role::Accused);
        if witness_to_accused {
            attributes.insert(WITNESS_TO_ACCUSED.to_string(), Value::Bool(true));
        }

        let entity = CanonicalEntity {
            canonical_id,
            canonical_name: cluster.key.clone(),
            variants: cluster.members.clone(),
            entity_type,
            gender,
            locations,
            trial_appearances,
            roles_in_trials,
            outcome,
            witness_to_accused,
            attributes,
        };
        (entity, unresolved)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::entity::Gender;
    use crate::trial::TrialMetadata;

    use super::*;

    fn table(entities: Vec<RawEntity>) -> RawEntityTable {
        entities.into_iter().collect()
    }

    fn cluster_of(key: &str, members: &[&str]) -> Cluster {
        let mut cluster = Cluster::new(key);
        for name in members {
            cluster.push(*name, None);
        }
        cluster
    }

    fn trials() -> TrialTable {
        vec![
            TrialMetadata::new("T1", Some("1590"), Some("released")),
            TrialMetadata::new("T2", Some("1598-06-14"), Some("death_sentence")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn aggregates_constituents() {
        let raw = table(vec![
            RawEntity::new("Mengeon Didier", EntityType::Witness)
                .with_location("Vaxoncourt")
                .with_trial("T1", Role::Witness)
                .with_gender(Gender::Male),
            RawEntity::new("Mengeon Didier, laboureur", EntityType::Accused)
                .with_trial("T2", Role::Accused)
                .with_attribute("occupation", json!("laboureur")),
        ]);
        let trials = trials();

        let result = CanonicalEntityBuilder::new(&raw, &trials)
            .build(&[cluster_of("mengeon didier", &["Mengeon Didier", "Mengeon Didier, laboureur"])]);

        assert_eq!(result.entities.len(), 1);
        let entity = &result.entities[0];
        assert_eq!(entity.canonical_id.as_str(), "E00001");
        assert_eq!(entity.entity_type, EntityType::Accused);
        assert_eq!(entity.gender, Gender::Male);
        assert_eq!(entity.locations.iter().collect::<Vec<_>>(), vec!["Vaxoncourt"]);
        assert_eq!(entity.outcome.as_deref(), Some("death_sentence"));
        assert!(entity.witness_to_accused);
        assert!(entity.has_flag(WITNESS_TO_ACCUSED));
        assert_eq!(entity.attributes.get("occupation"), Some(&json!("laboureur")));

        let years: Vec<_> = entity.trial_appearances.iter().map(|a| a.year).collect();
        assert_eq!(years, vec![Some(1590), Some(1598)]);
        assert_eq!(entity.trial_appearances[1].raw_name, "Mengeon Didier, laboureur");
        assert_eq!(result.mapping.get("Mengeon Didier, laboureur"), Some(&entity.canonical_id));
        assert_eq!(result.unresolved_trial_refs, 0);
    }

    #[test]
    fn last_constituent_wins_role_conflicts() {
        let raw = table(vec![
            RawEntity::new("A", EntityType::Witness).with_trial("T1", Role::Witness),
            RawEntity::new("A2", EntityType::Authority).with_trial("T1", Role::Authority),
        ]);
        let trials = trials();

        let result = CanonicalEntityBuilder::new(&raw, &trials).build(&[cluster_of("a", &["A", "A2"])]);
        let entity = &result.entities[0];

        assert_eq!(entity.roles_in_trials.get("T1"), Some(&Role::Authority));
        // One appearance per (raw name, trial) pair, each with its own role.
        assert_eq!(entity.trial_appearances.len(), 2);
        assert_eq!(entity.trial_appearances[0].role, Role::Witness);
        assert!(entity.outcome.is_none());
    }

    #[test]
    fn outcome_follows_accused_appearances() {
        let raw = table(vec![
            RawEntity::new("Barbe Didier", EntityType::Accused).with_trial("T2", Role::Accused),
            RawEntity::new("Barbe Didier, 45 ans", EntityType::Witness).with_trial("T2", Role::Witness),
        ]);
        let trials = trials();

        let result = CanonicalEntityBuilder::new(&raw, &trials)
            .build(&[cluster_of("barbe didier", &["Barbe Didier", "Barbe Didier, 45 ans"])]);
        let entity = &result.entities[0];

        assert_eq!(entity.entity_type, EntityType::Accused);
        assert_eq!(entity.roles_in_trials.get("T2"), Some(&Role::Witness));
        assert_eq!(entity.outcome.as_deref(), Some("death_sentence"));
    }

    #[test]
    fn roles_without_an_appearance_are_ignored() {
        let mut record = RawEntity::new("Claude Mathieu", EntityType::Accused).with_trial("T1", Role::Witness);
        record.roles_in_trials.insert("T2".to_string(), Role::Accused);
        let raw = table(vec![record]);
        let trials = trials();

        let result = CanonicalEntityBuilder::new(&raw, &trials).build(&[cluster_of("claude mathieu", &["Claude Mathieu"])]);
        let entity = &result.entities[0];

        assert_eq!(entity.trial_appearances.len(), 1);
        assert!(!entity.roles_in_trials.contains_key("T2"));
        assert!(!entity.witness_to_accused);
        assert!(!entity.has_flag(WITNESS_TO_ACCUSED));
        assert_eq!(entity.outcome, None);
    }

    #[test]
    fn unknown_trials_resolve_to_null_year() {
        let raw = table(vec![RawEntity::new("B", EntityType::Accused)
            .with_trial("T404", Role::Accused)
            .with_trial("T404", Role::Accused)]);
        let trials = trials();

        let result = CanonicalEntityBuilder::new(&raw, &trials).build(&[cluster_of("b", &["B"])]);
        let entity = &result.entities[0];

        assert_eq!(entity.trial_appearances.len(), 1);
        assert_eq!(entity.trial_appearances[0].year, None);
        assert_eq!(entity.outcome, None);
        assert_eq!(result.unresolved_trial_refs, 1);
        assert!(!entity.witness_to_accused);
    }

    #[test]
    fn ids_follow_cluster_order_and_format() {
        let raw = table(vec![
            RawEntity::new("X", EntityType::Person),
            RawEntity::new("Y", EntityType::Person),
        ]);
        let trials = TrialTable::new();

        let result = CanonicalEntityBuilder::new(&raw, &trials)
            .with_id_format("P", 3)
            .build(&[cluster_of("y", &["Y"]), cluster_of("x", &["X"])]);

        let ids: Vec<_> = result.entities.iter().map(|e| e.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["P001", "P002"]);
        assert_eq!(result.mapping.get("Y").map(CanonicalId::as_str), Some("P001"));
    }
}
