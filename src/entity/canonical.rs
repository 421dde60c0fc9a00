//! Resolved identities.
//!
//! A [`CanonicalEntity`] is created once per surviving cluster and is never
//! mutated afterwards. [`EntityMapping`] is the derived surjection from every
//! clustered raw name onto its canonical id.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::raw::{EntityType, Gender, Role};

/// Sequential, zero-padded identifier of a canonical entity (`E00001`).
///
/// Ids are assigned in cluster enumeration order, so the same input in the
/// same order always yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Formats the `sequence`-th id (1-based) with the given prefix and width.
    ///
    /// # Examples
    ///
    /// ```
    /// use personae::CanonicalId;
    ///
    /// assert_eq!(CanonicalId::sequential("E", 5, 42).as_str(), "E00042");
    /// ```
    #[must_use]
    pub fn sequential(prefix: &str, width: usize, sequence: usize) -> Self {
        Self(format!("{prefix}{sequence:0width$}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CanonicalId> for String {
    fn from(id: CanonicalId) -> Self {
        id.0
    }
}

/// One appearance of a canonical entity in a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialAppearance {
    pub trial_id: String,
    pub role: Role,
    /// Year of the trial; `None` when the trial is unknown or undated.
    pub year: Option<i32>,
    /// The variant under which the entity appears in this trial.
    pub raw_name: String,
}

/// The resolved identity record of one historical person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub canonical_id: CanonicalId,

    /// Normalization key of the cluster the entity was built from.
    pub canonical_name: String,

    /// Raw names known to refer to this entity, in cluster order.
    pub variants: Vec<String>,

    pub entity_type: EntityType,

    pub gender: Gender,

    pub locations: BTreeSet<String>,

    pub trial_appearances: Vec<TrialAppearance>,

    /// Aggregated trial → role map (last constituent wins on conflict).
    pub roles_in_trials: BTreeMap<String, Role>,

    /// Outcome of the entity's own trial, for accused entities.
    pub outcome: Option<String>,

    /// True iff the aggregated roles contain both witness and accused.
    pub witness_to_accused: bool,

    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl CanonicalEntity {
    /// Distinct trial ids across all appearances, first-seen order.
    #[must_use]
    pub fn distinct_trials(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.trial_appearances
            .iter()
            .map(|a| a.trial_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Appearances in the given role, in appearance order.
    pub fn appearances_as<'a>(&'a self, role: &'a Role) -> impl Iterator<Item = &'a TrialAppearance> + 'a {
        self.trial_appearances.iter().filter(move |a| &a.role == role)
    }

    /// Returns true if the attribute is present and truthy.
    #[must_use]
    pub fn has_flag(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .is_some_and(crate::resolution::policies::is_truthy)
    }
}

/// Ordered mapping `raw_name → canonical_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMapping {
    entries: Vec<(String, CanonicalId)>,
    index: HashMap<String, usize>,
}

impl EntityMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `raw_name` to `id`.
    ///
    /// Returns the previous id if the name was already mapped; the mapping
    /// is then left unchanged, so the first assignment sticks.
    pub fn assign(&mut self, raw_name: impl Into<String>, id: CanonicalId) -> Option<CanonicalId> {
        let raw_name = raw_name.into();
        if let Some(&pos) = self.index.get(&raw_name) {
            return Some(self.entries[pos].1.clone());
        }
        self.index.insert(raw_name.clone(), self.entries.len());
        self.entries.push((raw_name, id));
        None
    }

    #[must_use]
    pub fn get(&self, raw_name: &str) -> Option<&CanonicalId> {
        self.index.get(raw_name).map(|&pos| &self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for EntityMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(name, id)| (name, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_zero_padded() {
        assert_eq!(CanonicalId::sequential("E", 5, 1).as_str(), "E00001");
        assert_eq!(CanonicalId::sequential("P", 3, 1234).as_str(), "P1234");
        assert_eq!(format!("{}", CanonicalId::sequential("E", 5, 7)), "E00007");
    }

    #[test]
    fn mapping_keeps_first_assignment() {
        let mut mapping = EntityMapping::new();
        let first = CanonicalId::sequential("E", 5, 1);
        let second = CanonicalId::sequential("E", 5, 2);

        assert!(mapping.assign("Odille Thieriat", first.clone()).is_none());
        assert_eq!(mapping.assign("Odille Thieriat", second), Some(first.clone()));
        assert_eq!(mapping.get("Odille Thieriat"), Some(&first));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn mapping_serializes_in_insertion_order() {
        let mut mapping = EntityMapping::new();
        mapping.assign("zeta", CanonicalId::sequential("E", 5, 1));
        mapping.assign("alpha", CanonicalId::sequential("E", 5, 2));

        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"zeta":"E00001","alpha":"E00002"}"#);
    }

    #[test]
    fn distinct_trials_preserve_first_seen_order() {
        let entity = CanonicalEntity {
            canonical_id: CanonicalId::sequential("E", 5, 1),
            canonical_name: "jean petit".to_string(),
            variants: vec!["Jean Petit".to_string()],
            entity_type: EntityType::Witness,
            gender: Gender::Male,
            locations: BTreeSet::new(),
            trial_appearances: ["T2", "T1", "T2"]
                .iter()
                .map(|t| TrialAppearance {
                    trial_id: (*t).to_string(),
                    role: Role::Witness,
                    year: None,
                    raw_name: "Jean Petit".to_string(),
                })
                .collect(),
            roles_in_trials: BTreeMap::new(),
            outcome: None,
            witness_to_accused: false,
            attributes: BTreeMap::new(),
        };

        assert_eq!(entity.distinct_trials(), vec!["T2", "T1"]);
        assert_eq!(entity.appearances_as(&Role::Witness).count(), 3);
        assert!(!entity.has_flag("personal_suspicion"));
    }
}
