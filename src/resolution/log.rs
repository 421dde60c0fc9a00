//! Append-only audit trail of merge decisions.

use serde::{Deserialize, Serialize};

/// Kind of decision recorded in the resolution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Two clusters were merged by the fuzzy merger.
    FuzzyMerge,
    /// A `la X` / `le X` reference was attached to a full-name cluster.
    SurnameAttach,
    /// A surname reference matched several clusters and was left alone.
    SurnameAmbiguous,
}

impl ResolutionAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FuzzyMerge => "fuzzy_merge",
            Self::SurnameAttach => "surname_attach",
            Self::SurnameAmbiguous => "surname_ambiguous",
        }
    }
}

/// One audit record. `name1` is the surviving key, `name2` the absorbed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionLogEntry {
    pub action: ResolutionAction,
    pub name1: String,
    pub name2: String,
    pub similarity: f64,
}

/// Ordered list of [`ResolutionLogEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionLog {
    entries: Vec<ResolutionLogEntry>,
}

impl ResolutionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action: ResolutionAction,
        name1: impl Into<String>,
        name2: impl Into<String>,
        similarity: f64,
    ) {
        self.entries.push(ResolutionLogEntry {
            action,
            name1: name1.into(),
            name2: name2.into(),
            similarity,
        });
    }

    /// Appends every entry of `other`, keeping its order.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[ResolutionLogEntry] {
        &self.entries
    }

    /// Number of entries with the given action.
    #[must_use]
    pub fn count(&self, action: ResolutionAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_as_flat_array() {
        let mut log = ResolutionLog::new();
        log.record(ResolutionAction::FuzzyMerge, "odille claudin thieriat", "odille thieriat", 100.0);

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "action": "fuzzy_merge",
                "name1": "odille claudin thieriat",
                "name2": "odille thieriat",
                "similarity": 100.0
            }])
        );
    }

    #[test]
    fn count_by_action() {
        let mut log = ResolutionLog::new();
        log.record(ResolutionAction::FuzzyMerge, "a", "b", 96.0);
        log.record(ResolutionAction::SurnameAttach, "c", "d", 100.0);

        let mut other = ResolutionLog::new();
        other.record(ResolutionAction::FuzzyMerge, "e", "f", 97.0);
        log.extend(other);

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(ResolutionAction::FuzzyMerge), 2);
        assert_eq!(log.count(ResolutionAction::SurnameAmbiguous), 0);
        assert_eq!(log.entries()[2].name1, "e");
    }
}
