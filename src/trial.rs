//! Trial metadata consumed from the upstream trial table.
//!
//! Only two facts about a trial matter to resolution: the year it took place
//! (resolved from a free-text date) and its outcome.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

static YEAR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn year_pattern() -> &'static Regex {
    YEAR_PATTERN.get_or_init(|| Regex::new(r"\b(1[5-6]\d{2})\b").expect("static year pattern compiles"))
}

/// Extracts the year from a trial date string.
///
/// A full ISO date (`YYYY-MM-DD`) is used as is. Otherwise the first
/// standalone year between 1500 and 1699 is taken. Returns `None` when
/// neither is found.
///
/// # Examples
///
/// ```
/// use personae::trial::extract_year;
///
/// assert_eq!(extract_year("1598-06-14"), Some(1598));
/// assert_eq!(extract_year("June 1598 (Nancy)"), Some(1598));
/// assert_eq!(extract_year("undated"), None);
/// ```
#[must_use]
pub fn extract_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed.year());
    }
    year_pattern()
        .captures(date)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Metadata of one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialMetadata {
    pub trial_id: String,
    pub date: Option<String>,
    /// Year resolved from `date`.
    pub year: Option<i32>,
    pub outcome: Option<String>,
}

impl TrialMetadata {
    /// Creates trial metadata, resolving the year from `date`.
    #[must_use]
    pub fn new(trial_id: impl Into<String>, date: Option<&str>, outcome: Option<&str>) -> Self {
        Self {
            trial_id: trial_id.into(),
            date: date.map(str::to_string),
            year: date.and_then(extract_year),
            outcome: outcome
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
        }
    }

    /// Parses one row of the trial table.
    ///
    /// `key` is the table key when the input is an object keyed by trial id;
    /// for array input the id must be carried in the row itself.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedTrial`] when the row is not an object, has no
    /// trial id, or carries a date of an unsupported type.
    pub fn from_json(key: Option<&str>, value: serde_json::Value) -> Result<Self, MalformedTrial> {
        let label = key.unwrap_or("<unnamed>").to_string();
        let record: TrialRecord = serde_json::from_value(value).map_err(|e| MalformedTrial {
            trial_id: label.clone(),
            reason: e.to_string(),
        })?;

        let trial_id = match (key, record.trial_id) {
            (Some(key), _) => key.to_string(),
            (None, Some(id)) if !id.trim().is_empty() => id,
            (None, _) => {
                return Err(MalformedTrial {
                    trial_id: label,
                    reason: "missing field `trial_id`".to_string(),
                })
            }
        };

        let date = match record.date {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(MalformedTrial {
                    trial_id,
                    reason: format!("unsupported date value: {other}"),
                })
            }
        };

        Ok(Self::new(trial_id, date.as_deref(), record.outcome.as_deref()))
    }
}

#[derive(Debug, Deserialize)]
struct TrialRecord {
    #[serde(default)]
    trial_id: Option<String>,
    #[serde(default, alias = "trial_date")]
    date: Option<serde_json::Value>,
    #[serde(default)]
    outcome: Option<String>,
}

/// A trial row that was skipped because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedTrial {
    pub trial_id: String,
    pub reason: String,
}

impl From<MalformedTrial> for crate::error::ValidationError {
    fn from(value: MalformedTrial) -> Self {
        Self::MalformedTrial {
            trial_id: value.trial_id,
            reason: value.reason,
        }
    }
}

/// Insertion-ordered table of trial metadata keyed by trial id.
#[derive(Debug, Clone, Default)]
pub struct TrialTable {
    trials: Vec<TrialMetadata>,
    index: HashMap<String, usize>,
}

impl TrialTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a trial. The first row seen for an id is kept; a repeated id
    /// is ignored and `false` is returned.
    pub fn insert(&mut self, trial: TrialMetadata) -> bool {
        if self.index.contains_key(&trial.trial_id) {
            return false;
        }
        self.index.insert(trial.trial_id.clone(), self.trials.len());
        self.trials.push(trial);
        true
    }

    #[must_use]
    pub fn get(&self, trial_id: &str) -> Option<&TrialMetadata> {
        self.index.get(trial_id).map(|&pos| &self.trials[pos])
    }

    #[must_use]
    pub fn contains(&self, trial_id: &str) -> bool {
        self.index.contains_key(trial_id)
    }

    /// Year of the trial, `None` if the trial is unknown or undated.
    #[must_use]
    pub fn year_of(&self, trial_id: &str) -> Option<i32> {
        self.get(trial_id).and_then(|t| t.year)
    }

    /// Trials in table order.
    pub fn iter(&self) -> impl Iterator<Item = &TrialMetadata> {
        self.trials.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl FromIterator<TrialMetadata> for TrialTable {
    fn from_iter<I: IntoIterator<Item = TrialMetadata>>(iter: I) -> Self {
        let mut table = Self::new();
        for trial in iter {
            table.insert(trial);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn year_from_free_text() {
        assert_eq!(extract_year("le 3 mars 1590"), Some(1590));
        assert_eq!(extract_year("1612"), Some(1612));
        assert_eq!(extract_year("  "), None);
        // Four digits glued to other digits are not a year.
        assert_eq!(extract_year("B 21590"), None);
        // Outside the archive window and not an ISO date.
        assert_eq!(extract_year("1750"), None);
    }

    #[test]
    fn year_from_iso_date_outside_window() {
        assert_eq!(extract_year("1702-01-15"), Some(1702));
    }

    #[test]
    fn metadata_blank_outcome_is_none() {
        let trial = TrialMetadata::new("T1", Some("1598"), Some("  "));
        assert_eq!(trial.year, Some(1598));
        assert_eq!(trial.outcome, None);
    }

    #[test]
    fn from_json_array_row() {
        let trial = TrialMetadata::from_json(
            None,
            json!({"trial_id": "T7", "trial_date": "1601", "outcome": "death_sentence"}),
        )
        .unwrap();
        assert_eq!(trial.trial_id, "T7");
        assert_eq!(trial.year, Some(1601));
        assert_eq!(trial.outcome.as_deref(), Some("death_sentence"));
    }

    #[test]
    fn from_json_keyed_row_with_numeric_date() {
        let trial = TrialMetadata::from_json(Some("T8"), json!({"date": 1595})).unwrap();
        assert_eq!(trial.trial_id, "T8");
        assert_eq!(trial.year, Some(1595));
        assert_eq!(trial.outcome, None);
    }

    #[test]
    fn from_json_rejects_rows_without_id() {
        let err = TrialMetadata::from_json(None, json!({"date": "1590"})).unwrap_err();
        assert!(err.reason.contains("trial_id"));

        let err = TrialMetadata::from_json(Some("T9"), json!({"date": ["1590"]})).unwrap_err();
        assert_eq!(err.trial_id, "T9");
    }

    #[test]
    fn table_lookup_and_order() {
        let table: TrialTable = vec![
            TrialMetadata::new("T2", Some("1598"), None),
            TrialMetadata::new("T1", None, Some("released")),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.year_of("T2"), Some(1598));
        assert_eq!(table.year_of("T1"), None);
        assert_eq!(table.year_of("missing"), None);
        assert!(table.contains("T1"));
        let ids: Vec<_> = table.iter().map(|t| t.trial_id.as_str()).collect();
        assert_eq!(ids, vec!["T2", "T1"]);
    }
}
