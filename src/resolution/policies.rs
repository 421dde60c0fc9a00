//! Attribute conflict policies used when building canonical entities.
//!
//! Policies are pure functions of their inputs and their iteration order,
//! so the same clusters always resolve to the same record.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::entity::{EntityType, Gender};
use crate::trial::TrialTable;

/// Truthiness of a free-form attribute value.
///
/// `null`, `false`, zero, the empty string and empty containers are falsy;
/// everything else is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Highest-priority type among `types` (`accused > authority > witness >
/// person`); [`EntityType::Person`] when there are none.
#[must_use]
pub fn resolve_entity_type<I>(types: I) -> EntityType
where
    I: IntoIterator<Item = EntityType>,
{
    types
        .into_iter()
        .max_by_key(|t| t.priority())
        .unwrap_or(EntityType::Person)
}

/// Majority vote over known genders.
///
/// Unknown values do not vote. A tie goes to the value seen first, and no
/// votes at all yield [`Gender::Unknown`].
#[must_use]
pub fn vote_gender<I>(votes: I) -> Gender
where
    I: IntoIterator<Item = Gender>,
{
    let mut tally: Vec<(Gender, usize)> = Vec::new();
    for gender in votes.into_iter().filter(|g| g.is_known()) {
        match tally.iter_mut().find(|(g, _)| *g == gender) {
            Some((_, count)) => *count += 1,
            None => tally.push((gender, 1)),
        }
    }

    let mut winner = Gender::Unknown;
    let mut best = 0;
    for (gender, count) in tally {
        if count > best {
            winner = gender;
            best = count;
        }
    }
    winner
}

/// First non-null outcome among `accused_trials`, in trial table order.
#[must_use]
pub fn select_outcome(trials: &TrialTable, accused_trials: &BTreeSet<&str>) -> Option<String> {
    if accused_trials.is_empty() {
        return None;
    }

    trials
        .iter()
        .filter(|t| accused_trials.contains(t.trial_id.as_str()))
        .find_map(|t| t.outcome.clone())
}

/// Merges `incoming` into `merged`, keeping only truthy values. A later
/// truthy value overwrites an earlier one.
pub fn merge_attributes(merged: &mut BTreeMap<String, Value>, incoming: &BTreeMap<String, Value>) {
    for (key, value) in incoming {
        if is_truthy(value) {
            merged.insert(key.clone(), value.clone());
        }
    }
}
