//! Raw person references as produced by upstream extraction.
//!
//! A [`RawEntity`] is immutable input: one surface form of a name together
//! with everything the extractor recorded about it. The [`RawEntityTable`]
//! keeps records in insertion order, which is the order every later stage
//! iterates in.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification assigned to a reference by the extractor.
///
/// Variants are ordered by resolution priority: when several references
/// collapse into one identity, the highest-priority type wins
/// (`accused > authority > witness > person`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityType {
    /// A person with no more specific role.
    Person,
    /// A witness deposing in at least one trial.
    Witness,
    /// An official (mayor, procureur, judge).
    Authority,
    /// A person tried for witchcraft.
    Accused,
}

impl EntityType {
    /// Every type, lowest priority first.
    pub const ALL: [Self; 4] = [Self::Person, Self::Witness, Self::Authority, Self::Accused];

    /// Resolution priority; higher wins.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Person => 0,
            Self::Witness => 1,
            Self::Authority => 2,
            Self::Accused => 3,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Witness => "witness",
            Self::Authority => "authority",
            Self::Accused => "accused",
        }
    }
}

impl TryFrom<String> for EntityType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err("entity type cannot be empty".to_string());
        }

        Self::ALL
            .into_iter()
            .find(|t| value.eq_ignore_ascii_case(t.as_str()))
            .ok_or_else(|| {
                format!("unknown entity type: {value}. Use one of person, witness, authority, accused")
            })
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a reference played in one trial.
///
/// Unrecognized role labels are kept verbatim in [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Accused,
    Witness,
    Authority,
    /// The extractor recorded the trial but no role for it.
    Unknown,
    Other(String),
}

impl Role {
    /// Returns the role label as written in the output tables.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accused => "accused",
            Self::Witness => "witness",
            Self::Authority => "authority",
            Self::Unknown => "unknown",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("accused") {
            Self::Accused
        } else if trimmed.eq_ignore_ascii_case("witness") {
            Self::Witness
        } else if trimmed.eq_ignore_ascii_case("authority") {
            Self::Authority
        } else if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
            Self::Unknown
        } else {
            Self::Other(trimmed.to_string())
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded or inferred gender of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("male") || value.eq_ignore_ascii_case("m") {
            Self::Male
        } else if value.eq_ignore_ascii_case("female") || value.eq_ignore_ascii_case("f") {
            Self::Female
        } else {
            Self::Unknown
        }
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted person reference.
///
/// # Examples
///
/// ```
/// use personae::{EntityType, RawEntity, Role};
///
/// let raw = RawEntity::new("Odille Thieriat", EntityType::Witness)
///     .with_location("Thieriat")
///     .with_trial("T001", Role::Witness);
/// assert_eq!(raw.trial_ids, vec!["T001".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEntity {
    /// Surface form exactly as extracted.
    pub raw_name: String,

    pub entity_type: EntityType,

    /// Place the reference was attached to, if the extractor found one.
    pub location: Option<String>,

    /// Trials the reference appears in, in extraction order.
    pub trial_ids: Vec<String>,

    pub roles_in_trials: BTreeMap<String, Role>,

    pub gender: Option<Gender>,

    /// Free-form extractor output (occupation, suspicion flags, ...).
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl RawEntity {
    /// Creates a reference with no trials, location, gender or attributes.
    #[must_use]
    pub fn new(raw_name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            raw_name: raw_name.into(),
            entity_type,
            location: None,
            trial_ids: Vec::new(),
            roles_in_trials: BTreeMap::new(),
            gender: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Adds an appearance in `trial_id` with the given role.
    #[must_use]
    pub fn with_trial(mut self, trial_id: impl Into<String>, role: impl Into<Role>) -> Self {
        let trial_id = trial_id.into();
        self.roles_in_trials.insert(trial_id.clone(), role.into());
        self.trial_ids.push(trial_id);
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// The recorded location, trimmed, or `None` when absent or blank.
    #[must_use]
    pub fn recorded_location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
    }

    /// Role recorded for `trial_id`, [`Role::Unknown`] if none was recorded.
    #[must_use]
    pub fn role_in(&self, trial_id: &str) -> Role {
        self.roles_in_trials
            .get(trial_id)
            .cloned()
            .unwrap_or(Role::Unknown)
    }

    /// Parses one record of the raw-entity input table.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedRecord`] when the value is not an object, a
    /// required field (`entity_type`, `trial_ids`) is missing, or a field has
    /// the wrong shape.
    pub fn from_json(raw_name: &str, value: serde_json::Value) -> Result<Self, MalformedRecord> {
        let record: RawEntityRecord =
            serde_json::from_value(value).map_err(|e| MalformedRecord {
                raw_name: raw_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            raw_name: raw_name.to_string(),
            entity_type: record.entity_type,
            location: record.location,
            trial_ids: record.trial_ids,
            roles_in_trials: record.roles_in_trials,
            gender: record.gender,
            attributes: record.attributes,
        })
    }
}

/// Wire shape of one raw-entity record (the name is the table key).
#[derive(Debug, Deserialize)]
struct RawEntityRecord {
    entity_type: EntityType,
    trial_ids: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    roles_in_trials: BTreeMap<String, Role>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

/// A raw record that was skipped because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRecord {
    pub raw_name: String,
    pub reason: String,
}

impl From<MalformedRecord> for crate::error::ValidationError {
    fn from(value: MalformedRecord) -> Self {
        Self::MalformedRecord {
            raw_name: value.raw_name,
            reason: value.reason,
        }
    }
}

/// Insertion-ordered table of raw references keyed by `raw_name`.
#[derive(Debug, Clone, Default)]
pub struct RawEntityTable {
    records: Vec<RawEntity>,
    index: HashMap<String, usize>,
}

impl RawEntityTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record.
    ///
    /// A record whose name is already present replaces the earlier one in
    /// place, so the table behaves like an ordered map.
    pub fn insert(&mut self, entity: RawEntity) {
        if let Some(&pos) = self.index.get(&entity.raw_name) {
            self.records[pos] = entity;
        } else {
            self.index.insert(entity.raw_name.clone(), self.records.len());
            self.records.push(entity);
        }
    }

    #[must_use]
    pub fn get(&self, raw_name: &str) -> Option<&RawEntity> {
        self.index.get(raw_name).map(|&pos| &self.records[pos])
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RawEntity> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<RawEntity> for RawEntityTable {
    fn from_iter<I: IntoIterator<Item = RawEntity>>(iter: I) -> Self {
        let mut table = Self::new();
        for entity in iter {
            table.insert(entity);
        }
        table
    }
}
