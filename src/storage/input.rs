//! Loading the raw-entity and trial tables.
//!
//! Both tables are JSON. Object key order is preserved and becomes the
//! iteration order of the whole run. A missing or unparseable file is
//! fatal; individual records that fail to parse are skipped and returned
//! alongside the table.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::PathsConfig;
use crate::entity::{MalformedRecord, RawEntity, RawEntityTable};
use crate::error::{InputError, ValidationError};
use crate::trial::{MalformedTrial, TrialMetadata, TrialTable};

/// Identity of an input file: where it came from and what it contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDigest {
    /// Path the file was read from.
    pub path: PathBuf,
    /// blake3 of the file bytes, hex encoded.
    pub blake3: String,
}

/// A loaded raw-entity table.
#[derive(Debug, Clone)]
pub struct LoadedEntities {
    /// Records that parsed.
    pub table: RawEntityTable,
    pub malformed: Vec<MalformedRecord>,
    pub digest: InputDigest,
}

/// A loaded trial table.
#[derive(Debug, Clone)]
pub struct LoadedTrials {
    /// Trials that parsed.
    pub table: TrialTable,
    pub malformed: Vec<MalformedTrial>,
    pub digest: InputDigest,
}

/// Both inputs of a run.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub entities: LoadedEntities,
    pub trials: LoadedTrials,
}

fn read_json(path: &Path) -> Result<(Value, InputDigest), InputError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            InputError::MissingInputFile {
                path: path.to_path_buf(),
            }
        } else {
            InputError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let digest = InputDigest {
        path: path.to_path_buf(),
        blake3: blake3::hash(&bytes).to_hex().to_string(),
    };
    let value = serde_json::from_slice(&bytes).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((value, digest))
}

/// Parses a raw-entity table already read as JSON.
///
/// # Errors
///
/// Returns [`InputError::UnsupportedShape`] unless `value` is an object.
pub fn parse_raw_entities(
    value: Value,
    path: &Path,
) -> Result<(RawEntityTable, Vec<MalformedRecord>), InputError> {
    let Value::Object(records) = value else {
        return Err(InputError::UnsupportedShape {
            path: path.to_path_buf(),
            reason: "expected an object keyed by raw name".to_string(),
        });
    };

    let mut table = RawEntityTable::new();
    let mut malformed = Vec::new();
    for (raw_name, record) in records {
        match RawEntity::from_json(&raw_name, record) {
            Ok(entity) => table.insert(entity),
            Err(bad) => {
                warn!(error = %ValidationError::from(bad.clone()), "Skipping malformed record");
                malformed.push(bad);
            }
        }
    }
    Ok((table, malformed))
}

/// Parses a trial table already read as JSON: either an array of rows
/// carrying `trial_id`, or an object keyed by trial id.
///
/// # Errors
///
/// Returns [`InputError::UnsupportedShape`] for any other JSON value.
pub fn parse_trials(value: Value, path: &Path) -> Result<(TrialTable, Vec<MalformedTrial>), InputError> {
    let rows: Vec<(Option<String>, Value)> = match value {
        Value::Array(rows) => rows.into_iter().map(|row| (None, row)).collect(),
        Value::Object(rows) => rows.into_iter().map(|(id, row)| (Some(id), row)).collect(),
        _ => {
            return Err(InputError::UnsupportedShape {
                path: path.to_path_buf(),
                reason: "expected an array of trials or an object keyed by trial id".to_string(),
            })
        }
    };

    let mut table = TrialTable::new();
    let mut malformed = Vec::new();
    for (key, row) in rows {
        match TrialMetadata::from_json(key.as_deref(), row) {
            Ok(trial) => {
                let trial_id = trial.trial_id.clone();
                if !table.insert(trial) {
                    warn!(trial_id = %trial_id, "Duplicate trial id, keeping the first row");
                }
            }
            Err(bad) => {
                warn!(error = %ValidationError::from(bad.clone()), "Skipping malformed trial");
                malformed.push(bad);
            }
        }
    }
    Ok((table, malformed))
}

/// Loads the raw-entity table from `path`.
///
/// # Errors
///
/// Returns [`InputError::MissingInputFile`] if the file does not exist, or
/// an I/O, parse or shape error.
pub fn load_raw_entities(path: &Path) -> Result<LoadedEntities, InputError> {
    let (value, digest) = read_json(path)?;
    let (table, malformed) = parse_raw_entities(value, path)?;
    info!(
        path = %path.display(),
        records = table.len(),
        skipped = malformed.len(),
        "Loaded raw entities"
    );
    Ok(LoadedEntities {
        table,
        malformed,
        digest,
    })
}

/// Loads the trial table from `path`.
///
/// # Errors
///
/// Returns [`InputError::MissingInputFile`] if the file does not exist, or
/// an I/O, parse or shape error.
pub fn load_trials(path: &Path) -> Result<LoadedTrials, InputError> {
    let (value, digest) = read_json(path)?;
    let (table, malformed) = parse_trials(value, path)?;
    info!(
        path = %path.display(),
        trials = table.len(),
        skipped = malformed.len(),
        "Loaded trial metadata"
    );
    Ok(LoadedTrials {
        table,
        malformed,
        digest,
    })
}

/// Loads both inputs. Nothing is returned unless both load.
///
/// # Errors
///
/// Returns the first load failure.
pub fn load_inputs(paths: &PathsConfig) -> Result<LoadedInputs, InputError> {
    Ok(LoadedInputs {
        entities: load_raw_entities(&paths.entities)?,
        trials: load_trials(&paths.trials)?,
    })
}
