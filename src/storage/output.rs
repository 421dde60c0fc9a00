//! Writing the run artifacts.
//!
//! Every artifact is rendered in memory first, then written next to its
//! final name as a hidden temporary file. Only when all temporaries are on
//! disk are they renamed into place, so a failed run never leaves a partial
//! canonical table behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::derived::{SuperWitness, Transition};
use crate::entity::{CanonicalEntity, MalformedRecord};
use crate::error::OutputError;
use crate::pipeline::Resolution;
use crate::stats::RunSummary;
use crate::trial::MalformedTrial;

use super::input::{InputDigest, LoadedInputs};

/// `canonical_id → entity` table.
pub const CANONICAL_ENTITIES: &str = "canonical_entities.json";
/// `raw_name → canonical_id` table.
pub const ENTITY_MAPPINGS: &str = "entity_mappings.json";
/// Merge and attachment decisions.
pub const RESOLUTION_LOG: &str = "resolution_log.json";
/// Witness-to-accused rows.
pub const TRANSITIONS_JSON: &str = "witness_to_accused_transitions.json";
pub const TRANSITIONS_CSV: &str = "witness_to_accused_transitions.csv";
/// Super-witness rows.
pub const SUPER_WITNESSES_CSV: &str = "super_witnesses_resolved.csv";
pub const SUPER_WITNESSES_JSON: &str = "super_witnesses_resolved.json";
/// Aggregate counts.
pub const STATISTICS: &str = "resolution_statistics.json";
/// Names and records that were not resolved.
pub const MANUAL_REVIEW: &str = "manual_review.json";
/// Input digests, effective configuration and run summary.
pub const RUN_MANIFEST: &str = "run_manifest.json";

const TRANSITION_HEADER: [&str; 9] = [
    "canonical_id",
    "canonical_name",
    "first_witness_trial",
    "first_witness_year",
    "first_accused_trial",
    "first_accused_year",
    "years_between",
    "total_witness_appearances",
    "outcome",
];

const SUPER_WITNESS_HEADER: [&str; 9] = [
    "canonical_id",
    "canonical_name",
    "num_trials",
    "trial_ids",
    "years_active",
    "gender",
    "locations",
    "became_accused",
    "personal_suspicion",
];

/// Separator for list-valued CSV cells.
const LIST_SEPARATOR: &str = ";";

/// `canonical_id → entity`, in id order.
struct CanonicalTable<'a>(&'a [CanonicalEntity]);

impl Serialize for CanonicalTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|e| (e.canonical_id.as_str(), e)))
    }
}

/// Super-witness row flattened for CSV.
#[derive(Serialize)]
struct SuperWitnessRow<'a> {
    canonical_id: &'a str,
    canonical_name: &'a str,
    num_trials: usize,
    trial_ids: String,
    years_active: String,
    gender: &'static str,
    locations: String,
    became_accused: bool,
    personal_suspicion: bool,
}

impl<'a> From<&'a SuperWitness> for SuperWitnessRow<'a> {
    fn from(row: &'a SuperWitness) -> Self {
        Self {
            canonical_id: row.canonical_id.as_str(),
            canonical_name: &row.canonical_name,
            num_trials: row.num_trials,
            trial_ids: row.trial_ids.join(LIST_SEPARATOR),
            years_active: row
                .years_active
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            gender: row.gender.as_str(),
            locations: row.locations.join(LIST_SEPARATOR),
            became_accused: row.became_accused,
            personal_suspicion: row.personal_suspicion,
        }
    }
}

#[derive(Serialize)]
struct ManualReview<'a> {
    empty_key: &'a [String],
    malformed_records: &'a [MalformedRecord],
    malformed_trials: &'a [MalformedTrial],
}

#[derive(Serialize)]
struct ManifestInputs<'a> {
    entities: &'a InputDigest,
    trials: &'a InputDigest,
}

/// Provenance record of a run. Contains no timestamps, so identical input
/// yields a byte-identical manifest.
#[derive(Serialize)]
struct RunManifest<'a> {
    inputs: ManifestInputs<'a>,
    config: &'a ResolverConfig,
    summary: &'a RunSummary,
    artifacts: Vec<&'static str>,
}

fn to_json<T: Serialize + ?Sized>(artifact: &'static str, value: &T) -> Result<Vec<u8>, OutputError> {
    let mut bytes =
        serde_json::to_vec_pretty(value).map_err(|source| OutputError::Serialize { artifact, source })?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn to_csv<R: Serialize>(
    artifact: &'static str,
    header: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> Result<Vec<u8>, OutputError> {
    let csv_err = |source| OutputError::Csv { artifact, source };

    // Header written by hand so an empty table still has one.
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv_err(csv::Error::from(e.into_error())))
}

/// Renders every artifact. Nothing touches the disk here.
fn render(
    resolution: &Resolution,
    inputs: &LoadedInputs,
    config: &ResolverConfig,
) -> Result<Vec<(&'static str, Vec<u8>)>, OutputError> {
    let summary = resolution
        .summary
        .with_input_issues(inputs.entities.malformed.len(), inputs.trials.malformed.len());

    let mut artifacts = vec![
        (
            CANONICAL_ENTITIES,
            to_json(CANONICAL_ENTITIES, &CanonicalTable(&resolution.entities))?,
        ),
        (ENTITY_MAPPINGS, to_json(ENTITY_MAPPINGS, &resolution.mapping)?),
        (RESOLUTION_LOG, to_json(RESOLUTION_LOG, &resolution.log)?),
        (TRANSITIONS_JSON, to_json(TRANSITIONS_JSON, &resolution.transitions)?),
        (
            TRANSITIONS_CSV,
            to_csv::<&Transition>(TRANSITIONS_CSV, &TRANSITION_HEADER, &resolution.transitions)?,
        ),
        (
            SUPER_WITNESSES_CSV,
            to_csv(
                SUPER_WITNESSES_CSV,
                &SUPER_WITNESS_HEADER,
                resolution.super_witnesses.iter().map(SuperWitnessRow::from),
            )?,
        ),
        (
            SUPER_WITNESSES_JSON,
            to_json(SUPER_WITNESSES_JSON, &resolution.super_witnesses)?,
        ),
        (STATISTICS, to_json(STATISTICS, &resolution.statistics)?),
        (
            MANUAL_REVIEW,
            to_json(
                MANUAL_REVIEW,
                &ManualReview {
                    empty_key: &resolution.manual_review,
                    malformed_records: &inputs.entities.malformed,
                    malformed_trials: &inputs.trials.malformed,
                },
            )?,
        ),
    ];

    let mut names: Vec<&'static str> = artifacts.iter().map(|(name, _)| *name).collect();
    names.push(RUN_MANIFEST);
    let manifest = RunManifest {
        inputs: ManifestInputs {
            entities: &inputs.entities.digest,
            trials: &inputs.trials.digest,
        },
        config,
        summary: &summary,
        artifacts: names,
    };
    artifacts.push((RUN_MANIFEST, to_json(RUN_MANIFEST, &manifest)?));

    Ok(artifacts)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn temp_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!(".{name}.tmp"))
}

/// Writes all artifacts of `resolution` into `output_dir`, creating it if
/// needed. Returns the final paths in write order.
///
/// # Errors
///
/// Returns an [`OutputError`] if an artifact cannot be serialized or
/// written. Temporary files of a failed run are removed.
pub fn write_outputs(
    output_dir: &Path,
    resolution: &Resolution,
    inputs: &LoadedInputs,
    config: &ResolverConfig,
) -> Result<Vec<PathBuf>, OutputError> {
    let artifacts = render(resolution, inputs, config)?;

    fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;

    let mut staged: Vec<PathBuf> = Vec::with_capacity(artifacts.len());
    for (name, bytes) in &artifacts {
        let tmp = temp_path(output_dir, name);
        if let Err(e) = fs::write(&tmp, bytes).map_err(io_err(&tmp)) {
            for path in &staged {
                let _ = fs::remove_file(path);
            }
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        debug!(artifact = name, bytes = bytes.len(), "Staged artifact");
        staged.push(tmp);
    }

    let mut written = Vec::with_capacity(artifacts.len());
    for (i, ((name, _), tmp)) in artifacts.iter().zip(&staged).enumerate() {
        let target = output_dir.join(name);
        if let Err(e) = fs::rename(tmp, &target).map_err(io_err(&target)) {
            for path in &staged[i..] {
                let _ = fs::remove_file(path);
            }
            return Err(e);
        }
        written.push(target);
    }

    info!(
        output_dir = %output_dir.display(),
        artifacts = written.len(),
        entities = resolution.entities.len(),
        "Wrote resolution outputs"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::entity::{EntityType, RawEntity, RawEntityTable, Role};
    use crate::pipeline::Resolver;
    use crate::storage::input::{LoadedEntities, LoadedTrials};
    use crate::trial::{TrialMetadata, TrialTable};

    use super::*;

    fn digest(name: &str) -> InputDigest {
        InputDigest {
            path: PathBuf::from(name),
            blake3: "0".repeat(64),
        }
    }

    fn inputs() -> LoadedInputs {
        let entities: RawEntityTable = vec![
            RawEntity::new("Mengeon Didier", EntityType::Witness)
                .with_trial("T1", Role::Witness)
                .with_trial("T2", Role::Witness)
                .with_trial("T3", Role::Accused),
            RawEntity::new("Catherine Marchal", EntityType::Witness).with_trial("T1", Role::Witness),
        ]
        .into_iter()
        .collect();
        let trials: TrialTable = vec![
            TrialMetadata::new("T1", Some("1590"), None),
            TrialMetadata::new("T2", Some("1592"), None),
            TrialMetadata::new("T3", Some("1597"), Some("death_sentence")),
        ]
        .into_iter()
        .collect();

        LoadedInputs {
            entities: LoadedEntities {
                table: entities,
                malformed: vec![MalformedRecord {
                    raw_name: "Broken".to_string(),
                    reason: "missing field `entity_type`".to_string(),
                }],
                digest: digest("entities.json"),
            },
            trials: LoadedTrials {
                table: trials,
                malformed: Vec::new(),
                digest: digest("trials.json"),
            },
        }
    }

    fn resolve(inputs: &LoadedInputs, config: &ResolverConfig) -> Resolution {
        Resolver::new(config.clone())
            .unwrap()
            .resolve(&inputs.entities.table, &inputs.trials.table)
    }

    #[test]
    fn renders_every_artifact_in_fixed_order() {
        let inputs = inputs();
        let config = ResolverConfig {
            super_witness_min_trials: 2,
            ..ResolverConfig::default()
        };
        let resolution = resolve(&inputs, &config);

        let artifacts = render(&resolution, &inputs, &config).unwrap();
        let names: Vec<_> = artifacts.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names.first(), Some(&CANONICAL_ENTITIES));
        assert_eq!(names.last(), Some(&RUN_MANIFEST));

        let csv = String::from_utf8(artifacts[5].1.clone()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(SUPER_WITNESS_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("E00001,mengeon didier,2,T1;T2,1590;1592,unknown,,true,false")
        );

        let manifest: Value = serde_json::from_slice(&artifacts[9].1).unwrap();
        assert_eq!(manifest["summary"]["malformed_records"], 1);
        assert_eq!(manifest["config"]["super_witness_min_trials"], 2);
        assert_eq!(manifest["artifacts"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn empty_tables_still_have_headers() {
        let inputs = inputs();
        let config = ResolverConfig::default();
        let resolution = resolve(&inputs, &config);
        assert!(resolution.super_witnesses.is_empty());

        let artifacts = render(&resolution, &inputs, &config).unwrap();
        let csv = String::from_utf8(artifacts[5].1.clone()).unwrap();
        assert_eq!(csv.trim_end(), SUPER_WITNESS_HEADER.join(","));
    }

    #[test]
    fn writes_into_directory_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("output");
        let inputs = inputs();
        let config = ResolverConfig::default();
        let resolution = resolve(&inputs, &config);

        let written = write_outputs(&out, &resolution, &inputs, &config).unwrap();
        assert_eq!(written.len(), 10);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }

        let leftovers: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let canonical: Value =
            serde_json::from_str(&fs::read_to_string(out.join(CANONICAL_ENTITIES)).unwrap()).unwrap();
        let ids: Vec<_> = canonical.as_object().unwrap().keys().cloned().collect();
        assert_eq!(ids, vec!["E00001", "E00002"]);
    }

    #[test]
    fn failed_rename_removes_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        // A non-empty directory where the second artifact should land.
        let blocker = out.join(ENTITY_MAPPINGS);
        fs::create_dir_all(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let inputs = inputs();
        let config = ResolverConfig::default();
        let resolution = resolve(&inputs, &config);

        let err = write_outputs(&out, &resolution, &inputs, &config).unwrap_err();
        assert!(matches!(err, OutputError::Io { .. }));

        let leftovers: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(!out.join(RUN_MANIFEST).exists());
    }
}
