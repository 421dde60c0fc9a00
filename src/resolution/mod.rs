//! Record linkage: from raw references to canonical entities.
//!
//! Stages run strictly forward:
//! 1. [`cluster`] groups raw names by normalization key
//! 2. [`merge`] fuses near-duplicate clusters
//! 3. [`attach`] folds family-name-only references into full names
//! 4. [`canonicalize`] builds one canonical entity per surviving cluster
//!
//! Every decision that joins two clusters is recorded in a [`ResolutionLog`].

pub mod attach;
pub mod canonicalize;
pub mod cluster;
pub mod log;
pub mod merge;
pub mod policies;

pub use attach::{attach_surname_references, surname_reference};
pub use canonicalize::{CanonicalEntityBuilder, Canonicalization, WITNESS_TO_ACCUSED};
pub use cluster::{build_initial_clusters, Cluster, InitialClustering};
pub use log::{ResolutionAction, ResolutionLog, ResolutionLogEntry};
pub use merge::{FuzzyMerger, MergeOutcome, MergeStrategy};
