//! # personae - Record linkage for historical trial records
//!
//! Witchcraft-trial records name the same person in many ways: "Odille femme
//! Claudin Thieriat", "Odille Thieriat", "la Thieriat". personae links such
//! hand-extracted references into one canonical identity per person so that
//! later graph and statistical analysis counts people, not spellings.
//!
//! ## Core Concepts
//!
//! - **Raw entity**: one surface form of a name with what the extractor
//!   recorded about it (type, place, trials, roles, gender)
//! - **Normalization key**: the string raw names are grouped by
//! - **Cluster**: raw names believed to denote one person
//! - **Canonical entity**: the resolved identity record built from a cluster
//!
//! Data flows strictly forward: raw table → keys → initial clusters →
//! merged clusters → canonical entities → derived tables and statistics.
//!
//! ## Usage
//!
//! ```
//! use personae::{EntityType, RawEntity, RawEntityTable, Resolver, ResolverConfig, Role};
//! use personae::trial::{TrialMetadata, TrialTable};
//!
//! let entities: RawEntityTable = vec![
//!     RawEntity::new("Odille femme Claudin Thieriat", EntityType::Witness)
//!         .with_location("Thieriat")
//!         .with_trial("T1", Role::Witness),
//!     RawEntity::new("Odille Thieriat", EntityType::Accused)
//!         .with_location("Thieriat")
//!         .with_trial("T2", Role::Accused),
//! ]
//! .into_iter()
//! .collect();
//! let trials: TrialTable = vec![
//!     TrialMetadata::new("T1", Some("1590"), None),
//!     TrialMetadata::new("T2", Some("1598"), Some("death_sentence")),
//! ]
//! .into_iter()
//! .collect();
//!
//! let resolver = Resolver::new(ResolverConfig::default())?;
//! let resolution = resolver.resolve(&entities, &trials);
//!
//! assert_eq!(resolution.entities.len(), 1);
//! assert_eq!(resolution.entities[0].entity_type, EntityType::Accused);
//! assert_eq!(resolution.transitions[0].years_between, 8);
//! # Ok::<(), personae::ResolveError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Input and identity types
pub mod entity;
pub mod error;
pub mod trial;

// Linkage
pub mod normalize;
pub mod resolution;
pub mod similarity;

// Outputs and orchestration
pub mod config;
pub mod derived;
pub mod pipeline;
pub mod stats;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::{FileConfig, ResolverConfig};
pub use derived::{SuperWitness, Transition};
pub use entity::{
    CanonicalEntity, CanonicalId, EntityMapping, EntityType, Gender, RawEntity, RawEntityTable,
    Role, TrialAppearance,
};
pub use error::{ResolveError, ResolveResult};
pub use pipeline::{Resolution, Resolver};
pub use resolution::{MergeStrategy, ResolutionLog, ResolutionLogEntry};
pub use stats::{ResolutionStatistics, RunSummary};
