//! Entity layer modules.
//!
//! This module groups the raw references consumed from extraction and the
//! canonical identities produced by resolution.

pub mod canonical;
pub mod raw;

pub use canonical::{CanonicalEntity, CanonicalId, EntityMapping, TrialAppearance};
pub use raw::{EntityType, Gender, MalformedRecord, RawEntity, RawEntityTable, Role};
