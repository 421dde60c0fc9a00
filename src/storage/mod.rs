//! File-based input and output of a resolution run.
//!
//! Inputs are read and parsed in full before resolution starts, so a
//! missing or unreadable table aborts the run before anything is written.

pub mod input;
pub mod output;

pub use input::{
    load_inputs, load_raw_entities, load_trials, InputDigest, LoadedEntities, LoadedInputs,
    LoadedTrials,
};
pub use output::write_outputs;
