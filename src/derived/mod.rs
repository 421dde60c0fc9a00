//! Derived views over canonical entities.

pub mod super_witness;
pub mod transitions;

pub use super_witness::{identify_super_witnesses, SuperWitness, PERSONAL_SUSPICION};
pub use transitions::{detect_transition, find_transitions, Transition};
