//! Run and stage contexts.
//!
//! A [`RunContext`] is created once per run and owns the identity and the
//! event sink. Each stage gets a short-lived [`StageContext`] that borrows it
//! together with the stage definition and its expanded inputs.

mod execution;
mod identity;

pub use execution::{ResolvedInput, RunContext, StageContext};
pub use identity::RunIdentity;
