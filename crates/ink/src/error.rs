//! Error types for the ink simulation.

use thiserror::Error;

/// Failures surfaced to the host.
///
/// Out-of-domain deposits and spawn requests beyond capacity are absorbed
/// where they happen and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InkError {
    /// The caller supplied `dt <= 0` or a non-finite timestep. The frame is
    /// skipped and all state is left as it was.
    #[error("invalid timestep {dt}: must be positive and finite")]
    InvalidTimestep { dt: f32 },

    /// The configuration failed validation at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type InkResult<T> = Result<T, InkError>;
