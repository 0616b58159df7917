// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the editor session.

use stripfx_curves::{CurveError, EffectId, PropertyPath};

/// Failure reported by a host collaborator
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No curve exists for the property
    #[error("No host curve for {0}")]
    CurveMissing(PropertyPath),

    /// The edit target has no such property
    #[error("Edit target has no property {0}")]
    PropertyMissing(PropertyPath),

    /// The host cannot serve the request right now
    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

/// Error raised by an [`AnimationSession`](crate::AnimationSession) operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A host collaborator failed; the current cycle is aborted
    #[error(transparent)]
    Host(#[from] HostError),

    /// The engine rejected the input
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// No effect with this ID in the session
    #[error("Effect not found: {0:?}")]
    EffectNotFound(EffectId),

    /// No track for this property in the session
    #[error("No track for {0}")]
    TrackNotFound(PropertyPath),

    /// Session configuration could not be read or written
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// True for errors that must abort the current event cycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Host(_) | Self::TrackNotFound(_))
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
