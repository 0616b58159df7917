// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the curve engine.

use crate::params::{ParamName, ParamShape};

/// Error raised when a caller hands the engine input it must reject
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    /// Effect kind tag is not registered
    #[error("Unknown effect kind: {0}")]
    UnknownKind(String),

    /// Serialized effect string could not be read
    #[error("Malformed effect string: {0}")]
    Malformed(String),

    /// Parameter value does not have the shape its schema declares
    #[error("Parameter {param} expects a {expected:?} value")]
    ShapeMismatch {
        /// Offending parameter
        param: ParamName,
        /// Shape declared by the schema
        expected: ParamShape,
    },

    /// Parameter is not part of the effect kind's schema
    #[error("Parameter {0} is not declared by this effect kind")]
    UndeclaredParam(ParamName),

    /// Frame range with end before start
    #[error("Invalid frame range: {start}..{end}")]
    InvalidRange {
        /// Start frame
        start: i64,
        /// End frame
        end: i64,
    },
}
