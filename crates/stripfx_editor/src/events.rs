// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host events and editor operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stripfx_curves::{EffectId, ParamName, ParamValue, PropertyPath};

/// Something the host observed since the last cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// A property of the edit target changed
    PropertyChanged {
        /// Property that changed
        path: PropertyPath,
        /// New value
        value: f64,
    },
    /// The user edited an effect parameter
    EffectParamChanged {
        /// Effect edited
        id: EffectId,
        /// Parameter edited
        param: ParamName,
        /// New value
        value: ParamValue,
    },
    /// An effect strip was moved or resized
    EffectRangeChanged {
        /// Effect moved
        id: EffectId,
        /// New first frame
        start: i64,
        /// New last frame
        end: i64,
    },
    /// Effect strips currently present in the host
    StripsPresent(Vec<EffectId>),
    /// Operator running this cycle, if any
    OperatorRunning(Option<OperatorKind>),
}

impl From<(PropertyPath, f64)> for HostEvent {
    fn from((path, value): (PropertyPath, f64)) -> Self {
        Self::PropertyChanged { path, value }
    }
}

/// Editor operators the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Move in the preview
    Translate,
    /// Rotate in the preview
    Rotate,
    /// Scale in the preview
    Resize,
    /// Scrub the playhead
    ChangeFrame,
    /// Slide strips in time
    SeqSlide,
    /// Slip strip contents
    Slip,
}

impl OperatorKind {
    /// Every operator kind
    pub const ALL: [OperatorKind; 6] = [
        Self::Translate,
        Self::Rotate,
        Self::Resize,
        Self::ChangeFrame,
        Self::SeqSlide,
        Self::Slip,
    ];

    /// Host identifier
    pub fn idname(&self) -> &'static str {
        match self {
            Self::Translate => "TRANSFORM_OT_translate",
            Self::Rotate => "TRANSFORM_OT_rotate",
            Self::Resize => "TRANSFORM_OT_resize",
            Self::ChangeFrame => "ANIM_OT_change_frame",
            Self::SeqSlide => "TRANSFORM_OT_seq_slide",
            Self::Slip => "SEQUENCER_OT_slip",
        }
    }

    /// Toggle whose properties a value operator edits
    pub fn value_group(&self) -> Option<ParamName> {
        match self {
            Self::Translate => Some(ParamName::UseOffset),
            Self::Rotate => Some(ParamName::UseRotation),
            Self::Resize => Some(ParamName::UseScale),
            _ => None,
        }
    }

    /// Operators that move effects in time
    pub fn is_time_edit(&self) -> bool {
        matches!(self, Self::SeqSlide | Self::Slip)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.idname())
    }
}

/// Host identifier that is not a tracked operator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Untracked operator: {0}")]
pub struct UnknownOperator(pub String);

impl FromStr for OperatorKind {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.idname() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}
