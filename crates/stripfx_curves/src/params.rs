// SPDX-License-Identifier: MIT OR Apache-2.0
//! Effect parameter catalogue and values.
//!
//! Every parameter an effect kind can declare is listed in [`ParamName`],
//! with a fixed [`ParamShape`]. Values are tagged with [`ParamValue`] and
//! checked against the shape when a descriptor is built.

use crate::binding::PropertyPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamShape {
    /// Boolean toggle, serialized as `1`/`0`
    Bool,
    /// Single float
    Float,
    /// Endpoint pair `(live, stored)`, serialized comma-joined
    FloatPair,
}

/// Value of an effect parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Boolean toggle
    Bool(bool),
    /// Single float
    Float(f64),
    /// Endpoint pair, `(live, stored)`
    FloatPair(f64, f64),
}

impl ParamValue {
    /// Shape of this value
    pub fn shape(&self) -> ParamShape {
        match self {
            Self::Bool(_) => ParamShape::Bool,
            Self::Float(_) => ParamShape::Float,
            Self::FloatPair(..) => ParamShape::FloatPair,
        }
    }

    /// Get as bool if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float if possible
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as pair if possible
    pub fn as_pair(&self) -> Option<(f64, f64)> {
        match self {
            Self::FloatPair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    /// Serialized form used by the effect codec
    pub fn encode(&self) -> String {
        match self {
            Self::Bool(v) => String::from(if *v { "1" } else { "0" }),
            Self::Float(v) => format!("{v:?}"),
            Self::FloatPair(a, b) => format!("{a:?},{b:?}"),
        }
    }

    /// Parse a serialized value of the given shape
    pub fn decode(shape: ParamShape, text: &str) -> Option<Self> {
        match shape {
            ParamShape::Bool => match text {
                "1" => Some(Self::Bool(true)),
                "0" => Some(Self::Bool(false)),
                _ => None,
            },
            ParamShape::Float => text.trim().parse().ok().map(Self::Float),
            ParamShape::FloatPair => {
                let (a, b) = text.split_once(',')?;
                Some(Self::FloatPair(a.trim().parse().ok()?, b.trim().parse().ok()?))
            }
        }
    }
}

/// Every parameter name an effect kind may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamName {
    /// Which endpoint the live values represent
    StartEnd,
    /// Horizontal offset endpoints
    OffsetX,
    /// Vertical offset endpoints
    OffsetY,
    /// Horizontal scale endpoints
    ScaleX,
    /// Vertical scale endpoints
    ScaleY,
    /// Rotation endpoints
    Rotation,
    /// Opacity endpoints
    Opacity,
    /// Animate offsets
    UseOffset,
    /// Animate scale
    UseScale,
    /// Animate rotation
    UseRotation,
    /// Animate opacity
    UseOpacity,
    /// Noise erraticness (0..1)
    NoiseErraticness,
    /// Noise radius (0..1000)
    NoiseRadius,
    /// Noise seed (0..1)
    NoiseSeed,
}

impl ParamName {
    /// Every parameter name
    pub const ALL: [ParamName; 14] = [
        Self::StartEnd,
        Self::OffsetX,
        Self::OffsetY,
        Self::ScaleX,
        Self::ScaleY,
        Self::Rotation,
        Self::Opacity,
        Self::UseOffset,
        Self::UseScale,
        Self::UseRotation,
        Self::UseOpacity,
        Self::NoiseErraticness,
        Self::NoiseRadius,
        Self::NoiseSeed,
    ];

    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartEnd => "startend",
            Self::OffsetX => "offset_x",
            Self::OffsetY => "offset_y",
            Self::ScaleX => "scale_x",
            Self::ScaleY => "scale_y",
            Self::Rotation => "rotation",
            Self::Opacity => "opacity",
            Self::UseOffset => "use_offset",
            Self::UseScale => "use_scale",
            Self::UseRotation => "use_rotation",
            Self::UseOpacity => "use_opacity",
            Self::NoiseErraticness => "noise_erraticness",
            Self::NoiseRadius => "noise_radius",
            Self::NoiseSeed => "noise_seed",
        }
    }

    /// Look up a parameter by its serialized name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Value shape declared for this parameter
    pub fn shape(&self) -> ParamShape {
        match self {
            Self::StartEnd
            | Self::UseOffset
            | Self::UseScale
            | Self::UseRotation
            | Self::UseOpacity => ParamShape::Bool,
            Self::OffsetX
            | Self::OffsetY
            | Self::ScaleX
            | Self::ScaleY
            | Self::Rotation
            | Self::Opacity => ParamShape::FloatPair,
            Self::NoiseErraticness | Self::NoiseRadius | Self::NoiseSeed => ParamShape::Float,
        }
    }

    /// Property an endpoint pair drives
    pub fn property(&self) -> Option<PropertyPath> {
        match self {
            Self::OffsetX => Some(PropertyPath::OffsetX),
            Self::OffsetY => Some(PropertyPath::OffsetY),
            Self::ScaleX => Some(PropertyPath::ScaleX),
            Self::ScaleY => Some(PropertyPath::ScaleY),
            Self::Rotation => Some(PropertyPath::Rotation),
            Self::Opacity => Some(PropertyPath::Opacity),
            _ => None,
        }
    }

    /// Endpoint pair parameter for a property
    pub fn for_property(path: PropertyPath) -> Self {
        match path {
            PropertyPath::OffsetX => Self::OffsetX,
            PropertyPath::OffsetY => Self::OffsetY,
            PropertyPath::ScaleX => Self::ScaleX,
            PropertyPath::ScaleY => Self::ScaleY,
            PropertyPath::Rotation => Self::Rotation,
            PropertyPath::Opacity => Self::Opacity,
        }
    }

    /// Properties a `use_*` toggle switches on, empty for other parameters
    pub fn toggled_properties(&self) -> &'static [PropertyPath] {
        match self {
            Self::UseOffset => &[PropertyPath::OffsetX, PropertyPath::OffsetY],
            Self::UseScale => &[PropertyPath::ScaleX, PropertyPath::ScaleY],
            Self::UseRotation => &[PropertyPath::Rotation],
            Self::UseOpacity => &[PropertyPath::Opacity],
            _ => &[],
        }
    }

    /// True for `use_*` toggles
    pub fn is_toggle(&self) -> bool {
        !self.toggled_properties().is_empty()
    }

    /// Inclusive range a float parameter is clamped to
    pub fn float_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::NoiseErraticness | Self::NoiseSeed => Some((0.0, 1.0)),
            Self::NoiseRadius => Some((0.0, 1000.0)),
            _ => None,
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for name in ParamName::ALL {
            assert_eq!(ParamName::from_name(name.as_str()), Some(name));
        }
        assert_eq!(ParamName::from_name("origin"), None);
    }

    #[test]
    fn test_toggle_groups() {
        assert_eq!(
            ParamName::UseOffset.toggled_properties(),
            &[PropertyPath::OffsetX, PropertyPath::OffsetY]
        );
        assert!(!ParamName::StartEnd.is_toggle());
        for path in PropertyPath::ALL {
            assert_eq!(ParamName::for_property(path).property(), Some(path));
        }
    }

    #[test]
    fn test_encode_matches_persisted_format() {
        assert_eq!(ParamValue::Bool(true).encode(), "1");
        assert_eq!(ParamValue::Bool(false).encode(), "0");
        assert_eq!(ParamValue::Float(10.0).encode(), "10.0");
        assert_eq!(ParamValue::FloatPair(0.5, -3.0).encode(), "0.5,-3.0");
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert_eq!(ParamValue::decode(ParamShape::Bool, "yes"), None);
        assert_eq!(ParamValue::decode(ParamShape::Float, "abc"), None);
        assert_eq!(ParamValue::decode(ParamShape::FloatPair, "1.0"), None);
        assert_eq!(
            ParamValue::decode(ParamShape::FloatPair, "1.0,2"),
            Some(ParamValue::FloatPair(1.0, 2.0))
        );
    }
}
