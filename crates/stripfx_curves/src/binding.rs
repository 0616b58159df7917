// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animatable properties of the edit target.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar property of the edited strip that a curve track can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyPath {
    /// Horizontal offset in pixels
    OffsetX,
    /// Vertical offset in pixels
    OffsetY,
    /// Horizontal scale factor
    ScaleX,
    /// Vertical scale factor
    ScaleY,
    /// Rotation in radians
    Rotation,
    /// Blend alpha (0..1)
    Opacity,
}

impl PropertyPath {
    /// Every animatable property, in track creation order
    pub const ALL: [PropertyPath; 6] = [
        Self::OffsetX,
        Self::OffsetY,
        Self::ScaleX,
        Self::ScaleY,
        Self::Rotation,
        Self::Opacity,
    ];

    /// Host data path of the property
    pub fn data_path(&self) -> &'static str {
        match self {
            Self::OffsetX => "transform.offset_x",
            Self::OffsetY => "transform.offset_y",
            Self::ScaleX => "transform.scale_x",
            Self::ScaleY => "transform.scale_y",
            Self::Rotation => "transform.rotation",
            Self::Opacity => "blend_alpha",
        }
    }

    /// Look up a property by its host data path
    pub fn from_data_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.data_path() == path)
    }

    /// Value used when the host cannot supply one
    pub fn neutral_value(&self) -> f64 {
        match self {
            Self::OffsetX | Self::OffsetY | Self::Rotation => 0.0,
            Self::ScaleX | Self::ScaleY | Self::Opacity => 1.0,
        }
    }

    /// Stable small index, used to derive per-track identities
    pub fn index(&self) -> u64 {
        match self {
            Self::OffsetX => 0,
            Self::OffsetY => 1,
            Self::ScaleX => 2,
            Self::ScaleY => 3,
            Self::Rotation => 4,
            Self::Opacity => 5,
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data_path())
    }
}

/// Source of the edit target's current property values.
///
/// Used to seed endpoint defaults when a new effect is created.
pub trait BaseValues {
    /// Current value of `path` on the edit target
    fn base_value(&self, path: PropertyPath) -> f64;
}

/// Base values that are always the property's neutral value
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralValues;

impl BaseValues for NeutralValues {
    fn base_value(&self, path: PropertyPath) -> f64 {
        path.neutral_value()
    }
}

impl<F> BaseValues for F
where
    F: Fn(PropertyPath) -> f64,
{
    fn base_value(&self, path: PropertyPath) -> f64 {
        self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_path_lookup() {
        for path in PropertyPath::ALL {
            assert_eq!(PropertyPath::from_data_path(path.data_path()), Some(path));
        }
        assert_eq!(PropertyPath::from_data_path("transform.origin"), None);
    }

    #[test]
    fn test_neutral_values() {
        assert_eq!(NeutralValues.base_value(PropertyPath::ScaleY), 1.0);
        assert_eq!(NeutralValues.base_value(PropertyPath::OffsetX), 0.0);
        let fixed = |_: PropertyPath| 3.5;
        assert_eq!(fixed.base_value(PropertyPath::Opacity), 3.5);
    }
}
