// SPDX-License-Identifier: MIT OR Apache-2.0
//! Effect kinds and their dispatch table.
//!
//! The set of kinds is closed. Each kind owns a static [`KindSpec`] that
//! declares its parameter schema, its fixed defaults and, for procedural
//! kinds, how to derive modifier parameters.

use crate::binding::BaseValues;
use crate::effect::EffectDescriptor;
use crate::modifier::{ModifierKind, ModifierParams, NoiseParams};
use crate::params::{ParamName, ParamShape, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of effect a descriptor represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Offset, scale and rotation keyframes
    Transform,
    /// Procedural noise on offset, scale, rotation or opacity
    Shake,
    /// Opacity keyframes
    Opacity,
}

/// Static description of an effect kind
pub struct KindSpec {
    /// Tag used in serialized strings
    pub tag: &'static str,
    /// Name shown to the user and used for new effects
    pub display_name: &'static str,
    /// Declared parameters, in serialization order
    pub schema: &'static [ParamName],
    /// Defaults that do not depend on the edit target
    pub fixed_default: fn(ParamName) -> Option<ParamValue>,
    /// Modifier produced by procedural kinds
    pub modifier: Option<(ModifierKind, fn(&EffectDescriptor, f64) -> ModifierParams)>,
}

static TRANSFORM: KindSpec = KindSpec {
    tag: "anim_transform",
    display_name: "Transform",
    schema: &[
        ParamName::StartEnd,
        ParamName::UseOffset,
        ParamName::OffsetX,
        ParamName::OffsetY,
        ParamName::UseScale,
        ParamName::ScaleX,
        ParamName::ScaleY,
        ParamName::UseRotation,
        ParamName::Rotation,
    ],
    fixed_default: transform_default,
    modifier: None,
};

static SHAKE: KindSpec = KindSpec {
    tag: "anim_shake",
    display_name: "Shake",
    schema: &[
        ParamName::UseOffset,
        ParamName::UseScale,
        ParamName::UseRotation,
        ParamName::UseOpacity,
        ParamName::NoiseErraticness,
        ParamName::NoiseRadius,
        ParamName::NoiseSeed,
    ],
    fixed_default: shake_default,
    modifier: Some((ModifierKind::Noise, shake_noise)),
};

static OPACITY: KindSpec = KindSpec {
    tag: "anim_opacity",
    display_name: "Opacity",
    schema: &[ParamName::StartEnd, ParamName::UseOpacity, ParamName::Opacity],
    fixed_default: opacity_default,
    modifier: None,
};

fn transform_default(name: ParamName) -> Option<ParamValue> {
    match name {
        ParamName::StartEnd | ParamName::UseScale | ParamName::UseRotation => {
            Some(ParamValue::Bool(false))
        }
        ParamName::UseOffset => Some(ParamValue::Bool(true)),
        _ => None,
    }
}

fn shake_default(name: ParamName) -> Option<ParamValue> {
    match name {
        ParamName::UseOffset => Some(ParamValue::Bool(true)),
        ParamName::UseScale | ParamName::UseRotation | ParamName::UseOpacity => {
            Some(ParamValue::Bool(false))
        }
        ParamName::NoiseErraticness | ParamName::NoiseSeed => Some(ParamValue::Float(0.5)),
        ParamName::NoiseRadius => Some(ParamValue::Float(10.0)),
        _ => None,
    }
}

fn opacity_default(name: ParamName) -> Option<ParamValue> {
    match name {
        ParamName::StartEnd => Some(ParamValue::Bool(false)),
        ParamName::UseOpacity => Some(ParamValue::Bool(true)),
        _ => None,
    }
}

/// Noise parameters for a shake effect
fn shake_noise(effect: &EffectDescriptor, seed: f64) -> ModifierParams {
    let erraticness = effect.float_param(ParamName::NoiseErraticness);
    let radius = effect.float_param(ParamName::NoiseRadius);
    let seed_param = effect.float_param(ParamName::NoiseSeed);

    ModifierParams {
        noise: NoiseParams {
            scale: 0.5 + 20.0 * (1.0 - erraticness),
            strength: radius,
            offset: seed * seed_param * 1000.0,
            ..NoiseParams::default()
        },
        ..ModifierParams::default()
    }
}

impl EffectKind {
    /// Every registered kind
    pub const ALL: [EffectKind; 3] = [Self::Transform, Self::Shake, Self::Opacity];

    /// Dispatch table entry for this kind
    pub fn spec(&self) -> &'static KindSpec {
        match self {
            Self::Transform => &TRANSFORM,
            Self::Shake => &SHAKE,
            Self::Opacity => &OPACITY,
        }
    }

    /// Look up a kind by its serialized tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.spec().tag == tag)
    }

    /// Serialized tag
    pub fn tag(&self) -> &'static str {
        self.spec().tag
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        self.spec().display_name
    }

    /// Declared parameters
    pub fn schema(&self) -> &'static [ParamName] {
        self.spec().schema
    }

    /// True when the kind declares `name`
    pub fn declares(&self, name: ParamName) -> bool {
        self.schema().contains(&name)
    }

    /// Procedural kinds produce modifiers instead of keyframes
    pub fn is_modifier(&self) -> bool {
        self.spec().modifier.is_some()
    }

    /// Modifier kind produced by this effect kind
    pub fn modifier_kind(&self) -> Option<ModifierKind> {
        self.spec().modifier.map(|(kind, _)| kind)
    }

    /// Default value of `name` for this kind.
    ///
    /// Endpoint pairs without a fixed default start out at the edit
    /// target's current value on both ends.
    pub fn default_value(&self, name: ParamName, base: &dyn BaseValues) -> ParamValue {
        if let Some(value) = (self.spec().fixed_default)(name) {
            return value;
        }
        match (name.shape(), name.property()) {
            (ParamShape::FloatPair, Some(path)) => {
                let v = base.base_value(path);
                ParamValue::FloatPair(v, v)
            }
            (ParamShape::FloatPair, None) => ParamValue::FloatPair(0.0, 0.0),
            (ParamShape::Float, _) => ParamValue::Float(0.0),
            (ParamShape::Bool, _) => ParamValue::Bool(false),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
