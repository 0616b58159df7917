// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe and modifier synthesis for strip effects.
//!
//! This crate turns time-ranged effects on a media strip into host curve
//! data:
//! - Bezier root solving for curve sampling
//! - Effect descriptors and their parameter model
//! - Effect kinds and the compact string codec
//! - Curve tracks with overlap resolution and additive merging
//! - Procedural modifier stacks
//!
//! ## Architecture
//!
//! Effects are owned by the caller in an [`EffectMap`]. Each animatable
//! property has a [`CurveTrack`] that references effects by ID and
//! recomputes its keyframes and modifiers from that map on demand. Nothing
//! here talks to a host; see `stripfx_editor` for the session layer.

pub mod bezier;
pub mod binding;
pub mod codec;
pub mod effect;
pub mod error;
pub mod keyframe;
pub mod modifier;
pub mod params;
pub mod registry;
pub mod track;

pub use binding::{BaseValues, NeutralValues, PropertyPath};
pub use codec::{decode, parse, serialize, ParsedEffect};
pub use effect::{EffectDescriptor, EffectId};
pub use error::CurveError;
pub use keyframe::{evaluate_keyframes, KeyframePoint};
pub use modifier::{
    reconcile, seed_value, track_identity, ModifierEntry, ModifierKind, ModifierParams,
    ModifierSlot, NoiseBlend, NoiseParams, ReconcileReport,
};
pub use params::{ParamName, ParamShape, ParamValue};
pub use registry::{EffectKind, KindSpec};
pub use track::{CurveTrack, EffectMap, Range, RecomputeOutcome, DEFAULT_HANDLE_OFFSET};
