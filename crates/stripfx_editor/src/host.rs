// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interfaces the session needs from the host application.
//!
//! The host owns the edit target, its animation curves and the strip's
//! persisted effect entries. A session only talks to it through these
//! traits, so any editor can drive the engine.

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use stripfx_curves::{BaseValues, KeyframePoint, ModifierSlot, PropertyPath, ReconcileReport};

/// Opaque reference to a host animation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurveHandle(pub u32);

/// Animation curves on the edit target
pub trait HostCurve {
    /// Create (or fetch) the curve driving `path`
    fn new_curve(&mut self, path: PropertyPath) -> Result<CurveHandle, HostError>;

    /// Replace the curve's keyframes with `points`, sorted by frame
    fn set_keyframes(&mut self, handle: CurveHandle, points: &[KeyframePoint]) -> Result<(), HostError>;

    /// Bring the curve's modifier slots in line with `desired`
    fn sync_modifier_slots(
        &mut self,
        handle: CurveHandle,
        desired: &[ModifierSlot],
    ) -> Result<ReconcileReport, HostError>;

    /// Value of the curve at `frame`, without modifiers
    fn evaluate(&self, handle: CurveHandle, frame: f64) -> Result<f64, HostError>;

    /// Delete the curve
    fn remove_curve(&mut self, handle: CurveHandle) -> Result<(), HostError>;
}

/// Scalar properties of the edit target
pub trait HostProperty {
    /// Current value of `path`
    fn get(&self, path: PropertyPath) -> Result<f64, HostError>;

    /// Write `path`
    fn set(&mut self, path: PropertyPath, value: f64) -> Result<(), HostError>;

    /// Start reporting changes of `path`
    fn subscribe(&mut self, path: PropertyPath) -> Result<(), HostError>;

    /// Stop reporting changes of `path`
    fn unsubscribe(&mut self, path: PropertyPath);

    /// Changes reported since the last call, oldest first
    fn take_notifications(&mut self) -> Vec<(PropertyPath, f64)>;

    /// Start frame of the edit target's strip
    fn target_start(&self) -> i64;

    /// Frame under the playhead
    fn current_frame(&self) -> i64;
}

/// Per-strip storage of serialized effects, keyed by entry name
pub trait PersistedEffectStore {
    /// All entries, in storage order
    fn entries(&self) -> Vec<(String, String)>;

    /// Insert or replace an entry
    fn insert(&mut self, key: String, value: String);

    /// Remove an entry
    fn remove(&mut self, key: &str);
}

/// Current property values of a host, with neutral fallbacks
pub struct HostValues<'a, H: HostProperty>(pub &'a H);

impl<H: HostProperty> BaseValues for HostValues<'_, H> {
    fn base_value(&self, path: PropertyPath) -> f64 {
        self.0.get(path).unwrap_or_else(|_| path.neutral_value())
    }
}
