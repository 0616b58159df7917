// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural curve modifiers.
//!
//! Modifier effects do not write keyframes. Each one becomes a modifier
//! slot on the host curve, restricted to the effect's frame range.

use crate::binding::PropertyPath;
use crate::effect::EffectId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Kind of host curve modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Procedural noise
    Noise,
}

impl ModifierKind {
    /// Host type name
    pub fn host_name(&self) -> &'static str {
        match self {
            Self::Noise => "NOISE",
        }
    }
}

/// How noise combines with the underlying curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseBlend {
    /// Noise is centred on the curve value
    #[default]
    Replace,
    /// Noise is added
    Add,
    /// Noise is subtracted
    Subtract,
    /// Curve is multiplied by the noise
    Multiply,
}

/// Noise-specific modifier settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Blend mode
    pub blend_type: NoiseBlend,
    /// Octave depth
    pub depth: u32,
    /// Phase
    pub phase: f64,
    /// Time scale, larger is smoother
    pub scale: f64,
    /// Amplitude
    pub strength: f64,
    /// Time offset into the noise field
    pub offset: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            blend_type: NoiseBlend::Replace,
            depth: 0,
            phase: 0.0,
            scale: 0.0,
            strength: 0.0,
            offset: 0.0,
        }
    }
}

/// Full parameter bundle for one modifier instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierParams {
    /// Frames to fade in over
    pub blend_in: f64,
    /// Frames to fade out over
    pub blend_out: f64,
    /// Influence when `use_influence` is set
    pub influence: f64,
    /// Muted modifiers are skipped by the host
    pub mute: bool,
    /// Scale the result by `influence`
    pub use_influence: bool,
    /// Only apply between the slot's start and end frame
    pub use_restricted_range: bool,
    /// Noise settings
    pub noise: NoiseParams,
}

impl Default for ModifierParams {
    fn default() -> Self {
        Self {
            blend_in: 0.0,
            blend_out: 0.0,
            influence: 1.0,
            mute: false,
            use_influence: false,
            use_restricted_range: true,
            noise: NoiseParams::default(),
        }
    }
}

/// A modifier instance on a host curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierSlot {
    /// Modifier kind
    pub kind: ModifierKind,
    /// First frame the modifier applies to
    pub frame_start: i64,
    /// Last frame the modifier applies to
    pub frame_end: i64,
    /// Parameters
    pub params: ModifierParams,
}

/// One entry of a track's modifier stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierEntry {
    /// Effect the modifier comes from
    pub effect: EffectId,
    /// Desired host slot
    pub slot: ModifierSlot,
}

/// Stable identity of a track within a session
pub fn track_identity(session_seed: u64, path: PropertyPath) -> u64 {
    session_seed ^ (path.index() + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Pseudo-random value in `[0, 1)` tied to a track identity.
///
/// The same identity always yields the same value.
pub fn seed_value(identity: u64) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(identity);
    rng.random::<f64>()
}

/// What [`reconcile`] did to the host slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Existing slots updated in place
    pub updated: usize,
    /// Existing slots removed
    pub removed: usize,
    /// Slots appended
    pub created: usize,
}

impl ReconcileReport {
    /// True when the slots were touched at all
    pub fn touched(&self) -> bool {
        self.updated + self.removed + self.created > 0
    }
}

/// Bring host modifier slots in line with the desired stack.
///
/// Existing slots are matched to desired ones by kind only, in order, and
/// updated in place. Unmatched existing slots are removed, unmatched desired
/// slots are appended.
pub fn reconcile(slots: &mut Vec<ModifierSlot>, desired: &[ModifierSlot]) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut claimed = vec![false; desired.len()];

    slots.retain_mut(|slot| {
        let found = desired
            .iter()
            .enumerate()
            .find(|(i, want)| !claimed[*i] && want.kind == slot.kind);
        match found {
            Some((i, want)) => {
                claimed[i] = true;
                *slot = *want;
                report.updated += 1;
                true
            }
            None => {
                report.removed += 1;
                false
            }
        }
    });

    for (want, taken) in desired.iter().zip(&claimed) {
        if !taken {
            slots.push(*want);
            report.created += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(start: i64, end: i64, strength: f64) -> ModifierSlot {
        ModifierSlot {
            kind: ModifierKind::Noise,
            frame_start: start,
            frame_end: end,
            params: ModifierParams {
                noise: NoiseParams {
                    strength,
                    ..NoiseParams::default()
                },
                ..ModifierParams::default()
            },
        }
    }

    #[test]
    fn test_seed_value_is_deterministic() {
        let id = track_identity(42, PropertyPath::OffsetX);
        assert_eq!(seed_value(id), seed_value(id));
        assert!((0.0..1.0).contains(&seed_value(id)));
        assert_ne!(id, track_identity(42, PropertyPath::OffsetY));
    }

    #[test]
    fn test_reconcile_updates_in_place() {
        let mut slots = vec![noise(0, 10, 1.0)];
        let report = reconcile(&mut slots, &[noise(5, 20, 3.0)]);
        assert_eq!(report, ReconcileReport { updated: 1, removed: 0, created: 0 });
        assert_eq!(slots, vec![noise(5, 20, 3.0)]);
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let mut slots = vec![noise(0, 10, 1.0), noise(10, 20, 1.0)];
        let report = reconcile(&mut slots, &[noise(3, 4, 2.0)]);
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(slots.len(), 1);

        let report = reconcile(&mut slots, &[noise(3, 4, 2.0), noise(8, 9, 2.0)]);
        assert_eq!(report.created, 1);
        assert_eq!(slots[1], noise(8, 9, 2.0));
    }

    #[test]
    fn test_reconcile_empty_desired_clears() {
        let mut slots = vec![noise(0, 10, 1.0)];
        let report = reconcile(&mut slots, &[]);
        assert_eq!(report.removed, 1);
        assert!(slots.is_empty());
        assert!(!reconcile(&mut slots, &[]).touched());
    }
}
