// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-property curve tracks.
//!
//! A track collects the effects that animate one property and turns them
//! into keyframe samples and a modifier stack. Overlapping keyframe effects
//! share sample frames at their overlap boundaries and are summed.

use crate::bezier;
use crate::binding::PropertyPath;
use crate::effect::{EffectDescriptor, EffectId};
use crate::keyframe::{keyframes_from_samples, KeyframePoint};
use crate::modifier::{seed_value, ModifierEntry, ModifierSlot};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

/// Effects keyed by ID, as owned by a session
pub type EffectMap = IndexMap<EffectId, EffectDescriptor>;

/// Longest synthetic handle used when sampling inside a range
pub const DEFAULT_HANDLE_OFFSET: f64 = 5.0;

/// One effect's contribution to a track for a single recompute pass
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    /// Source effect
    pub effect: EffectId,
    /// First frame
    pub start: i64,
    /// Last frame
    pub end: i64,
    /// Value at `start`
    pub value_start: f64,
    /// Value at `end`
    pub value_end: f64,
    /// Sample frames injected by overlap resolution
    pub extra_frames: BTreeSet<i64>,
}

impl Range {
    /// Range of `effect` on `path`, if the effect carries values for it
    pub fn from_effect(effect: &EffectDescriptor, path: PropertyPath) -> Option<Self> {
        let (value_start, value_end) = effect.values(path)?;
        Some(Self {
            effect: effect.id,
            start: effect.start(),
            end: effect.end(),
            value_start,
            value_end,
            extra_frames: BTreeSet::new(),
        })
    }

    /// Ordering key shared by keyframe and modifier ranges
    pub fn sort_key(&self) -> (i64, i64, EffectId) {
        (self.start, self.end, self.effect)
    }

    /// Value of this range at `frame`
    pub fn value_at(&self, frame: i64, handle_offset: f64) -> f64 {
        if frame == self.start {
            return self.value_start;
        }
        if frame == self.end {
            return self.value_end;
        }
        if self.value_start == self.value_end {
            return self.value_start;
        }

        let (x0, x3) = (self.start as f64, self.end as f64);
        let h = handle_offset.min(x3 - x0);
        let p0 = [x0, self.value_start];
        let p1 = [x0 + h, self.value_start];
        let p2 = [x3 - h, self.value_end];
        let p3 = [x3, self.value_end];

        bezier::solve(p0, p1, p2, p3, frame as f64).unwrap_or_else(|| {
            tracing::debug!("no bezier root at frame {frame} in {}..{}", self.start, self.end);
            if frame - self.start <= self.end - frame {
                self.value_start
            } else {
                self.value_end
            }
        })
    }

    /// Endpoint and injected samples of this range
    pub fn samples(&self, handle_offset: f64) -> BTreeMap<i64, f64> {
        let mut samples = BTreeMap::new();
        samples.insert(self.start, self.value_start);
        samples.insert(self.end, self.value_end);
        for &frame in &self.extra_frames {
            samples.insert(frame, self.value_at(frame, handle_offset));
        }
        samples
    }
}

/// Sort ranges and inject shared samples where they overlap
pub fn resolve_overlaps(ranges: &mut [Range]) {
    ranges.sort_by_key(Range::sort_key);
    if ranges.len() < 2 {
        return;
    }

    for i in 0..ranges.len() {
        for j in i + 1..ranges.len() {
            let (head, tail) = ranges.split_at_mut(j);
            let earlier = &mut head[i];
            let later = &mut tail[0];
            if later.start > earlier.end {
                continue;
            }
            earlier.extra_frames.insert(later.start);
            if later.end <= earlier.end {
                earlier.extra_frames.insert(later.end);
            } else {
                later.extra_frames.insert(earlier.end);
            }
        }
    }
}

/// Sum every range's samples per frame
pub fn merge_ranges(ranges: &[Range], handle_offset: f64) -> BTreeMap<i64, f64> {
    let mut merged = BTreeMap::new();
    for range in ranges {
        for (frame, value) in range.samples(handle_offset) {
            *merged.entry(frame).or_insert(0.0) += value;
        }
    }
    merged
}

/// What a recompute changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeOutcome {
    /// Keyframe samples differ from the previous pass
    pub keyframes_changed: bool,
    /// Modifier stack differs from the previous pass
    pub modifiers_changed: bool,
}

impl RecomputeOutcome {
    /// True if anything needs writing to the host
    pub fn any(&self) -> bool {
        self.keyframes_changed || self.modifiers_changed
    }
}

/// Curve state for one animatable property
#[derive(Debug, Clone)]
pub struct CurveTrack {
    path: PropertyPath,
    identity: u64,
    seed: f64,
    members: BTreeSet<EffectId>,
    modifier_members: BTreeSet<EffectId>,
    keyframe_points: BTreeMap<i64, f64>,
    modifier_stack: Vec<ModifierEntry>,
    default_value: f64,
    reference_start: i64,
    recomputing: bool,
    recompute_count: usize,
}

impl CurveTrack {
    /// Create an empty track
    pub fn new(path: PropertyPath, identity: u64, default_value: f64, reference_start: i64) -> Self {
        Self {
            path,
            identity,
            seed: seed_value(identity),
            members: BTreeSet::new(),
            modifier_members: BTreeSet::new(),
            keyframe_points: BTreeMap::new(),
            modifier_stack: Vec::new(),
            default_value,
            reference_start,
            recomputing: false,
            recompute_count: 0,
        }
    }

    /// Property this track drives
    pub fn path(&self) -> PropertyPath {
        self.path
    }

    /// Stable identity used to seed procedural modifiers
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Keyframe-contributing effects
    pub fn members(&self) -> &BTreeSet<EffectId> {
        &self.members
    }

    /// Modifier-contributing effects
    pub fn modifier_members(&self) -> &BTreeSet<EffectId> {
        &self.modifier_members
    }

    /// True if `id` contributes to this track in any way
    pub fn contains(&self, id: EffectId) -> bool {
        self.members.contains(&id) || self.modifier_members.contains(&id)
    }

    /// Merged keyframe samples from the last recompute
    pub fn keyframe_points(&self) -> &BTreeMap<i64, f64> {
        &self.keyframe_points
    }

    /// Keyframes with handles, ready for the host curve
    pub fn keyframes(&self, handle_offset: f64) -> Vec<KeyframePoint> {
        keyframes_from_samples(&self.keyframe_points, handle_offset)
    }

    /// Modifier stack from the last recompute
    pub fn modifier_stack(&self) -> &[ModifierEntry] {
        &self.modifier_stack
    }

    /// Host slots for the modifier stack
    pub fn modifier_slots(&self) -> Vec<ModifierSlot> {
        self.modifier_stack.iter().map(|entry| entry.slot).collect()
    }

    /// Value used when no effect contributes keyframes
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Set the fallback value
    pub fn set_default_value(&mut self, value: f64) {
        self.default_value = value;
    }

    /// Frame the fallback key is written at
    pub fn reference_start(&self) -> i64 {
        self.reference_start
    }

    /// Move the fallback key
    pub fn set_reference_start(&mut self, frame: i64) {
        self.reference_start = frame;
    }

    /// Number of recompute passes run so far
    pub fn recompute_count(&self) -> usize {
        self.recompute_count
    }

    /// True while results are being written back to the host.
    ///
    /// The flag only stops a write-back from nesting inside another one.
    /// Host notifications raised by the write are collected by the caller
    /// once the write has ended and replayed on the next cycle.
    pub fn is_recomputing(&self) -> bool {
        self.recomputing
    }

    /// Mark the start of a host write-back. Returns false if one is running.
    pub fn begin_recompute(&mut self) -> bool {
        if self.recomputing {
            return false;
        }
        self.recomputing = true;
        true
    }

    /// Mark the end of a host write-back
    pub fn end_recompute(&mut self) {
        self.recomputing = false;
    }

    /// Forget the last results so the next recompute reports a change
    pub fn invalidate(&mut self) {
        self.keyframe_points.clear();
        self.modifier_stack.clear();
    }

    /// Add or remove `effect` according to its enabled targets.
    ///
    /// Returns true if membership changed.
    pub fn sync_member(&mut self, effect: &EffectDescriptor) -> bool {
        let wanted = effect.targets(self.path);
        let (set, other) = if effect.is_modifier() {
            (&mut self.modifier_members, &mut self.members)
        } else {
            (&mut self.members, &mut self.modifier_members)
        };
        let stale = other.remove(&effect.id);
        let changed = if wanted {
            set.insert(effect.id)
        } else {
            set.remove(&effect.id)
        };
        changed || stale
    }

    /// Drop `id` from the track. Returns true if it was a member.
    pub fn remove_member(&mut self, id: EffectId) -> bool {
        let a = self.members.remove(&id);
        let b = self.modifier_members.remove(&id);
        a || b
    }

    /// Recompute keyframe samples and modifier stack
    pub fn recompute(&mut self, effects: &EffectMap, handle_offset: f64) -> RecomputeOutcome {
        self.recompute_count += 1;
        let outcome = RecomputeOutcome {
            keyframes_changed: self.rebuild_keyframes(effects, handle_offset),
            modifiers_changed: self.rebuild_modifiers(effects),
        };
        tracing::debug!(
            "{}: recompute #{} keyframes_changed={} modifiers_changed={}",
            self.path,
            self.recompute_count,
            outcome.keyframes_changed,
            outcome.modifiers_changed
        );
        outcome
    }

    /// Recompute keyframe samples only. Returns true if they changed.
    pub fn recompute_values(&mut self, effects: &EffectMap, handle_offset: f64) -> bool {
        self.recompute_count += 1;
        self.rebuild_keyframes(effects, handle_offset)
    }

    /// Recompute the modifier stack only. Returns true if it changed.
    pub fn recompute_modifiers(&mut self, effects: &EffectMap) -> bool {
        self.recompute_count += 1;
        self.rebuild_modifiers(effects)
    }

    fn member_ranges(&self, ids: &BTreeSet<EffectId>, effects: &EffectMap) -> Vec<Range> {
        ids.iter()
            .filter_map(|id| match effects.get(id) {
                Some(effect) => Range::from_effect(effect, self.path),
                None => {
                    tracing::debug!("{}: member {:?} has no descriptor", self.path, id);
                    None
                }
            })
            .collect()
    }

    fn rebuild_keyframes(&mut self, effects: &EffectMap, handle_offset: f64) -> bool {
        let mut ranges = self.member_ranges(&self.members, effects);
        let empty = ranges.is_empty();
        let merged = if empty {
            BTreeMap::from([(self.reference_start, self.default_value)])
        } else {
            resolve_overlaps(&mut ranges);
            merge_ranges(&ranges, handle_offset)
        };

        // The fallback key is always rewritten in case the host dropped it.
        let changed = empty || merged != self.keyframe_points;
        self.keyframe_points = merged;
        changed
    }

    fn rebuild_modifiers(&mut self, effects: &EffectMap) -> bool {
        let mut sources: Vec<&EffectDescriptor> = self
            .modifier_members
            .iter()
            .filter_map(|id| effects.get(id))
            .collect();
        sources.sort_by_key(|e| (e.start(), e.end(), e.id));

        let stack: Vec<ModifierEntry> = sources
            .into_iter()
            .filter_map(|effect| {
                let (kind, derive) = effect.kind().spec().modifier?;
                Some(ModifierEntry {
                    effect: effect.id,
                    slot: ModifierSlot {
                        kind,
                        frame_start: effect.start(),
                        frame_end: effect.end(),
                        params: derive(effect, self.seed),
                    },
                })
            })
            .collect();

        let changed = stack != self.modifier_stack;
        self.modifier_stack = stack;
        changed
    }
}
