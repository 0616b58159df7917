// SPDX-License-Identifier: MIT OR Apache-2.0
//! The animation session.
//!
//! A session is created when the effect editor opens on a strip and owns
//! everything the engine needs while it stays open: the effects, one curve
//! track per property, the host curve handles and the bookkeeping for
//! change detection. Hosts feed it [`HostEvent`]s once per cycle.

use crate::config::SessionConfig;
use crate::error::{HostError, SessionError, SessionResult};
use crate::events::{HostEvent, OperatorKind};
use crate::host::{CurveHandle, HostCurve, HostProperty, HostValues, PersistedEffectStore};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use stripfx_curves::{
    codec, track_identity, CurveError, CurveTrack, EffectDescriptor, EffectId, EffectKind,
    EffectMap, ParamName, ParamShape, ParamValue, PropertyPath, RecomputeOutcome,
};

/// Tolerance when deciding whether a property sits on its curve
const ON_CURVE_EPSILON: f64 = 1e-9;

/// Session shared with background work
pub type SharedSession<H, S> = Arc<Mutex<AnimationSession<H, S>>>;

/// Editor state for one edit target
pub struct AnimationSession<H, S>
where
    H: HostCurve + HostProperty,
    S: PersistedEffectStore,
{
    config: SessionConfig,
    host: H,
    store: S,
    seed: u64,
    effects: EffectMap,
    detached: BTreeSet<EffectId>,
    selected: BTreeSet<EffectId>,
    target_selected: bool,
    tracks: IndexMap<PropertyPath, CurveTrack>,
    curves: IndexMap<PropertyPath, CurveHandle>,
    last_seen: IndexMap<PropertyPath, f64>,
    pending_edits: IndexMap<PropertyPath, f64>,
    deferred: VecDeque<(PropertyPath, f64)>,
    running: Option<OperatorKind>,
}

impl<H, S> AnimationSession<H, S>
where
    H: HostCurve + HostProperty,
    S: PersistedEffectStore,
{
    /// Open a session: create tracks, load persisted effects and write curves
    pub fn open(config: SessionConfig, mut host: H, store: S) -> SessionResult<Self> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let reference_start = host.target_start();

        let mut tracks = IndexMap::new();
        let mut curves = IndexMap::new();
        let mut last_seen = IndexMap::new();
        for path in PropertyPath::ALL {
            let value = host.get(path)?;
            curves.insert(path, host.new_curve(path)?);
            host.subscribe(path)?;
            tracks.insert(
                path,
                CurveTrack::new(path, track_identity(seed, path), value, reference_start),
            );
            last_seen.insert(path, value);
        }

        let mut session = Self {
            config,
            host,
            store,
            seed,
            effects: EffectMap::new(),
            detached: BTreeSet::new(),
            selected: BTreeSet::new(),
            target_selected: false,
            tracks,
            curves,
            last_seen,
            pending_edits: IndexMap::new(),
            deferred: VecDeque::new(),
            running: None,
        };
        session.load_effects();
        session.recompute_all()?;

        tracing::info!(
            "Opened animation session with {} effects (seed {})",
            session.effects.len(),
            session.seed
        );
        Ok(session)
    }

    /// Wrap the session for use behind a lock
    pub fn into_shared(self) -> SharedSession<H, S> {
        Arc::new(Mutex::new(self))
    }

    fn load_effects(&mut self) {
        let offset = self.host.target_start();
        for (key, text) in self.store.entries() {
            let Some(name) = key.strip_prefix(self.config.store_prefix.as_str()) else {
                continue;
            };
            let result = codec::decode(&text, offset)
                .and_then(|parsed| parsed.into_descriptor(name, &HostValues(&self.host)));
            match result {
                Ok(effect) => {
                    self.attach(effect);
                }
                Err(e) => tracing::warn!("Dropping effect entry {key}: {e}"),
            }
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Seed the track identities derive from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Host collaborator
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Host collaborator, mutably
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Persisted effect store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All effects, including detached ones
    pub fn effects(&self) -> &EffectMap {
        &self.effects
    }

    /// Look up an effect
    pub fn effect(&self, id: EffectId) -> Option<&EffectDescriptor> {
        self.effects.get(&id)
    }

    /// Look up an effect by name
    pub fn effect_by_name(&self, name: &str) -> Option<&EffectDescriptor> {
        self.effects.values().find(|e| e.name == name)
    }

    /// True if the effect's strip is currently gone from the host
    pub fn is_detached(&self, id: EffectId) -> bool {
        self.detached.contains(&id)
    }

    /// Track driving `path`
    pub fn track(&self, path: PropertyPath) -> Option<&CurveTrack> {
        self.tracks.get(&path)
    }

    /// All tracks in property order
    pub fn tracks(&self) -> impl Iterator<Item = &CurveTrack> {
        self.tracks.values()
    }

    /// Operator seen running in the last cycle
    pub fn running_operator(&self) -> Option<OperatorKind> {
        self.running
    }

    /// Notifications waiting for the next cycle
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Selected effects
    pub fn selected(&self) -> &BTreeSet<EffectId> {
        &self.selected
    }

    /// Replace the effect selection
    pub fn select(&mut self, ids: impl IntoIterator<Item = EffectId>) {
        self.selected = ids
            .into_iter()
            .filter(|id| self.effects.contains_key(id))
            .collect();
    }

    /// Mark whether the edit target itself is selected
    pub fn set_target_selected(&mut self, selected: bool) {
        self.target_selected = selected;
    }

    /// Value the host curve for `path` yields at `frame`
    pub fn preview(&self, path: PropertyPath, frame: f64) -> SessionResult<f64> {
        let handle = self.curve_handle(path)?;
        Ok(self.host.evaluate(handle, frame)?)
    }

    /// Add a new effect of `kind` starting at `start` or at the playhead
    pub fn add_effect(&mut self, kind: EffectKind, start: Option<i64>) -> SessionResult<EffectId> {
        let start = start.unwrap_or_else(|| self.host.current_frame());
        let end = start + self.config.default_duration.max(self.config.min_duration);
        let effect = EffectDescriptor::new(
            kind,
            kind.display_name(),
            start,
            end,
            &HostValues(&self.host),
        )?;
        self.insert_effect(effect)
    }

    /// Add a prepared effect, renaming it if the name is taken
    pub fn insert_effect(&mut self, mut effect: EffectDescriptor) -> SessionResult<EffectId> {
        effect.name = self.unique_name(&effect.name);
        let id = effect.id;
        tracing::debug!("Adding {} effect {:?}", effect.kind(), effect.name);

        let paths = self.attach(effect);
        self.selected = BTreeSet::from([id]);
        self.recompute_paths(&paths)?;
        Ok(id)
    }

    /// Remove an effect for good
    pub fn remove_effect(&mut self, id: EffectId) -> SessionResult<EffectDescriptor> {
        let effect = self
            .effects
            .shift_remove(&id)
            .ok_or(SessionError::EffectNotFound(id))?;
        self.detached.remove(&id);
        self.selected.remove(&id);

        let paths: Vec<PropertyPath> = self
            .tracks
            .values_mut()
            .filter_map(|track| track.remove_member(id).then(|| track.path()))
            .collect();
        self.recompute_paths(&paths)?;
        Ok(effect)
    }

    /// Edit an effect parameter. Returns false if the value did not change.
    ///
    /// Endpoint pairs recompute the keyframes of their property, floats the
    /// modifier stacks the effect feeds, and `use_*` toggles resync
    /// membership with one recompute per affected track.
    pub fn set_param(&mut self, id: EffectId, param: ParamName, value: ParamValue) -> SessionResult<bool> {
        if param == ParamName::StartEnd {
            let flag = value.as_bool().ok_or(CurveError::ShapeMismatch {
                param,
                expected: ParamShape::Bool,
            })?;
            return self.set_start_end(id, flag);
        }

        let effect = self
            .effects
            .get_mut(&id)
            .ok_or(SessionError::EffectNotFound(id))?;
        let old = effect.set_param(param, value)?;
        if effect.param(param) == Some(old) {
            return Ok(false);
        }
        if self.detached.contains(&id) {
            return Ok(true);
        }

        if param.is_toggle() {
            for path in self.sync_membership(id) {
                self.recompute_track(path)?;
            }
        } else if let Some(path) = param.property() {
            if self.track_of(path)?.members().contains(&id) {
                self.recompute_track_values(path)?;
            }
        } else {
            let paths: Vec<PropertyPath> = self
                .tracks
                .values()
                .filter(|track| track.modifier_members().contains(&id))
                .map(CurveTrack::path)
                .collect();
            for path in paths {
                self.recompute_track_modifiers(path)?;
            }
        }
        Ok(true)
    }

    /// Choose whether the live values of an effect are its end state
    pub fn set_start_end(&mut self, id: EffectId, at_end: bool) -> SessionResult<bool> {
        let effect = self
            .effects
            .get_mut(&id)
            .ok_or(SessionError::EffectNotFound(id))?;
        Ok(effect.set_start_end(at_end))
    }

    /// Move or resize an effect and recompute every track it feeds
    pub fn set_range(&mut self, id: EffectId, start: i64, end: i64) -> SessionResult<()> {
        self.move_effect(id, start, end)?;
        for path in self.paths_of(id) {
            self.recompute_track(path)?;
        }
        Ok(())
    }

    fn move_effect(&mut self, id: EffectId, start: i64, end: i64) -> SessionResult<()> {
        let end = end.max(start + self.config.min_duration);
        self.effects
            .get_mut(&id)
            .ok_or(SessionError::EffectNotFound(id))?
            .set_range(start, end)?;
        Ok(())
    }

    /// Recompute every track
    pub fn recompute_all(&mut self) -> SessionResult<()> {
        let paths: Vec<PropertyPath> = self.tracks.keys().copied().collect();
        self.recompute_paths(&paths)
    }

    /// Detach effects whose strips are gone and reattach returning ones
    pub fn sync_strips(&mut self, present: &[EffectId]) -> SessionResult<()> {
        let present: BTreeSet<EffectId> = present.iter().copied().collect();
        let ids: Vec<EffectId> = self.effects.keys().copied().collect();
        let mut changed = false;

        for id in ids {
            let here = present.contains(&id);
            let detached = self.detached.contains(&id);
            if !here && !detached {
                tracing::debug!("Strip of effect {id:?} disappeared, detaching");
                self.detached.insert(id);
                self.selected.remove(&id);
                for track in self.tracks.values_mut() {
                    track.remove_member(id);
                }
                changed = true;
            } else if here && detached {
                tracing::debug!("Strip of effect {id:?} is back, reattaching");
                self.detached.remove(&id);
                self.sync_membership(id);
                changed = true;
            }
        }

        if changed {
            self.recompute_all()?;
        }
        Ok(())
    }

    /// Write every attached effect to the store
    pub fn save(&mut self) {
        let prefix = self.config.store_prefix.as_str();
        for (key, _) in self.store.entries() {
            if key.starts_with(prefix) {
                self.store.remove(&key);
            }
        }

        let offset = self.host.target_start();
        for effect in self.effects.values() {
            if self.detached.contains(&effect.id) {
                continue;
            }
            self.store.insert(
                format!("{prefix}{}", effect.name),
                codec::serialize(effect, offset),
            );
        }
    }

    /// Save and end the session, leaving the written curves in place
    pub fn close(mut self) -> (H, S) {
        self.save();
        for path in self.curves.keys() {
            self.host.unsubscribe(*path);
        }
        tracing::info!("Closed animation session with {} effects", self.effects.len());
        (self.host, self.store)
    }

    /// End the session without saving and delete its curves
    pub fn discard(mut self) -> SessionResult<(H, S)> {
        for (path, handle) in std::mem::take(&mut self.curves) {
            self.host.unsubscribe(path);
            self.host.remove_curve(handle)?;
        }
        tracing::info!("Discarded animation session");
        Ok((self.host, self.store))
    }

    /// Handle one cycle of host events.
    ///
    /// Property changes are looked at first, then the strip ledger, then the
    /// running operator. Notifications raised while a track was writing to
    /// the host are replayed ahead of the new events.
    pub fn process(&mut self, events: impl IntoIterator<Item = HostEvent>) -> SessionResult<()> {
        let mut changes = Vec::new();
        let replay: Vec<(PropertyPath, f64)> = self.deferred.drain(..).collect();
        for (path, value) in replay {
            // superseded by a later write
            if self.host.get(path)? == value {
                changes.push((path, value));
            }
        }
        let mut edits = Vec::new();
        let mut present = None;
        let mut operator = None;

        for event in events {
            match event {
                HostEvent::PropertyChanged { path, value } => changes.push((path, value)),
                HostEvent::StripsPresent(ids) => present = Some(ids),
                HostEvent::OperatorRunning(op) => operator = Some(op),
                edit => edits.push(edit),
            }
        }

        for (path, value) in changes {
            self.on_property_changed(path, value)?;
        }
        for edit in edits {
            let result = match edit {
                HostEvent::EffectParamChanged { id, param, value } => {
                    self.set_param(id, param, value).map(|_| ())
                }
                HostEvent::EffectRangeChanged { id, start, end } => self.on_range_changed(id, start, end),
                _ => Ok(()),
            };
            recover(result)?;
        }

        if let Some(ids) = present {
            self.sync_strips(&ids)?;
        }

        if let Some(op) = operator {
            self.on_operator(op)?;
        }
        Ok(())
    }

    fn on_property_changed(&mut self, path: PropertyPath, value: f64) -> SessionResult<()> {
        let on_curve = self.host.current_frame() as f64;
        if (self.preview(path, on_curve)? - value).abs() <= ON_CURVE_EPSILON {
            self.last_seen.insert(path, value);
            return Ok(());
        }

        match self.running {
            Some(op) if op.value_group().is_some() => {
                self.pending_edits.insert(path, value);
                Ok(())
            }
            _ => self.direct_edit(path, value),
        }
    }

    fn on_range_changed(&mut self, id: EffectId, start: i64, end: i64) -> SessionResult<()> {
        if self.running.is_some_and(|op| op.is_time_edit()) {
            // the operator recomputes selected effects every cycle
            self.move_effect(id, start, end)
        } else {
            self.set_range(id, start, end)
        }
    }

    fn on_operator(&mut self, op: Option<OperatorKind>) -> SessionResult<()> {
        let previous = std::mem::replace(&mut self.running, op);
        if previous != op {
            if let Some(finished) = previous {
                tracing::debug!("Operator {finished} finished");
                if finished.value_group().is_some() {
                    self.commit_pending_edits(finished)?;
                }
                self.apply_operator(finished)?;
            }
        }
        if let Some(op) = op {
            self.apply_operator(op)?;
        }
        Ok(())
    }

    fn apply_operator(&mut self, op: OperatorKind) -> SessionResult<()> {
        let selected: Vec<EffectId> = self
            .selected
            .iter()
            .copied()
            .filter(|id| !self.detached.contains(id))
            .collect();

        if op.is_time_edit() {
            let paths: BTreeSet<PropertyPath> =
                selected.iter().flat_map(|id| self.paths_of(*id)).collect();
            for path in paths {
                self.recompute_track(path)?;
            }
            return self.resync_values();
        }

        let Some(group) = op.value_group() else {
            return self.resync_values();
        };
        let paths = group.toggled_properties();
        let touched = paths.iter().any(|path| {
            self.tracks
                .get(path)
                .is_some_and(|track| selected.iter().any(|id| track.members().contains(id)))
        });
        if touched {
            for path in paths {
                self.recompute_track_values(*path)?;
            }
            self.resync_values()?;
        }
        Ok(())
    }

    fn commit_pending_edits(&mut self, op: OperatorKind) -> SessionResult<()> {
        let pending = std::mem::take(&mut self.pending_edits);
        let group = op.value_group().map(|g| g.toggled_properties()).unwrap_or(&[]);
        for (path, value) in pending {
            if self.target_selected && group.contains(&path) {
                self.direct_edit(path, value)?;
            } else {
                self.last_seen.insert(path, value);
            }
        }
        Ok(())
    }

    /// Take the host's current values as the baseline for edit detection
    pub fn resync_values(&mut self) -> SessionResult<()> {
        let paths: Vec<PropertyPath> = self.tracks.keys().copied().collect();
        for path in paths {
            if self.pending_edits.contains_key(&path) {
                continue;
            }
            self.last_seen.insert(path, self.host.get(path)?);
        }
        Ok(())
    }

    /// Shift every keyframe effect on `path` by the edit to the target
    fn direct_edit(&mut self, path: PropertyPath, value: f64) -> SessionResult<()> {
        let previous = self.last_seen.insert(path, value).unwrap_or(value);
        let diff = value - previous;
        if diff == 0.0 {
            return Ok(());
        }
        tracing::debug!("{path} edited directly by {diff}");

        let track = self
            .tracks
            .get_mut(&path)
            .ok_or(SessionError::TrackNotFound(path))?;
        for id in track.members() {
            let Some(effect) = self.effects.get_mut(id) else {
                continue;
            };
            if let Some((at_start, at_end)) = effect.values(path) {
                effect.set_values(path, at_start + diff, at_end + diff)?;
            }
        }
        track.set_default_value(track.default_value() + diff);
        self.recompute_track_values(path)
    }

    fn unique_name(&self, base: &str) -> String {
        if self.effect_by_name(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}.{n:03}"))
            .find(|name| self.effect_by_name(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    fn attach(&mut self, effect: EffectDescriptor) -> Vec<PropertyPath> {
        let id = effect.id;
        self.effects.insert(id, effect);
        self.sync_membership(id)
    }

    /// Resync track membership of `id`, returning the tracks that changed
    fn sync_membership(&mut self, id: EffectId) -> Vec<PropertyPath> {
        let Some(effect) = self.effects.get(&id) else {
            return Vec::new();
        };
        if self.detached.contains(&id) {
            return Vec::new();
        }
        self.tracks
            .values_mut()
            .filter_map(|track| track.sync_member(effect).then(|| track.path()))
            .collect()
    }

    fn paths_of(&self, id: EffectId) -> Vec<PropertyPath> {
        self.tracks
            .values()
            .filter(|track| track.contains(id))
            .map(CurveTrack::path)
            .collect()
    }

    fn track_of(&self, path: PropertyPath) -> SessionResult<&CurveTrack> {
        self.tracks.get(&path).ok_or(SessionError::TrackNotFound(path))
    }

    fn curve_handle(&self, path: PropertyPath) -> SessionResult<CurveHandle> {
        Ok(*self.curves.get(&path).ok_or(HostError::CurveMissing(path))?)
    }

    fn recompute_paths(&mut self, paths: &[PropertyPath]) -> SessionResult<()> {
        for path in paths {
            self.recompute_track(*path)?;
        }
        Ok(())
    }

    fn recompute_track(&mut self, path: PropertyPath) -> SessionResult<()> {
        let handle_offset = self.config.handle_offset;
        let target_start = self.host.target_start();
        let track = self
            .tracks
            .get_mut(&path)
            .ok_or(SessionError::TrackNotFound(path))?;
        // The edit strip may have moved since the last pass.
        track.set_reference_start(target_start);
        let outcome = track.recompute(&self.effects, handle_offset);
        self.write_back(path, outcome)
    }

    fn recompute_track_values(&mut self, path: PropertyPath) -> SessionResult<()> {
        let handle_offset = self.config.handle_offset;
        let target_start = self.host.target_start();
        let track = self
            .tracks
            .get_mut(&path)
            .ok_or(SessionError::TrackNotFound(path))?;
        track.set_reference_start(target_start);
        let outcome = RecomputeOutcome {
            keyframes_changed: track.recompute_values(&self.effects, handle_offset),
            modifiers_changed: false,
        };
        self.write_back(path, outcome)
    }

    fn recompute_track_modifiers(&mut self, path: PropertyPath) -> SessionResult<()> {
        let track = self
            .tracks
            .get_mut(&path)
            .ok_or(SessionError::TrackNotFound(path))?;
        let outcome = RecomputeOutcome {
            keyframes_changed: false,
            modifiers_changed: track.recompute_modifiers(&self.effects),
        };
        self.write_back(path, outcome)
    }

    /// Push a track's new state to its host curve
    fn write_back(&mut self, path: PropertyPath, outcome: RecomputeOutcome) -> SessionResult<()> {
        if !outcome.any() {
            return Ok(());
        }
        let handle = self.curve_handle(path)?;
        let handle_offset = self.config.handle_offset;
        let track = self
            .tracks
            .get_mut(&path)
            .ok_or(SessionError::TrackNotFound(path))?;
        if !track.begin_recompute() {
            tracing::debug!("{path}: write-back already running, skipping");
            return Ok(());
        }

        let written = write_curve(&mut self.host, track, handle, outcome, handle_offset);
        if written.is_err() {
            track.invalidate();
        }
        track.end_recompute();

        // Writes made while the track was recomputing are replayed next cycle.
        self.deferred.extend(self.host.take_notifications());
        written?;
        self.last_seen.insert(path, self.host.get(path)?);
        Ok(())
    }
}

fn write_curve<H: HostCurve>(
    host: &mut H,
    track: &CurveTrack,
    handle: CurveHandle,
    outcome: RecomputeOutcome,
    handle_offset: f64,
) -> Result<(), HostError> {
    if outcome.keyframes_changed {
        host.set_keyframes(handle, &track.keyframes(handle_offset))?;
    }
    if outcome.modifiers_changed {
        let report = host.sync_modifier_slots(handle, &track.modifier_slots())?;
        tracing::debug!(
            "{}: modifiers updated={} removed={} created={}",
            track.path(),
            report.updated,
            report.removed,
            report.created
        );
    }
    Ok(())
}

/// Log and swallow errors that only affect the current event
fn recover(result: SessionResult<()>) -> SessionResult<()> {
    match result {
        Err(e) if !e.is_fatal() => {
            tracing::warn!("Ignoring host event: {e}");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryEffectStore, MemoryHost};
    use std::collections::BTreeMap;

    type TestSession = AnimationSession<MemoryHost, MemoryEffectStore>;

    fn config() -> SessionConfig {
        SessionConfig {
            seed: Some(11),
            ..SessionConfig::default()
        }
    }

    fn open_with(host: MemoryHost, store: MemoryEffectStore) -> TestSession {
        AnimationSession::open(config(), host, store).unwrap()
    }

    fn open() -> TestSession {
        open_with(MemoryHost::new(0), MemoryEffectStore::new())
    }

    fn host_frames(session: &TestSession, path: PropertyPath) -> Vec<(i64, f64)> {
        session
            .host()
            .curve(path)
            .unwrap()
            .keyframes
            .iter()
            .map(|k| (k.frame, k.value))
            .collect()
    }

    fn fade(session: &mut TestSession, start: i64, from: f64, to: f64) -> EffectId {
        let id = session.add_effect(EffectKind::Opacity, Some(start)).unwrap();
        session
            .set_param(id, ParamName::Opacity, ParamValue::FloatPair(from, to))
            .unwrap();
        id
    }

    #[test]
    fn test_open_writes_default_keys() {
        let session = open();
        assert_eq!(session.host().curve_count(), PropertyPath::ALL.len());
        assert_eq!(host_frames(&session, PropertyPath::ScaleX), vec![(0, 1.0)]);
        assert_eq!(host_frames(&session, PropertyPath::OffsetY), vec![(0, 0.0)]);
    }

    #[test]
    fn test_add_effect_writes_endpoints() {
        let mut session = open();
        let id = fade(&mut session, 10, 0.0, 1.0);
        assert_eq!(session.effect(id).unwrap().end(), 30);
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(10, 0.0), (30, 1.0)]);
        assert_eq!(session.selected(), &BTreeSet::from([id]));
    }

    #[test]
    fn test_overlapping_effects_merge_additively() {
        let mut session = open();
        let a = fade(&mut session, 0, 0.0, 10.0);
        session.set_range(a, 0, 10).unwrap();
        let b = fade(&mut session, 5, 0.0, 5.0);
        session.set_range(b, 5, 15).unwrap();

        let frames: BTreeMap<i64, f64> = host_frames(&session, PropertyPath::Opacity)
            .into_iter()
            .collect();
        assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![0, 5, 10, 15]);
        assert!((frames[&10] - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_toggle_recomputes_once_per_track() {
        let mut session = open();
        let id = session.add_effect(EffectKind::Transform, Some(0)).unwrap();
        let count = |s: &TestSession, p: PropertyPath| s.track(p).unwrap().recompute_count();
        let before: Vec<usize> = PropertyPath::ALL.iter().map(|p| count(&session, *p)).collect();

        assert!(session.set_param(id, ParamName::UseScale, ParamValue::Bool(true)).unwrap());
        assert!(session.track(PropertyPath::ScaleX).unwrap().members().contains(&id));
        assert_eq!(count(&session, PropertyPath::ScaleX), before[2] + 1);
        assert_eq!(count(&session, PropertyPath::ScaleY), before[3] + 1);
        assert_eq!(count(&session, PropertyPath::OffsetX), before[0]);

        assert!(!session.set_param(id, ParamName::UseScale, ParamValue::Bool(true)).unwrap());
        assert_eq!(count(&session, PropertyPath::ScaleX), before[2] + 1);

        assert!(session.set_param(id, ParamName::UseScale, ParamValue::Bool(false)).unwrap());
        assert!(!session.track(PropertyPath::ScaleX).unwrap().contains(id));
        assert_eq!(count(&session, PropertyPath::ScaleX), before[2] + 2);
        assert_eq!(host_frames(&session, PropertyPath::ScaleX), vec![(0, 1.0)]);
    }

    #[test]
    fn test_shake_writes_modifier_slots() {
        let mut session = open();
        let id = session.add_effect(EffectKind::Shake, Some(4)).unwrap();
        let curve = session.host().curve(PropertyPath::OffsetX).unwrap();
        assert_eq!(curve.modifiers.len(), 1);
        assert_eq!((curve.modifiers[0].frame_start, curve.modifiers[0].frame_end), (4, 24));
        let writes = curve.modifier_writes;

        session
            .set_param(id, ParamName::NoiseRadius, ParamValue::Float(40.0))
            .unwrap();
        let curve = session.host().curve(PropertyPath::OffsetX).unwrap();
        assert_eq!(curve.modifiers[0].params.noise.strength, 40.0);
        assert_eq!(curve.modifier_writes, writes + 1);
        assert!(session.host().curve(PropertyPath::Rotation).unwrap().modifiers.is_empty());
    }

    #[test]
    fn test_unique_names() {
        let mut session = open();
        let a = session.add_effect(EffectKind::Shake, None).unwrap();
        let b = session.add_effect(EffectKind::Shake, None).unwrap();
        assert_eq!(session.effect(a).unwrap().name, "Shake");
        assert_eq!(session.effect(b).unwrap().name, "Shake.001");
    }

    #[test]
    fn test_set_range_keeps_min_duration() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session.set_range(id, 10, 5).unwrap();
        let effect = session.effect(id).unwrap();
        assert_eq!((effect.start(), effect.end()), (10, 11));
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(10, 0.0), (11, 1.0)]);
    }

    #[test]
    fn test_remove_effect_restores_default() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 0.5);
        session.remove_effect(id).unwrap();
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(0, 1.0)]);
        assert!(matches!(
            session.remove_effect(id),
            Err(SessionError::EffectNotFound(_))
        ));
    }

    #[test]
    fn test_default_key_follows_moved_strip() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 0.5);
        session.host_mut().set_target_start(50);
        session.remove_effect(id).unwrap();
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(50, 1.0)]);
        assert_eq!(session.track(PropertyPath::Opacity).unwrap().reference_start(), 50);
    }

    #[test]
    fn test_start_end_keeps_curve() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.25, 0.75);
        let before = host_frames(&session, PropertyPath::Opacity);
        assert!(session
            .set_param(id, ParamName::StartEnd, ParamValue::Bool(true))
            .unwrap());
        assert_eq!(session.effect(id).unwrap().live_value(PropertyPath::Opacity), Some(0.75));
        assert_eq!(host_frames(&session, PropertyPath::Opacity), before);
    }

    #[test]
    fn test_persistence_round_trip() {
        let text = "s0e10;anim_opacity;startend:0;use_opacity:1;opacity:0.0,1.0;";
        let store: MemoryEffectStore = [
            ("fx_Fade", text),
            ("fx_Broken", "s0e10;anim_warp;"),
            ("notes", "keep me"),
        ]
        .into_iter()
        .collect();

        let mut session = open_with(MemoryHost::new(100), store);
        assert_eq!(session.effects().len(), 1);
        let fade = session.effect_by_name("Fade").unwrap();
        assert_eq!((fade.start(), fade.end()), (100, 110));
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(100, 0.0), (110, 1.0)]);

        session.save();
        assert_eq!(session.store().get("fx_Fade"), Some(text));
        assert_eq!(session.store().get("fx_Broken"), None);
        assert_eq!(session.store().get("notes"), Some("keep me"));
    }

    #[test]
    fn test_close_saves_and_keeps_curves() {
        let mut session = open();
        fade(&mut session, 0, 0.0, 1.0);
        let (host, store) = session.close();
        assert_eq!(store.get("fx_Opacity").map(|s| s.starts_with("s0e20;anim_opacity;")), Some(true));
        assert_eq!(host.curve_count(), PropertyPath::ALL.len());
    }

    #[test]
    fn test_discard_removes_curves() {
        let mut session = open();
        fade(&mut session, 0, 0.0, 1.0);
        let (host, store) = session.discard().unwrap();
        assert_eq!(host.curve_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_direct_edit_shifts_members() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session.process(Vec::new()).unwrap();
        assert_eq!(session.host().get(PropertyPath::Opacity).unwrap(), 0.0);

        session.host_mut().set(PropertyPath::Opacity, 0.25).unwrap();
        let events: Vec<HostEvent> = session
            .host_mut()
            .take_notifications()
            .into_iter()
            .map(HostEvent::from)
            .collect();
        session.process(events).unwrap();

        assert_eq!(session.effect(id).unwrap().values(PropertyPath::Opacity), Some((0.25, 1.25)));
        assert_eq!(session.track(PropertyPath::Opacity).unwrap().default_value(), 1.25);
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(0, 0.25), (20, 1.25)]);
    }

    #[test]
    fn test_write_back_notifications_are_deferred() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        assert!(session.deferred_count() > 0);

        session.process(Vec::new()).unwrap();
        assert_eq!(session.deferred_count(), 0);
        assert_eq!(session.effect(id).unwrap().values(PropertyPath::Opacity), Some((0.0, 1.0)));
    }

    #[test]
    fn test_superseded_deferred_values_are_dropped() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session
            .set_param(id, ParamName::Opacity, ParamValue::FloatPair(0.4, 1.0))
            .unwrap();
        assert_eq!(session.deferred_count(), 2);

        // The first replayed value (0.0) was overwritten by the second write.
        session.process(Vec::new()).unwrap();
        assert_eq!(session.deferred_count(), 0);
        assert_eq!(session.effect(id).unwrap().values(PropertyPath::Opacity), Some((0.4, 1.0)));
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(0, 0.4), (20, 1.0)]);
    }

    #[test]
    fn test_playhead_moves_are_not_edits() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session.host_mut().set_current_frame(20);
        let mut events: Vec<HostEvent> = session
            .host_mut()
            .take_notifications()
            .into_iter()
            .map(HostEvent::from)
            .collect();
        events.push(HostEvent::OperatorRunning(Some(OperatorKind::ChangeFrame)));
        session.process(events).unwrap();
        session.process([HostEvent::OperatorRunning(None)]).unwrap();

        assert_eq!(session.effect(id).unwrap().values(PropertyPath::Opacity), Some((0.0, 1.0)));
        assert_eq!(session.running_operator(), None);
    }

    #[test]
    fn test_translate_applies_on_finish() {
        let mut session = open();
        let id = session.add_effect(EffectKind::Transform, Some(0)).unwrap();
        session.set_target_selected(true);

        session
            .process([HostEvent::OperatorRunning(Some(OperatorKind::Translate))])
            .unwrap();
        session.host_mut().set(PropertyPath::OffsetX, 10.0).unwrap();
        session
            .process([HostEvent::PropertyChanged {
                path: PropertyPath::OffsetX,
                value: 10.0,
            }])
            .unwrap();
        assert_eq!(session.effect(id).unwrap().values(PropertyPath::OffsetX), Some((0.0, 0.0)));

        session.process([HostEvent::OperatorRunning(None)]).unwrap();
        assert_eq!(session.effect(id).unwrap().values(PropertyPath::OffsetX), Some((10.0, 10.0)));
        assert_eq!(host_frames(&session, PropertyPath::OffsetX), vec![(0, 10.0), (20, 10.0)]);
    }

    #[test]
    fn test_slide_recomputes_selected() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session
            .process([
                HostEvent::EffectRangeChanged { id, start: 5, end: 25 },
                HostEvent::OperatorRunning(Some(OperatorKind::SeqSlide)),
            ])
            .unwrap();
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(5, 0.0), (25, 1.0)]);
        session.process([HostEvent::OperatorRunning(None)]).unwrap();
        assert_eq!(session.running_operator(), None);
    }

    #[test]
    fn test_param_event_for_unknown_effect_is_skipped() {
        let mut session = open();
        session
            .process([HostEvent::EffectParamChanged {
                id: EffectId::new(),
                param: ParamName::NoiseSeed,
                value: ParamValue::Float(0.1),
            }])
            .unwrap();
    }

    #[test]
    fn test_ledger_detaches_and_restores() {
        let mut session = open();
        let a = fade(&mut session, 0, 0.0, 1.0);
        let b = fade(&mut session, 40, 0.5, 0.5);

        session.process([HostEvent::StripsPresent(vec![a])]).unwrap();
        assert!(session.is_detached(b));
        assert!(!session.track(PropertyPath::Opacity).unwrap().contains(b));
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(0, 0.0), (20, 1.0)]);

        session.save();
        assert!(session.store().get("fx_Opacity.001").is_none());

        session.process([HostEvent::StripsPresent(vec![a, b])]).unwrap();
        assert!(!session.is_detached(b));
        assert_eq!(host_frames(&session, PropertyPath::Opacity).len(), 4);
    }

    #[test]
    fn test_host_failure_is_fatal() {
        let mut session = open();
        let id = fade(&mut session, 0, 0.0, 1.0);
        session.host_mut().set_offline(true);
        let err = session
            .set_param(id, ParamName::Opacity, ParamValue::FloatPair(0.5, 1.0))
            .unwrap_err();
        assert!(matches!(err, SessionError::Host(HostError::Unavailable(_))));
        assert!(err.is_fatal());

        session.host_mut().set_offline(false);
        session.recompute_all().unwrap();
        assert_eq!(host_frames(&session, PropertyPath::Opacity), vec![(0, 0.5), (20, 1.0)]);
    }

    #[test]
    fn test_shared_session() {
        let shared = open().into_shared();
        let id = shared.lock().add_effect(EffectKind::Opacity, Some(3)).unwrap();
        let guard = shared.lock();
        assert_eq!(guard.effect(id).unwrap().start(), 3);
    }
}
