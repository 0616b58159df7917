// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory host, for headless use and tests.
//!
//! [`MemoryHost`] behaves like an animated edit target: writing keyframes
//! to a curve re-evaluates it at the playhead and writes the result into
//! the driven property, which in turn raises a change notification.

use crate::error::HostError;
use crate::host::{CurveHandle, HostCurve, HostProperty, PersistedEffectStore};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use stripfx_curves::{
    evaluate_keyframes, reconcile, KeyframePoint, ModifierSlot, PropertyPath, ReconcileReport,
};

/// A curve held by [`MemoryHost`]
#[derive(Debug, Clone, Default)]
pub struct MemoryCurve {
    /// Keyframes as last written
    pub keyframes: Vec<KeyframePoint>,
    /// Modifier slots as last reconciled
    pub modifiers: Vec<ModifierSlot>,
    /// Number of keyframe writes
    pub keyframe_writes: usize,
    /// Number of modifier reconciles that touched a slot
    pub modifier_writes: usize,
}

/// Edit target plus its curves
#[derive(Debug, Clone)]
pub struct MemoryHost {
    properties: IndexMap<PropertyPath, f64>,
    curves: IndexMap<CurveHandle, (PropertyPath, MemoryCurve)>,
    subscribed: BTreeSet<PropertyPath>,
    notifications: Vec<(PropertyPath, f64)>,
    target_start: i64,
    current_frame: i64,
    next_handle: u32,
    offline: bool,
}

impl MemoryHost {
    /// Edit target at neutral values whose strip starts at `target_start`
    pub fn new(target_start: i64) -> Self {
        Self {
            properties: PropertyPath::ALL
                .into_iter()
                .map(|path| (path, path.neutral_value()))
                .collect(),
            curves: IndexMap::new(),
            subscribed: BTreeSet::new(),
            notifications: Vec::new(),
            target_start,
            current_frame: target_start,
            next_handle: 0,
            offline: false,
        }
    }

    /// Move the playhead, re-evaluating every curve
    pub fn set_current_frame(&mut self, frame: i64) {
        self.current_frame = frame;
        let handles: Vec<CurveHandle> = self.curves.keys().copied().collect();
        for handle in handles {
            self.animate(handle);
        }
    }

    /// Move the edit target's strip to start at `frame`
    pub fn set_target_start(&mut self, frame: i64) {
        self.target_start = frame;
    }

    /// Curve driving `path`
    pub fn curve(&self, path: PropertyPath) -> Option<&MemoryCurve> {
        self.curves
            .values()
            .find(|(p, _)| *p == path)
            .map(|(_, curve)| curve)
    }

    /// Number of live curves
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Make every curve request fail, as a host without animation data would
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn check_online(&self) -> Result<(), HostError> {
        if self.offline {
            return Err(HostError::Unavailable("animation data is gone".to_string()));
        }
        Ok(())
    }

    fn curve_mut(&mut self, handle: CurveHandle) -> Result<&mut (PropertyPath, MemoryCurve), HostError> {
        self.check_online()?;
        self.curves
            .get_mut(&handle)
            .ok_or_else(|| HostError::Unavailable(format!("stale curve handle {}", handle.0)))
    }

    fn animate(&mut self, handle: CurveHandle) {
        let Some((path, curve)) = self.curves.get(&handle) else {
            return;
        };
        let path = *path;
        if let Some(value) = evaluate_keyframes(&curve.keyframes, self.current_frame as f64) {
            self.write(path, value);
        }
    }

    fn write(&mut self, path: PropertyPath, value: f64) {
        let previous = self.properties.insert(path, value);
        if previous != Some(value) && self.subscribed.contains(&path) {
            self.notifications.push((path, value));
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(1)
    }
}

impl HostCurve for MemoryHost {
    fn new_curve(&mut self, path: PropertyPath) -> Result<CurveHandle, HostError> {
        self.check_online()?;
        if let Some((handle, _)) = self.curves.iter().find(|(_, (p, _))| *p == path) {
            return Ok(*handle);
        }
        let handle = CurveHandle(self.next_handle);
        self.next_handle += 1;
        self.curves.insert(handle, (path, MemoryCurve::default()));
        Ok(handle)
    }

    fn set_keyframes(&mut self, handle: CurveHandle, points: &[KeyframePoint]) -> Result<(), HostError> {
        let (_, curve) = self.curve_mut(handle)?;
        curve.keyframes = points.to_vec();
        curve.keyframe_writes += 1;
        self.animate(handle);
        Ok(())
    }

    fn sync_modifier_slots(
        &mut self,
        handle: CurveHandle,
        desired: &[ModifierSlot],
    ) -> Result<ReconcileReport, HostError> {
        let (_, curve) = self.curve_mut(handle)?;
        let report = reconcile(&mut curve.modifiers, desired);
        if report.touched() {
            curve.modifier_writes += 1;
        }
        Ok(report)
    }

    fn evaluate(&self, handle: CurveHandle, frame: f64) -> Result<f64, HostError> {
        self.check_online()?;
        let (path, curve) = self
            .curves
            .get(&handle)
            .ok_or_else(|| HostError::Unavailable(format!("stale curve handle {}", handle.0)))?;
        evaluate_keyframes(&curve.keyframes, frame).ok_or(HostError::CurveMissing(*path))
    }

    fn remove_curve(&mut self, handle: CurveHandle) -> Result<(), HostError> {
        self.check_online()?;
        self.curves.shift_remove(&handle);
        Ok(())
    }
}

impl HostProperty for MemoryHost {
    fn get(&self, path: PropertyPath) -> Result<f64, HostError> {
        self.properties
            .get(&path)
            .copied()
            .ok_or(HostError::PropertyMissing(path))
    }

    fn set(&mut self, path: PropertyPath, value: f64) -> Result<(), HostError> {
        if !self.properties.contains_key(&path) {
            return Err(HostError::PropertyMissing(path));
        }
        self.write(path, value);
        Ok(())
    }

    fn subscribe(&mut self, path: PropertyPath) -> Result<(), HostError> {
        if !self.properties.contains_key(&path) {
            return Err(HostError::PropertyMissing(path));
        }
        self.subscribed.insert(path);
        Ok(())
    }

    fn unsubscribe(&mut self, path: PropertyPath) {
        self.subscribed.remove(&path);
    }

    fn take_notifications(&mut self) -> Vec<(PropertyPath, f64)> {
        std::mem::take(&mut self.notifications)
    }

    fn target_start(&self) -> i64 {
        self.target_start
    }

    fn current_frame(&self) -> i64 {
        self.current_frame
    }
}

/// Effect entries kept in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryEffectStore {
    entries: IndexMap<String, String>,
}

impl MemoryEffectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEffectStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl PersistedEffectStore for MemoryEffectStore {
    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }
}
