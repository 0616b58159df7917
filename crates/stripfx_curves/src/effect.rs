// SPDX-License-Identifier: MIT OR Apache-2.0
//! Effect descriptors.
//!
//! A descriptor is a time-ranged animation intent: a kind, a frame range
//! and the kind's parameters. Endpoint pairs are stored as `(live, stored)`;
//! the `startend` flag says whether the live slot is the start or the end
//! state.

use crate::binding::{BaseValues, PropertyPath};
use crate::error::CurveError;
use crate::params::{ParamName, ParamValue};
use crate::registry::EffectKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub Uuid);

impl EffectId {
    /// Create a new random effect ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// A time-ranged effect on the edit target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Unique effect ID
    pub id: EffectId,
    /// Effect name, unique within a session
    pub name: String,
    kind: EffectKind,
    start: i64,
    end: i64,
    params: IndexMap<ParamName, ParamValue>,
}

impl EffectDescriptor {
    /// Create an effect with the kind's default parameters
    pub fn new(
        kind: EffectKind,
        name: impl Into<String>,
        start: i64,
        end: i64,
        base: &dyn BaseValues,
    ) -> Result<Self, CurveError> {
        Self::with_params(kind, name, start, end, std::iter::empty(), base)
    }

    /// Create an effect from supplied parameters.
    ///
    /// Parameters the kind does not declare are dropped. Declared parameters
    /// that are missing or have the wrong shape fall back to the kind's
    /// default. Floats are clamped to their declared range.
    pub fn with_params(
        kind: EffectKind,
        name: impl Into<String>,
        start: i64,
        end: i64,
        supplied: impl IntoIterator<Item = (ParamName, ParamValue)>,
        base: &dyn BaseValues,
    ) -> Result<Self, CurveError> {
        if end < start {
            return Err(CurveError::InvalidRange { start, end });
        }

        let mut supplied: IndexMap<ParamName, ParamValue> = supplied.into_iter().collect();
        let mut params = IndexMap::with_capacity(kind.schema().len());

        for &name in kind.schema() {
            let value = match supplied.swap_remove(&name) {
                Some(value) if value.shape() == name.shape() => clamp(name, value),
                Some(value) => {
                    tracing::warn!(
                        "{kind}: parameter {name} has shape {:?}, using default",
                        value.shape()
                    );
                    kind.default_value(name, base)
                }
                None => kind.default_value(name, base),
            };
            params.insert(name, value);
        }

        for name in supplied.keys() {
            tracing::warn!("{kind}: dropping undeclared parameter {name}");
        }

        Ok(Self {
            id: EffectId::new(),
            name: name.into(),
            kind,
            start,
            end,
            params,
        })
    }

    /// Effect kind
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// First frame
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last frame
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Move or resize the effect
    pub fn set_range(&mut self, start: i64, end: i64) -> Result<(), CurveError> {
        if end < start {
            return Err(CurveError::InvalidRange { start, end });
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Procedural effects contribute modifiers instead of keyframes
    pub fn is_modifier(&self) -> bool {
        self.kind.is_modifier()
    }

    /// All parameters in schema order
    pub fn params(&self) -> &IndexMap<ParamName, ParamValue> {
        &self.params
    }

    /// Get a parameter value
    pub fn param(&self, name: ParamName) -> Option<ParamValue> {
        self.params.get(&name).copied()
    }

    /// Set a parameter, returning the previous value
    pub fn set_param(&mut self, name: ParamName, value: ParamValue) -> Result<ParamValue, CurveError> {
        let slot = self
            .params
            .get_mut(&name)
            .ok_or(CurveError::UndeclaredParam(name))?;
        if value.shape() != name.shape() {
            return Err(CurveError::ShapeMismatch {
                param: name,
                expected: name.shape(),
            });
        }
        Ok(std::mem::replace(slot, clamp(name, value)))
    }

    /// Float parameter value, or the kind's fixed default
    pub fn float_param(&self, name: ParamName) -> f64 {
        self.param(name)
            .and_then(|v| v.as_float())
            .or_else(|| (self.kind.spec().fixed_default)(name).and_then(|v| v.as_float()))
            .unwrap_or(0.0)
    }

    /// Bool parameter value, false when undeclared
    pub fn flag(&self, name: ParamName) -> bool {
        self.param(name).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// True when the live values represent the end state
    pub fn start_end(&self) -> bool {
        self.flag(ParamName::StartEnd)
    }

    /// Choose which endpoint the live values represent.
    ///
    /// Swaps every endpoint pair so start and end values are preserved.
    /// Returns true if the flag changed.
    pub fn set_start_end(&mut self, at_end: bool) -> bool {
        if !self.kind.declares(ParamName::StartEnd) || self.start_end() == at_end {
            return false;
        }
        for value in self.params.values_mut() {
            if let ParamValue::FloatPair(live, stored) = *value {
                *value = ParamValue::FloatPair(stored, live);
            }
        }
        self.params.insert(ParamName::StartEnd, ParamValue::Bool(at_end));
        true
    }

    /// Values at start and end frame for a property
    pub fn values(&self, path: PropertyPath) -> Option<(f64, f64)> {
        let (live, stored) = self.param(ParamName::for_property(path))?.as_pair()?;
        if self.start_end() {
            Some((stored, live))
        } else {
            Some((live, stored))
        }
    }

    /// Set the values at start and end frame for a property
    pub fn set_values(&mut self, path: PropertyPath, at_start: f64, at_end: f64) -> Result<(), CurveError> {
        let (live, stored) = if self.start_end() {
            (at_end, at_start)
        } else {
            (at_start, at_end)
        };
        self.set_param(ParamName::for_property(path), ParamValue::FloatPair(live, stored))
            .map(|_| ())
    }

    /// Value currently shown for a property
    pub fn live_value(&self, path: PropertyPath) -> Option<f64> {
        self.param(ParamName::for_property(path))?.as_pair().map(|(live, _)| live)
    }

    /// Frame the live values belong to
    pub fn live_frame(&self) -> i64 {
        if self.start_end() {
            self.end
        } else {
            self.start
        }
    }

    /// True when an enabled `use_*` toggle covers `path`
    pub fn targets(&self, path: PropertyPath) -> bool {
        self.kind.schema().iter().any(|name| {
            name.toggled_properties().contains(&path) && self.flag(*name)
        })
    }

    /// Properties this effect currently animates
    pub fn target_paths(&self) -> Vec<PropertyPath> {
        PropertyPath::ALL
            .into_iter()
            .filter(|path| self.targets(*path))
            .collect()
    }
}

fn clamp(name: ParamName, value: ParamValue) -> ParamValue {
    match (value, name.float_range()) {
        (ParamValue::Float(v), Some((lo, hi))) => ParamValue::Float(v.clamp(lo, hi)),
        _ => value,
    }
}
