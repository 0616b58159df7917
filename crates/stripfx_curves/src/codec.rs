// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compact string form of effect descriptors.
//!
//! ```text
//! s<start>e<end>;<kind>;<param>:<value>;<param>:<value>;...;
//! ```
//!
//! Frames are relative to the owning strip's start frame. Parameters are
//! written in schema order; endpoint pairs are comma-joined and toggles are
//! `1`/`0`.

use crate::binding::BaseValues;
use crate::effect::EffectDescriptor;
use crate::error::CurveError;
use crate::params::{ParamName, ParamValue};
use crate::registry::EffectKind;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s(?P<start>-?\d+)e(?P<end>-?\d+);(?P<kind>[^;]*);").expect("valid header pattern")
});

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>\w+):(?P<value>[^;]*);").expect("valid parameter pattern")
});

/// Result of parsing an effect string
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEffect {
    /// Effect kind
    pub kind: EffectKind,
    /// Absolute start frame
    pub start: i64,
    /// Absolute end frame
    pub end: i64,
    /// Parameters that were present and readable
    pub params: IndexMap<ParamName, ParamValue>,
}

impl ParsedEffect {
    /// Build a descriptor, filling missing parameters with defaults
    pub fn into_descriptor(
        self,
        name: impl Into<String>,
        base: &dyn BaseValues,
    ) -> Result<EffectDescriptor, CurveError> {
        EffectDescriptor::with_params(self.kind, name, self.start, self.end, self.params, base)
    }
}

/// Serialize an effect with frames relative to `offset`
pub fn serialize(effect: &EffectDescriptor, offset: i64) -> String {
    let mut out = format!(
        "s{}e{};{};",
        effect.start() - offset,
        effect.end() - offset,
        effect.kind().tag()
    );
    for (name, value) in effect.params() {
        // Writing into a String cannot fail.
        let _ = write!(out, "{}:{};", name, value.encode());
    }
    out
}

/// Parse an effect string, moving frames by `offset`.
///
/// Returns `None` for unknown kinds and unreadable headers. Unknown or
/// unreadable parameters are skipped.
pub fn parse(text: &str, offset: i64) -> Option<ParsedEffect> {
    decode(text, offset).ok()
}

/// Like [`parse`], but reports why a string was rejected
pub fn decode(text: &str, offset: i64) -> Result<ParsedEffect, CurveError> {
    let malformed = || CurveError::Malformed(text.to_string());
    let caps = HEADER.captures(text).ok_or_else(malformed)?;
    let start = caps["start"].parse::<i64>().map_err(|_| malformed())? + offset;
    let end = caps["end"].parse::<i64>().map_err(|_| malformed())? + offset;
    if end < start {
        return Err(CurveError::InvalidRange { start, end });
    }
    let kind = EffectKind::from_tag(&caps["kind"])
        .ok_or_else(|| CurveError::UnknownKind(caps["kind"].to_string()))?;
    let body = &text[caps.get(0).ok_or_else(malformed)?.end()..];

    let mut params = IndexMap::new();
    for m in PARAM.captures_iter(body) {
        let Some(name) = ParamName::from_name(&m["name"]) else {
            tracing::debug!("{kind}: skipping unknown parameter {}", &m["name"]);
            continue;
        };
        if !kind.declares(name) {
            tracing::debug!("{kind}: skipping undeclared parameter {name}");
            continue;
        }
        match ParamValue::decode(name.shape(), &m["value"]) {
            Some(value) => {
                params.insert(name, value);
            }
            None => tracing::warn!("{kind}: unreadable value for {name}: {:?}", &m["value"]),
        }
    }

    Ok(ParsedEffect {
        kind,
        start,
        end,
        params,
    })
}
