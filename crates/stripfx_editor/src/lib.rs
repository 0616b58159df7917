// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session layer for strip effects.
//!
//! This crate connects the `stripfx_curves` engine to a host editor:
//! - Host collaborator traits and in-memory implementations
//! - The [`AnimationSession`] context object
//! - Per-cycle event processing and the strip ledger
//! - Persistence through a per-strip effect store
//! - Configuration and logging bootstrap
//!
//! ## Architecture
//!
//! All state lives in one [`AnimationSession`], created when the editor
//! opens and consumed when it closes. Hosts deliver what they observed as
//! [`HostEvent`]s; the session recomputes the affected tracks and writes
//! the results back through [`HostCurve`].

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod memory;
pub mod session;

pub use config::SessionConfig;
pub use error::{HostError, SessionError, SessionResult};
pub use events::{HostEvent, OperatorKind, UnknownOperator};
pub use host::{CurveHandle, HostCurve, HostProperty, HostValues, PersistedEffectStore};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use memory::{MemoryCurve, MemoryEffectStore, MemoryHost};
pub use session::{AnimationSession, SharedSession};
