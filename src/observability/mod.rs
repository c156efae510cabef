// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the evaluation engine.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus the [`messages::StructuredLog`] trait, so call sites
//! never format magic strings and every event carries its fields as
//! structured `tracing` attributes.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - evaluator lifecycle and cache events
//! * `messages::export` - tiled file export events

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber honoring `RUST_LOG`.
///
/// Convenience for binaries and examples; a library embedding the engine
/// will usually install its own subscriber instead.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
