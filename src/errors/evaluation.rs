// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised during evaluation of a block graph.
//!
//! All variants abort the whole top-level evaluation call: the engine
//! performs no partial-result recovery, and the call-scoped cache is simply
//! discarded. Collaborator failures (`Io`, `Malformed`) are surfaced
//! unchanged; the engine neither retries nor interprets them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// A block rejected the incoming request during `plan`.
    #[error("block '{kind}' rejected the request: {reason}")]
    Request {
        kind: &'static str,
        reason: String,
    },

    /// A feature evaluation produced more rows than the configured ceiling
    /// and the caller supplied no explicit, larger `limit`.
    #[error(
        "the amount of returned geometries ({count}) exceeded the maximum of {limit}; \
         widen the request limit or narrow the request"
    )]
    LimitExceeded { count: usize, limit: usize },

    /// An I/O failure from an external collaborator (file source, sink).
    #[error("collaborator I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed data from an external collaborator.
    #[error("malformed collaborator data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A violation of the plan/combine contract itself. Indicates a bug in a
    /// block implementation rather than a bad request.
    #[error("evaluation fault in block '{kind}': {reason}")]
    Fault {
        kind: &'static str,
        reason: String,
    },
}

impl EvalError {
    pub fn request(kind: &'static str, reason: impl Into<String>) -> Self {
        EvalError::Request {
            kind,
            reason: reason.into(),
        }
    }

    pub fn fault(kind: &'static str, reason: impl Into<String>) -> Self {
        EvalError::Fault {
            kind,
            reason: reason.into(),
        }
    }
}
