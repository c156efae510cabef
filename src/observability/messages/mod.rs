// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.

pub mod engine;
pub mod export;

/// A log message that knows how to emit itself with structured fields.
pub trait StructuredLog {
    fn log(&self);
}
