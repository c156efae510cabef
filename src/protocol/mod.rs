// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The request/response grammar of the engine.
//!
//! Requests flow top-down through the block graph and are reshaped by each
//! block before being forwarded to its inputs; values flow bottom-up and are
//! folded by `combine`. Both are plain data: requests are immutable once
//! built, and a block that needs a different request for a child constructs
//! a new one (copy-and-modify), never mutates the caller's.

mod requests;
mod values;

pub use requests::{canonical_request, GeometryMode, GeometryRequest, RasterMode, RasterRequest, Request};
pub use values::Value;
