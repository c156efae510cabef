// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod set_operations;
mod sinks;
mod sources;

pub use set_operations::{Difference, Intersection};
pub use sinks::to_file;
pub use sources::GeometryFileSource;
