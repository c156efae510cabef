// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod paths;
mod settings;

pub use paths::{resolve_under_root, validate_source_url};
pub use settings::{load_settings, Settings};
