// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod construction;
mod evaluation;

pub use construction::ConstructionError;
pub use evaluation::EvalError;
