// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod cache;
mod evaluator;
#[cfg(test)]
mod integration_tests;

pub(crate) use cache::{CacheKey, CallCache};
pub use evaluator::{EvalScope, Evaluator};
