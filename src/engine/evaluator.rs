// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The recursive, memoizing evaluator.
//!
//! `evaluate(block, request)` walks the graph top-down following `plan`,
//! resolves children recursively (literals pass through untouched), and
//! folds the results bottom-up via `combine`:
//!
//! 1. Look up `(token, canonical request)` in the call-scoped cache; a
//!    populated slot short-circuits the recursion.
//! 2. Ask the block to `plan` the request into an ordered input list.
//! 3. Spawn one task per `Evaluate` input; literals are already resolved.
//! 4. Join the tasks in original order and hand the values to `combine`.
//!
//! Sibling inputs from one plan are independent and run concurrently, but
//! `combine` always receives them in plan order. Shared sub-graphs reached
//! through multiple parents (diamond dependencies) hit the same cache slot,
//! so `combine` runs at most once per distinct key within one call even
//! under concurrent fan-out: the slot is a single-flight cell and late
//! arrivals wait for the in-flight computation instead of repeating it.
//!
//! Determinism follows from `plan` and `combine` being side-effect free:
//! identical `(block, request)` pairs yield identical results within a call,
//! and across calls as long as external collaborators are unchanged.

use super::{CacheKey, CallCache};
use crate::config::Settings;
use crate::errors::EvalError;
use crate::observability::messages::engine::{
    CacheReuse, EvaluationCompleted, EvaluationFailed, EvaluationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{canonical_request, Request, Value};
use crate::traits::{BlockRef, PlannedInput};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// The evaluation context handed to `plan` implementations.
///
/// Carries the settings threaded into this evaluation and the call-scoped
/// cache, so metadata sub-queries issued during planning (such as resolving
/// a child's extent) are memoized together with everything else.
#[derive(Clone)]
pub struct EvalScope {
    settings: Arc<Settings>,
    cache: Arc<CallCache>,
}

impl EvalScope {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve a child within this call. Intended for metadata requests
    /// issued from `plan`; the result lands in the same cache as regular
    /// recursion.
    pub async fn resolve(&self, block: BlockRef, request: Request) -> Result<Value, EvalError> {
        let value = evaluate_block(self.clone(), block, request).await?;
        Ok((*value).clone())
    }

    pub(crate) async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }
}

/// The engine: owns the settings and drives one recursion per call.
///
/// Cheap to construct; holds no state between calls. Every `evaluate` call
/// gets a fresh call-scoped cache, so no mutable state persists across
/// independent top-level calls.
pub struct Evaluator {
    settings: Arc<Settings>,
}

impl Evaluator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings.normalized()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Evaluate a block for a request.
    pub async fn evaluate(
        &self,
        block: BlockRef,
        request: impl Into<Request>,
    ) -> Result<Value, EvalError> {
        let request = request.into();
        let scope = self.scope();
        let kind = block.kind();
        EvaluationStarted {
            kind,
            request: request.label(),
        }
        .log();
        let started = Instant::now();
        match evaluate_block(scope.clone(), block, request).await {
            Ok(value) => {
                EvaluationCompleted {
                    kind,
                    elapsed: started.elapsed(),
                    cached_entries: scope.cached_entries().await,
                }
                .log();
                Ok((*value).clone())
            }
            Err(error) => {
                EvaluationFailed {
                    kind,
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    /// Evaluate a planned input at top level. A literal is returned
    /// unchanged without touching any block; an `Evaluate` pair recurses
    /// normally.
    pub async fn resolve(&self, input: PlannedInput) -> Result<Value, EvalError> {
        match input {
            PlannedInput::Literal(value) => Ok(value),
            PlannedInput::Evaluate(block, request) => self.evaluate(block, request).await,
        }
    }

    fn scope(&self) -> EvalScope {
        EvalScope {
            settings: self.settings.clone(),
            cache: Arc::new(CallCache::new()),
        }
    }
}

type EvalFuture = Pin<Box<dyn Future<Output = Result<Arc<Value>, EvalError>> + Send>>;

/// The recursion step. Boxed so blocks and the scope can recurse through
/// spawned tasks without a self-referential future type.
fn evaluate_block(scope: EvalScope, block: BlockRef, request: Request) -> EvalFuture {
    Box::pin(async move {
        let key = CacheKey::new(block.token().clone(), canonical_request(&request)?);
        let slot = scope.cache.slot(key).await;
        if slot.initialized() {
            CacheReuse { kind: block.kind() }.log();
        }
        let value = slot
            .get_or_try_init(|| compute(scope.clone(), block.clone(), request.clone()))
            .await?;
        Ok(value.clone())
    })
}

/// Plan, fan out, join in order, combine.
async fn compute(
    scope: EvalScope,
    block: BlockRef,
    request: Request,
) -> Result<Arc<Value>, EvalError> {
    enum Pending {
        Ready(Value),
        Task(tokio::task::JoinHandle<Result<Arc<Value>, EvalError>>),
    }

    let planned = block.plan(&request, &scope).await?;
    let pending: Vec<Pending> = planned
        .into_iter()
        .map(|input| match input {
            PlannedInput::Literal(value) => Pending::Ready(value),
            PlannedInput::Evaluate(child, sub_request) => {
                Pending::Task(tokio::spawn(evaluate_block(
                    scope.clone(),
                    child,
                    sub_request,
                )))
            }
        })
        .collect();

    // Join in plan order; concurrency comes from the spawns above.
    let mut inputs = Vec::with_capacity(pending.len());
    for entry in pending {
        match entry {
            Pending::Ready(value) => inputs.push(value),
            Pending::Task(handle) => {
                let value = handle.await.map_err(|e| {
                    EvalError::fault(block.kind(), format!("input task failed: {e}"))
                })??;
                inputs.push((*value).clone());
            }
        }
    }

    Ok(Arc::new(block.combine(inputs)?))
}
