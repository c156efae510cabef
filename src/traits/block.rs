// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The block contract: the two-method protocol every graph vertex
//! implements, plus the capability subtraits that constrain composition.
//!
//! A block is an immutable vertex in a computation DAG. It never holds
//! data; it only knows how to reshape an incoming request into sub-requests
//! for its inputs (`plan`) and how to fold the resolved input values into
//! its own value (`combine`). The evaluator in [`crate::engine`] drives the
//! recursion and guarantees at-most-once `combine` per distinct
//! `(block, canonical request)` key within one top-level call.
//!
//! Capabilities are closed: a block is a vector-feature block, a raster
//! block or a scalar-series block, expressed by the subtrait it implements.
//! Consuming operations take `Arc<dyn GeometryBlock>` (and friends) as
//! arguments, so a capability mismatch is unrepresentable; the remaining
//! semantic constraints are checked by constructors, which fail with a
//! [`crate::errors::ConstructionError`] before any evaluation can happen.

use crate::engine::EvalScope;
use crate::errors::EvalError;
use crate::gis::{Bbox, Dtype};
use crate::protocol::{Request, Value};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a block. Blocks form a DAG: children may be reachable
/// through multiple parents and are deduplicated by structural token, not by
/// pointer identity.
pub type BlockRef = Arc<dyn Block>;

/// Structural fingerprint of a block, assigned at construction.
///
/// Two independently constructed blocks with the same kind and
/// element-wise-equal arguments produce equal tokens and are therefore
/// interchangeable as cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockToken(Arc<str>);

impl BlockToken {
    /// Compose a token from a block kind and the canonical descriptions of
    /// its arguments (child tokens inline, literals rendered canonically).
    pub fn compose<I, S>(kind: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::with_capacity(kind.len() + 2);
        out.push_str(kind);
        out.push('(');
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(part.as_ref());
        }
        out.push(')');
        BlockToken(out.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `(input, sub-request)` pair produced by `plan`.
///
/// A `Literal` is data already in final form: the evaluator hands it to
/// `combine` untouched and never recurses into it.
#[derive(Debug, Clone)]
pub enum PlannedInput {
    Evaluate(BlockRef, Request),
    Literal(Value),
}

impl PlannedInput {
    pub fn evaluate(block: BlockRef, request: impl Into<Request>) -> Self {
        PlannedInput::Evaluate(block, request.into())
    }

    pub fn literal(value: Value) -> Self {
        PlannedInput::Literal(value)
    }
}

/// The operation contract of a graph vertex.
#[async_trait]
pub trait Block: Send + Sync + fmt::Debug {
    /// The operation tag, e.g. `"difference"` or `"classify"`.
    fn kind(&self) -> &'static str;

    /// Structural fingerprint computed at construction.
    fn token(&self) -> &BlockToken;

    /// Turn an incoming request into an ordered list of inputs.
    ///
    /// Pure with respect to data: a plan may resolve child *metadata*
    /// through the scope (e.g. an extent) but must not compute its own
    /// result here. The returned order is the order `combine` will see.
    async fn plan(
        &self,
        request: &Request,
        scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError>;

    /// Fold resolved input values, in plan order, into this block's value.
    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError>;
}

/// A vector-feature block: evaluates to feature rows or an extent.
pub trait GeometryBlock: Block {
    /// Column names this block's feature rows are declared to carry.
    /// Derived from arguments only; never triggers evaluation.
    fn columns(&self) -> BTreeSet<String>;
}

/// A raster block: evaluates to a grid, a temporal axis or metadata.
pub trait RasterBlock: Block {
    /// Declared cell dtype of the output grid.
    fn dtype(&self) -> Dtype;

    /// The no-data sentinel this block fills derived grids with.
    fn fill_value(&self) -> f64 {
        self.dtype().max_value()
    }

    /// Known spatial extent, if any can be derived without evaluation.
    fn extent(&self) -> Option<Bbox> {
        None
    }

    /// Known temporal period `(first, last)`, if any.
    fn period(&self) -> Option<(i64, i64)> {
        None
    }
}

/// A scalar-series block: evaluates to an index-aligned sequence of
/// scalars, one per row of some feature frame.
pub trait SeriesBlock: Block {}

/// Shared handle to a vector-feature block.
pub type GeometryRef = Arc<dyn GeometryBlock>;
/// Shared handle to a raster block.
pub type RasterRef = Arc<dyn RasterBlock>;
/// Shared handle to a scalar-series block.
pub type SeriesRef = Arc<dyn SeriesBlock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_structural() {
        let a = BlockToken::compose("add", ["get_series(src,height)", "2"]);
        let b = BlockToken::compose("add", ["get_series(src,height)", "2"]);
        let c = BlockToken::compose("add", ["get_series(src,height)", "3"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "add(get_series(src,height),2)");
    }
}
