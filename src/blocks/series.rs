// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scalar-series expression algebra.
//!
//! Series blocks compose per-row scalar operations over the property
//! columns of a feature frame. The algebra is a set of factory functions:
//! each operator constructs a new block tagged with a dedicated kind, and a
//! series request is simply the geometry request of the frame the rows
//! align with.
//!
//! Alignment is by row id. A row present in one operand but absent in the
//! other (or carrying a value of the wrong type for the operator) is absent
//! from the output; callers wanting an inner-join intersection of rows must
//! arrange it explicitly. Negation is `multiply(a, -1)` rather than a
//! distinct kind.

use crate::engine::EvalScope;
use crate::errors::{ConstructionError, EvalError};
use crate::gis::{PropertyValue, Series};
use crate::protocol::{Request, Value};
use crate::traits::{
    Block, BlockToken, GeometryBlock, GeometryRef, PlannedInput, SeriesBlock, SeriesRef,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Right-hand operand of a binary series operation: another series block or
/// a broadcast constant.
#[derive(Debug, Clone)]
pub enum SeriesOperand {
    Block(SeriesRef),
    Constant(f64),
}

impl SeriesOperand {
    fn describe(&self) -> String {
        match self {
            SeriesOperand::Block(block) => block.token().as_str().to_string(),
            SeriesOperand::Constant(c) => format!("{c}"),
        }
    }

    fn planned(&self, request: &Request) -> PlannedInput {
        match self {
            SeriesOperand::Block(block) => PlannedInput::evaluate(block.clone(), request.clone()),
            SeriesOperand::Constant(c) => PlannedInput::literal(Value::Number(*c)),
        }
    }
}

impl From<f64> for SeriesOperand {
    fn from(value: f64) -> Self {
        SeriesOperand::Constant(value)
    }
}

impl From<SeriesRef> for SeriesOperand {
    fn from(block: SeriesRef) -> Self {
        SeriesOperand::Block(block)
    }
}

/// The binary operators of the algebra. Arithmetic expects numeric rows,
/// comparisons yield booleans, the logical operators expect boolean rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::FloorDivide => "floor_divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::Power => "power",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "not_equal",
            BinaryOp::Greater => "greater",
            BinaryOp::GreaterEqual => "greater_equal",
            BinaryOp::Less => "less",
            BinaryOp::LessEqual => "less_equal",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    /// Apply to one aligned row pair; `None` drops the row from the output.
    fn apply(&self, left: &PropertyValue, right: &PropertyValue) -> Option<PropertyValue> {
        use BinaryOp::*;
        match self {
            Add | Subtract | Multiply | Divide | FloorDivide | Modulo | Power => {
                let (a, b) = (left.as_number()?, right.as_number()?);
                let out = match self {
                    Add => a + b,
                    Subtract => a - b,
                    Multiply => a * b,
                    Divide => a / b,
                    FloorDivide => (a / b).floor(),
                    // Python-style modulo: result takes the divisor's sign.
                    Modulo => a - b * (a / b).floor(),
                    Power => a.powf(b),
                    _ => unreachable!(),
                };
                Some(PropertyValue::Number(out))
            }
            Equal => Some(PropertyValue::Bool(left == right)),
            NotEqual => Some(PropertyValue::Bool(left != right)),
            Greater | GreaterEqual | Less | LessEqual => {
                let (a, b) = (left.as_number()?, right.as_number()?);
                let out = match self {
                    Greater => a > b,
                    GreaterEqual => a >= b,
                    Less => a < b,
                    LessEqual => a <= b,
                    _ => unreachable!(),
                };
                Some(PropertyValue::Bool(out))
            }
            And | Or | Xor => {
                let (a, b) = (left.as_bool()?, right.as_bool()?);
                let out = match self {
                    And => a && b,
                    Or => a || b,
                    Xor => a ^ b,
                    _ => unreachable!(),
                };
                Some(PropertyValue::Bool(out))
            }
        }
    }
}

/// A binary operation over a series block and an operand.
#[derive(Debug)]
pub struct SeriesBinary {
    op: BinaryOp,
    left: SeriesRef,
    right: SeriesOperand,
    token: BlockToken,
}

impl SeriesBinary {
    pub fn new(op: BinaryOp, left: SeriesRef, right: impl Into<SeriesOperand>) -> Arc<Self> {
        let right = right.into();
        let token = BlockToken::compose(
            op.name(),
            [left.token().as_str().to_string(), right.describe()],
        );
        Arc::new(Self {
            op,
            left,
            right,
            token,
        })
    }
}

#[async_trait]
impl Block for SeriesBinary {
    fn kind(&self) -> &'static str {
        self.op.name()
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_geometry(self.kind())?;
        Ok(vec![
            PlannedInput::evaluate(self.left.clone(), request.clone()),
            self.right.planned(request),
        ])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let kind = self.kind();
        let mut inputs = inputs.into_iter();
        let (left, right) = match (inputs.next(), inputs.next()) {
            (Some(left), Some(right)) => (left, right),
            _ => return Err(EvalError::fault(kind, "expected exactly two inputs")),
        };
        let left = left.into_series(kind)?;
        let result: Series = match right {
            Value::Series(right) => left
                .iter()
                .filter_map(|(id, a)| {
                    let b = right.get(id)?;
                    Some((id, self.op.apply(a, b)?))
                })
                .collect(),
            Value::Number(c) => {
                let constant = PropertyValue::Number(c);
                left.iter()
                    .filter_map(|(id, a)| Some((id, self.op.apply(a, &constant)?)))
                    .collect()
            }
            other => {
                return Err(EvalError::fault(
                    kind,
                    format!("expected a series or number input, got {}", other.shape_name()),
                ))
            }
        };
        Ok(Value::Series(result))
    }
}

impl SeriesBlock for SeriesBinary {}

/// Logical inversion of a boolean series.
#[derive(Debug)]
pub struct Invert {
    source: SeriesRef,
    token: BlockToken,
}

impl Invert {
    pub fn new(source: SeriesRef) -> Arc<Self> {
        let token = BlockToken::compose("invert", [source.token().as_str()]);
        Arc::new(Self { source, token })
    }
}

#[async_trait]
impl Block for Invert {
    fn kind(&self) -> &'static str {
        "invert"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_geometry(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.source.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let source = inputs
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::fault(self.kind(), "expected one input"))?
            .into_series(self.kind())?;
        let result: Series = source
            .iter()
            .filter_map(|(id, v)| Some((id, PropertyValue::Bool(!v.as_bool()?))))
            .collect();
        Ok(Value::Series(result))
    }
}

impl SeriesBlock for Invert {}

/// Project a named property column out of a feature block.
///
/// The column must be in the source's declared column set; that is checked
/// at construction. At evaluation time a frame with zero rows, or without
/// the expected column, yields an empty series rather than an error.
#[derive(Debug)]
pub struct GetSeries {
    source: GeometryRef,
    name: String,
    token: BlockToken,
}

impl GetSeries {
    pub fn new(source: GeometryRef, name: impl Into<String>) -> Result<Arc<Self>, ConstructionError> {
        let name = name.into();
        if !source.columns().contains(&name) {
            return Err(ConstructionError::UnknownColumn {
                kind: "get_series",
                column: name,
            });
        }
        let token = BlockToken::compose("get_series", [source.token().as_str(), &name]);
        Ok(Arc::new(Self {
            source,
            name,
            token,
        }))
    }
}

#[async_trait]
impl Block for GetSeries {
    fn kind(&self) -> &'static str {
        "get_series"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_geometry(self.kind())?;
        Ok(vec![PlannedInput::evaluate(
            self.source.clone(),
            request.clone(),
        )])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let series = match inputs.into_iter().next() {
            Some(Value::Features(fc)) => fc
                .features
                .iter()
                .filter_map(|(id, feature)| {
                    Some((*id, feature.properties.get(&self.name)?.clone()))
                })
                .collect::<Series>(),
            // Extent-shaped or otherwise non-tabular input: no rows.
            _ => Series::empty(),
        };
        Ok(Value::Series(series))
    }
}

impl SeriesBlock for GetSeries {}

/// Set one or more property columns on a feature block.
///
/// Values are series blocks (aligned by row id) or broadcast constants. The
/// declared column set is the source's set plus the assigned names. A
/// zero-row evaluation of the source is returned unchanged.
#[derive(Debug)]
pub struct SetSeries {
    source: GeometryRef,
    assignments: Vec<(String, SeriesOperand)>,
    token: BlockToken,
}

impl SetSeries {
    pub fn new(
        source: GeometryRef,
        assignments: Vec<(String, SeriesOperand)>,
    ) -> Result<Arc<Self>, ConstructionError> {
        if assignments.is_empty() {
            return Err(ConstructionError::invalid(
                "set_series",
                "at least one (column, value) pair is required",
            ));
        }
        let mut parts = vec![source.token().as_str().to_string()];
        for (name, operand) in &assignments {
            parts.push(name.clone());
            parts.push(operand.describe());
        }
        let token = BlockToken::compose("set_series", parts);
        Ok(Arc::new(Self {
            source,
            assignments,
            token,
        }))
    }
}

#[async_trait]
impl Block for SetSeries {
    fn kind(&self) -> &'static str {
        "set_series"
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    async fn plan(
        &self,
        request: &Request,
        _scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        request.as_geometry(self.kind())?;
        let mut planned = vec![PlannedInput::evaluate(self.source.clone(), request.clone())];
        for (_, operand) in &self.assignments {
            planned.push(operand.planned(request));
        }
        Ok(planned)
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let mut inputs = inputs.into_iter();
        let source = inputs
            .next()
            .ok_or_else(|| EvalError::fault(self.kind(), "expected a source input"))?;
        // Zero rows, or a non-tabular (extent) response: no-op.
        let mut fc = match source {
            Value::Features(fc) if !fc.is_empty() => fc,
            other => return Ok(other),
        };
        for ((name, _), value) in self.assignments.iter().zip(inputs) {
            match value {
                Value::Series(series) => {
                    for (id, feature) in fc.features.iter_mut() {
                        if let Some(v) = series.get(*id) {
                            feature.properties.insert(name.clone(), v.clone());
                        }
                    }
                }
                Value::Number(c) => {
                    for feature in fc.features.values_mut() {
                        feature
                            .properties
                            .insert(name.clone(), PropertyValue::Number(c));
                    }
                }
                other => {
                    return Err(EvalError::fault(
                        self.kind(),
                        format!(
                            "expected a series or number input, got {}",
                            other.shape_name()
                        ),
                    ))
                }
            }
        }
        Ok(Value::Features(fc))
    }
}

impl GeometryBlock for SetSeries {
    fn columns(&self) -> BTreeSet<String> {
        let mut columns = self.source.columns();
        columns.extend(self.assignments.iter().map(|(name, _)| name.clone()));
        columns
    }
}

// Factory functions: the public surface of the algebra.

pub fn add(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Add, left, right)
}

pub fn subtract(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Subtract, left, right)
}

pub fn multiply(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Multiply, left, right)
}

pub fn divide(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Divide, left, right)
}

pub fn floor_divide(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::FloorDivide, left, right)
}

pub fn modulo(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Modulo, left, right)
}

pub fn power(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Power, left, right)
}

pub fn equal(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Equal, left, right)
}

pub fn not_equal(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::NotEqual, left, right)
}

pub fn greater(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Greater, left, right)
}

pub fn greater_equal(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::GreaterEqual, left, right)
}

pub fn less(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Less, left, right)
}

pub fn less_equal(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::LessEqual, left, right)
}

pub fn and(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::And, left, right)
}

pub fn or(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Or, left, right)
}

pub fn xor(left: SeriesRef, right: impl Into<SeriesOperand>) -> SeriesRef {
    SeriesBinary::new(BinaryOp::Xor, left, right)
}

pub fn invert(source: SeriesRef) -> SeriesRef {
    Invert::new(source)
}

/// Negation is multiplication by the literal -1, not a distinct kind.
pub fn neg(source: SeriesRef) -> SeriesRef {
    multiply(source, -1.0)
}
