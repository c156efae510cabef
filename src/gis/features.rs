// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{Bbox, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single property value on a feature row. Also used for request filters
/// and scalar-series cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

/// One feature row: a geometry plus named properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }
}

/// A table of feature rows keyed by row id, in a single projection.
///
/// Row ids are the identity that aligns features with scalar series and with
/// counterpart rows in set operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub projection: String,
    pub features: BTreeMap<i64, Feature>,
}

impl FeatureCollection {
    pub fn empty(projection: impl Into<String>) -> Self {
        Self {
            projection: projection.into(),
            features: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounds containing every feature, or `None` when there are no rows
    /// with a non-empty geometry.
    pub fn total_bounds(&self) -> Option<Bbox> {
        self.features
            .values()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|acc, b| acc.union(&b))
    }
}
