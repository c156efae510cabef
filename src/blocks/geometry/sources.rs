// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Leaf block reading feature rows from a JSON document on disk.

use crate::engine::EvalScope;
use crate::errors::{ConstructionError, EvalError};
use crate::gis::{Feature, FeatureCollection, Geometry, PropertyValue};
use crate::protocol::{GeometryMode, GeometryRequest, Request, Value};
use crate::traits::{Block, BlockToken, GeometryBlock, PlannedInput};
use async_trait::async_trait;
use serde::de::Error as _;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;

const KIND: &str = "geometry_file_source";

/// On-disk document layout: a projection and a flat list of rows. Row ids
/// live in a regular property named by the block's `id_field`.
#[derive(Debug, Deserialize)]
struct StoredDocument {
    projection: String,
    features: Vec<StoredFeature>,
}

#[derive(Debug, Deserialize)]
struct StoredFeature {
    geometry: Geometry,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

/// A leaf block backed by a feature file under the configured file root.
///
/// The url is validated at construction (relative, no escapes) but only
/// resolved against `settings.file_root` at evaluation time, so the same
/// graph can run against different roots. The declared column set is part
/// of the block's identity; it is what downstream `get_series` constructors
/// check against.
#[derive(Debug)]
pub struct GeometryFileSource {
    url: String,
    id_field: String,
    columns: BTreeSet<String>,
    token: BlockToken,
}

impl GeometryFileSource {
    pub fn new<I, S>(
        url: impl Into<String>,
        id_field: impl Into<String>,
        columns: I,
    ) -> Result<Arc<Self>, ConstructionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let url = url.into();
        crate::config::validate_source_url(&url)?;
        let id_field = id_field.into();
        let mut columns: BTreeSet<String> = columns.into_iter().map(Into::into).collect();
        columns.insert(id_field.clone());

        let mut parts = vec![url.clone(), id_field.clone()];
        parts.extend(columns.iter().cloned());
        let token = BlockToken::compose(KIND, parts);
        Ok(Arc::new(Self {
            url,
            id_field,
            columns,
            token,
        }))
    }

    fn read_rows(
        &self,
        path: &str,
        request: &GeometryRequest,
    ) -> Result<FeatureCollection, EvalError> {
        let raw = fs::read_to_string(path)?;
        let document: StoredDocument = serde_json::from_str(&raw)?;
        if document.projection != request.projection {
            return Err(EvalError::request(
                KIND,
                format!(
                    "stored projection '{}' does not match requested '{}'",
                    document.projection, request.projection
                ),
            ));
        }

        let mut out = FeatureCollection::empty(document.projection);
        for (position, row) in document.features.into_iter().enumerate() {
            let id = row
                .properties
                .get(&self.id_field)
                .and_then(PropertyValue::as_number)
                .ok_or_else(|| {
                    serde_json::Error::custom(format!(
                        "row {position} has no numeric '{}' property",
                        self.id_field
                    ))
                })? as i64;
            if !Self::matches(&row, request) {
                continue;
            }
            out.features.insert(
                id,
                Feature {
                    geometry: row.geometry,
                    properties: row.properties,
                },
            );
        }
        Ok(out)
    }

    fn matches(row: &StoredFeature, request: &GeometryRequest) -> bool {
        for (field, wanted) in &request.filters {
            if row.properties.get(field) != Some(wanted) {
                return false;
            }
        }
        let spatial = match request.mode {
            GeometryMode::Intersects | GeometryMode::Extent => {
                row.geometry.intersects(&request.geometry)
            }
            GeometryMode::Centroid => match (row.geometry.centroid(), request.geometry.bounds()) {
                (Some((x, y)), Some(bounds)) => bounds.contains_point(x, y),
                _ => false,
            },
        };
        if !spatial {
            return false;
        }
        if let Some(min_size) = request.min_size {
            if let Some(bounds) = row.geometry.bounds() {
                if bounds.width() < min_size && bounds.height() < min_size {
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl Block for GeometryFileSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn token(&self) -> &BlockToken {
        &self.token
    }

    /// Leaf planning: no children, just the literals `combine` needs. The
    /// path is resolved against the file root here because only the scope
    /// knows the settings; the request travels along as a literal so that
    /// filtering and the limit policy can run in `combine`.
    async fn plan(
        &self,
        request: &Request,
        scope: &EvalScope,
    ) -> Result<Vec<PlannedInput>, EvalError> {
        let geometry_request = request.as_geometry(KIND)?;
        if let Some(field) = geometry_request.filters.keys().find(|k| k.contains("__")) {
            return Err(EvalError::request(
                KIND,
                format!("filter '{field}': field lookups are not supported"),
            ));
        }
        let resolved =
            crate::config::resolve_under_root(&scope.settings().file_root, &self.url);
        Ok(vec![
            PlannedInput::literal(Value::Text(resolved.to_string_lossy().into_owned())),
            PlannedInput::literal(Value::Request(request.clone())),
            PlannedInput::literal(Value::Number(scope.settings().geometry_limit as f64)),
        ])
    }

    fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
        let mut inputs = inputs.into_iter();
        let (path, request, global_limit) = match (inputs.next(), inputs.next(), inputs.next()) {
            (Some(path), Some(request), Some(limit)) => match (path, request, limit) {
                (Value::Text(path), Value::Request(request), Value::Number(limit)) => {
                    (path, request, limit as usize)
                }
                _ => return Err(EvalError::fault(KIND, "unexpected literal shapes")),
            },
            _ => return Err(EvalError::fault(KIND, "expected three literal inputs")),
        };
        let geometry_request = request.as_geometry(KIND)?;

        let mut rows = self.read_rows(&path, geometry_request)?;

        if geometry_request.mode == GeometryMode::Extent {
            return Ok(Value::Extent {
                projection: geometry_request.projection.clone(),
                extent: rows.total_bounds(),
            });
        }

        match geometry_request.limit {
            Some(limit) => {
                // An explicit limit truncates, lowest row ids first.
                let cut = rows.features.keys().nth(limit).copied();
                if let Some(cut) = cut {
                    rows.features.split_off(&cut);
                }
            }
            None => {
                if rows.len() > global_limit {
                    return Err(EvalError::LimitExceeded {
                        count: rows.len(),
                        limit: global_limit,
                    });
                }
            }
        }
        Ok(Value::Features(rows))
    }
}

impl GeometryBlock for GeometryFileSource {
    fn columns(&self) -> BTreeSet<String> {
        self.columns.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engine::Evaluator;
    use crate::gis::Bbox;
    use std::path::Path;

    fn write_fixture(dir: &Path) {
        let raw = serde_json::json!({
            "projection": "EPSG:28992",
            "features": [
                {
                    "geometry": { "rect": { "x1": 0.0, "y1": 0.0, "x2": 4.0, "y2": 4.0 } },
                    "properties": { "gid": 1.0, "kind": "house", "height": 6.0 }
                },
                {
                    "geometry": { "rect": { "x1": 10.0, "y1": 10.0, "x2": 11.0, "y2": 11.0 } },
                    "properties": { "gid": 2.0, "kind": "shed", "height": 2.5 }
                },
                {
                    "geometry": { "rect": { "x1": 2.0, "y1": 2.0, "x2": 2.2, "y2": 2.2 } },
                    "properties": { "gid": 3.0, "kind": "well", "height": 1.0 }
                }
            ]
        });
        fs::write(dir.join("parcels.json"), raw.to_string()).unwrap();
    }

    fn evaluator(dir: &Path) -> Evaluator {
        Evaluator::new(Settings {
            file_root: dir.to_path_buf(),
            ..Settings::default()
        })
    }

    fn source() -> Arc<GeometryFileSource> {
        GeometryFileSource::new("parcels.json", "gid", ["kind", "height"]).unwrap()
    }

    fn intersects(x1: f64, y1: f64, x2: f64, y2: f64) -> GeometryRequest {
        GeometryRequest::new(
            GeometryMode::Intersects,
            Geometry::Rect(Bbox::new(x1, y1, x2, y2)),
            "EPSG:28992",
        )
    }

    #[test]
    fn escaping_urls_fail_construction() {
        let err = GeometryFileSource::new("../parcels.json", "gid", ["kind"]).unwrap_err();
        assert!(matches!(err, ConstructionError::UnsafePath { .. }));
    }

    #[test]
    fn declared_columns_include_the_id_field() {
        assert!(source().columns().contains("gid"));
        assert!(source().columns().contains("height"));
    }

    #[tokio::test]
    async fn intersecting_rows_are_returned_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let value = evaluator(dir.path())
            .evaluate(source(), intersects(0.0, 0.0, 5.0, 5.0))
            .await
            .unwrap();
        let fc = value.into_features("test").unwrap();
        assert_eq!(fc.features.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn filters_apply_before_the_limit_policy() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = intersects(0.0, 0.0, 20.0, 20.0).with_filter("kind", "shed");
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        let fc = value.into_features("test").unwrap();
        assert_eq!(fc.features.keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn min_size_drops_small_features() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let mut request = intersects(0.0, 0.0, 20.0, 20.0);
        request.min_size = Some(0.5);
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        let fc = value.into_features("test").unwrap();
        assert!(!fc.features.contains_key(&3));
        assert_eq!(fc.len(), 2);
    }

    #[tokio::test]
    async fn centroid_mode_requires_the_center_inside() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        // Box overlaps feature 1 but not its centroid at (2, 2).
        let request = GeometryRequest::new(
            GeometryMode::Centroid,
            Geometry::rect(3.0, 3.0, 5.0, 5.0),
            "EPSG:28992",
        );
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        assert!(value.into_features("test").unwrap().is_empty());
    }

    #[tokio::test]
    async fn extent_mode_returns_bounds_of_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = intersects(0.0, 0.0, 20.0, 20.0).to_extent();
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::Extent {
                projection: "EPSG:28992".to_string(),
                extent: Some(Bbox::new(0.0, 0.0, 11.0, 11.0)),
            }
        );
    }

    #[tokio::test]
    async fn extent_of_zero_matches_is_none() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = intersects(100.0, 100.0, 101.0, 101.0).to_extent();
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::Extent {
                projection: "EPSG:28992".to_string(),
                extent: None,
            }
        );
    }

    #[tokio::test]
    async fn global_limit_overflow_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let evaluator = Evaluator::new(Settings {
            file_root: dir.path().to_path_buf(),
            geometry_limit: 2,
            ..Settings::default()
        });
        let err = evaluator
            .evaluate(source(), intersects(0.0, 0.0, 20.0, 20.0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::LimitExceeded { count: 3, limit: 2 }
        ));
    }

    #[tokio::test]
    async fn explicit_limit_truncates_instead() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = intersects(0.0, 0.0, 20.0, 20.0).with_limit(2);
        let value = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap();
        let fc = value.into_features("test").unwrap();
        assert_eq!(fc.features.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn lookup_filters_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = intersects(0.0, 0.0, 20.0, 20.0).with_filter("height__gte", 2.0);
        let err = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Request { .. }));
    }

    #[tokio::test]
    async fn projection_mismatch_is_a_request_error() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let request = GeometryRequest::new(
            GeometryMode::Intersects,
            Geometry::rect(0.0, 0.0, 5.0, 5.0),
            "EPSG:4326",
        );
        let err = evaluator(dir.path())
            .evaluate(source(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Request { .. }));
    }

    #[tokio::test]
    async fn missing_file_surfaces_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = evaluator(dir.path())
            .evaluate(source(), intersects(0.0, 0.0, 5.0, 5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Io(_)));
    }
}
