// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tiled export of a feature block to a JSON document on disk.

use crate::engine::Evaluator;
use crate::errors::EvalError;
use crate::gis::{Bbox, FeatureCollection, Geometry};
use crate::observability::messages::export::{ExportCompleted, ExportStarted};
use crate::observability::messages::StructuredLog;
use crate::protocol::{GeometryMode, GeometryRequest};
use crate::traits::GeometryRef;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const KIND: &str = "to_file";

/// Split `bounds` into tiles of at most `tile_size` on a side. A `None`
/// tile size exports in one piece.
fn tiles(bounds: Bbox, tile_size: Option<f64>) -> Vec<Bbox> {
    let size = match tile_size {
        Some(size) if size > 0.0 => size,
        _ => return vec![bounds],
    };
    let mut out = Vec::new();
    let mut y = bounds.y1;
    while y < bounds.y2 || (y == bounds.y1 && bounds.height() == 0.0) {
        let mut x = bounds.x1;
        while x < bounds.x2 || (x == bounds.x1 && bounds.width() == 0.0) {
            out.push(Bbox::new(
                x,
                y,
                (x + size).min(bounds.x2),
                (y + size).min(bounds.y2),
            ));
            if bounds.width() == 0.0 {
                break;
            }
            x += size;
        }
        if bounds.height() == 0.0 {
            break;
        }
        y += size;
    }
    out
}

/// Evaluate `source` over the request's geometry, tile by tile, and write
/// the merged rows to `target` as one JSON document.
///
/// Every tile is a top-level evaluation of its own; tiles run concurrently
/// up to `settings.max_concurrency` at a time, and rows are merged by id so
/// a feature straddling a tile boundary is written once. The document is
/// assembled under `settings.scratch_dir` first and only moved to `target`
/// when complete, so readers never observe a half-written export.
///
/// Returns the number of features written.
pub async fn to_file(
    evaluator: Arc<Evaluator>,
    source: GeometryRef,
    request: GeometryRequest,
    target: &Path,
    tile_size: Option<f64>,
) -> Result<usize, EvalError> {
    if request.mode == GeometryMode::Extent {
        return Err(EvalError::request(
            KIND,
            "an extent request has no rows to export",
        ));
    }
    let target_label = target.to_string_lossy().into_owned();
    let mut merged = FeatureCollection::empty(request.projection.clone());

    let tile_boxes = match request.geometry.bounds() {
        Some(bounds) => tiles(bounds, tile_size),
        // Empty export geometry: write an empty document.
        None => Vec::new(),
    };
    ExportStarted {
        target: &target_label,
        tiles: tile_boxes.len(),
    }
    .log();

    let chunk_size = evaluator.settings().max_concurrency;
    for chunk in tile_boxes.chunks(chunk_size.max(1)) {
        let handles: Vec<_> = chunk
            .iter()
            .map(|tile| {
                let mut tile_request = request.clone();
                tile_request.geometry = Geometry::Rect(*tile);
                let evaluator = evaluator.clone();
                let source = source.clone();
                tokio::spawn(async move { evaluator.evaluate(source, tile_request).await })
            })
            .collect();
        for handle in handles {
            let value = handle
                .await
                .map_err(|e| EvalError::fault(KIND, format!("tile task failed: {e}")))??;
            merged.features.extend(value.into_features(KIND)?.features);
        }
    }

    write_via_scratch(&evaluator.settings().scratch_dir, target, &merged)?;
    ExportCompleted {
        target: &target_label,
        features: merged.len(),
    }
    .log();
    Ok(merged.len())
}

fn write_via_scratch(
    scratch_dir: &Path,
    target: &Path,
    document: &FeatureCollection,
) -> Result<(), EvalError> {
    let name = target
        .file_name()
        .ok_or_else(|| EvalError::request(KIND, "target path has no file name"))?;
    let scratch = scratch_dir.join(format!(
        ".{}.{}.partial",
        name.to_string_lossy(),
        std::process::id()
    ));
    fs::write(&scratch, serde_json::to_string_pretty(document)?)?;
    // Scratch and target may live on different filesystems.
    if fs::rename(&scratch, target).is_err() {
        fs::copy(&scratch, target)?;
        fs::remove_file(&scratch)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::gis::Feature;
    use crate::protocol::{Request, Value};
    use crate::traits::{Block, BlockToken, GeometryBlock, PlannedInput};
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    /// Fixed rows; answers any feature request with the rows intersecting
    /// the requested geometry and counts how many requests it served.
    #[derive(Debug)]
    struct FixedRows {
        rows: FeatureCollection,
        token: BlockToken,
    }

    impl FixedRows {
        fn new(rows: FeatureCollection) -> Arc<Self> {
            Arc::new(Self {
                rows,
                token: BlockToken::compose("fixed_rows", ["test"]),
            })
        }
    }

    #[async_trait]
    impl Block for FixedRows {
        fn kind(&self) -> &'static str {
            "fixed_rows"
        }

        fn token(&self) -> &BlockToken {
            &self.token
        }

        async fn plan(
            &self,
            request: &Request,
            _scope: &crate::engine::EvalScope,
        ) -> Result<Vec<PlannedInput>, EvalError> {
            Ok(vec![PlannedInput::literal(Value::Request(request.clone()))])
        }

        fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
            let request = inputs
                .into_iter()
                .next()
                .ok_or_else(|| EvalError::fault("fixed_rows", "missing request"))?
                .into_request("fixed_rows")?;
            let geometry = request.as_geometry("fixed_rows")?.geometry.clone();
            let mut out = self.rows.clone();
            out.features
                .retain(|_, feature| feature.geometry.intersects(&geometry));
            Ok(Value::Features(out))
        }
    }

    impl GeometryBlock for FixedRows {
        fn columns(&self) -> BTreeSet<String> {
            BTreeSet::new()
        }
    }

    fn rows() -> FeatureCollection {
        let mut fc = FeatureCollection::empty("EPSG:28992");
        fc.features
            .insert(1, Feature::new(Geometry::rect(1.0, 1.0, 3.0, 3.0)));
        // Straddles the boundary between two 10-unit tiles.
        fc.features
            .insert(2, Feature::new(Geometry::rect(8.0, 0.0, 12.0, 4.0)));
        fc.features
            .insert(3, Feature::new(Geometry::rect(15.0, 15.0, 18.0, 18.0)));
        fc
    }

    fn export_request() -> GeometryRequest {
        GeometryRequest::new(
            GeometryMode::Intersects,
            Geometry::rect(0.0, 0.0, 20.0, 20.0),
            "EPSG:28992",
        )
    }

    #[test]
    fn tiling_covers_the_bounds_exactly() {
        let boxes = tiles(Bbox::new(0.0, 0.0, 20.0, 10.0), Some(8.0));
        assert_eq!(boxes.len(), 6);
        assert_eq!(boxes[0], Bbox::new(0.0, 0.0, 8.0, 8.0));
        assert_eq!(boxes[2], Bbox::new(16.0, 0.0, 20.0, 8.0));
        assert_eq!(boxes[5], Bbox::new(16.0, 8.0, 20.0, 10.0));
    }

    #[test]
    fn no_tile_size_means_one_tile() {
        let bounds = Bbox::new(0.0, 0.0, 20.0, 10.0);
        assert_eq!(tiles(bounds, None), vec![bounds]);
    }

    #[tokio::test]
    async fn export_merges_tiles_by_row_id() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        let evaluator = Arc::new(Evaluator::new(Settings {
            scratch_dir: dir.path().to_path_buf(),
            ..Settings::default()
        }));

        let written = to_file(
            evaluator,
            FixedRows::new(rows()),
            export_request(),
            &target,
            Some(10.0),
        )
        .await
        .unwrap();
        assert_eq!(written, 3);

        let raw = fs::read_to_string(&target).unwrap();
        let document: FeatureCollection = serde_json::from_str(&raw).unwrap();
        assert_eq!(document.features.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_export_geometry_writes_an_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("empty.json");
        let evaluator = Arc::new(Evaluator::new(Settings {
            scratch_dir: dir.path().to_path_buf(),
            ..Settings::default()
        }));

        let mut request = export_request();
        request.geometry = Geometry::Empty;
        let written = to_file(evaluator, FixedRows::new(rows()), request, &target, None)
            .await
            .unwrap();
        assert_eq!(written, 0);

        let document: FeatureCollection =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert!(document.is_empty());
    }

    #[tokio::test]
    async fn extent_requests_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = Arc::new(Evaluator::new(Settings::default()));
        let err = to_file(
            evaluator,
            FixedRows::new(rows()),
            export_request().to_extent(),
            &dir.path().join("never.json"),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EvalError::Request { .. }));
    }
}
