//! In-memory spatial index over building footprints.
//!
//! Built once from the Buildings layer, then queried on every placement
//! click: R-tree envelope prefilter followed by an exact point-in-polygon
//! test. Pins hold shared references into this index for the lifetime of
//! the board.

use std::sync::Arc;

use dispensary_map_dataset_models::records::BuildingFootprint;
use dispensary_map_dataset_models::Feature;
use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

/// One building footprint: the backend object id plus its polygon.
#[derive(Debug, Clone)]
pub struct Building {
    /// Backend object id of the footprint.
    pub object_id: i64,
    /// Footprint geometry.
    pub footprint: MultiPolygon<f64>,
}

/// A footprint stored in the R-tree with its envelope.
struct BuildingEntry {
    envelope: AABB<[f64; 2]>,
    building: Arc<Building>,
}

impl RTreeObject for BuildingEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built hit-test index over the Buildings layer.
pub struct BuildingIndex {
    tree: RTree<BuildingEntry>,
}

impl BuildingIndex {
    /// Builds the index from raw building features. Features without
    /// polygonal geometry are skipped.
    #[must_use]
    pub fn from_features(features: &[Feature]) -> Self {
        let mut entries = Vec::new();

        for feature in features {
            let footprint = match &feature.geometry {
                Some(Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon.clone()]),
                Some(Geometry::MultiPolygon(multi)) => multi.clone(),
                _ => {
                    log::warn!("Skipping building feature without polygonal geometry");
                    continue;
                }
            };
            let Some(rect) = footprint.bounding_rect() else {
                continue;
            };

            let record = BuildingFootprint::from_feature(feature);
            entries.push(BuildingEntry {
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                building: Arc::new(Building {
                    object_id: record.object_id,
                    footprint,
                }),
            });
        }

        log::info!("Indexed {} building footprints", entries.len());
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns the footprint under a point, if any.
    ///
    /// Footprints are dissolved by building id and do not overlap, so
    /// first match wins.
    #[must_use]
    pub fn hit_test(&self, point: Point<f64>) -> Option<Arc<Building>> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .find(|entry| entry.building.footprint.contains(&point))
            .map(|entry| Arc::clone(&entry.building))
    }

    /// Number of indexed footprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns whether the index holds no footprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
