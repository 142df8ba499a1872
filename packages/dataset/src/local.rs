//! In-memory `GeoJSON`-backed feature source.
//!
//! Holds one parsed `FeatureCollection` per layer and evaluates the query
//! predicates in process. Used for offline analysis against exported layer
//! snapshots and by every test that needs a deterministic backend.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use dispensary_map_dataset_models::{Feature, LayerId};
use geo::Intersects;

use crate::{DatasetError, FeatureQuery, FeatureSource, feature_from_geojson, registry};

/// In-memory feature source.
#[derive(Default)]
pub struct GeoJsonSource {
    layers: BTreeMap<LayerId, Vec<Feature>>,
}

impl GeoJsonSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a layer's features, builder style.
    #[must_use]
    pub fn with_layer(mut self, layer: LayerId, features: Vec<Feature>) -> Self {
        self.layers.insert(layer, features);
        self
    }

    /// Adds (or replaces) a layer's features.
    pub fn insert_layer(&mut self, layer: LayerId, features: Vec<Feature>) {
        self.layers.insert(layer, features);
    }

    /// Returns the layer ids with data loaded.
    #[must_use]
    pub fn loaded_layers(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    /// Loads every registered layer that has a `<layer_id>.geojson` file in
    /// the directory. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if a present file cannot be read or parsed.
    pub fn load_dir(dir: &Path) -> Result<Self, DatasetError> {
        let mut source = Self::new();
        for def in registry::all_layers() {
            let path = dir.join(format!("{}.geojson", def.id));
            if !path.exists() {
                log::debug!("No snapshot for layer {} at {}", def.id, path.display());
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let features = parse_collection(&text)?;
            log::info!("Loaded {} features for layer {}", features.len(), def.id);
            source.layers.insert(def.id, features);
        }
        Ok(source)
    }
}

/// Parses a `GeoJSON` `FeatureCollection` into adapter features.
///
/// # Errors
///
/// Returns [`DatasetError::Conversion`] if the text is not a feature
/// collection or contains invalid geometry.
pub fn parse_collection(text: &str) -> Result<Vec<Feature>, DatasetError> {
    let gj: geojson::GeoJson = text.parse().map_err(|e| DatasetError::Conversion {
        message: format!("Failed to parse GeoJSON: {e}"),
    })?;
    let collection =
        geojson::FeatureCollection::try_from(gj).map_err(|e| DatasetError::Conversion {
            message: format!("Expected a FeatureCollection: {e}"),
        })?;

    collection
        .features
        .into_iter()
        .map(feature_from_geojson)
        .collect()
}

#[async_trait]
impl FeatureSource for GeoJsonSource {
    async fn query(
        &self,
        layer: LayerId,
        query: &FeatureQuery,
    ) -> Result<Vec<Feature>, DatasetError> {
        let features = self
            .layers
            .get(&layer)
            .ok_or(DatasetError::MissingLayer(layer))?;

        let matches = |feature: &Feature| {
            if !query.filters.iter().all(|filter| filter.matches(feature)) {
                return false;
            }
            match &query.geometry {
                None => true,
                Some(filter_geom) => feature
                    .geometry
                    .as_ref()
                    .is_some_and(|geom| filter_geom.intersects(geom)),
            }
        };

        if let Some(field) = &query.distinct_field {
            // One feature per distinct value, in first-occurrence order,
            // geometry omitted.
            let mut seen = BTreeSet::new();
            let mut out = Vec::new();
            for feature in features.iter().filter(|f| matches(f)) {
                let Some(value) = feature.attr_str(field) else {
                    continue;
                };
                if seen.insert(value.to_string()) {
                    let mut distinct = Feature::default();
                    distinct
                        .attributes
                        .insert(field.clone(), serde_json::Value::String(value.to_string()));
                    out.push(distinct);
                }
            }
            return Ok(out);
        }

        Ok(features.iter().filter(|f| matches(f)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeFilter;
    use geo::{Geometry, Point, polygon};

    fn point_feature(x: f64, y: f64, key: &str, value: &str) -> Feature {
        let mut feature = Feature {
            geometry: Some(Geometry::Point(Point::new(x, y))),
            ..Feature::default()
        };
        feature
            .attributes
            .insert(key.to_string(), serde_json::json!(value));
        feature
    }

    fn store_layer() -> Vec<Feature> {
        vec![
            point_feature(0.5, 0.5, "LIC_STATUS", "Active"),
            point_feature(5.0, 5.0, "LIC_STATUS", "Active"),
            point_feature(0.2, 0.2, "LIC_STATUS", "Expired"),
        ]
    }

    #[tokio::test]
    async fn geometry_filter_keeps_intersecting_features() {
        let source =
            GeoJsonSource::new().with_layer(LayerId::RetailMarijuana, store_layer());

        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let results = source
            .query(
                LayerId::RetailMarijuana,
                &FeatureQuery::intersecting(Geometry::Polygon(square)),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn intersects_is_boundary_inclusive() {
        let source = GeoJsonSource::new().with_layer(
            LayerId::RetailMarijuana,
            vec![point_feature(1.0, 0.5, "LIC_STATUS", "Active")],
        );

        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let results = source
            .query(
                LayerId::RetailMarijuana,
                &FeatureQuery::intersecting(Geometry::Polygon(square)),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1, "a point on the edge must match");
    }

    #[tokio::test]
    async fn attribute_filter_restricts_results() {
        let source =
            GeoJsonSource::new().with_layer(LayerId::RetailMarijuana, store_layer());

        let results = source
            .query(
                LayerId::RetailMarijuana,
                &FeatureQuery::all()
                    .with_filter(AttributeFilter::is_in("LIC_STATUS", ["Expired"])),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].attr_str("LIC_STATUS"), Some("Expired"));
    }

    #[tokio::test]
    async fn distinct_dedupes_in_first_occurrence_order() {
        let source =
            GeoJsonSource::new().with_layer(LayerId::RetailMarijuana, store_layer());

        let results = source
            .query(
                LayerId::RetailMarijuana,
                &FeatureQuery::distinct("LIC_STATUS"),
            )
            .await
            .unwrap();

        let values: Vec<_> = results
            .iter()
            .map(|f| f.attr_str("LIC_STATUS").unwrap())
            .collect();
        assert_eq!(values, ["Active", "Expired"]);
        assert!(results.iter().all(|f| f.geometry.is_none()));
    }

    #[tokio::test]
    async fn unloaded_layer_is_an_error() {
        let source = GeoJsonSource::new();
        let result = source
            .query(LayerId::Addresses, &FeatureQuery::all())
            .await;
        assert!(matches!(result, Err(DatasetError::MissingLayer(_))));
    }

    #[test]
    fn parses_a_feature_collection() {
        let features = parse_collection(
            r#"{
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "NBHD_NAME": "Baker" },
                    "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attr_str("NBHD_NAME"), Some("Baker"));
    }

    #[test]
    fn rejects_non_collections() {
        assert!(parse_collection(r#"{"type": "Point", "coordinates": [0, 0]}"#).is_err());
    }
}
