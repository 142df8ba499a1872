//! `ArcGIS` `FeatureServer` query backend.
//!
//! Translates a [`FeatureQuery`] into the REST query parameters the layer
//! endpoints expect (`where`, Esri geometry filter, distinct values) and
//! requests `f=geojson` so responses parse as standard `GeoJSON`. Handles
//! pagination via `resultOffset` for services with transfer limits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dispensary_map_dataset_models::{Feature, LayerDef, LayerId};
use geo::{Geometry, LineString};

use crate::{DatasetError, FeatureQuery, FeatureSource, feature_from_geojson, registry};

/// Max records requested per page (often the server cap as well).
const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Live `ArcGIS` feature source over the registered layer endpoints.
pub struct ArcGisSource {
    client: reqwest::Client,
    layers: BTreeMap<LayerId, LayerDef>,
    page_size: u32,
}

impl ArcGisSource {
    /// Creates a source over every registered layer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a source with a custom page size.
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            layers: registry::layers_by_id(),
            page_size,
        }
    }
}

impl Default for ArcGisSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureSource for ArcGisSource {
    async fn query(
        &self,
        layer: LayerId,
        query: &FeatureQuery,
    ) -> Result<Vec<Feature>, DatasetError> {
        let def = self
            .layers
            .get(&layer)
            .ok_or(DatasetError::MissingLayer(layer))?;

        let mut base_params: Vec<(&str, String)> = vec![
            ("where", query.where_clause()),
            ("f", "geojson".to_string()),
            ("outSR", "4326".to_string()),
        ];

        if let Some(field) = &query.distinct_field {
            base_params.push(("outFields", field.clone()));
            base_params.push(("returnDistinctValues", "true".to_string()));
            base_params.push(("returnGeometry", "false".to_string()));
        } else {
            base_params.push(("outFields", "*".to_string()));
            base_params.push(("returnGeometry", "true".to_string()));
        }

        if let Some(geometry) = &query.geometry {
            let (geometry_type, geometry_json) = esri_geometry(geometry)?;
            base_params.push(("geometry", geometry_json));
            base_params.push(("geometryType", geometry_type.to_string()));
            base_params.push(("inSR", "4326".to_string()));
            base_params.push(("spatialRel", "esriSpatialRelIntersects".to_string()));
        }

        let mut all_features = Vec::new();
        let mut offset = 0u32;

        loop {
            let mut params = base_params.clone();
            params.push(("resultRecordCount", self.page_size.to_string()));
            params.push(("resultOffset", offset.to_string()));

            let resp = self.client.get(&def.url).query(&params).send().await?;
            if !resp.status().is_success() {
                return Err(DatasetError::Conversion {
                    message: format!("ArcGIS request failed with status {}", resp.status()),
                });
            }
            let body: serde_json::Value = resp.json().await?;

            // ArcGIS reports request-level errors in a 200 body.
            if body.get("error").is_some() {
                return Err(DatasetError::Conversion {
                    message: format!(
                        "ArcGIS API error: {}",
                        body["error"]["message"].as_str().unwrap_or("unknown error")
                    ),
                });
            }

            let features = body
                .get("features")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default();

            if features.is_empty() {
                break;
            }

            log::debug!(
                "{layer}: fetched {} features at offset {offset}",
                features.len()
            );

            #[allow(clippy::cast_possible_truncation)]
            {
                offset += features.len() as u32;
            }

            for value in features {
                let gj: geojson::Feature = serde_json::from_value(value)?;
                all_features.push(feature_from_geojson(gj)?);
            }

            // `exceededTransferLimit` is the canonical pagination signal;
            // checking count < page size is unreliable because the server
            // silently caps results at its own maxRecordCount.
            let exceeded = body
                .get("exceededTransferLimit")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !exceeded {
                break;
            }
        }

        Ok(all_features)
    }
}

/// Renders a geometry filter as `(geometryType, Esri JSON)` parameters.
///
/// The engine only filters by points and polygons; anything else is
/// rejected.
fn esri_geometry(geometry: &Geometry<f64>) -> Result<(&'static str, String), DatasetError> {
    match geometry {
        Geometry::Point(point) => {
            let json = serde_json::json!({
                "x": point.x(),
                "y": point.y(),
                "spatialReference": { "wkid": 4326 },
            });
            Ok(("esriGeometryPoint", json.to_string()))
        }
        Geometry::Polygon(polygon) => {
            let mut rings = vec![ring_coords(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(ring_coords));
            let json = serde_json::json!({
                "rings": rings,
                "spatialReference": { "wkid": 4326 },
            });
            Ok(("esriGeometryPolygon", json.to_string()))
        }
        Geometry::MultiPolygon(multi) => {
            let mut rings = Vec::new();
            for polygon in &multi.0 {
                rings.push(ring_coords(polygon.exterior()));
                rings.extend(polygon.interiors().iter().map(ring_coords));
            }
            let json = serde_json::json!({
                "rings": rings,
                "spatialReference": { "wkid": 4326 },
            });
            Ok(("esriGeometryPolygon", json.to_string()))
        }
        other => Err(DatasetError::Conversion {
            message: format!("Unsupported geometry filter type: {other:?}"),
        }),
    }
}

fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|coord| [coord.x, coord.y]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, Polygon, polygon};

    #[test]
    fn point_filter_renders_esri_point() {
        let (geometry_type, json) =
            esri_geometry(&Geometry::Point(Point::new(-105.0, 39.7))).unwrap();
        assert_eq!(geometry_type, "esriGeometryPoint");

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!((value["x"].as_f64().unwrap() - -105.0).abs() < f64::EPSILON);
        assert_eq!(value["spatialReference"]["wkid"], 4326);
    }

    #[test]
    fn polygon_filter_renders_rings() {
        let square: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let (geometry_type, json) = esri_geometry(&Geometry::Polygon(square)).unwrap();
        assert_eq!(geometry_type, "esriGeometryPolygon");

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rings = value["rings"].as_array().unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].as_array().unwrap().len(), 5);
    }

    #[test]
    fn line_filter_is_rejected() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
        assert!(esri_geometry(&line).is_err());
    }

    #[test]
    fn response_feature_converts_attributes_and_geometry() {
        let gj: geojson::Feature = serde_json::from_str(
            r#"{
                "type": "Feature",
                "properties": { "FULL_ADDRESS": "1600 GLENARM PL" },
                "geometry": { "type": "Point", "coordinates": [-104.99, 39.74] }
            }"#,
        )
        .unwrap();

        let feature = feature_from_geojson(gj).unwrap();
        assert_eq!(feature.attr_str("FULL_ADDRESS"), Some("1600 GLENARM PL"));
        assert!(matches!(feature.geometry, Some(Geometry::Point(_))));
    }

    #[test]
    fn response_feature_without_geometry_is_kept() {
        let gj: geojson::Feature = serde_json::from_str(
            r#"{
                "type": "Feature",
                "properties": { "CHECKBOXTYPE": "Retail Store" },
                "geometry": null
            }"#,
        )
        .unwrap();

        let feature = feature_from_geojson(gj).unwrap();
        assert_eq!(feature.attr_str("CHECKBOXTYPE"), Some("Retail Store"));
        assert!(feature.geometry.is_none());
    }
}
