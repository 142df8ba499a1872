#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset layer identifiers, layer definitions, and typed attribute records.
//!
//! Every queryable feature dataset in the dispensary map is identified by a
//! closed [`LayerId`]. Raw query results come back as loosely-typed
//! [`Feature`]s; the `records` module narrows those into per-dataset record
//! types at the query boundary.

pub mod records;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Identifier for one of the queryable feature datasets.
///
/// The set is closed: the suitability rules are written against exactly
/// these layers. Rendering-only layers of the map (parks, parcels, county
/// boundaries) are not queried by anything and have no id here.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerId {
    /// Zoning districts (polygons, `ZONE_DISTRICT`).
    Zoning,
    /// Statistical neighborhoods (polygons, `NBHD_NAME`).
    StatisticalNeighborhoods,
    /// Licensed retail marijuana stores (points).
    RetailMarijuana,
    /// Drug and alcohol treatment facilities (points).
    DrugTreatment,
    /// Public school locations (points).
    PublicSchools,
    /// Public school parcels (polygons).
    PublicSchoolAreas,
    /// Non-public school locations (points).
    NonPublicSchools,
    /// Non-public school parcels (polygons).
    NonPublicSchoolAreas,
    /// Licensed childcare facilities (points).
    ChildcareFacilities,
    /// Childcare parcels (polygons).
    ChildcareParcels,
    /// Building footprints (polygons); the placement surface.
    Buildings,
    /// Public address points.
    Addresses,
}

/// Broad geometry category of a layer's features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Point features.
    Point,
    /// Polygon features.
    Polygon,
}

/// A feature layer definition, deserialized from an embedded TOML file.
///
/// Each entry names the `ArcGIS` `FeatureServer` query endpoint for one
/// dataset along with the metadata the query adapter needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDef {
    /// Which dataset this definition describes.
    pub id: LayerId,
    /// Human-readable layer title (e.g., "Retail Marijuana Store Location").
    pub title: String,
    /// `FeatureServer` query URL (up to `/query`).
    pub url: String,
    /// Geometry category of the layer's features.
    pub geometry: GeometryKind,
    /// Whether the layer starts out shown on the map.
    #[serde(default)]
    pub visible_by_default: bool,
}

/// One record of a feature dataset: an attribute map plus optional geometry.
///
/// Attribute values keep the backend's JSON representation; use the typed
/// records in [`records`] to read named fields with explicit fallbacks.
/// Geometry is absent for distinct-values queries.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// Attribute key/value pairs, keys unique.
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Feature geometry in the working spatial reference (EPSG:4326).
    pub geometry: Option<geo::Geometry<f64>>,
}

impl Feature {
    /// Returns a string attribute, or `None` if absent, null, or not a
    /// string.
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns an integer attribute, or `None` if absent or non-numeric.
    #[must_use]
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(serde_json::Value::as_i64)
    }
}
