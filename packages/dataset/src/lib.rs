#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial query adapter over the dispensary map feature datasets.
//!
//! Every dataset read in the system goes through the [`FeatureSource`]
//! trait: an intersects-predicate geometry filter, optional attribute
//! membership filters, and an optional distinct-values mode. Two backends
//! implement it: a live `ArcGIS` `FeatureServer` client ([`arcgis`]) and an
//! in-memory `GeoJSON` store ([`local`]) used offline and in tests.
//!
//! The [`Datasets`] context bundles the active backend with per-layer
//! visibility flags so that layer-scoped actions can refuse to run against
//! a hidden layer instead of silently querying it.

pub mod arcgis;
pub mod filter;
pub mod local;
pub mod registry;
pub mod search;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dispensary_map_dataset_models::{Feature, LayerId};

/// Errors that can occur during dataset queries.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error (malformed geometry, bad `GeoJSON`, or a
    /// backend-reported request error).
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The layer has no data loaded in this source.
    #[error("No data loaded for layer {0}")]
    MissingLayer(LayerId),

    /// A layer-scoped action was requested while the layer is hidden.
    #[error("Layer {0} must be visible for this action")]
    LayerUnavailable(LayerId),
}

/// An attribute membership predicate: `field IN (values)`.
///
/// A single value behaves as equality. Values are matched as strings
/// against the feature's attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    /// Attribute field name.
    pub field: String,
    /// Accepted values.
    pub values: Vec<String>,
}

impl AttributeFilter {
    /// Builds a membership filter over the given values.
    pub fn is_in<F, I, V>(field: F, values: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the predicate as a SQL-like `where` fragment, with embedded
    /// single quotes doubled.
    #[must_use]
    pub fn to_where_clause(&self) -> String {
        let values = self
            .values
            .iter()
            .map(|value| format!("'{}'", value.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(",");
        format!("{} IN ({values})", self.field)
    }

    /// Returns whether a feature's attribute value is a member.
    #[must_use]
    pub fn matches(&self, feature: &Feature) -> bool {
        feature
            .attr_str(&self.field)
            .is_some_and(|value| self.values.iter().any(|accepted| accepted == value))
    }
}

/// A read query against one feature dataset.
///
/// All parts are optional; an empty query returns every feature of the
/// layer. Mirrors the query surface the suitability engine needs:
/// boundary-inclusive intersects, `IN` attribute predicates (ANDed), and a
/// distinct-values mode that omits geometry.
#[derive(Debug, Clone, Default)]
pub struct FeatureQuery {
    /// Restrict results to features intersecting this geometry.
    pub geometry: Option<geo::Geometry<f64>>,
    /// Attribute predicates; all must match.
    pub filters: Vec<AttributeFilter>,
    /// Return one feature per distinct value of this field, geometry
    /// omitted.
    pub distinct_field: Option<String>,
}

impl FeatureQuery {
    /// A query matching every feature of the layer.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A query for features intersecting the given geometry.
    #[must_use]
    pub fn intersecting(geometry: impl Into<geo::Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            ..Self::default()
        }
    }

    /// A distinct-values query over one field.
    #[must_use]
    pub fn distinct(field: impl Into<String>) -> Self {
        Self {
            distinct_field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Adds an attribute predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Renders all attribute predicates as a single `where` clause
    /// (`1=1` when there are none).
    #[must_use]
    pub fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            "1=1".to_string()
        } else {
            self.filters
                .iter()
                .map(AttributeFilter::to_where_clause)
                .collect::<Vec<_>>()
                .join(" AND ")
        }
    }
}

/// A queryable collection of feature datasets.
///
/// Implementations must apply intersects semantics boundary-inclusively
/// and must preserve the backend's feature order.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Runs a read query against one layer.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] on transport or backend failure, or when
    /// the layer has no data in this source.
    async fn query(&self, layer: LayerId, query: &FeatureQuery)
    -> Result<Vec<Feature>, DatasetError>;
}

/// The dataset context handed to the placement manager, rule engine, and
/// buffer actions: one backend plus per-layer visibility flags.
///
/// Visibility is owned by the UI collaborator; the core only reads it to
/// refuse layer-scoped actions against hidden layers.
pub struct Datasets {
    source: Arc<dyn FeatureSource>,
    visible: RwLock<BTreeMap<LayerId, bool>>,
}

impl Datasets {
    /// Wraps a backend, seeding visibility from the layer registry
    /// defaults.
    #[must_use]
    pub fn new(source: Arc<dyn FeatureSource>) -> Self {
        let visible = registry::all_layers()
            .into_iter()
            .map(|def| (def.id, def.visible_by_default))
            .collect();
        Self {
            source,
            visible: RwLock::new(visible),
        }
    }

    /// Sets a layer's visibility flag.
    ///
    /// # Panics
    ///
    /// Panics if the visibility lock is poisoned.
    pub fn set_visible(&self, layer: LayerId, visible: bool) {
        self.visible
            .write()
            .expect("visibility lock poisoned")
            .insert(layer, visible);
    }

    /// Returns whether a layer is currently shown.
    ///
    /// # Panics
    ///
    /// Panics if the visibility lock is poisoned.
    #[must_use]
    pub fn is_visible(&self, layer: LayerId) -> bool {
        self.visible
            .read()
            .expect("visibility lock poisoned")
            .get(&layer)
            .copied()
            .unwrap_or(false)
    }

    /// Fails with [`DatasetError::LayerUnavailable`] when the layer is
    /// hidden.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::LayerUnavailable`] if the layer is not
    /// visible.
    pub fn require_visible(&self, layer: LayerId) -> Result<(), DatasetError> {
        if self.is_visible(layer) {
            Ok(())
        } else {
            Err(DatasetError::LayerUnavailable(layer))
        }
    }

    /// Runs a read query against one layer through the active backend.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the backend query fails.
    pub async fn query(
        &self,
        layer: LayerId,
        query: &FeatureQuery,
    ) -> Result<Vec<Feature>, DatasetError> {
        self.source.query(layer, query).await
    }
}

/// Converts a `GeoJSON` feature into the adapter's [`Feature`] form.
pub(crate) fn feature_from_geojson(gj: geojson::Feature) -> Result<Feature, DatasetError> {
    let geometry = match gj.geometry {
        Some(geom) => {
            Some(
                geo::Geometry::<f64>::try_from(geom).map_err(|e| DatasetError::Conversion {
                    message: format!("Invalid geometry: {e}"),
                })?,
            )
        }
        None => None,
    };
    let attributes = gj
        .properties
        .map(|props| props.into_iter().collect())
        .unwrap_or_default();

    Ok(Feature {
        attributes,
        geometry,
    })
}
