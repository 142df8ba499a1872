//! Standalone facility buffers, one per facility type.
//!
//! The buffer panel lets the user draw fixed-distance buffers around every
//! feature of a facility layer, independent of the pin analysis. Each
//! facility type holds exactly one buffer result at a time; a new request
//! replaces the previous one atomically. Buffers are only available while
//! the backing layer is shown, and asking for one against a hidden layer
//! is a user-facing validation error, not a silent no-op.

use std::collections::BTreeMap;
use std::sync::Arc;

use dispensary_map_dataset::filter::FacilityFilter;
use dispensary_map_dataset::{Datasets, FeatureQuery};
use dispensary_map_dataset_models::LayerId;
use geo::Polygon;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{BufferDistance, SuitabilityError};

/// The facility types the buffer panel offers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum FacilityKind {
    /// Retail marijuana stores; honors the active facility filter.
    Marijuana,
    /// Licensed childcare facilities.
    Childcare,
    /// Drug and alcohol treatment facilities.
    DrugTreatment,
    /// Public school locations.
    PublicSchools,
    /// Non-public school locations.
    NonPublicSchools,
}

impl FacilityKind {
    /// Every facility type, in panel order.
    pub const ALL: &[Self] = &[
        Self::Marijuana,
        Self::Childcare,
        Self::DrugTreatment,
        Self::PublicSchools,
        Self::NonPublicSchools,
    ];

    /// The layer whose features get buffered.
    #[must_use]
    pub const fn layer(self) -> LayerId {
        match self {
            Self::Marijuana => LayerId::RetailMarijuana,
            Self::Childcare => LayerId::ChildcareFacilities,
            Self::DrugTreatment => LayerId::DrugTreatment,
            Self::PublicSchools => LayerId::PublicSchools,
            Self::NonPublicSchools => LayerId::NonPublicSchools,
        }
    }

    /// Panel label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Marijuana => "Marijuana Store",
            Self::Childcare => "Childcare Facility",
            Self::DrugTreatment => "Drug Treatment Facility",
            Self::PublicSchools => "Public School",
            Self::NonPublicSchools => "Non-Public School",
        }
    }
}

/// The buffer state of one facility type.
#[derive(Debug, Clone, Default)]
pub enum BufferState {
    /// No buffer requested, or cleared.
    #[default]
    Idle,
    /// Buffers computed and shown at the given distance.
    Shown {
        /// Distance the buffers were generated at.
        distance: BufferDistance,
        /// One buffer polygon per buffered feature, in dataset order.
        polygons: Vec<Polygon<f64>>,
    },
}

impl BufferState {
    /// Whether buffers are currently shown.
    #[must_use]
    pub const fn is_shown(&self) -> bool {
        matches!(self, Self::Shown { .. })
    }
}

/// Per-facility-type buffer results, replaced atomically per request.
pub struct BufferBoard {
    datasets: Arc<Datasets>,
    filter: FacilityFilter,
    states: BTreeMap<FacilityKind, BufferState>,
}

impl BufferBoard {
    /// Creates an idle board over the dataset context.
    #[must_use]
    pub fn new(datasets: Arc<Datasets>) -> Self {
        Self {
            datasets,
            filter: FacilityFilter::default(),
            states: BTreeMap::new(),
        }
    }

    /// Sets the facility filter applied to marijuana buffer queries.
    pub fn set_filter(&mut self, filter: FacilityFilter) {
        self.filter = filter;
    }

    /// The current state of one facility type.
    #[must_use]
    pub fn state(&self, kind: FacilityKind) -> &BufferState {
        static IDLE: BufferState = BufferState::Idle;
        self.states.get(&kind).unwrap_or(&IDLE)
    }

    /// Buffers every feature of the facility's layer at the given
    /// distance, replacing any previous buffer for that facility type.
    /// Returns the number of buffered features.
    ///
    /// # Errors
    ///
    /// Returns [`SuitabilityError::Dataset`] when the layer is hidden
    /// (`LayerUnavailable`, user-facing) or when the feature query fails.
    pub async fn apply(
        &mut self,
        kind: FacilityKind,
        distance: BufferDistance,
    ) -> Result<usize, SuitabilityError> {
        let layer = kind.layer();
        self.datasets.require_visible(layer)?;

        let query = if kind == FacilityKind::Marijuana {
            self.filter.apply_to(FeatureQuery::all())
        } else {
            FeatureQuery::all()
        };
        let features = self.datasets.query(layer, &query).await?;

        let polygons: Vec<Polygon<f64>> = features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
            .map(|geometry| dispensary_map_spatial::buffer(geometry, distance.as_f64()))
            .collect();

        log::info!(
            "Buffered {} {} feature(s) at {distance}",
            polygons.len(),
            kind.label()
        );
        let count = polygons.len();
        self.states
            .insert(kind, BufferState::Shown { distance, polygons });

        Ok(count)
    }

    /// Applies buffers for every facility type with a requested distance,
    /// skipping hidden layers and invalid distances the way the panel's
    /// apply-all button does. Returns the facility types actually
    /// buffered with their feature counts.
    ///
    /// # Errors
    ///
    /// Returns [`SuitabilityError::Dataset`] when a feature query fails
    /// for a visible layer.
    pub async fn apply_all(
        &mut self,
        requests: &[(FacilityKind, i64)],
    ) -> Result<Vec<(FacilityKind, usize)>, SuitabilityError> {
        let mut applied = Vec::new();
        for &(kind, raw_distance) in requests {
            let Ok(distance) = BufferDistance::new(raw_distance) else {
                log::debug!("Skipping {} buffer: invalid distance", kind.label());
                continue;
            };
            if !self.datasets.is_visible(kind.layer()) {
                log::debug!("Skipping {} buffer: layer hidden", kind.label());
                continue;
            }
            let count = self.apply(kind, distance).await?;
            applied.push((kind, count));
        }
        Ok(applied)
    }

    /// Resets every facility type to idle.
    pub fn clear_all(&mut self) {
        self.states.clear();
        log::info!("Cleared all facility buffers");
    }
}
