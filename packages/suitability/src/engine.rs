//! The suitability rule engine.
//!
//! Each pin gets two 1000 ft buffers: one around the marker point and one
//! grown outward from the building footprint boundary. The point buffer
//! drives the nearest-address lookup and the marijuana-store and
//! drug-treatment proximity checks; zoning and neighborhood exclusion are
//! evaluated at the bare point (land-use designation applies at the point
//! of use, proximity rules to the surrounding area). The footprint buffer
//! drives the school and childcare proximity checks.
//!
//! Criterion queries run concurrently; a failed query degrades that
//! criterion to `Unknown` instead of failing the pin or the run. Results
//! are keyed by pin id at merge time so completion order never reorders
//! the output.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dispensary_map_dataset::{AttributeFilter, Datasets, FeatureQuery};
use dispensary_map_dataset_models::LayerId;
use dispensary_map_dataset_models::records::{Neighborhood, ZoningDistrict};
use dispensary_map_suitability_models::{
    AnalysisResult, BuildingVerdict, NearestAddress, NeighborhoodCheck, Pin, PinId, PointVerdict,
    ProximityCheck, ZoningCheck,
};
use futures::future;
use geo::{Geometry, Point, Polygon};

use crate::SuitabilityError;

/// Radius of both analysis buffers, in feet.
pub const ANALYSIS_RADIUS_FEET: f64 = 1000.0;

/// Zone districts where a dispensary cannot be sited.
///
/// Campus, estate, general-urban, suburban, urban, row-house, former
/// Chapter 59 residential, and gateway designations.
pub const EXCLUDED_ZONE_DISTRICTS: &[&str] = &[
    "C-RX-5", "C-RX-8", "C-RX-12", "E-MU-2.5", "E-RH-2.5", "E-RX-3", "E-RX-5", "E-SU-A", "E-SU-B",
    "E-SU-B1", "E-SU-D", "E-SU-D1", "E-SU-D1x", "E-SU-DX", "E-SU-G", "E-SU-G1", "E-TU-B", "E-TU-C",
    "G-MU-12", "G-MU-20", "G-MU-3", "G-MU-5", "G-MU-8", "G-RH-3", "G-RO-3", "G-RO-5", "G-RX-3",
    "G-RX-5", "M-RH-3", "M-RX-3", "M-RX-5", "M-RX-5A", "S-MU-12", "S-MU-20", "S-MU-3", "S-MU-5",
    "S-MU-8", "S-RH-2.5", "S-SU-A", "S-SU-D", "S-SU-F", "S-SU-F1", "S-SU-FX", "S-SU-I", "S-SU-IX",
    "U-RH-2.5", "U-RH-3A", "U-RX-3", "U-RX-5", "U-SU-A", "U-SU-A1", "U-SU-A2", "U-SU-B", "U-SU-B1",
    "U-SU-B2", "U-SU-C", "U-SU-C1", "U-SU-C2", "U-SU-E", "U-SU-E1", "U-SU-H", "U-SU-H1", "U-TU-B",
    "U-TU-B2", "U-TU-C", "GTWY-RU1", "GTWY-RU2", "R-0", "R-2", "R-2-A", "R-2-B", "R-3", "R-3-X",
    "R-4", "R-4-X", "R-5", "R-MU-20", "R-MU-30", "RS-4", "R-X",
];

/// Statistical neighborhoods where a dispensary cannot be sited.
pub const EXCLUDED_NEIGHBORHOODS: &[&str] = &[
    "Overland",
    "Northeast Park Hill",
    "Baker",
    "Five Points",
    "Montbello",
    "Valverde",
];

/// The two analysis buffers computed for one pin, kept for visualization
/// until the next run replaces them.
#[derive(Debug, Clone)]
pub struct PinBuffers {
    /// Pin the buffers belong to.
    pub pin_id: PinId,
    /// 1000 ft disc around the marker point.
    pub point_buffer: Polygon<f64>,
    /// 1000 ft offset of the building footprint boundary.
    pub footprint_buffer: Polygon<f64>,
}

/// Everything one analysis run produces, in pin input order.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Per-pin verdicts.
    pub results: Vec<AnalysisResult>,
    /// Per-pin buffer polygons for visualization.
    pub buffers: Vec<PinBuffers>,
}

/// Runs the multi-criteria analysis over a pin snapshot.
///
/// Runs are tagged with an id from a shared counter; starting a new run
/// (or clearing the pin set through [`Self::supersede`]) invalidates any
/// run still in flight, whose output is then discarded rather than merged.
pub struct Analyzer {
    datasets: Arc<Datasets>,
    current_run: Arc<AtomicU64>,
}

impl Analyzer {
    /// Creates an analyzer with its own run counter.
    #[must_use]
    pub fn new(datasets: Arc<Datasets>) -> Self {
        Self::with_run_counter(datasets, Arc::new(AtomicU64::new(0)))
    }

    /// Creates an analyzer sharing an externally owned run counter, so a
    /// clear-all elsewhere can supersede in-flight runs.
    #[must_use]
    pub fn with_run_counter(datasets: Arc<Datasets>, current_run: Arc<AtomicU64>) -> Self {
        Self {
            datasets,
            current_run,
        }
    }

    /// Invalidates any in-flight run without starting a new one.
    pub fn supersede(&self) {
        self.current_run.fetch_add(1, Ordering::SeqCst);
    }

    /// Analyzes a snapshot of the pin set, one result per pin in input
    /// order.
    ///
    /// Per-pin sub-analyses run concurrently; per-criterion query
    /// failures degrade that criterion to `Unknown` and never abort the
    /// run. An empty snapshot short-circuits to an empty outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SuitabilityError::Aborted`] when a newer run or a
    /// clear-all superseded this run while it was in flight; the partial
    /// output is discarded.
    pub async fn analyze(&self, pins: &[Pin]) -> Result<AnalysisOutcome, SuitabilityError> {
        if pins.is_empty() {
            return Ok(AnalysisOutcome::default());
        }

        let run_id = self.current_run.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Starting analysis run {run_id} over {} pins", pins.len());

        let analyzed = future::join_all(pins.iter().map(|pin| self.analyze_pin(pin))).await;

        if self.current_run.load(Ordering::SeqCst) != run_id {
            log::debug!("Analysis run {run_id} superseded, discarding results");
            return Err(SuitabilityError::Aborted);
        }

        // Merge keyed by pin id, then emit in input order; completion
        // order never leaks into the result sequence.
        let mut by_id: BTreeMap<PinId, (AnalysisResult, PinBuffers)> = analyzed
            .into_iter()
            .map(|entry| (entry.0.pin_id, entry))
            .collect();

        let mut outcome = AnalysisOutcome::default();
        for pin in pins {
            if let Some((result, buffers)) = by_id.remove(&pin.id) {
                outcome.results.push(result);
                outcome.buffers.push(buffers);
            }
        }

        Ok(outcome)
    }

    async fn analyze_pin(&self, pin: &Pin) -> (AnalysisResult, PinBuffers) {
        let point_buffer = dispensary_map_spatial::buffer(
            &Geometry::Point(pin.location),
            ANALYSIS_RADIUS_FEET,
        );
        let footprint_buffer = dispensary_map_spatial::buffer(
            &Geometry::MultiPolygon(pin.building.footprint.clone()),
            ANALYSIS_RADIUS_FEET,
        );

        let (point, building) = future::join(
            self.analyze_point(pin.location, &point_buffer),
            self.analyze_building(&footprint_buffer),
        )
        .await;

        (
            AnalysisResult {
                pin_id: pin.id,
                point,
                building,
            },
            PinBuffers {
                pin_id: pin.id,
                point_buffer,
                footprint_buffer,
            },
        )
    }

    /// Point-side criteria: nearest address and proximity checks use the
    /// point buffer, zoning and neighborhood the bare marker point.
    async fn analyze_point(&self, location: Point<f64>, buffer: &Polygon<f64>) -> PointVerdict {
        let (nearest_address, zoning, neighborhood, marijuana_stores, drug_treatment) =
            future::join5(
                self.nearest_address(location, buffer),
                self.zoning_check(location),
                self.neighborhood_check(location),
                self.proximity_check(LayerId::RetailMarijuana, buffer),
                self.proximity_check(LayerId::DrugTreatment, buffer),
            )
            .await;

        PointVerdict {
            nearest_address,
            zoning,
            neighborhood,
            marijuana_stores,
            drug_treatment,
        }
    }

    /// Building-side criteria, all against the footprint buffer.
    async fn analyze_building(&self, buffer: &Polygon<f64>) -> BuildingVerdict {
        let (public_schools, non_public_schools, childcare) = future::join3(
            self.proximity_check(LayerId::PublicSchoolAreas, buffer),
            self.proximity_check(LayerId::NonPublicSchoolAreas, buffer),
            self.childcare_check(buffer),
        )
        .await;

        BuildingVerdict {
            public_schools,
            non_public_schools,
            childcare,
        }
    }

    /// Closest address point inside the buffer. Ties go to the earlier
    /// feature in dataset order.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn nearest_address(&self, location: Point<f64>, buffer: &Polygon<f64>) -> NearestAddress {
        let query = FeatureQuery::intersecting(buffer.clone());
        let features = match self.datasets.query(LayerId::Addresses, &query).await {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Address query failed: {e}");
                return NearestAddress::Unknown;
            }
        };

        let mut closest: Option<(String, f64)> = None;
        for feature in &features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let distance =
                dispensary_map_spatial::distance_to_geometry_feet(location, geometry);
            if closest.as_ref().is_none_or(|(_, best)| distance < *best) {
                let record =
                    dispensary_map_dataset_models::records::AddressPoint::from_feature(feature);
                closest = Some((record.full_address, distance));
            }
        }

        closest.map_or(NearestAddress::NotFound, |(address, distance)| {
            NearestAddress::Found {
                address,
                distance_feet: distance.round() as u32,
            }
        })
    }

    /// Zone district covering the bare point, checked against the
    /// exclusion list. No covering district is allowed with no zone
    /// recorded.
    async fn zoning_check(&self, location: Point<f64>) -> ZoningCheck {
        let query = FeatureQuery::intersecting(location);
        let features = match self.datasets.query(LayerId::Zoning, &query).await {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Zoning query failed: {e}");
                return ZoningCheck::Unknown;
            }
        };

        let zone = features
            .first()
            .and_then(ZoningDistrict::from_feature)
            .map(|record| record.zone_district);

        match zone {
            Some(zone) if EXCLUDED_ZONE_DISTRICTS.contains(&zone.as_str()) => {
                ZoningCheck::Excluded { zone }
            }
            zone => ZoningCheck::Allowed { zone },
        }
    }

    /// Whether the bare point falls in any of the excluded statistical
    /// neighborhoods. The exclusion list is pushed down as an attribute
    /// filter so only offending neighborhoods come back.
    async fn neighborhood_check(&self, location: Point<f64>) -> NeighborhoodCheck {
        let query = FeatureQuery::intersecting(location).with_filter(AttributeFilter::is_in(
            Neighborhood::FIELD_NAME,
            EXCLUDED_NEIGHBORHOODS.iter().copied(),
        ));

        match self
            .datasets
            .query(LayerId::StatisticalNeighborhoods, &query)
            .await
        {
            Ok(features) if features.is_empty() => NeighborhoodCheck::Clear,
            Ok(_) => NeighborhoodCheck::Excluded,
            Err(e) => {
                log::warn!("Neighborhood query failed: {e}");
                NeighborhoodCheck::Unknown
            }
        }
    }

    /// Count of one layer's features intersecting a buffer.
    async fn proximity_check(&self, layer: LayerId, buffer: &Polygon<f64>) -> ProximityCheck {
        let query = FeatureQuery::intersecting(buffer.clone());
        match self.datasets.query(layer, &query).await {
            Ok(features) => ProximityCheck::from_count(features.len()),
            Err(e) => {
                log::warn!("{layer} proximity query failed: {e}");
                ProximityCheck::Unknown
            }
        }
    }

    /// Childcare proximity merged from the facilities and parcels
    /// datasets, counts summed. Either query failing degrades the whole
    /// criterion to unknown.
    async fn childcare_check(&self, buffer: &Polygon<f64>) -> ProximityCheck {
        let query = FeatureQuery::intersecting(buffer.clone());
        let (facilities, parcels) = future::join(
            self.datasets.query(LayerId::ChildcareFacilities, &query),
            self.datasets.query(LayerId::ChildcareParcels, &query),
        )
        .await;

        match (facilities, parcels) {
            (Ok(facilities), Ok(parcels)) => {
                ProximityCheck::from_count(facilities.len() + parcels.len())
            }
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Childcare query failed: {e}");
                ProximityCheck::Unknown
            }
        }
    }
}
