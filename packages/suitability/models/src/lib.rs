#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data model of the suitability analysis: pins, per-criterion verdicts,
//! per-pin results, and the aggregated report.
//!
//! Every criterion is tri-state: a definite outcome, a definite all-clear,
//! or `Unknown` when the backing dataset query failed. Unknowns never flip
//! the overall verdict; they are carried so the report can say a criterion
//! could not be evaluated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dispensary_map_spatial::buildings::Building;
use geo::Point;
use serde::{Deserialize, Serialize};

/// Sequence number of a placed pin. Assigned at creation, monotonically
/// increasing, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PinId(pub u64);

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-placed candidate site, anchored to a building footprint.
///
/// The pin holds a shared read-only reference to the footprint it was
/// placed on; the footprint itself is owned by the building index.
#[derive(Debug, Clone)]
pub struct Pin {
    /// Sequence number, unique across the board's lifetime.
    pub id: PinId,
    /// Marker location in EPSG:4326 lon/lat.
    pub location: Point<f64>,
    /// Footprint the marker was placed on.
    pub building: Arc<Building>,
}

/// Outcome of the nearest-address lookup within the point buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum NearestAddress {
    /// The closest address inside the buffer, with its distance from the
    /// marker rounded to whole feet.
    Found {
        /// Full street address.
        address: String,
        /// Distance from the marker, in feet.
        distance_feet: u32,
    },
    /// No address point falls inside the buffer.
    NotFound,
    /// The address query failed; no verdict.
    Unknown,
}

/// Outcome of the zoning check at the bare marker point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ZoningCheck {
    /// The marker sits in a zone district on the exclusion list.
    Excluded {
        /// The offending zone code.
        zone: String,
    },
    /// The marker's zone is not excluded. `zone` is `None` when no zoning
    /// district covers the point at all.
    Allowed {
        /// Raw zone code, when one was found.
        zone: Option<String>,
    },
    /// The zoning query failed; no verdict.
    Unknown,
}

impl ZoningCheck {
    /// Whether the check flags an exclusion.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded { .. })
    }
}

/// Outcome of the statistical-neighborhood check at the bare marker point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodCheck {
    /// The marker sits in an excluded neighborhood.
    Excluded,
    /// The marker is clear of every excluded neighborhood.
    Clear,
    /// The neighborhood query failed; no verdict.
    Unknown,
}

impl NeighborhoodCheck {
    /// Whether the check flags an exclusion.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded)
    }
}

/// Outcome of a proximity check against one dataset (or, for childcare,
/// two merged datasets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProximityCheck {
    /// One or more features intersect the buffer.
    Near {
        /// Number of intersecting features.
        count: usize,
    },
    /// Nothing intersects the buffer.
    Clear,
    /// The proximity query failed; no verdict.
    Unknown,
}

impl ProximityCheck {
    /// Builds the verdict from a feature count; zero is [`Self::Clear`],
    /// never an error.
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        if count == 0 {
            Self::Clear
        } else {
            Self::Near { count }
        }
    }

    /// Whether anything was found nearby.
    #[must_use]
    pub const fn is_near(&self) -> bool {
        matches!(self, Self::Near { .. })
    }

    /// The feature count, when the check produced a verdict.
    #[must_use]
    pub const fn count(&self) -> Option<usize> {
        match self {
            Self::Near { count } => Some(*count),
            Self::Clear => Some(0),
            Self::Unknown => None,
        }
    }
}

/// Verdicts evaluated around the marker point and its 1000 ft buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointVerdict {
    /// Nearest address within the point buffer.
    pub nearest_address: NearestAddress,
    /// Zoning exclusion at the bare point.
    pub zoning: ZoningCheck,
    /// Neighborhood exclusion at the bare point.
    pub neighborhood: NeighborhoodCheck,
    /// Retail marijuana stores within the point buffer (informational).
    pub marijuana_stores: ProximityCheck,
    /// Drug/alcohol treatment facilities within the point buffer
    /// (informational).
    pub drug_treatment: ProximityCheck,
}

impl PointVerdict {
    /// Whether any point-side criterion could not be evaluated.
    #[must_use]
    pub const fn has_unknowns(&self) -> bool {
        matches!(self.nearest_address, NearestAddress::Unknown)
            || matches!(self.zoning, ZoningCheck::Unknown)
            || matches!(self.neighborhood, NeighborhoodCheck::Unknown)
            || matches!(self.marijuana_stores, ProximityCheck::Unknown)
            || matches!(self.drug_treatment, ProximityCheck::Unknown)
    }
}

/// Verdicts evaluated around the 1000 ft buffer of the building footprint
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingVerdict {
    /// Public school parcels intersecting the footprint buffer.
    pub public_schools: ProximityCheck,
    /// Non-public school parcels intersecting the footprint buffer.
    pub non_public_schools: ProximityCheck,
    /// Childcare facilities and parcels intersecting the footprint buffer,
    /// counts summed across both source datasets.
    pub childcare: ProximityCheck,
}

impl BuildingVerdict {
    /// Whether any building-side criterion could not be evaluated.
    #[must_use]
    pub const fn has_unknowns(&self) -> bool {
        matches!(self.public_schools, ProximityCheck::Unknown)
            || matches!(self.non_public_schools, ProximityCheck::Unknown)
            || matches!(self.childcare, ProximityCheck::Unknown)
    }
}

/// The complete analysis outcome for one pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analyzed pin.
    pub pin_id: PinId,
    /// Point-side verdicts.
    pub point: PointVerdict,
    /// Building-side verdicts.
    pub building: BuildingVerdict,
}

impl AnalysisResult {
    /// Whether the site fails any exclusion criterion.
    ///
    /// Marijuana-store and drug-treatment proximity are informational
    /// warnings and never contribute here.
    #[must_use]
    pub const fn overall_issue(&self) -> bool {
        self.point.zoning.is_excluded()
            || self.point.neighborhood.is_excluded()
            || self.building.public_schools.is_near()
            || self.building.non_public_schools.is_near()
            || self.building.childcare.is_near()
    }

    /// Whether any criterion could not be evaluated.
    #[must_use]
    pub const fn has_unknowns(&self) -> bool {
        self.point.has_unknowns() || self.building.has_unknowns()
    }
}

/// Two-valued visual state of a pin marker after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    /// At least one exclusion criterion failed.
    Issue,
    /// All exclusion criteria passed.
    Clear,
}

impl MarkerState {
    /// Derives the marker state from a result.
    #[must_use]
    pub const fn for_result(result: &AnalysisResult) -> Self {
        if result.overall_issue() {
            Self::Issue
        } else {
            Self::Clear
        }
    }
}

/// The aggregated outcome of one analysis run, in pin input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Per-pin results, preserving the order pins were analyzed in.
    pub results: Vec<AnalysisResult>,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
}

impl Report {
    /// Whether any pin has a criterion that could not be evaluated.
    #[must_use]
    pub fn has_unknowns(&self) -> bool {
        self.results.iter().any(AnalysisResult::has_unknowns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_result(pin_id: u64) -> AnalysisResult {
        AnalysisResult {
            pin_id: PinId(pin_id),
            point: PointVerdict {
                nearest_address: NearestAddress::NotFound,
                zoning: ZoningCheck::Allowed { zone: None },
                neighborhood: NeighborhoodCheck::Clear,
                marijuana_stores: ProximityCheck::Clear,
                drug_treatment: ProximityCheck::Clear,
            },
            building: BuildingVerdict {
                public_schools: ProximityCheck::Clear,
                non_public_schools: ProximityCheck::Clear,
                childcare: ProximityCheck::Clear,
            },
        }
    }

    #[test]
    fn clear_result_has_no_issue() {
        let result = clear_result(1);
        assert!(!result.overall_issue());
        assert!(!result.has_unknowns());
        assert_eq!(MarkerState::for_result(&result), MarkerState::Clear);
    }

    #[test]
    fn marijuana_proximity_is_informational_only() {
        let mut result = clear_result(1);
        result.point.marijuana_stores = ProximityCheck::Near { count: 3 };
        result.point.drug_treatment = ProximityCheck::Near { count: 1 };

        assert!(!result.overall_issue());
        assert_eq!(MarkerState::for_result(&result), MarkerState::Clear);
    }

    #[test]
    fn zoning_exclusion_flags_the_site() {
        let mut result = clear_result(1);
        result.point.zoning = ZoningCheck::Excluded {
            zone: "U-SU-A".to_string(),
        };

        assert!(result.overall_issue());
        assert_eq!(MarkerState::for_result(&result), MarkerState::Issue);
    }

    #[test]
    fn school_proximity_flags_the_site() {
        let mut result = clear_result(1);
        result.building.public_schools = ProximityCheck::from_count(2);

        assert!(result.overall_issue());
    }

    #[test]
    fn proximity_from_zero_count_is_clear() {
        assert_eq!(ProximityCheck::from_count(0), ProximityCheck::Clear);
        assert_eq!(ProximityCheck::from_count(0).count(), Some(0));
        assert_eq!(
            ProximityCheck::from_count(2),
            ProximityCheck::Near { count: 2 }
        );
        assert_eq!(ProximityCheck::Unknown.count(), None);
    }

    #[test]
    fn unknowns_do_not_flip_the_verdict_but_are_reported() {
        let mut result = clear_result(1);
        result.point.drug_treatment = ProximityCheck::Unknown;

        assert!(!result.overall_issue());
        assert!(result.has_unknowns());

        let report = Report {
            results: vec![clear_result(1), result],
            completed_at: DateTime::<Utc>::MIN_UTC,
        };
        assert!(report.has_unknowns());
    }
}
