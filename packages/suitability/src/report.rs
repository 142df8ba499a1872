//! Result aggregation, marker state, and the text export.
//!
//! The store caches the last completed run: the report itself, the
//! two-valued marker state per pin, and the run's buffer polygons for
//! visualization. Everything is invalidated together when the pin set
//! changes or a new run starts. The interactive rendering and the text
//! export both read the cached [`Report`], so the two paths cannot
//! diverge.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Utc;
use dispensary_map_suitability_models::{
    AnalysisResult, MarkerState, NearestAddress, NeighborhoodCheck, PinId, ProximityCheck, Report,
    ZoningCheck,
};

use crate::engine::{AnalysisOutcome, PinBuffers};

/// Process-wide cache of the last analysis run.
#[derive(Default)]
pub struct ReportStore {
    report: Option<Report>,
    markers: BTreeMap<PinId, MarkerState>,
    buffers: Vec<PinBuffers>,
}

impl ReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates a completed run: records marker states for the pins
    /// that still exist, keeps the run buffers for visualization, and
    /// caches the report for export.
    ///
    /// A result for a pin no longer in `live_pins` gets no marker (the
    /// pin is gone; a no-op, not an error), but stays in the report.
    pub fn aggregate(&mut self, outcome: AnalysisOutcome, live_pins: &[PinId]) -> &Report {
        self.markers = outcome
            .results
            .iter()
            .filter(|result| live_pins.contains(&result.pin_id))
            .map(|result| (result.pin_id, MarkerState::for_result(result)))
            .collect();
        self.buffers = outcome.buffers;

        let report = Report {
            results: outcome.results,
            completed_at: Utc::now(),
        };
        log::info!(
            "Aggregated report over {} pins ({} with issues)",
            report.results.len(),
            report
                .results
                .iter()
                .filter(|result| result.overall_issue())
                .count()
        );
        self.report.insert(report)
    }

    /// The cached report, if a run has completed since the last
    /// invalidation.
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// The marker state recorded for a pin, if it was analyzed and still
    /// existed at aggregation time.
    #[must_use]
    pub fn marker_state(&self, pin: PinId) -> Option<MarkerState> {
        self.markers.get(&pin).copied()
    }

    /// The buffer polygons of the cached run.
    #[must_use]
    pub fn run_buffers(&self) -> &[PinBuffers] {
        &self.buffers
    }

    /// Drops the cached report, markers, and buffers.
    pub fn invalidate(&mut self) {
        self.report = None;
        self.markers.clear();
        self.buffers.clear();
    }
}

/// Renders the report as the flat text form used for clipboard export.
///
/// Pure and deterministic for a given report; field values and rounding
/// are exactly those of the cached report.
#[must_use]
pub fn render_report_as_text(report: &Report) -> String {
    let mut out = String::new();

    out.push_str("DENVER DISPENSARY SUITABILITY ANALYSIS RESULTS\n");
    out.push_str(&"=".repeat(51));
    out.push_str("\n\n");

    if report.has_unknowns() {
        out.push_str("NOTE: some criteria could not be evaluated this run.\n\n");
    }

    for result in &report.results {
        render_pin(&mut out, result);
    }

    let _ = writeln!(
        out,
        "\nAnalysis completed on {}",
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push_str("Generated by Denver Dispensary Map Tool\n");

    out
}

fn render_pin(out: &mut String, result: &AnalysisResult) {
    let verdict = if result.overall_issue() {
        "HAS ISSUES \u{274c}"
    } else {
        "SUITABLE \u{2705}"
    };
    let _ = writeln!(out, "PIN {} ANALYSIS - {verdict}", result.pin_id);
    out.push_str(&"-".repeat(40));
    out.push('\n');

    match &result.point.nearest_address {
        NearestAddress::Found {
            address,
            distance_feet,
        } => {
            let _ = writeln!(out, "Address: {address} ({distance_feet}ft away)");
        }
        NearestAddress::NotFound => {
            out.push_str("Address: No address found within 1000ft\n");
        }
        NearestAddress::Unknown => {
            out.push_str("Address: \u{2753} Could not be evaluated\n");
        }
    }
    out.push('\n');

    out.push_str("PIN LOCATION ANALYSIS (1000ft radius):\n");
    let zoning = match &result.point.zoning {
        ZoningCheck::Excluded { zone } => format!("\u{274c} In No-Go Zone ({zone})"),
        ZoningCheck::Allowed { zone: Some(zone) } => {
            format!("\u{2705} Not in No-Go Zone ({zone})")
        }
        ZoningCheck::Allowed { zone: None } => {
            "\u{2705} Not in No-Go Zone (no zoning found)".to_string()
        }
        ZoningCheck::Unknown => "\u{2753} Could not be evaluated".to_string(),
    };
    let _ = writeln!(out, "  \u{2022} Zoning: {zoning}");

    let neighborhood = match result.point.neighborhood {
        NeighborhoodCheck::Excluded => "\u{274c} In No-Go Neighborhood",
        NeighborhoodCheck::Clear => "\u{2705} Not in No-Go Neighborhood",
        NeighborhoodCheck::Unknown => "\u{2753} Could not be evaluated",
    };
    let _ = writeln!(out, "  \u{2022} Neighborhood: {neighborhood}");

    let _ = writeln!(
        out,
        "  \u{2022} Marijuana Stores: {}",
        proximity_line(
            result.point.marijuana_stores,
            "\u{26a0}\u{fe0f}",
            "store(s)",
            "No stores nearby"
        )
    );
    let _ = writeln!(
        out,
        "  \u{2022} Drug Treatment: {}",
        proximity_line(
            result.point.drug_treatment,
            "\u{26a0}\u{fe0f}",
            "facility(ies)",
            "No facilities nearby"
        )
    );

    out.push_str("\nBUILDING BUFFER ANALYSIS (1000ft from edges):\n");
    let _ = writeln!(
        out,
        "  \u{2022} Public Schools: {}",
        proximity_line(
            result.building.public_schools,
            "\u{274c}",
            "school(s)",
            "No schools nearby"
        )
    );
    let _ = writeln!(
        out,
        "  \u{2022} Non-Public Schools: {}",
        proximity_line(
            result.building.non_public_schools,
            "\u{274c}",
            "school(s)",
            "No schools nearby"
        )
    );
    let _ = writeln!(
        out,
        "  \u{2022} Childcare: {}",
        proximity_line(
            result.building.childcare,
            "\u{274c}",
            "facility(ies)",
            "No facilities nearby"
        )
    );

    out.push('\n');
}

/// One proximity criterion line. The glyph distinguishes hard exclusions
/// from informational warnings.
fn proximity_line(check: ProximityCheck, glyph: &str, noun: &str, clear_text: &str) -> String {
    match check {
        ProximityCheck::Near { count } => format!("{glyph} Near {count} {noun}"),
        ProximityCheck::Clear => format!("\u{2705} {clear_text}"),
        ProximityCheck::Unknown => "\u{2753} Could not be evaluated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispensary_map_suitability_models::{BuildingVerdict, PointVerdict};

    fn result(pin_id: u64, excluded_zone: Option<&str>, school_count: usize) -> AnalysisResult {
        AnalysisResult {
            pin_id: PinId(pin_id),
            point: PointVerdict {
                nearest_address: NearestAddress::Found {
                    address: "1600 GLENARM PL".to_string(),
                    distance_feet: 42,
                },
                zoning: excluded_zone.map_or(
                    ZoningCheck::Allowed {
                        zone: Some("C-MX-5".to_string()),
                    },
                    |zone| ZoningCheck::Excluded {
                        zone: zone.to_string(),
                    },
                ),
                neighborhood: NeighborhoodCheck::Clear,
                marijuana_stores: ProximityCheck::Near { count: 1 },
                drug_treatment: ProximityCheck::Clear,
            },
            building: BuildingVerdict {
                public_schools: ProximityCheck::from_count(school_count),
                non_public_schools: ProximityCheck::Clear,
                childcare: ProximityCheck::Clear,
            },
        }
    }

    fn outcome(results: Vec<AnalysisResult>) -> AnalysisOutcome {
        AnalysisOutcome {
            results,
            buffers: Vec::new(),
        }
    }

    #[test]
    fn aggregate_records_marker_states_by_pin_id() {
        let mut store = ReportStore::new();
        store.aggregate(
            outcome(vec![result(1, Some("U-SU-A"), 0), result(2, None, 0)]),
            &[PinId(1), PinId(2)],
        );

        assert_eq!(store.marker_state(PinId(1)), Some(MarkerState::Issue));
        assert_eq!(store.marker_state(PinId(2)), Some(MarkerState::Clear));
        assert_eq!(store.report().unwrap().results.len(), 2);
    }

    #[test]
    fn vanished_pins_get_no_marker_but_stay_in_the_report() {
        let mut store = ReportStore::new();
        store.aggregate(outcome(vec![result(7, None, 2)]), &[]);

        assert_eq!(store.marker_state(PinId(7)), None);
        assert_eq!(store.report().unwrap().results.len(), 1);
    }

    #[test]
    fn invalidate_drops_everything() {
        let mut store = ReportStore::new();
        store.aggregate(outcome(vec![result(1, None, 0)]), &[PinId(1)]);
        store.invalidate();

        assert!(store.report().is_none());
        assert_eq!(store.marker_state(PinId(1)), None);
        assert!(store.run_buffers().is_empty());
    }

    #[test]
    fn text_export_carries_every_flag_and_count() {
        let report = Report {
            results: vec![result(1, None, 2)],
            completed_at: chrono::DateTime::<Utc>::MIN_UTC,
        };
        let text = render_report_as_text(&report);

        assert!(text.contains("PIN 1 ANALYSIS - HAS ISSUES"));
        assert!(text.contains("Address: 1600 GLENARM PL (42ft away)"));
        assert!(text.contains("Not in No-Go Zone (C-MX-5)"));
        assert!(text.contains("Not in No-Go Neighborhood"));
        assert!(text.contains("Near 1 store(s)"));
        assert!(text.contains("Public Schools: \u{274c} Near 2 school(s)"));
        assert!(text.contains("Generated by Denver Dispensary Map Tool"));
        assert!(!text.contains("could not be evaluated"));
    }

    #[test]
    fn text_export_flags_unknown_criteria() {
        let mut failed = result(1, None, 0);
        failed.point.drug_treatment = ProximityCheck::Unknown;
        let report = Report {
            results: vec![failed],
            completed_at: chrono::DateTime::<Utc>::MIN_UTC,
        };
        let text = render_report_as_text(&report);

        assert!(text.contains("NOTE: some criteria could not be evaluated"));
        assert!(text.contains("Drug Treatment: \u{2753} Could not be evaluated"));
    }

    #[test]
    fn suitable_pin_renders_suitable_header() {
        let report = Report {
            results: vec![result(3, None, 0)],
            completed_at: chrono::DateTime::<Utc>::MIN_UTC,
        };
        let text = render_report_as_text(&report);
        assert!(text.contains("PIN 3 ANALYSIS - SUITABLE"));
    }
}
