//! The session facade wiring the cross-component invariants together.
//!
//! A session owns the pin board, the analyzer, and the report store, and
//! enforces the rules that span them: placing a pin invalidates the
//! cached report, a new run invalidates it before anything else happens,
//! clearing pins supersedes in-flight runs, and a superseded run's output
//! never reaches the store.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use dispensary_map_dataset::Datasets;
use dispensary_map_spatial::buildings::BuildingIndex;
use dispensary_map_suitability_models::{MarkerState, Pin, PinId, Report};
use geo::Point;

use crate::SuitabilityError;
use crate::engine::Analyzer;
use crate::pins::{PinBoard, PlacementRejected};
use crate::report::{ReportStore, render_report_as_text};

/// One user's working state: pins, analysis runs, and the cached report.
pub struct Session {
    pins: PinBoard,
    analyzer: Analyzer,
    reports: ReportStore,
}

impl Session {
    /// Creates a session over the dataset context and building index.
    #[must_use]
    pub fn new(datasets: Arc<Datasets>, buildings: Arc<BuildingIndex>) -> Self {
        Self {
            pins: PinBoard::new(buildings),
            analyzer: Analyzer::with_run_counter(datasets, Arc::new(AtomicU64::new(0))),
            reports: ReportStore::new(),
        }
    }

    /// The pin board, for reads and mode toggling.
    #[must_use]
    pub const fn pins(&self) -> &PinBoard {
        &self.pins
    }

    /// Turns pin placement mode on or off.
    pub fn set_placement_mode(&mut self, active: bool) {
        self.pins.set_mode_active(active);
    }

    /// Places a pin. A successful placement changes the pin set, so any
    /// cached report is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementRejected`] as [`PinBoard::try_place`] does.
    pub fn place_pin(&mut self, click: Point<f64>) -> Result<Pin, PlacementRejected> {
        let pin = self.pins.try_place(click)?;
        self.reports.invalidate();
        Ok(pin)
    }

    /// Clears every pin, supersedes any in-flight run, and drops the
    /// cached report and buffer visuals. Irreversible, always succeeds.
    pub fn clear_all(&mut self) {
        self.pins.clear_all();
        self.analyzer.supersede();
        self.reports.invalidate();
    }

    /// Runs the analysis over a snapshot of the current pin set and, if
    /// the run was not superseded meanwhile, aggregates the report.
    ///
    /// Returns `None` when the run was superseded (its output is
    /// discarded silently) and when there are no pins to analyze.
    ///
    /// # Errors
    ///
    /// Returns [`SuitabilityError`] for failures other than supersession;
    /// per-criterion query failures are folded into the verdicts and do
    /// not error here.
    pub async fn analyze(&mut self) -> Result<Option<&Report>, SuitabilityError> {
        if self.pins.is_empty() {
            log::debug!("No pins to analyze");
            return Ok(None);
        }
        self.reports.invalidate();

        let snapshot = self.pins.snapshot();
        match self.analyzer.analyze(&snapshot).await {
            Ok(outcome) => {
                let live: Vec<PinId> = self.pins.pins().iter().map(|pin| pin.id).collect();
                Ok(Some(self.reports.aggregate(outcome, &live)))
            }
            Err(SuitabilityError::Aborted) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The cached report from the last completed run, if any.
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        self.reports.report()
    }

    /// The marker state of a pin after the last completed run.
    #[must_use]
    pub fn marker_state(&self, pin: PinId) -> Option<MarkerState> {
        self.reports.marker_state(pin)
    }

    /// The report store, for buffer visuals.
    #[must_use]
    pub const fn reports(&self) -> &ReportStore {
        &self.reports
    }

    /// Renders the cached report as exportable text, if a run has
    /// completed.
    #[must_use]
    pub fn export_text(&self) -> Option<String> {
        self.reports.report().map(render_report_as_text)
    }
}
