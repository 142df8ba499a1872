//! Pin placement against the building footprint index.
//!
//! Placement is click-driven and heavily rejected: the board refuses
//! clicks while placement mode is off, past the pin cap, and anywhere no
//! building footprint sits under the point. Rejection is a notice, never
//! an error state.

use std::sync::Arc;

use dispensary_map_spatial::buildings::BuildingIndex;
use dispensary_map_suitability_models::{Pin, PinId};
use geo::Point;
use tokio::sync::watch;

/// Maximum number of live pins.
pub const MAX_PINS: usize = 100;

/// Why a placement click did not create a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementRejected {
    /// Placement mode is not active.
    #[error("Pin placement mode is not active")]
    ModeInactive,

    /// The board already holds [`MAX_PINS`] pins.
    #[error("Maximum of {MAX_PINS} pins already placed")]
    CapReached,

    /// No building footprint under the clicked point.
    #[error("No building footprint under the clicked point")]
    NoBuilding,
}

/// The mutable set of placed pins.
///
/// Only the board mutates the pin set; the rule engine works from
/// [`Self::snapshot`]s. Live-count changes are published on a watch
/// channel for the counter/action-panel collaborators.
pub struct PinBoard {
    buildings: Arc<BuildingIndex>,
    pins: Vec<Pin>,
    next_id: u64,
    mode_active: bool,
    count_tx: watch::Sender<usize>,
}

impl PinBoard {
    /// Creates an empty board over a building index. Placement mode
    /// starts inactive.
    #[must_use]
    pub fn new(buildings: Arc<BuildingIndex>) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            buildings,
            pins: Vec::new(),
            next_id: 0,
            mode_active: false,
            count_tx,
        }
    }

    /// Turns placement mode on or off.
    pub fn set_mode_active(&mut self, active: bool) {
        self.mode_active = active;
    }

    /// Whether placement clicks are currently accepted.
    #[must_use]
    pub const fn mode_active(&self) -> bool {
        self.mode_active
    }

    /// Attempts to place a pin at the clicked point.
    ///
    /// On success the pin gets the next sequence id and holds a shared
    /// reference to the footprint it landed on.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementRejected`] when placement mode is off, the pin
    /// cap is reached, or no building footprint is under the point. None
    /// of these change board state.
    pub fn try_place(&mut self, click: Point<f64>) -> Result<Pin, PlacementRejected> {
        if !self.mode_active {
            return Err(PlacementRejected::ModeInactive);
        }
        if self.pins.len() >= MAX_PINS {
            log::warn!("Pin cap of {MAX_PINS} reached, rejecting placement");
            return Err(PlacementRejected::CapReached);
        }
        let Some(building) = self.buildings.hit_test(click) else {
            log::debug!(
                "No building footprint at ({}, {}), pin not placed",
                click.x(),
                click.y()
            );
            return Err(PlacementRejected::NoBuilding);
        };

        self.next_id += 1;
        let pin = Pin {
            id: PinId(self.next_id),
            location: click,
            building,
        };
        log::info!("Placed pin {} on building {}", pin.id, pin.building.object_id);
        self.pins.push(pin.clone());
        self.count_tx.send_replace(self.pins.len());

        Ok(pin)
    }

    /// Removes every pin. Always succeeds; ids are not reused by later
    /// placements. There is intentionally no single-pin removal.
    pub fn clear_all(&mut self) {
        self.pins.clear();
        self.count_tx.send_replace(0);
        log::info!("Cleared all pins");
    }

    /// The live pins, in placement order.
    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// A read-only copy of the pin set for an analysis run. Pins added
    /// after the snapshot do not join the run.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Pin> {
        self.pins.clone()
    }

    /// Number of live pins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the board holds no pins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Whether a pin with this id is still on the board.
    #[must_use]
    pub fn contains(&self, id: PinId) -> bool {
        self.pins.iter().any(|pin| pin.id == id)
    }

    /// Subscribes to live-count updates (the "pin added" event surface).
    #[must_use]
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }
}
