#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The suitability analysis engine.
//!
//! Evaluates candidate dispensary sites against a fixed rule set: pins are
//! constrained to building footprints ([`pins`]), each pin gets a point
//! buffer and a footprint buffer, the rule engine fans out spatial queries
//! per criterion and merges deterministic verdicts ([`engine`]), and the
//! aggregator caches the report, marker states, and run buffers for export
//! ([`report`]). Standalone facility buffers live in [`buffers`], and
//! [`session`] wires the cross-component invariants together.

pub mod buffers;
pub mod engine;
pub mod pins;
pub mod report;
pub mod session;

use dispensary_map_dataset::DatasetError;

/// Errors surfaced by the suitability components.
#[derive(Debug, thiserror::Error)]
pub enum SuitabilityError {
    /// A buffer distance was zero or negative.
    #[error("Buffer distance must be a positive number of feet, got {0}")]
    InvalidBufferDistance(i64),

    /// The run was superseded by a newer run or a clear-all and its
    /// results were discarded. Never shown to the user.
    #[error("Analysis run superseded")]
    Aborted,

    /// A dataset-level failure that aborts a whole action (not a single
    /// criterion), e.g. a required layer being hidden.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// A validated buffer distance in feet.
///
/// Construction is the caller-side validation the buffer primitive itself
/// does not do: zero and negative distances are rejected before any query
/// is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDistance(u32);

impl BufferDistance {
    /// Validates a raw distance.
    ///
    /// # Errors
    ///
    /// Returns [`SuitabilityError::InvalidBufferDistance`] when the
    /// distance is not a positive number of feet.
    pub fn new(feet: i64) -> Result<Self, SuitabilityError> {
        u32::try_from(feet)
            .ok()
            .filter(|&feet| feet > 0)
            .map(Self)
            .ok_or(SuitabilityError::InvalidBufferDistance(feet))
    }

    /// The distance in whole feet.
    #[must_use]
    pub const fn feet(self) -> u32 {
        self.0
    }

    /// The distance as the float the buffer primitive takes.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl std::fmt::Display for BufferDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ft", self.0)
    }
}
