//! # Fitted trajectories
//!
//! A [`Trajectory`] is an ordered, fitted sequence of [`Hit`]s running outward from the
//! interaction point, together with the fitted [`TrajectoryState`] at its innermost and
//! outermost measurements.
//!
//! Trajectories are produced by external collaborators (pattern recognition, re-fit,
//! track conversion) and owned by the [`TrackCandidate`](crate::tracks::TrackCandidate)
//! holding them until they are moved into the output container.

use nalgebra::Vector3;

use crate::constants::{Hits, N_TRACK_PARAMETERS};
use crate::tracks::hit::Hit;
use crate::tracks::{TrackKey, TrackParameters};

/// Fitted track state at one measurement surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryState {
    pub params: TrackParameters,
    /// Global position of the state (cm)
    pub position: Vector3<f64>,
}

impl TrajectoryState {
    pub fn new(params: TrackParameters, position: Vector3<f64>) -> Self {
        TrajectoryState { params, position }
    }
}

/// Ordered and fitted hit sequence of one particle.
///
/// Degrees of freedom follow the usual track-fit convention: the sum of the dimensions of all
/// valid hits minus the five helix parameters, never below zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    hits: Hits,
    chi2: f64,
    inner_state: TrajectoryState,
    outer_state: TrajectoryState,
    track_key: Option<TrackKey>,
}

impl Trajectory {
    /// Build a trajectory from already fitted hits.
    ///
    /// The hits are sorted outward (see [`sort_outward`]) so that callers never depend on
    /// the order in which a collaborator emitted them.
    ///
    /// Arguments
    /// -----------------
    /// * `hits`: the fitted hits, in any order
    /// * `chi2`: total chi-square of the fit
    /// * `inner_state`: fitted state at the innermost hit, also used as outer state until
    ///   [`with_outer_state`](Trajectory::with_outer_state) is called
    ///
    /// Return
    /// ----------
    /// * a new [`Trajectory`] with no associated track key
    pub fn new(hits: impl IntoIterator<Item = Hit>, chi2: f64, inner_state: TrajectoryState) -> Self {
        let mut hits: Hits = hits.into_iter().collect();
        sort_outward(&mut hits);
        Trajectory {
            hits,
            chi2,
            outer_state: inner_state.clone(),
            inner_state,
            track_key: None,
        }
    }

    pub fn with_outer_state(mut self, outer_state: TrajectoryState) -> Self {
        self.outer_state = outer_state;
        self
    }

    /// Associate the trajectory with the tracker track it produced.
    pub fn with_track_key(mut self, key: TrackKey) -> Self {
        self.track_key = Some(key);
        self
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    pub fn inner_state(&self) -> &TrajectoryState {
        &self.inner_state
    }

    pub fn outer_state(&self) -> &TrajectoryState {
        &self.outer_state
    }

    pub fn track_key(&self) -> Option<TrackKey> {
        self.track_key
    }

    /// Number of valid hits, the last count-based tie-breaker of candidate selection.
    pub fn n_valid_hits(&self) -> usize {
        self.hits.iter().filter(|hit| hit.valid).count()
    }

    /// Number of valid muon-system hits.
    pub fn n_muon_hits(&self) -> usize {
        self.hits
            .iter()
            .filter(|hit| hit.valid && hit.is_muon())
            .count()
    }

    /// Degrees of freedom of the fit: Σ dimension(valid hits) − 5, floored at zero.
    pub fn ndof(&self) -> u32 {
        let measured: u32 = self
            .hits
            .iter()
            .filter(|hit| hit.valid)
            .map(|hit| u32::from(hit.dimension))
            .sum();
        measured.saturating_sub(N_TRACK_PARAMETERS)
    }

    /// `true` when the trajectory holds at least one valid hit.
    pub fn is_valid(&self) -> bool {
        self.hits.iter().any(|hit| hit.valid)
    }
}

/// Sort hits outward from the interaction point (radius, then layer).
///
/// The sort is stable: hits at identical radius and layer keep their relative order.
pub fn sort_outward(hits: &mut [Hit]) {
    hits.sort_by(|a, b| a.outward_cmp(b));
}
