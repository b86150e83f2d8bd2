//! # Tracks and track candidates
//!
//! This module defines the reconstructed-track summary ([`Track`]), its helix parameters at
//! the reference surface ([`TrackParameters`]) and the [`TrackCandidate`] record that pairs
//! a track with an optional detailed [`Trajectory`].
//!
//! ## Ownership
//!
//! * Tracks are shared through [`Arc<Track>`]: several candidates (and the output container)
//!   may refer to the same reconstructed track.
//! * Trajectories are owned by exactly one candidate at a time and are moved, never shared.
//!
//! ## See also
//! ------------
//! * [`hit::Hit`] – single detector measurement.
//! * [`trajectory::Trajectory`] – ordered fitted hit sequence.
pub mod hit;
pub mod trajectory;

use std::sync::Arc;

use nalgebra::Vector3;

use crate::constants::{Eta, GeV, Radian};
use trajectory::Trajectory;

/// Index of a track inside the event's tracker-track collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey(pub usize);

/// Helix parameters of a track at its reference surface, with their uncertainties.
///
/// # Fields
///
/// * `eta` - pseudorapidity of the momentum direction
/// * `phi` - azimuth of the momentum direction (radians)
/// * `curvature` - signed curvature q/pT in (GeV/c)⁻¹
/// * `sigma_eta`, `sigma_phi`, `sigma_curvature` - one-sigma uncertainties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParameters {
    pub eta: Eta,
    pub phi: Radian,
    pub curvature: f64,
    pub sigma_eta: Eta,
    pub sigma_phi: Radian,
    pub sigma_curvature: f64,
}

impl TrackParameters {
    /// Parameters without uncertainties.
    pub fn new(eta: Eta, phi: Radian, curvature: f64) -> Self {
        TrackParameters {
            eta,
            phi,
            curvature,
            sigma_eta: 0.0,
            sigma_phi: 0.0,
            sigma_curvature: 0.0,
        }
    }

    pub fn with_errors(mut self, sigma_eta: Eta, sigma_phi: Radian, sigma_curvature: f64) -> Self {
        self.sigma_eta = sigma_eta;
        self.sigma_phi = sigma_phi;
        self.sigma_curvature = sigma_curvature;
        self
    }

    /// Transverse momentum; a straight track (zero curvature) has infinite momentum.
    pub fn pt(&self) -> GeV {
        if self.curvature == 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.curvature.abs()
        }
    }

    /// Electric charge sign: +1, -1, or 0 for a straight track.
    pub fn charge(&self) -> i8 {
        if self.curvature > 0.0 {
            1
        } else if self.curvature < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Unit vector of the momentum direction.
    pub fn direction(&self) -> Vector3<f64> {
        let theta = 2.0 * (-self.eta).exp().atan();
        Vector3::new(
            theta.sin() * self.phi.cos(),
            theta.sin() * self.phi.sin(),
            theta.cos(),
        )
    }
}

/// Summary of a reconstructed track.
///
/// `key` is `None` for transient tracks made from seeded trajectories, which do not belong
/// to any event collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub key: Option<TrackKey>,
    pub params: TrackParameters,
    /// Point of closest approach to the beam line (cm)
    pub reference_point: Vector3<f64>,
    pub chi2: f64,
    pub ndof: u32,
}

impl Track {
    /// A track stored at `key` in the event collection.
    pub fn new(key: TrackKey, params: TrackParameters) -> Self {
        Track {
            key: Some(key),
            params,
            reference_point: Vector3::zeros(),
            chi2: 0.0,
            ndof: 0,
        }
    }

    /// A track that does not belong to any event collection.
    pub fn transient(params: TrackParameters) -> Self {
        Track {
            key: None,
            params,
            reference_point: Vector3::zeros(),
            chi2: 0.0,
            ndof: 0,
        }
    }

    /// Summarize a trajectory as a transient track, using its innermost fitted state.
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let state = trajectory.inner_state();
        Track {
            key: trajectory.track_key(),
            params: state.params,
            reference_point: state.position,
            chi2: trajectory.chi2(),
            ndof: trajectory.ndof(),
        }
    }

    pub fn with_reference_point(mut self, reference_point: Vector3<f64>) -> Self {
        self.reference_point = reference_point;
        self
    }

    pub fn with_fit(mut self, chi2: f64, ndof: u32) -> Self {
        self.chi2 = chi2;
        self.ndof = ndof;
        self
    }

    pub fn pt(&self) -> GeV {
        self.params.pt()
    }
}

/// A track paired with its optional detailed trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCandidate {
    pub track: Arc<Track>,
    pub trajectory: Option<Trajectory>,
}

impl TrackCandidate {
    /// A track-only candidate, to be resolved later.
    pub fn new(track: Arc<Track>) -> Self {
        TrackCandidate {
            track,
            trajectory: None,
        }
    }

    pub fn with_trajectory(track: Arc<Track>, trajectory: Trajectory) -> Self {
        TrackCandidate {
            track,
            trajectory: Some(trajectory),
        }
    }

    /// A candidate built from a seeded trajectory, with a transient track summary.
    pub fn from_trajectory(trajectory: Trajectory) -> Self {
        TrackCandidate {
            track: Arc::new(Track::from_trajectory(&trajectory)),
            trajectory: Some(trajectory),
        }
    }

    pub fn has_trajectory(&self) -> bool {
        self.trajectory.is_some()
    }
}

#[cfg(test)]
mod tracks_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pt_and_charge() {
        let params = TrackParameters::new(0.5, 0.1, -0.04);
        assert_relative_eq!(params.pt(), 25.0, epsilon = 1e-12);
        assert_eq!(params.charge(), -1);

        let straight = TrackParameters::new(0.0, 0.0, 0.0);
        assert!(straight.pt().is_infinite());
        assert_eq!(straight.charge(), 0);
    }

    #[test]
    fn test_direction_is_unit_and_central_at_zero_eta() {
        let dir = TrackParameters::new(0.0, std::f64::consts::FRAC_PI_2, 0.1).direction();
        assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(dir.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(dir.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_track_fit_summary() {
        let track = Track::new(TrackKey(5), TrackParameters::new(0.3, -1.0, 0.02));
        assert_eq!((track.chi2, track.ndof), (0.0, 0));

        let fitted = track.with_fit(12.5, 7);
        assert_eq!(fitted.chi2, 12.5);
        assert_eq!(fitted.ndof, 7);
        assert_eq!(fitted.key, Some(TrackKey(5)));
    }

    #[test]
    fn test_candidate_constructors() {
        let track = Arc::new(Track::new(TrackKey(3), TrackParameters::new(1.0, 2.0, 0.1)));
        let cand = TrackCandidate::new(Arc::clone(&track));
        assert!(!cand.has_trajectory());
        assert_eq!(cand.track.key, Some(TrackKey(3)));
    }
}
