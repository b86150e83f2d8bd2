//! # Region of interest
//!
//! The region of interest is a rectangular window in (η, φ) around the outer (muon) track
//! direction, anchored at the nominal interaction point. It bounds the combinatorics of the
//! global fit: only tracker tracks pointing inside the window are paired with the muon.
//!
//! ## Half-widths
//!
//! ```text
//! half_eta = max(min_half_width_eta, sigma_scale × σ_η)
//! half_phi = max(min_half_width_phi, sigma_scale × σ_φ)
//! ```
//!
//! The floors keep the window from collapsing for very well measured tracks.
//!
//! ## See also
//! ------------
//! * [`pruner::choose_regional_tracker_tracks`] – hard geometric cut using a [`Region`].
//! * [`GlobalMuonParams`](crate::params::GlobalMuonParams) – floors, scale and vertex constants.
pub mod pruner;

use std::fmt;

use nalgebra::{Matrix3, Vector3};

use crate::constants::{delta_phi, wrap_phi, Eta, Radian};
use crate::params::GlobalMuonParams;
use crate::tracks::{Track, TrackParameters};

/// Bounded (η, φ) window plus the vertex used to anchor it.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub eta: Eta,
    pub phi: Radian,
    pub half_eta: Eta,
    pub half_phi: Radian,
    pub vertex_position: Vector3<f64>,
    pub vertex_error: Matrix3<f64>,
}

impl Region {
    /// Check whether a direction lies inside the window (bounds included).
    ///
    /// The azimuthal distance is wrapped, so windows straddling φ = ±π behave correctly.
    pub fn contains(&self, params: &TrackParameters) -> bool {
        (params.eta - self.eta).abs() <= self.half_eta
            && delta_phi(params.phi, self.phi).abs() <= self.half_phi
    }

    pub fn eta_range(&self) -> (Eta, Eta) {
        (self.eta - self.half_eta, self.eta + self.half_eta)
    }

    /// Azimuthal bounds, each wrapped into (−π, π].
    pub fn phi_range(&self) -> (Radian, Radian) {
        (
            wrap_phi(self.phi - self.half_phi),
            wrap_phi(self.phi + self.half_phi),
        )
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region(eta={:.3}±{:.3}, phi={:.3}±{:.3})",
            self.eta, self.half_eta, self.phi, self.half_phi
        )
    }
}

/// Builds a [`Region`] from an outer track.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEstimator {
    min_half_width_eta: Eta,
    min_half_width_phi: Radian,
    sigma_scale: f64,
    vertex_position: Vector3<f64>,
    vertex_error: Matrix3<f64>,
}

impl RegionEstimator {
    /// Create an estimator from validated parameters.
    ///
    /// The vertex uncertainty is stored as a diagonal covariance
    /// `diag(σxy², σxy², σz²)`.
    pub fn new(params: &GlobalMuonParams) -> Self {
        let [x, y, z] = params.vertex_position;
        let sxy2 = params.vertex_sigma_xy * params.vertex_sigma_xy;
        let sz2 = params.vertex_sigma_z * params.vertex_sigma_z;
        RegionEstimator {
            min_half_width_eta: params.region_min_half_width_eta,
            min_half_width_phi: params.region_min_half_width_phi,
            sigma_scale: params.region_sigma_scale,
            vertex_position: Vector3::new(x, y, z),
            vertex_error: Matrix3::from_diagonal(&Vector3::new(sxy2, sxy2, sz2)),
        }
    }

    /// Define the region of interest around an outer track.
    ///
    /// Arguments
    /// -----------------
    /// * `outer`: the outer (muon) track; its parameters at the reference surface give the
    ///   window centre and its direction uncertainties drive the half-widths
    ///
    /// Return
    /// ----------
    /// * a [`Region`] centred on the outer direction, never narrower than the configured floors
    pub fn define_region(&self, outer: &Track) -> Region {
        let params = &outer.params;
        let half_eta = (self.sigma_scale * params.sigma_eta.abs()).max(self.min_half_width_eta);
        let half_phi = (self.sigma_scale * params.sigma_phi.abs()).max(self.min_half_width_phi);

        Region {
            eta: params.eta,
            phi: wrap_phi(params.phi),
            half_eta,
            half_phi,
            vertex_position: self.vertex_position,
            vertex_error: self.vertex_error,
        }
    }
}

#[cfg(test)]
mod region_test {
    use super::*;
    use crate::constants::{VERTEX_SIGMA_XY, VERTEX_SIGMA_Z};
    use crate::tracks::TrackKey;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn outer(eta: f64, phi: f64, sigma_eta: f64, sigma_phi: f64) -> Track {
        Track::new(
            TrackKey(0),
            TrackParameters::new(eta, phi, 0.02).with_errors(sigma_eta, sigma_phi, 1e-3),
        )
    }

    #[test]
    fn test_floor_for_well_measured_track() {
        let params = GlobalMuonParams::builder()
            .region_min_half_width(0.1)
            .build()
            .unwrap();
        let region = RegionEstimator::new(&params).define_region(&outer(1.2, 0.4, 1e-9, 1e-9));

        assert_eq!(region.half_eta, 0.1);
        assert_eq!(region.half_phi, 0.1);
        assert_eq!(region.eta, 1.2);
        assert_eq!(region.phi, 0.4);

        let (eta_lo, eta_hi) = region.eta_range();
        assert_relative_eq!(eta_lo, 1.1, epsilon = 1e-12);
        assert_relative_eq!(eta_hi, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_half_width_scales_with_uncertainty() {
        let params = GlobalMuonParams::builder()
            .region_min_half_width(0.05)
            .region_sigma_scale(3.0)
            .build()
            .unwrap();
        let region = RegionEstimator::new(&params).define_region(&outer(0.0, 0.0, 0.1, 0.02));

        assert_relative_eq!(region.half_eta, 0.3, epsilon = 1e-12);
        assert_relative_eq!(region.half_phi, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_constants() {
        let region = RegionEstimator::new(&GlobalMuonParams::default())
            .define_region(&outer(0.0, 0.0, 0.0, 0.0));

        assert_eq!(region.vertex_position, Vector3::zeros());
        assert_relative_eq!(region.vertex_error[(0, 0)], VERTEX_SIGMA_XY * VERTEX_SIGMA_XY);
        assert_relative_eq!(region.vertex_error[(2, 2)], VERTEX_SIGMA_Z * VERTEX_SIGMA_Z);
    }

    #[test]
    fn test_contains_wraps_around_pi() {
        let params = GlobalMuonParams::builder()
            .region_min_half_width(0.1)
            .build()
            .unwrap();
        let region = RegionEstimator::new(&params).define_region(&outer(0.0, PI - 0.02, 0.0, 0.0));

        assert!(region.contains(&TrackParameters::new(0.05, -PI + 0.03, 0.1)));
        assert!(!region.contains(&TrackParameters::new(0.05, -PI + 0.2, 0.1)));
        assert!(!region.contains(&TrackParameters::new(0.2, PI - 0.02, 0.1)));

        let (lo, hi) = region.phi_range();
        assert!(lo > 0.0 && hi < 0.0);
    }
}
