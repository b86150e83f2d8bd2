//! # Constants and type definitions for global muon reconstruction
//!
//! This module centralizes the **nominal interaction point**, **numerical sentinels**, and
//! **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Nominal vertex position and uncertainty used to anchor the region of interest
//! - Sentinels returned by scoring when the fit quality is undefined
//! - Type aliases for angles, pseudorapidity, lengths and momenta
//! - Container aliases for hits and candidate collections

use crate::builder::MuonCandidate;
use crate::tracks::hit::Hit;
use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Geometry
// -------------------------------------------------------------------------------------------------

/// 2π, useful for azimuth wrapping
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Transverse uncertainty of the nominal interaction point (cm)
pub const VERTEX_SIGMA_XY: Centimeter = 0.01;

/// Longitudinal uncertainty of the nominal interaction point (cm)
pub const VERTEX_SIGMA_Z: Centimeter = 5.3;

/// Number of helix parameters consumed by a track fit
pub const N_TRACK_PARAMETERS: u32 = 5;

// -------------------------------------------------------------------------------------------------
// Scoring sentinels
// -------------------------------------------------------------------------------------------------

/// Score assigned to a trajectory without degrees of freedom.
///
/// It is the worst finite score, so such a trajectory only wins when nothing else competes.
pub const ZERO_DOF_SCORE: f64 = f64::MAX;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;
/// Pseudorapidity (dimensionless)
pub type Eta = f64;
/// Length in centimeters
pub type Centimeter = f64;
/// Momentum in GeV/c
pub type GeV = f64;

/// A small, inline-optimized container for the hits of one trajectory.
pub type Hits = SmallVec<[Hit; 16]>;

/// Best-first collection of combined muon candidates.
pub type CandidateContainer = Vec<MuonCandidate>;

/// Wrap an azimuthal angle into `(-π, π]`.
pub fn wrap_phi(phi: Radian) -> Radian {
    let mut wrapped = phi % DPI;
    if wrapped <= -std::f64::consts::PI {
        wrapped += DPI;
    } else if wrapped > std::f64::consts::PI {
        wrapped -= DPI;
    }
    wrapped
}

/// Signed azimuthal difference `a - b`, wrapped into `(-π, π]`.
pub fn delta_phi(a: Radian, b: Radian) -> Radian {
    wrap_phi(a - b)
}
