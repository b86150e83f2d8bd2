//! # Detector hits
//!
//! A [`Hit`] is a single measurement in one detector chamber. Hits are plain owned values:
//! every [`Trajectory`](crate::tracks::trajectory::Trajectory) holds its own copies and no
//! hit is shared between trajectories.
//!
//! Muon hits are grouped by [`ChamberId`] when the shower veto of
//! [`HitQualityFilter`](crate::hit_filter::HitQualityFilter) counts chamber occupancy.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::Centimeter;

/// Detector technology producing a hit.
///
/// The three muon technologies carry their own chi-square cut in
/// [`GlobalMuonParams`](crate::params::GlobalMuonParams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetectorTechnology {
    /// Silicon tracker (inner detector)
    Tracker,
    /// Drift tubes (muon barrel)
    Dt,
    /// Cathode strip chambers (muon endcaps)
    Csc,
    /// Resistive plate chambers (muon trigger)
    Rpc,
}

impl DetectorTechnology {
    /// `true` for the three muon-system technologies.
    pub fn is_muon(&self) -> bool {
        !matches!(self, DetectorTechnology::Tracker)
    }
}

impl fmt::Display for DetectorTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectorTechnology::Tracker => "Tracker",
            DetectorTechnology::Dt => "DT",
            DetectorTechnology::Csc => "CSC",
            DetectorTechnology::Rpc => "RPC",
        };
        write!(f, "{name}")
    }
}

/// Identifier of the chamber (or tracker module) a hit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChamberId {
    pub technology: DetectorTechnology,
    /// Station number, counted outward from 1 (0 for tracker modules)
    pub station: u8,
    /// Chamber number within the station
    pub chamber: u32,
}

impl ChamberId {
    pub fn new(technology: DetectorTechnology, station: u8, chamber: u32) -> Self {
        ChamberId {
            technology,
            station,
            chamber,
        }
    }
}

impl fmt::Display for ChamberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/st{}/ch{}",
            self.technology, self.station, self.chamber
        )
    }
}

/// A single detector measurement along a trajectory.
///
/// # Fields
///
/// * `chamber` - the chamber the hit belongs to
/// * `layer` - layer index inside the detector, used to break radius ties
/// * `radius` - distance from the beam line in cm, used for outward ordering
/// * `dimension` - number of measured coordinates (1 or 2)
/// * `valid` - `false` for placeholder (missing) measurements
/// * `chi2` - local chi-square contribution against the fitted state, 0 before any fit
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub chamber: ChamberId,
    pub layer: u16,
    pub radius: Centimeter,
    pub dimension: u8,
    pub valid: bool,
    pub chi2: f64,
}

impl Hit {
    /// Create a new valid hit with no chi-square contribution yet.
    ///
    /// Arguments
    /// ---------
    /// * `chamber`: the chamber holding the hit
    /// * `layer`: layer index inside the detector
    /// * `radius`: distance from the beam line (cm)
    /// * `dimension`: measured coordinates, clamped to at least 1
    ///
    /// Return
    /// ------
    /// * a new valid [`Hit`]
    pub fn new(chamber: ChamberId, layer: u16, radius: Centimeter, dimension: u8) -> Self {
        Hit {
            chamber,
            layer,
            radius,
            dimension: dimension.max(1),
            valid: true,
            chi2: 0.0,
        }
    }

    /// Attach the local chi-square contribution of a fitted hit.
    pub fn with_chi2(mut self, chi2: f64) -> Self {
        self.chi2 = chi2;
        self
    }

    /// Mark the hit as an invalid placeholder.
    pub fn invalidated(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn technology(&self) -> DetectorTechnology {
        self.chamber.technology
    }

    pub fn is_muon(&self) -> bool {
        self.chamber.technology.is_muon()
    }

    /// Local chi-square normalized by the measurement dimension.
    pub fn chi2_per_dof(&self) -> f64 {
        self.chi2 / f64::from(self.dimension.max(1))
    }

    /// Outward ordering: by radius, then by layer.
    pub fn outward_cmp(&self, other: &Hit) -> Ordering {
        self.radius
            .total_cmp(&other.radius)
            .then(self.layer.cmp(&other.layer))
    }
}
