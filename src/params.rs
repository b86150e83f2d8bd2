//! # Global muon reconstruction parameters
//!
//! This module defines the [`GlobalMuonParams`] configuration struct and its builder, which
//! control how the global muon builder defines its region of interest, obtains tracker
//! candidates, filters muon hits, and accepts combined trajectories.
//!
//! ## Purpose
//!
//! The configuration is resolved **once**, when a
//! [`GlobalMuonTrajectoryBuilder`](crate::builder::GlobalMuonTrajectoryBuilder) is constructed.
//! Invalid or missing options are reported there as [`MuonError`]; nothing is re-validated
//! during event processing.
//!
//! ## Pipeline overview
//!
//! 1. **Region of interest**
//!    Half-widths in (η, φ) are `region_sigma_scale` × direction uncertainty, floored at
//!    `region_min_half_width_eta` / `region_min_half_width_phi`, anchored at the nominal vertex
//!    (`vertex_position`, `vertex_sigma_xy`, `vertex_sigma_z`).
//!
//! 2. **Tracker candidates**
//!    `direction`, `tracker_trajectories_available` and `require_tracker_trajectory` choose
//!    between the pre-supplied trajectory fast path, on-demand pattern recognition
//!    (`pattern_builder_name`), and outside-in seeding.
//!
//! 3. **Muon hit selection**
//!    `hit_filter_mode` selects unfiltered, chi-square only, or shower-veto filtering, with
//!    per-technology cuts (`dt_chi2_cut`, `csc_chi2_cut`, `rpc_chi2_cut`), a ceiling
//!    `global_chi2_cut`, and the chamber occupancy limit `shower_threshold`.
//!
//! 4. **Combination and selection**
//!    `min_muon_hits`, `keep_tracker_only` and `pt_cut` decide when a tracker-only trajectory
//!    stands in for the global fit; `max_score` and `clean_shared_inner` filter the winners.
//!
//! ## Example
//!
//! ```rust
//! use global_muon::params::{GlobalMuonParams, ReconstructionDirection};
//! use global_muon::hit_filter::HitFilterMode;
//!
//! let params = GlobalMuonParams::builder()
//!     .hit_filter_mode(HitFilterMode::ShowerVeto)
//!     .shower_threshold(5)
//!     .region_min_half_width(0.1)
//!     .direction(ReconstructionDirection::Either)
//!     .build()
//!     .unwrap();
//!
//! println!("{params:#}");
//! ```
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{Centimeter, Eta, GeV, Radian, VERTEX_SIGMA_XY, VERTEX_SIGMA_Z};
use crate::hit_filter::HitFilterMode;
use crate::muon_errors::MuonError;

/// Where tracker candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconstructionDirection {
    /// Start from tracker tracks inside the region of interest.
    InsideOut,
    /// Seed the tracker from the muon trajectory extrapolated inward.
    OutsideIn,
    /// Inside-out first, outside-in when it yields no candidate.
    Either,
}

/// How the combination stage enumerates tracker candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombinationStrategy {
    /// Pair the muon only with tracker tracks inside the region of interest.
    RegionConstrained,
    /// Pair the muon with every tracker track of the event.
    Exhaustive,
}

/// Configuration of the global muon trajectory builder.
///
/// Defaults
/// -----------------
/// * `hit_filter_mode`: `ShowerVeto`
/// * `min_muon_hits`: 1
/// * `shower_threshold`: 10 hits per chamber
/// * `dt_chi2_cut`: 10.0, `csc_chi2_cut`: 150.0, `rpc_chi2_cut`: 1.0
/// * `global_chi2_cut`: 200.0
/// * `region_min_half_width_eta` / `_phi`: 0.1
/// * `region_sigma_scale`: 3.0
/// * `vertex_position`: origin, `vertex_sigma_xy`: 0.01 cm, `vertex_sigma_z`: 5.3 cm
/// * `direction`: `InsideOut`
/// * `tracker_trajectories_available`: `true`
/// * `require_tracker_trajectory`: `true`
/// * `keep_tracker_only`: `true`
/// * `pt_cut`: 1.0 GeV
/// * `max_score`: none
/// * `strategy`: `RegionConstrained`
/// * `clean_shared_inner`: `true`
///
/// Notes & Validation
/// -----------------
/// * Chi-square cuts, region floors and `region_sigma_scale` must be strictly positive.
/// * Vertex uncertainties and `pt_cut` must be non-negative; `max_score`, when set, too.
/// * `shower_threshold ≥ 1` in `ShowerVeto` mode.
/// * `tracker_track_label` must be set; `tracker_trajectory_label` when trajectories are
///   pre-supplied; `pattern_builder_name` whenever pattern recognition can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalMuonParams {
    // --- Muon hit selection ---
    pub hit_filter_mode: HitFilterMode,
    /// Minimum number of accepted muon hits for a global re-fit.
    pub min_muon_hits: usize,
    /// Chamber occupancy above which every hit of the chamber is vetoed.
    pub shower_threshold: usize,
    pub dt_chi2_cut: f64,
    pub csc_chi2_cut: f64,
    pub rpc_chi2_cut: f64,
    /// Chi-square per measured coordinate above which a muon hit is always rejected.
    pub global_chi2_cut: f64,

    // --- Region of interest ---
    pub region_min_half_width_eta: Eta,
    pub region_min_half_width_phi: Radian,
    pub region_sigma_scale: f64,
    pub vertex_position: [Centimeter; 3],
    pub vertex_sigma_xy: Centimeter,
    pub vertex_sigma_z: Centimeter,

    // --- Tracker candidates ---
    pub direction: ReconstructionDirection,
    /// Tracker trajectories come with the event; pattern recognition is skipped.
    pub tracker_trajectories_available: bool,
    /// Drop tracker candidates whose trajectory cannot be resolved.
    pub require_tracker_trajectory: bool,
    pub tracker_track_label: String,
    pub tracker_trajectory_label: String,
    pub pattern_builder_name: String,

    // --- Combination / selection ---
    pub strategy: CombinationStrategy,
    /// Emit the tracker trajectory when too few muon hits survive the filter.
    pub keep_tracker_only: bool,
    /// Below this inner transverse momentum the muon hits are not re-fitted.
    pub pt_cut: GeV,
    /// Winners scoring above this value are discarded.
    pub max_score: Option<f64>,
    /// Assign each tracker track to at most one muon in a batch.
    pub clean_shared_inner: bool,
}

impl GlobalMuonParams {
    /// Construct a new [`GlobalMuonParams`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`GlobalMuonParamsBuilder`] initialized with default values.
    pub fn builder() -> GlobalMuonParamsBuilder {
        GlobalMuonParamsBuilder::new()
    }

    /// `true` when the configuration can invoke the pattern-recognition collaborator.
    pub fn needs_pattern_recognition(&self) -> bool {
        match self.direction {
            ReconstructionDirection::InsideOut => !self.tracker_trajectories_available,
            ReconstructionDirection::OutsideIn | ReconstructionDirection::Either => true,
        }
    }

    // ---- Numeric helpers for PartialOrd (handle NaN as invalid) ----

    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Check every validation rule.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` if the parameters can be used by the builder.
    /// * `Err(MuonError::InvalidParameter)` for out-of-range values.
    /// * `Err(MuonError::MissingParameter)` for an empty required label or name.
    pub fn validate(&self) -> Result<(), MuonError> {
        // --- Strictly positive cuts ---
        for (name, value) in [
            ("dt_chi2_cut", self.dt_chi2_cut),
            ("csc_chi2_cut", self.csc_chi2_cut),
            ("rpc_chi2_cut", self.rpc_chi2_cut),
            ("global_chi2_cut", self.global_chi2_cut),
            ("region_min_half_width_eta", self.region_min_half_width_eta),
            ("region_min_half_width_phi", self.region_min_half_width_phi),
            ("region_sigma_scale", self.region_sigma_scale),
        ] {
            if !Self::gt0(value) {
                return Err(MuonError::InvalidParameter(format!("{name} must be > 0")));
            }
        }

        // --- Non-negative values ---
        if !Self::ge0(self.vertex_sigma_xy) || !Self::ge0(self.vertex_sigma_z) {
            return Err(MuonError::InvalidParameter(
                "vertex uncertainties must be non-negative".into(),
            ));
        }
        if self.vertex_position.iter().any(|x| !x.is_finite()) {
            return Err(MuonError::InvalidParameter(
                "vertex_position must be finite".into(),
            ));
        }
        if !Self::ge0(self.pt_cut) {
            return Err(MuonError::InvalidParameter("pt_cut must be >= 0".into()));
        }
        if let Some(max_score) = self.max_score {
            if !Self::ge0(max_score) {
                return Err(MuonError::InvalidParameter(
                    "max_score must be >= 0".into(),
                ));
            }
        }

        if self.hit_filter_mode == HitFilterMode::ShowerVeto && self.shower_threshold == 0 {
            return Err(MuonError::InvalidParameter(
                "shower_threshold must be >= 1 with shower veto".into(),
            ));
        }

        // --- Required names ---
        if self.tracker_track_label.trim().is_empty() {
            return Err(MuonError::MissingParameter("tracker_track_label".into()));
        }
        if self.tracker_trajectories_available && self.tracker_trajectory_label.trim().is_empty()
        {
            return Err(MuonError::MissingParameter(
                "tracker_trajectory_label".into(),
            ));
        }
        if self.needs_pattern_recognition() && self.pattern_builder_name.trim().is_empty() {
            return Err(MuonError::MissingParameter("pattern_builder_name".into()));
        }

        Ok(())
    }
}

impl Default for GlobalMuonParams {
    fn default() -> Self {
        GlobalMuonParams {
            // Muon hit selection
            hit_filter_mode: HitFilterMode::ShowerVeto,
            min_muon_hits: 1,
            shower_threshold: 10,
            dt_chi2_cut: 10.0,
            csc_chi2_cut: 150.0,
            rpc_chi2_cut: 1.0,
            global_chi2_cut: 200.0,

            // Region of interest
            region_min_half_width_eta: 0.1,
            region_min_half_width_phi: 0.1,
            region_sigma_scale: 3.0,
            vertex_position: [0.0; 3],
            vertex_sigma_xy: VERTEX_SIGMA_XY,
            vertex_sigma_z: VERTEX_SIGMA_Z,

            // Tracker candidates
            direction: ReconstructionDirection::InsideOut,
            tracker_trajectories_available: true,
            require_tracker_trajectory: true,
            tracker_track_label: "tracker_tracks".into(),
            tracker_trajectory_label: "tracker_trajectories".into(),
            pattern_builder_name: "tracker_ckf".into(),

            // Combination / selection
            strategy: CombinationStrategy::RegionConstrained,
            keep_tracker_only: true,
            pt_cut: 1.0,
            max_score: None,
            clean_shared_inner: true,
        }
    }
}

/// Builder for [`GlobalMuonParams`], with validation.
#[derive(Debug, Clone)]
pub struct GlobalMuonParamsBuilder {
    params: GlobalMuonParams,
}

impl Default for GlobalMuonParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalMuonParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: GlobalMuonParams::default(),
        }
    }

    // --- Muon hit selection ---
    pub fn hit_filter_mode(mut self, v: HitFilterMode) -> Self {
        self.params.hit_filter_mode = v;
        self
    }
    pub fn min_muon_hits(mut self, v: usize) -> Self {
        self.params.min_muon_hits = v;
        self
    }
    pub fn shower_threshold(mut self, v: usize) -> Self {
        self.params.shower_threshold = v;
        self
    }
    pub fn dt_chi2_cut(mut self, v: f64) -> Self {
        self.params.dt_chi2_cut = v;
        self
    }
    pub fn csc_chi2_cut(mut self, v: f64) -> Self {
        self.params.csc_chi2_cut = v;
        self
    }
    pub fn rpc_chi2_cut(mut self, v: f64) -> Self {
        self.params.rpc_chi2_cut = v;
        self
    }
    pub fn global_chi2_cut(mut self, v: f64) -> Self {
        self.params.global_chi2_cut = v;
        self
    }

    // --- Region of interest ---
    /// Set the same half-width floor in η and φ.
    pub fn region_min_half_width(mut self, v: f64) -> Self {
        self.params.region_min_half_width_eta = v;
        self.params.region_min_half_width_phi = v;
        self
    }
    pub fn region_min_half_width_eta(mut self, v: Eta) -> Self {
        self.params.region_min_half_width_eta = v;
        self
    }
    pub fn region_min_half_width_phi(mut self, v: Radian) -> Self {
        self.params.region_min_half_width_phi = v;
        self
    }
    pub fn region_sigma_scale(mut self, v: f64) -> Self {
        self.params.region_sigma_scale = v;
        self
    }
    pub fn vertex_position(mut self, v: [Centimeter; 3]) -> Self {
        self.params.vertex_position = v;
        self
    }
    pub fn vertex_sigma_xy(mut self, v: Centimeter) -> Self {
        self.params.vertex_sigma_xy = v;
        self
    }
    pub fn vertex_sigma_z(mut self, v: Centimeter) -> Self {
        self.params.vertex_sigma_z = v;
        self
    }

    // --- Tracker candidates ---
    pub fn direction(mut self, v: ReconstructionDirection) -> Self {
        self.params.direction = v;
        self
    }
    pub fn tracker_trajectories_available(mut self, v: bool) -> Self {
        self.params.tracker_trajectories_available = v;
        self
    }
    pub fn require_tracker_trajectory(mut self, v: bool) -> Self {
        self.params.require_tracker_trajectory = v;
        self
    }
    pub fn tracker_track_label(mut self, v: impl Into<String>) -> Self {
        self.params.tracker_track_label = v.into();
        self
    }
    pub fn tracker_trajectory_label(mut self, v: impl Into<String>) -> Self {
        self.params.tracker_trajectory_label = v.into();
        self
    }
    pub fn pattern_builder_name(mut self, v: impl Into<String>) -> Self {
        self.params.pattern_builder_name = v.into();
        self
    }

    // --- Combination / selection ---
    pub fn strategy(mut self, v: CombinationStrategy) -> Self {
        self.params.strategy = v;
        self
    }
    pub fn keep_tracker_only(mut self, v: bool) -> Self {
        self.params.keep_tracker_only = v;
        self
    }
    pub fn pt_cut(mut self, v: GeV) -> Self {
        self.params.pt_cut = v;
        self
    }
    pub fn max_score(mut self, v: Option<f64>) -> Self {
        self.params.max_score = v;
        self
    }
    pub fn clean_shared_inner(mut self, v: bool) -> Self {
        self.params.clean_shared_inner = v;
        self
    }

    /// Finalize the builder and produce a validated [`GlobalMuonParams`].
    ///
    /// Return
    /// ----------
    /// * `Ok(GlobalMuonParams)` if [`GlobalMuonParams::validate`] accepts the values.
    /// * `Err(MuonError)` naming the first rule that failed.
    pub fn build(self) -> Result<GlobalMuonParams, MuonError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for GlobalMuonParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 52;
            writeln!(f, "Global Muon Parameters")?;
            writeln!(f, "----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Muon hit selection]")?;
            line!(
                "hit_filter_mode            = {:?}",
                self.hit_filter_mode,
                "All / Threshold / ShowerVeto"
            )?;
            line!(
                "min_muon_hits              = {}",
                self.min_muon_hits,
                "Accepted muon hits needed for a re-fit"
            )?;
            line!(
                "shower_threshold           = {}",
                self.shower_threshold,
                "Chamber occupancy veto"
            )?;
            line!(
                "dt_chi2_cut                = {:.2}",
                self.dt_chi2_cut,
                "DT chi2/ndf cut"
            )?;
            line!(
                "csc_chi2_cut               = {:.2}",
                self.csc_chi2_cut,
                "CSC chi2/ndf cut"
            )?;
            line!(
                "rpc_chi2_cut               = {:.2}",
                self.rpc_chi2_cut,
                "RPC chi2/ndf cut"
            )?;
            line!(
                "global_chi2_cut            = {:.2}",
                self.global_chi2_cut,
                "Chi2/ndf ceiling for any muon hit"
            )?;

            writeln!(f, "\n[Region of interest]")?;
            line!(
                "region_min_half_width_eta  = {:.3}",
                self.region_min_half_width_eta,
                "Eta half-width floor"
            )?;
            line!(
                "region_min_half_width_phi  = {:.3} rad",
                self.region_min_half_width_phi,
                "Phi half-width floor"
            )?;
            line!(
                "region_sigma_scale         = {:.2}",
                self.region_sigma_scale,
                "Sigmas per half-width"
            )?;
            line!(
                "vertex_position            = {:?} cm",
                self.vertex_position,
                "Nominal interaction point"
            )?;
            line!(
                "vertex_sigma_xy            = {:.3} cm",
                self.vertex_sigma_xy,
                "Transverse vertex uncertainty"
            )?;
            line!(
                "vertex_sigma_z             = {:.3} cm",
                self.vertex_sigma_z,
                "Longitudinal vertex uncertainty"
            )?;

            writeln!(f, "\n[Tracker candidates]")?;
            line!(
                "direction                  = {:?}",
                self.direction,
                "Candidate source"
            )?;
            line!(
                "tracker_trajectories_avail = {}",
                self.tracker_trajectories_available,
                "Skip pattern recognition"
            )?;
            line!(
                "require_tracker_trajectory = {}",
                self.require_tracker_trajectory,
                "Drop unresolved candidates"
            )?;
            line!(
                "tracker_track_label        = {}",
                self.tracker_track_label,
                "Event tracker-track collection"
            )?;
            line!(
                "tracker_trajectory_label   = {}",
                self.tracker_trajectory_label,
                "Event tracker-trajectory collection"
            )?;
            line!(
                "pattern_builder_name       = {}",
                self.pattern_builder_name,
                "Pattern-recognition service"
            )?;

            writeln!(f, "\n[Combination / selection]")?;
            line!(
                "strategy                   = {:?}",
                self.strategy,
                "Pairing strategy"
            )?;
            line!(
                "keep_tracker_only          = {}",
                self.keep_tracker_only,
                "Tracker-only fallback"
            )?;
            line!(
                "pt_cut                     = {:.2} GeV",
                self.pt_cut,
                "Minimum inner pT for muon re-fit"
            )?;
            line!(
                "max_score                  = {:?}",
                self.max_score,
                "Maximum -ln(P) accepted"
            )?;
            line!(
                "clean_shared_inner         = {}",
                self.clean_shared_inner,
                "One muon per tracker track"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "GlobalMuonParams(mode={:?}, min_hits={}, shower>{}, chi2 DT/CSC/RPC={:.1}/{:.1}/{:.1}, roi≥({:.2},{:.2}), direction={:?}, strategy={:?})",
                self.hit_filter_mode,
                self.min_muon_hits,
                self.shower_threshold,
                self.dt_chi2_cut,
                self.csc_chi2_cut,
                self.rpc_chi2_cut,
                self.region_min_half_width_eta,
                self.region_min_half_width_phi,
                self.direction,
                self.strategy,
            )
        }
    }
}
