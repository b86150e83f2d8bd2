//! # Muon hit quality filter
//!
//! Classify the hits of an outer (muon-system) trajectory as **accepted** or **rejected**
//! before they are merged with a tracker trajectory and re-fitted.
//!
//! ## Steps
//!
//! 1. **Occupancy** – valid muon hits are grouped by [`ChamberId`] and counted. In
//!    [`HitFilterMode::ShowerVeto`], a chamber holding more than `shower_threshold` hits is
//!    vetoed as a whole: every hit it holds is rejected whatever its chi-square, since a
//!    shower or a noise burst makes individual positions unreliable.
//! 2. **Per-hit cut** – outside vetoed chambers, a hit is kept when its chi-square per
//!    measured coordinate is below the cut of its technology (DT, CSC, RPC) and below the
//!    global ceiling.
//!
//! [`HitFilterMode::All`] skips both steps and accepts every valid muon hit;
//! [`HitFilterMode::Threshold`] only applies step 2. Invalid hits and tracker hits are always
//! rejected.
//!
//! ## Insufficient hits
//!
//! The filter never fails. When fewer hits than required survive, the selection is returned
//! as is and [`HitSelection::is_sufficient`] lets the caller decide what to do.
use ahash::RandomState;
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::params::GlobalMuonParams;
use crate::tracks::hit::{ChamberId, DetectorTechnology, Hit};

/// Per-chamber count of valid muon hits.
pub type ChamberOccupancy = HashMap<ChamberId, usize, RandomState>;

/// Filtering policy applied to the muon hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitFilterMode {
    /// Use every valid muon hit unfiltered.
    #[serde(alias = "none")]
    All,
    /// Per-technology chi-square cuts only.
    Threshold,
    /// Chamber occupancy veto followed by the chi-square cuts.
    ShowerVeto,
}

impl HitFilterMode {
    fn applies_chi2_cut(&self) -> bool {
        !matches!(self, HitFilterMode::All)
    }

    fn vetoes_showers(&self) -> bool {
        matches!(self, HitFilterMode::ShowerVeto)
    }
}

/// Why a hit was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitVerdict {
    Accepted,
    Invalid,
    NotMuon,
    ShowerVeto,
    Chi2Cut,
}

/// Outcome of [`HitQualityFilter::select`]: two disjoint hit sets plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct HitSelection {
    pub accepted: Vec<Hit>,
    pub rejected: Vec<Hit>,
    pub occupancy: ChamberOccupancy,
    vetoed: Vec<ChamberId>,
}

impl HitSelection {
    pub fn n_accepted(&self) -> usize {
        self.accepted.len()
    }

    /// `true` when at least `min_hits` hits were accepted.
    pub fn is_sufficient(&self, min_hits: usize) -> bool {
        self.accepted.len() >= min_hits
    }

    /// Number of valid muon hits recorded in `chamber`.
    pub fn occupancy_of(&self, chamber: &ChamberId) -> usize {
        self.occupancy.get(chamber).copied().unwrap_or(0)
    }

    /// Chambers vetoed as shower-affected, in ascending order.
    pub fn showered_chambers(&self) -> &[ChamberId] {
        &self.vetoed
    }
}

/// Classifies outer-trajectory hits as usable or rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct HitQualityFilter {
    mode: HitFilterMode,
    shower_threshold: usize,
    dt_chi2_cut: f64,
    csc_chi2_cut: f64,
    rpc_chi2_cut: f64,
    global_chi2_cut: f64,
}

impl HitQualityFilter {
    pub fn new(params: &GlobalMuonParams) -> Self {
        HitQualityFilter {
            mode: params.hit_filter_mode,
            shower_threshold: params.shower_threshold,
            dt_chi2_cut: params.dt_chi2_cut,
            csc_chi2_cut: params.csc_chi2_cut,
            rpc_chi2_cut: params.rpc_chi2_cut,
            global_chi2_cut: params.global_chi2_cut,
        }
    }

    pub fn mode(&self) -> HitFilterMode {
        self.mode
    }

    /// Chi-square per coordinate cut of a muon technology; `None` for the tracker.
    pub fn chi2_cut(&self, technology: DetectorTechnology) -> Option<f64> {
        match technology {
            DetectorTechnology::Dt => Some(self.dt_chi2_cut),
            DetectorTechnology::Csc => Some(self.csc_chi2_cut),
            DetectorTechnology::Rpc => Some(self.rpc_chi2_cut),
            DetectorTechnology::Tracker => None,
        }
    }

    /// Count the valid muon hits of every chamber.
    pub fn chamber_occupancy(hits: &[Hit]) -> ChamberOccupancy {
        hits.iter()
            .filter(|hit| hit.valid && hit.is_muon())
            .fold(ChamberOccupancy::default(), |mut occupancy, hit| {
                *occupancy.entry(hit.chamber).or_insert(0) += 1;
                occupancy
            })
    }

    /// Decide the fate of a single hit given the vetoed chambers (sorted).
    pub fn classify(&self, hit: &Hit, vetoed: &[ChamberId]) -> HitVerdict {
        if !hit.valid {
            return HitVerdict::Invalid;
        }
        let Some(cut) = self.chi2_cut(hit.technology()) else {
            return HitVerdict::NotMuon;
        };
        if self.mode.vetoes_showers() && vetoed.binary_search(&hit.chamber).is_ok() {
            return HitVerdict::ShowerVeto;
        }
        if self.mode.applies_chi2_cut() {
            let chi2 = hit.chi2_per_dof();
            if !(chi2 < cut && chi2 < self.global_chi2_cut) {
                return HitVerdict::Chi2Cut;
            }
        }
        HitVerdict::Accepted
    }

    /// Split the raw hits of an outer trajectory into accepted and rejected sets.
    ///
    /// Arguments
    /// -----------------
    /// * `hits`: the outer trajectory hits, with their local chi-square against the
    ///   preliminary fit
    ///
    /// Return
    /// ----------
    /// * a [`HitSelection`]; both hit sets keep the input order, and the occupancy record
    ///   is filled in every mode
    pub fn select(&self, hits: &[Hit]) -> HitSelection {
        let occupancy = Self::chamber_occupancy(hits);

        let vetoed: Vec<ChamberId> = if self.mode.vetoes_showers() {
            occupancy
                .iter()
                .filter(|(_, &count)| count > self.shower_threshold)
                .map(|(chamber, _)| *chamber)
                .sorted()
                .collect()
        } else {
            Vec::new()
        };

        for chamber in &vetoed {
            debug!(
                "Shower veto on chamber {chamber}: {} hits > {}",
                occupancy.get(chamber).copied().unwrap_or(0),
                self.shower_threshold
            );
        }

        let mut accepted = Vec::with_capacity(hits.len());
        let mut rejected = Vec::new();
        for hit in hits {
            match self.classify(hit, &vetoed) {
                HitVerdict::Accepted => accepted.push(hit.clone()),
                verdict => {
                    trace!(
                        "Skip hit in {}: {:?} (chi2/ndf={:.2})",
                        hit.chamber,
                        verdict,
                        hit.chi2_per_dof()
                    );
                    rejected.push(hit.clone());
                }
            }
        }

        HitSelection {
            accepted,
            rejected,
            occupancy,
            vetoed,
        }
    }
}

#[cfg(test)]
mod hit_filter_test {
    use super::*;

    fn hit(technology: DetectorTechnology, chamber: u32, chi2: f64) -> Hit {
        Hit::new(ChamberId::new(technology, 1, chamber), 0, 450.0, 1).with_chi2(chi2)
    }

    fn filter(mode: HitFilterMode, shower_threshold: usize) -> HitQualityFilter {
        let params = GlobalMuonParams::builder()
            .hit_filter_mode(mode)
            .shower_threshold(shower_threshold)
            .dt_chi2_cut(10.0)
            .csc_chi2_cut(150.0)
            .rpc_chi2_cut(1.0)
            .build()
            .unwrap();
        HitQualityFilter::new(&params)
    }

    /// One DT chamber with 8 good hits, one CSC chamber with 2 hits (one bad), one RPC hit.
    fn outer_hits() -> Vec<Hit> {
        let mut hits: Vec<Hit> = (0..8).map(|_| hit(DetectorTechnology::Dt, 1, 0.5)).collect();
        hits.push(hit(DetectorTechnology::Csc, 2, 20.0));
        hits.push(hit(DetectorTechnology::Csc, 2, 400.0));
        hits.push(hit(DetectorTechnology::Rpc, 3, 0.2));
        hits
    }

    #[test]
    fn test_shower_veto_rejects_whole_chamber() {
        let selection = filter(HitFilterMode::ShowerVeto, 5).select(&outer_hits());

        let dt_chamber = ChamberId::new(DetectorTechnology::Dt, 1, 1);
        assert_eq!(selection.occupancy_of(&dt_chamber), 8);
        assert_eq!(selection.showered_chambers(), &[dt_chamber]);
        assert!(selection.accepted.iter().all(|h| h.chamber != dt_chamber));
        assert_eq!(
            selection
                .rejected
                .iter()
                .filter(|h| h.chamber == dt_chamber)
                .count(),
            8
        );
        // CSC 20.0 < 150 kept, CSC 400 rejected, RPC 0.2 < 1.0 kept
        assert_eq!(selection.n_accepted(), 2);
        assert_eq!(selection.rejected.len(), 9);
    }

    #[test]
    fn test_threshold_mode_keeps_busy_chamber() {
        let f = filter(HitFilterMode::Threshold, 5);
        assert_eq!(f.mode(), HitFilterMode::Threshold);
        let selection = f.select(&outer_hits());

        assert!(selection.showered_chambers().is_empty());
        assert_eq!(selection.n_accepted(), 10);
        assert_eq!(selection.rejected.len(), 1);
        assert_eq!(selection.rejected[0].chi2, 400.0);
    }

    #[test]
    fn test_all_mode_is_unfiltered() {
        let mut hits = outer_hits();
        hits.push(hit(DetectorTechnology::Dt, 9, 1.0).invalidated());
        hits.push(hit(DetectorTechnology::Tracker, 0, 0.1));

        let selection = filter(HitFilterMode::All, 5).select(&hits);
        assert_eq!(selection.n_accepted(), 11);
        assert_eq!(selection.rejected.len(), 2);
    }

    #[test]
    fn test_global_ceiling_applies_to_loose_technology() {
        let params = GlobalMuonParams::builder()
            .hit_filter_mode(HitFilterMode::Threshold)
            .csc_chi2_cut(500.0)
            .global_chi2_cut(200.0)
            .build()
            .unwrap();
        let f = HitQualityFilter::new(&params);

        assert_eq!(
            f.classify(&hit(DetectorTechnology::Csc, 1, 300.0), &[]),
            HitVerdict::Chi2Cut
        );
        assert_eq!(
            f.classify(&hit(DetectorTechnology::Csc, 1, 150.0), &[]),
            HitVerdict::Accepted
        );
    }

    #[test]
    fn test_nan_chi2_is_rejected() {
        let f = filter(HitFilterMode::Threshold, 5);
        assert_eq!(
            f.classify(&hit(DetectorTechnology::Dt, 1, f64::NAN), &[]),
            HitVerdict::Chi2Cut
        );
    }

    #[test]
    fn test_insufficient_is_not_an_error() {
        let selection = filter(HitFilterMode::ShowerVeto, 1).select(&outer_hits());
        // every chamber with more than one hit is vetoed, only the RPC hit survives
        assert_eq!(selection.n_accepted(), 1);
        assert!(!selection.is_sufficient(3));
        assert!(selection.is_sufficient(1));
    }

    #[test]
    fn test_mode_deserializes_from_none() {
        let mode: HitFilterMode = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(mode, HitFilterMode::All);
        let mode: HitFilterMode = serde_json::from_str("\"shower-veto\"").unwrap();
        assert_eq!(mode, HitFilterMode::ShowerVeto);
    }
}
