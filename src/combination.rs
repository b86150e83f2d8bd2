//! # Outer/inner combination
//!
//! A combination merges the hits of one inner (tracker) trajectory with the accepted muon hits
//! of the outer track and re-fits the merged sequence from the innermost tracker state.
//!
//! ```text
//! hits = sort_outward(inner.hits ++ selection.accepted)
//! combined = refit(hits, inner.inner_state)
//! ```
//!
//! When the outer track brings too few usable muon hits, or the inner track is too soft to
//! reach the muon system, the inner trajectory alone is emitted as a tracker-only combination
//! if [`keep_tracker_only`](crate::params::GlobalMuonParams::keep_tracker_only) allows it.
use std::sync::Arc;

use log::{debug, trace};

use crate::collaborators::{ReFitter, TrackConverter};
use crate::constants::GeV;
use crate::hit_filter::HitSelection;
use crate::params::GlobalMuonParams;
use crate::selection::scoring::track_probability;
use crate::tracks::hit::Hit;
use crate::tracks::trajectory::{sort_outward, Trajectory};
use crate::tracks::{Track, TrackCandidate};

/// One outer/inner pairing after re-fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub inner_track: Arc<Track>,
    pub trajectory: Trajectory,
    /// Accepted muon hits that entered the fit (0 for tracker-only)
    pub n_muon_hits: usize,
    pub tracker_only: bool,
}

impl Combination {
    pub fn score(&self) -> f64 {
        track_probability(&self.trajectory)
    }
}

/// Builds and re-fits combinations for one outer track.
pub struct CombinationBuilder<'a> {
    refitter: &'a dyn ReFitter,
    converter: &'a dyn TrackConverter,
    min_muon_hits: usize,
    keep_tracker_only: bool,
    pt_cut: GeV,
}

impl<'a> CombinationBuilder<'a> {
    pub fn new(
        params: &GlobalMuonParams,
        refitter: &'a dyn ReFitter,
        converter: &'a dyn TrackConverter,
    ) -> Self {
        CombinationBuilder {
            refitter,
            converter,
            min_muon_hits: params.min_muon_hits,
            keep_tracker_only: params.keep_tracker_only,
            pt_cut: params.pt_cut,
        }
    }

    fn tracker_only(&self, inner_track: &Arc<Track>, inner: Trajectory) -> Option<Combination> {
        if !self.keep_tracker_only {
            debug!("dropping tracker-only combination with {:?}", inner_track.key);
            return None;
        }
        Some(Combination {
            inner_track: Arc::clone(inner_track),
            trajectory: inner,
            n_muon_hits: 0,
            tracker_only: true,
        })
    }

    /// Combine the accepted outer hits with one inner candidate.
    ///
    /// Arguments
    /// -----------------
    /// * `outer_selection`: result of the hit quality filter on the outer trajectory
    /// * `inner`: inner candidate; a track-only candidate is converted first
    ///
    /// Return
    /// ----------
    /// * the re-fitted combination, a tracker-only combination, or `None` when the pairing is
    ///   dropped (conversion failure, re-fit failure, tracker-only not kept)
    pub fn build(
        &self,
        outer_selection: &HitSelection,
        inner: &TrackCandidate,
    ) -> Option<Combination> {
        let inner_trajectory = match &inner.trajectory {
            Some(trajectory) => trajectory.clone(),
            None => match self.converter.trajectory(&inner.track) {
                Some(trajectory) => trajectory,
                None => {
                    debug!("tracker track {:?} could not be converted", inner.track.key);
                    return None;
                }
            },
        };

        let pt = inner.track.pt();
        if pt < self.pt_cut {
            trace!("inner pT {pt:.2} GeV below cut {:.2} GeV", self.pt_cut);
            return self.tracker_only(&inner.track, inner_trajectory);
        }

        let n_accepted = outer_selection.n_accepted();
        if n_accepted == 0 || !outer_selection.is_sufficient(self.min_muon_hits) {
            trace!(
                "{n_accepted} accepted muon hits, {} required",
                self.min_muon_hits.max(1)
            );
            return self.tracker_only(&inner.track, inner_trajectory);
        }

        let mut hits: Vec<Hit> = inner_trajectory
            .hits()
            .iter()
            .chain(outer_selection.accepted.iter())
            .cloned()
            .collect();
        sort_outward(&mut hits);

        match self.refitter.refit(&hits, inner_trajectory.inner_state()) {
            Ok(trajectory) if !trajectory.is_valid() => {
                debug!(
                    "dropping combination with {:?}: re-fit kept no valid hit",
                    inner.track.key
                );
                None
            }
            Ok(trajectory) => Some(Combination {
                inner_track: Arc::clone(&inner.track),
                trajectory,
                n_muon_hits: n_accepted,
                tracker_only: false,
            }),
            Err(err) => {
                debug!("dropping combination with {:?}: {err}", inner.track.key);
                None
            }
        }
    }
}

#[cfg(test)]
mod combination_test {
    use std::cell::RefCell;

    use nalgebra::Vector3;

    use super::*;
    use crate::hit_filter::HitQualityFilter;
    use crate::muon_errors::MuonError;
    use crate::tracks::hit::{ChamberId, DetectorTechnology};
    use crate::tracks::trajectory::TrajectoryState;
    use crate::tracks::{TrackKey, TrackParameters};

    struct RecordingFit {
        seen: RefCell<Vec<Vec<f64>>>,
        fail: bool,
    }

    impl ReFitter for RecordingFit {
        fn refit(
            &self,
            hits: &[Hit],
            start: &TrajectoryState,
        ) -> Result<Trajectory, MuonError> {
            self.seen
                .borrow_mut()
                .push(hits.iter().map(|h| h.radius).collect());
            if self.fail {
                return Err(MuonError::RefitDidNotConverge("singular".into()));
            }
            Ok(Trajectory::new(hits.to_vec(), 9.0, start.clone()))
        }
    }

    /// Converges but flags every hit as an outlier.
    struct OutlierFit;

    impl ReFitter for OutlierFit {
        fn refit(
            &self,
            hits: &[Hit],
            start: &TrajectoryState,
        ) -> Result<Trajectory, MuonError> {
            let hits = hits.iter().cloned().map(Hit::invalidated);
            Ok(Trajectory::new(hits, 0.0, start.clone()))
        }
    }

    struct EmptyFit;

    impl ReFitter for EmptyFit {
        fn refit(
            &self,
            _hits: &[Hit],
            start: &TrajectoryState,
        ) -> Result<Trajectory, MuonError> {
            Ok(Trajectory::new(Vec::new(), 0.0, start.clone()))
        }
    }

    struct NoConversion;
    impl TrackConverter for NoConversion {
        fn trajectory(&self, _track: &Track) -> Option<Trajectory> {
            None
        }
    }

    fn fit(fail: bool) -> RecordingFit {
        RecordingFit {
            seen: RefCell::new(Vec::new()),
            fail,
        }
    }

    fn state() -> TrajectoryState {
        TrajectoryState::new(TrackParameters::new(0.2, 0.3, 0.05), Vector3::zeros())
    }

    fn inner(curvature: f64) -> TrackCandidate {
        let hits = [4.0, 60.0, 11.0].map(|r| {
            Hit::new(ChamberId::new(DetectorTechnology::Tracker, 0, 1), 0, r, 2)
        });
        let track = Arc::new(Track::new(TrackKey(7), TrackParameters::new(0.2, 0.3, curvature)));
        TrackCandidate::with_trajectory(track, Trajectory::new(hits, 3.0, state()))
    }

    fn outer_selection(params: &GlobalMuonParams) -> HitSelection {
        let hits = [500.0, 430.0].map(|r| {
            Hit::new(ChamberId::new(DetectorTechnology::Dt, 1, 2), 0, r, 1).with_chi2(0.5)
        });
        HitQualityFilter::new(params).select(&hits)
    }

    #[test]
    fn test_refit_without_valid_hits_is_dropped() {
        let params = GlobalMuonParams::default();
        let selection = outer_selection(&params);

        let builder = CombinationBuilder::new(&params, &OutlierFit, &NoConversion);
        assert!(builder.build(&selection, &inner(0.05)).is_none());

        let builder = CombinationBuilder::new(&params, &EmptyFit, &NoConversion);
        assert!(builder.build(&selection, &inner(0.05)).is_none());
    }

    #[test]
    fn test_merged_hits_sorted_outward() {
        let params = GlobalMuonParams::default();
        let refit = fit(false);
        let builder = CombinationBuilder::new(&params, &refit, &NoConversion);

        let combo = builder.build(&outer_selection(&params), &inner(0.05)).unwrap();

        assert!(!combo.tracker_only);
        assert_eq!(combo.n_muon_hits, 2);
        assert_eq!(refit.seen.borrow()[0], vec![4.0, 11.0, 60.0, 430.0, 500.0]);
        assert_eq!(combo.trajectory.inner_state(), &state());
    }

    #[test]
    fn test_refit_failure_drops_combination() {
        let params = GlobalMuonParams::default();
        let refit = fit(true);
        let builder = CombinationBuilder::new(&params, &refit, &NoConversion);

        assert!(builder.build(&outer_selection(&params), &inner(0.05)).is_none());
    }

    #[test]
    fn test_insufficient_hits_tracker_only_policy() {
        let params = GlobalMuonParams::builder().min_muon_hits(3).build().unwrap();
        let refit = fit(false);
        let builder = CombinationBuilder::new(&params, &refit, &NoConversion);

        let combo = builder.build(&outer_selection(&params), &inner(0.05)).unwrap();
        assert!(combo.tracker_only);
        assert_eq!(combo.n_muon_hits, 0);
        assert!(refit.seen.borrow().is_empty());

        let strict = GlobalMuonParams::builder()
            .min_muon_hits(3)
            .keep_tracker_only(false)
            .build()
            .unwrap();
        let builder = CombinationBuilder::new(&strict, &refit, &NoConversion);
        assert!(builder.build(&outer_selection(&strict), &inner(0.05)).is_none());
    }

    #[test]
    fn test_soft_inner_track_is_not_refitted() {
        let params = GlobalMuonParams::builder().pt_cut(5.0).build().unwrap();
        let refit = fit(false);
        let builder = CombinationBuilder::new(&params, &refit, &NoConversion);

        // curvature 0.5 → pT = 2 GeV
        let combo = builder.build(&outer_selection(&params), &inner(0.5)).unwrap();
        assert!(combo.tracker_only);
        assert!(refit.seen.borrow().is_empty());
    }

    #[test]
    fn test_unconvertible_track_only_candidate_dropped() {
        let params = GlobalMuonParams::default();
        let refit = fit(false);
        let builder = CombinationBuilder::new(&params, &refit, &NoConversion);

        let degraded = TrackCandidate::new(Arc::new(Track::new(
            TrackKey(1),
            TrackParameters::new(0.0, 0.0, 0.05),
        )));
        assert!(builder.build(&outer_selection(&params), &degraded).is_none());
    }
}
