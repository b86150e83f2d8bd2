//! # Global muon trajectory builder
//!
//! This module defines [`GlobalMuonTrajectoryBuilder`], the façade that wires the stages of
//! global muon reconstruction together:
//!
//! 1. **Region of interest** around the outer track ([`RegionEstimator`]).
//! 2. **Pruning** of the event's tracker tracks to that region
//!    ([`choose_regional_tracker_tracks`]), skipped by the exhaustive strategy.
//! 3. **Inner candidates** with detailed trajectories ([`SeedAndPatternStage`]).
//! 4. **Hit quality filter** on the outer muon hits ([`HitQualityFilter`]), once per outer track.
//! 5. **Combination and re-fit** of every inner candidate ([`CombinationBuilder`]).
//! 6. **Scoring and selection** of the best combination ([`choose_best`]).
//!
//! ## Event lifecycle
//!
//! The builder is long-lived; the per-event state lives in an [`EventCache`] that
//! [`set_event`](GlobalMuonTrajectoryBuilder::set_event) replaces wholesale. The returned
//! [`GlobalMuonEvent`] borrows the builder, so trajectories can only be requested once an
//! event has been installed, and the cache cannot change while a request is running.
//!
//! The pattern-recognition collaborator is resolved by name once, on the first event, and
//! cached in a [`OnceCell`](once_cell::sync::OnceCell).
//!
//! ## Typical usage
//!
//! ```rust, ignore
//! use global_muon::builder::{GlobalMuonTrajectoryBuilder, MuonTrajectoryBuilder};
//!
//! let mut builder = GlobalMuonTrajectoryBuilder::new(params, services)?;
//! for event in events {
//!     let ctx = builder.set_event(&event)?;
//!     let muons = ctx.trajectories_for(&outer_candidates);
//! }
//! ```
//!
//! ## See also
//! ------------
//! * [`GlobalMuonParams`] – configuration of every stage.
//! * [`Services`] – collaborator handles injected at construction.
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ahash::RandomState;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use ordered_float::OrderedFloat;

use crate::collaborators::{EventSource, PatternRecognition, Services};
use crate::combination::{Combination, CombinationBuilder};
use crate::constants::CandidateContainer;
use crate::hit_filter::HitQualityFilter;
use crate::muon_errors::MuonError;
use crate::params::{CombinationStrategy, GlobalMuonParams};
use crate::region::pruner::choose_regional_tracker_tracks;
use crate::region::RegionEstimator;
use crate::seeding::SeedAndPatternStage;
use crate::selection::selector::choose_best;
use crate::tracks::trajectory::Trajectory;
use crate::tracks::{Track, TrackCandidate, TrackKey};

/// A combined muon: outer track, inner track and their common fitted trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct MuonCandidate {
    pub outer_track: Arc<Track>,
    pub inner_track: Arc<Track>,
    pub trajectory: Trajectory,
    /// Chi-square probability score of `trajectory` (lower is better)
    pub score: f64,
    /// Accepted muon hits that entered the fit
    pub n_muon_hits: usize,
    /// `true` when no muon hit could be added to the inner trajectory
    pub tracker_only: bool,
}

impl MuonCandidate {
    fn from_combination(outer_track: Arc<Track>, combination: Combination) -> Self {
        let score = combination.score();
        MuonCandidate {
            outer_track,
            inner_track: combination.inner_track,
            trajectory: combination.trajectory,
            score,
            n_muon_hits: combination.n_muon_hits,
            tracker_only: combination.tracker_only,
        }
    }

    fn rank(&self) -> (OrderedFloat<f64>, Reverse<usize>, Reverse<usize>) {
        (
            OrderedFloat(self.score),
            Reverse(self.n_muon_hits),
            Reverse(self.trajectory.n_valid_hits()),
        )
    }
}

/// Tracker collections of the current event.
#[derive(Debug, Clone, Default)]
pub struct EventCache {
    tracks: Vec<Arc<Track>>,
    trajectories: Vec<Trajectory>,
    by_key: HashMap<TrackKey, usize, RandomState>,
}

impl EventCache {
    /// Read the configured tracker collections from an event.
    ///
    /// Missing collections are logged and treated as empty. Trajectories are indexed by the
    /// key of the track they belong to; the first trajectory of a key wins.
    pub fn load(event: &dyn EventSource, params: &GlobalMuonParams) -> Self {
        let tracks = match event.tracker_tracks(&params.tracker_track_label) {
            Some(tracks) => tracks.to_vec(),
            None => {
                warn!(
                    "tracker track collection '{}' not found in event",
                    params.tracker_track_label
                );
                Vec::new()
            }
        };

        let trajectories = if params.tracker_trajectories_available {
            match event.tracker_trajectories(&params.tracker_trajectory_label) {
                Some(trajectories) => trajectories.to_vec(),
                None => {
                    warn!(
                        "tracker trajectory collection '{}' not found in event",
                        params.tracker_trajectory_label
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut by_key = HashMap::with_hasher(RandomState::new());
        for (idx, trajectory) in trajectories.iter().enumerate() {
            if let Some(key) = trajectory.track_key() {
                by_key.entry(key).or_insert(idx);
            }
        }

        EventCache {
            tracks,
            trajectories,
            by_key,
        }
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// Trajectory produced by the track stored at `key`.
    pub fn trajectory_for(&self, key: TrackKey) -> Option<&Trajectory> {
        self.by_key.get(&key).map(|&idx| &self.trajectories[idx])
    }

    /// Every tracker track of the event as a track-only candidate, in event order.
    pub fn candidates(&self) -> Vec<TrackCandidate> {
        self.tracks
            .iter()
            .map(|track| TrackCandidate::new(Arc::clone(track)))
            .collect()
    }
}

/// Anything able to turn one outer candidate into combined muon candidates.
pub trait MuonTrajectoryBuilder {
    /// Best-first combined candidates of one outer track; empty when nothing fits.
    fn trajectories(&self, outer: &TrackCandidate) -> CandidateContainer;
}

/// Long-lived global muon builder.
pub struct GlobalMuonTrajectoryBuilder<'s> {
    params: GlobalMuonParams,
    services: Services<'s>,
    region_estimator: RegionEstimator,
    hit_filter: HitQualityFilter,
    pattern: OnceCell<Option<&'s dyn PatternRecognition>>,
    cache: EventCache,
}

impl<'s> GlobalMuonTrajectoryBuilder<'s> {
    /// Construct a builder from its configuration and collaborators.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: configuration, validated here
    /// * `services`: collaborator handles, kept alive by the host for `'s`
    ///
    /// Return
    /// ----------
    /// * the builder, or the [`MuonError`] raised by [`GlobalMuonParams::validate`]
    pub fn new(params: GlobalMuonParams, services: Services<'s>) -> Result<Self, MuonError> {
        params.validate()?;
        debug!("global muon builder configured with {params}");

        Ok(GlobalMuonTrajectoryBuilder {
            region_estimator: RegionEstimator::new(&params),
            hit_filter: HitQualityFilter::new(&params),
            params,
            services,
            pattern: OnceCell::new(),
            cache: EventCache::default(),
        })
    }

    pub fn params(&self) -> &GlobalMuonParams {
        &self.params
    }

    /// Resolve the pattern-recognition builder by name.
    ///
    /// Idempotent: the lookup runs on the first successful call only. Nothing is resolved
    /// when the configuration never runs pattern recognition.
    ///
    /// Return
    /// ----------
    /// * [`MuonError::UnknownPatternBuilder`] when the registry does not know the name
    pub fn initialize(&self) -> Result<(), MuonError> {
        self.pattern
            .get_or_try_init(|| {
                if !self.params.needs_pattern_recognition() {
                    return Ok(None);
                }
                let registry = self.services.patterns;
                let name = &self.params.pattern_builder_name;
                match registry.resolve(name) {
                    Some(pattern) => {
                        info!("pattern recognition builder '{name}' resolved");
                        Ok(Some(pattern))
                    }
                    None => Err(MuonError::UnknownPatternBuilder(name.clone())),
                }
            })
            .map(|_| ())
    }

    /// Resolved pattern-recognition builder, `None` when not configured.
    ///
    /// Return
    /// ----------
    /// * [`MuonError::UninitializedBuilder`] before [`initialize`](Self::initialize) succeeded
    pub fn pattern_builder(&self) -> Result<Option<&'s dyn PatternRecognition>, MuonError> {
        self.pattern
            .get()
            .copied()
            .ok_or(MuonError::UninitializedBuilder)
    }

    /// Install a new event and return the per-event context.
    ///
    /// Initializes the builder if needed, then replaces the event cache.
    pub fn set_event<'b>(
        &'b mut self,
        event: &dyn EventSource,
    ) -> Result<GlobalMuonEvent<'b, 's>, MuonError> {
        self.initialize()?;
        self.cache = EventCache::load(event, &self.params);
        debug!(
            "event loaded: {} tracker tracks, {} tracker trajectories",
            self.cache.tracks().len(),
            self.cache.trajectories().len()
        );
        let pattern = self.pattern_builder()?;

        Ok(GlobalMuonEvent {
            builder: self,
            pattern,
        })
    }
}

/// Per-event view of a [`GlobalMuonTrajectoryBuilder`].
pub struct GlobalMuonEvent<'b, 's> {
    builder: &'b GlobalMuonTrajectoryBuilder<'s>,
    pattern: Option<&'s dyn PatternRecognition>,
}

impl<'b, 's> GlobalMuonEvent<'b, 's> {
    pub fn cache(&self) -> &EventCache {
        &self.builder.cache
    }

    fn outer_trajectory(&self, outer: &TrackCandidate) -> Option<Trajectory> {
        match &outer.trajectory {
            Some(trajectory) => Some(trajectory.clone()),
            None => self.builder.services.converter.trajectory(&outer.track),
        }
    }

    fn best_combination(&self, outer: &TrackCandidate) -> Option<MuonCandidate> {
        let builder = self.builder;
        let params = &builder.params;

        let Some(outer_trajectory) = self.outer_trajectory(outer) else {
            debug!("outer track {:?} has no trajectory", outer.track.key);
            return None;
        };

        let region = builder.region_estimator.define_region(&outer.track);
        let candidates = builder.cache.candidates();
        let pruned = match params.strategy {
            CombinationStrategy::RegionConstrained => {
                choose_regional_tracker_tracks(&region, &candidates)
            }
            CombinationStrategy::Exhaustive => candidates,
        };

        let stage = SeedAndPatternStage::new(
            params,
            self.pattern,
            builder.services.seed_generator,
            &builder.cache,
        );
        let inner = stage.make_tk_cand_collection(&outer_trajectory, &region, pruned);
        if inner.is_empty() {
            info!("no tracker candidate in {region}");
            return None;
        }

        let selection = builder.hit_filter.select(outer_trajectory.hits());
        let combiner = CombinationBuilder::new(
            params,
            builder.services.refitter,
            builder.services.converter,
        );
        let mut combinations: Vec<Combination> = inner
            .iter()
            .filter_map(|candidate| combiner.build(&selection, candidate))
            .collect();

        let best = choose_best(&combinations, |combination: &Combination| {
            &combination.trajectory
        })?;
        let winner = MuonCandidate::from_combination(
            Arc::clone(&outer.track),
            combinations.swap_remove(best),
        );

        info!(
            "{} tracker candidates, {} combinations, best score {:.3} with {} muon hits",
            inner.len(),
            combinations.len() + 1,
            winner.score,
            winner.n_muon_hits
        );

        match params.max_score {
            Some(max_score) if winner.score > max_score => {
                debug!(
                    "best combination rejected: score {:.3} above {max_score:.3}",
                    winner.score
                );
                None
            }
            _ => Some(winner),
        }
    }

    /// Best combined candidate of every outer track, merged best-first.
    ///
    /// With [`clean_shared_inner`](GlobalMuonParams::clean_shared_inner), an inner track is
    /// given to the best-scoring outer track only; the other claimants lose their candidate.
    pub fn trajectories_for(&self, outers: &[TrackCandidate]) -> CandidateContainer {
        let mut winners: CandidateContainer = outers
            .iter()
            .filter_map(|outer| self.best_combination(outer))
            .collect();
        winners.sort_by_key(MuonCandidate::rank);

        if !self.builder.params.clean_shared_inner {
            return winners;
        }

        let mut claimed: HashSet<TrackKey, RandomState> = HashSet::default();
        winners.retain(|candidate| match candidate.inner_track.key {
            Some(key) if !claimed.insert(key) => {
                debug!(
                    "inner track {key:?} already used, dropping outer {:?}",
                    candidate.outer_track.key
                );
                false
            }
            _ => true,
        });
        winners
    }
}

impl MuonTrajectoryBuilder for GlobalMuonEvent<'_, '_> {
    fn trajectories(&self, outer: &TrackCandidate) -> CandidateContainer {
        self.best_combination(outer).into_iter().collect()
    }
}
