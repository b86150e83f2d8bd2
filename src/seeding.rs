//! # Tracker candidate collection
//!
//! Turns the pruned tracker tracks of one outer track into inner candidates that carry a
//! detailed trajectory, following the configured
//! [`ReconstructionDirection`]:
//!
//! | Direction   | Source of inner trajectories                                           |
//! |-------------|------------------------------------------------------------------------|
//! | `InsideOut` | event trajectory collection (key lookup) or pattern recognition seeded |
//! |             | from each pruned tracker track                                         |
//! | `OutsideIn` | pattern recognition seeded from the outer trajectory                   |
//! | `Either`    | inside-out first, outside-in when inside-out yields nothing            |
//!
//! Failures are absences: a seed that grows nothing or a track without trajectory simply
//! does not produce a candidate.
use std::sync::Arc;

use log::{debug, trace};

use crate::builder::EventCache;
use crate::collaborators::{PatternRecognition, Seed, SeedGenerator};
use crate::params::{GlobalMuonParams, ReconstructionDirection};
use crate::region::Region;
use crate::tracks::trajectory::Trajectory;
use crate::tracks::TrackCandidate;

/// Builds the inner candidate collection of one outer track.
pub struct SeedAndPatternStage<'a> {
    direction: ReconstructionDirection,
    trajectories_available: bool,
    require_tracker_trajectory: bool,
    pattern: Option<&'a dyn PatternRecognition>,
    seed_generator: &'a dyn SeedGenerator,
    cache: &'a EventCache,
}

impl<'a> SeedAndPatternStage<'a> {
    /// Arguments
    /// -----------------
    /// * `params`: direction, trajectory availability and drop policy
    /// * `pattern`: resolved pattern-recognition builder, if any is configured
    /// * `seed_generator`: outside-in seed source
    /// * `cache`: current event collections
    pub fn new(
        params: &GlobalMuonParams,
        pattern: Option<&'a dyn PatternRecognition>,
        seed_generator: &'a dyn SeedGenerator,
        cache: &'a EventCache,
    ) -> Self {
        SeedAndPatternStage {
            direction: params.direction,
            trajectories_available: params.tracker_trajectories_available,
            require_tracker_trajectory: params.require_tracker_trajectory,
            pattern,
            seed_generator,
            cache,
        }
    }

    fn grow(&self, seed: &Seed) -> Option<Trajectory> {
        let trajectory = self.pattern.and_then(|pattern| pattern.build(seed));
        if trajectory.is_none() {
            trace!("seed at {:?} produced no trajectory", seed.state.position);
        }
        trajectory
    }

    /// Run pattern recognition once per seed.
    ///
    /// Return
    /// ----------
    /// * the trajectories grown from the seeds, in seed order; failed seeds are absent
    pub fn make_trajs_from_seeds(&self, seeds: &[Seed]) -> Vec<Trajectory> {
        seeds.iter().filter_map(|seed| self.grow(seed)).collect()
    }

    /// Attach a trajectory to a track-only candidate.
    ///
    /// A candidate that already holds a trajectory is left untouched. Otherwise the trajectory
    /// is looked up by track key in the event collection, or grown from a seed at the track's
    /// reference point when the event provides no trajectories.
    pub fn add_traj(&self, candidate: &mut TrackCandidate) {
        if candidate.has_trajectory() {
            return;
        }

        candidate.trajectory = if self.trajectories_available {
            candidate
                .track
                .key
                .and_then(|key| self.cache.trajectory_for(key))
                .cloned()
        } else {
            let seed = Seed::from_track(Arc::clone(&candidate.track));
            self.grow(&seed).map(|trajectory| match candidate.track.key {
                Some(key) => trajectory.with_track_key(key),
                None => trajectory,
            })
        };
    }

    fn normalise(&self, candidate: TrackCandidate) -> Option<TrackCandidate> {
        if candidate.has_trajectory() || !self.require_tracker_trajectory {
            Some(candidate)
        } else {
            debug!(
                "dropping tracker track {:?}: no trajectory available",
                candidate.track.key
            );
            None
        }
    }

    fn inside_out(&self, pruned: Vec<TrackCandidate>) -> Vec<TrackCandidate> {
        pruned
            .into_iter()
            .filter_map(|mut candidate| {
                self.add_traj(&mut candidate);
                self.normalise(candidate)
            })
            .collect()
    }

    fn outside_in(&self, outer: &Trajectory, region: &Region) -> Vec<TrackCandidate> {
        let seeds = self.seed_generator.seeds(outer, region);
        debug!("{} outside-in seeds in {region}", seeds.len());
        self.make_trajs_from_seeds(&seeds)
            .into_iter()
            .map(TrackCandidate::from_trajectory)
            .collect()
    }

    /// Build the inner candidate collection of one outer track.
    ///
    /// Arguments
    /// -----------------
    /// * `outer`: outer trajectory, used to seed outside-in pattern recognition
    /// * `region`: region of interest of the outer track
    /// * `pruned`: tracker candidates surviving the region cut, in event order
    ///
    /// Return
    /// ----------
    /// * inner candidates; all of them hold a trajectory unless degraded inputs are allowed
    pub fn make_tk_cand_collection(
        &self,
        outer: &Trajectory,
        region: &Region,
        pruned: Vec<TrackCandidate>,
    ) -> Vec<TrackCandidate> {
        match self.direction {
            ReconstructionDirection::InsideOut => self.inside_out(pruned),
            ReconstructionDirection::OutsideIn => self.outside_in(outer, region),
            ReconstructionDirection::Either => {
                let inside = self.inside_out(pruned);
                if inside.is_empty() {
                    debug!("inside-out found no tracker candidate, trying outside-in");
                    self.outside_in(outer, region)
                } else {
                    inside
                }
            }
        }
    }
}
