#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;

use global_muon::collaborators::{
    InMemoryEvent, PatternRegistry, ReFitter, Seed, SeedGenerator, Services, TrackConverter,
};
use global_muon::muon_errors::MuonError;
use global_muon::params::GlobalMuonParams;
use global_muon::region::Region;
use global_muon::tracks::hit::{ChamberId, DetectorTechnology, Hit};
use global_muon::tracks::trajectory::{Trajectory, TrajectoryState};
use global_muon::tracks::{Track, TrackCandidate, TrackKey, TrackParameters};
use nalgebra::Vector3;

/// Re-fit whose chi-square is the sum of the local hit contributions.
#[derive(Default)]
pub struct SumChi2Fit {
    pub calls: Cell<usize>,
}

impl ReFitter for SumChi2Fit {
    fn refit(&self, hits: &[Hit], start: &TrajectoryState) -> Result<Trajectory, MuonError> {
        self.calls.set(self.calls.get() + 1);
        let chi2 = hits.iter().filter(|hit| hit.valid).map(|hit| hit.chi2).sum();
        Ok(Trajectory::new(hits.to_vec(), chi2, start.clone()))
    }
}

pub struct FailingFit;

impl ReFitter for FailingFit {
    fn refit(&self, _hits: &[Hit], _start: &TrajectoryState) -> Result<Trajectory, MuonError> {
        Err(MuonError::RefitDidNotConverge("matrix not positive definite".into()))
    }
}

/// Converts a track into a four-hit tracker trajectory at its reference point.
pub struct StateConverter;

impl TrackConverter for StateConverter {
    fn trajectory(&self, track: &Track) -> Option<Trajectory> {
        let mut trajectory = Trajectory::new(
            tracker_hits(4, 1.0),
            4.0,
            TrajectoryState::new(track.params, track.reference_point),
        );
        if let Some(key) = track.key {
            trajectory = trajectory.with_track_key(key);
        }
        Some(trajectory)
    }
}

pub struct NoConversion;

impl TrackConverter for NoConversion {
    fn trajectory(&self, _track: &Track) -> Option<Trajectory> {
        None
    }
}

/// Emits `count` seeds at the innermost state of the outer trajectory.
pub struct OuterStateSeeds {
    pub count: usize,
}

impl SeedGenerator for OuterStateSeeds {
    fn seeds(&self, outer: &Trajectory, _region: &Region) -> Vec<Seed> {
        (0..self.count)
            .map(|_| Seed::new(outer.inner_state().clone()))
            .collect()
    }
}

/// Pattern recognition growing a four-hit tracker trajectory from any seed.
pub fn grow_four_hits(seed: &Seed) -> Option<Trajectory> {
    Some(Trajectory::new(
        tracker_hits(4, 2.25),
        9.0,
        seed.state.clone(),
    ))
}

pub fn registry() -> PatternRegistry {
    PatternRegistry::new().register("tracker_ckf", grow_four_hits)
}

pub fn services<'s>(
    registry: &'s PatternRegistry,
    seeds: &'s dyn SeedGenerator,
    refitter: &'s dyn ReFitter,
    converter: &'s dyn TrackConverter,
) -> Services<'s> {
    Services {
        patterns: registry,
        seed_generator: seeds,
        refitter,
        converter,
    }
}

/// `n` two-dimensional tracker hits with the same local chi-square.
pub fn tracker_hits(n: u32, chi2: f64) -> Vec<Hit> {
    (0..n)
        .map(|i| {
            Hit::new(
                ChamberId::new(DetectorTechnology::Tracker, 0, i),
                i as u16,
                4.0 + 10.0 * f64::from(i),
                2,
            )
            .with_chi2(chi2)
        })
        .collect()
}

/// `n` one-dimensional DT hits in `chamber`.
pub fn dt_hits(chamber: u32, n: u32, chi2: f64) -> Vec<Hit> {
    (0..n)
        .map(|i| {
            Hit::new(
                ChamberId::new(DetectorTechnology::Dt, 1, chamber),
                i as u16,
                420.0 + f64::from(i),
                1,
            )
            .with_chi2(chi2)
        })
        .collect()
}

pub fn params_at(eta: f64, phi: f64) -> TrackParameters {
    TrackParameters::new(eta, phi, 0.05)
}

pub fn tracker_track(key: usize, eta: f64, phi: f64) -> Arc<Track> {
    Arc::new(Track::new(TrackKey(key), params_at(eta, phi)))
}

/// Tracker trajectory of `key` with four hits of local chi-square `chi2_per_hit`.
pub fn tracker_trajectory(key: usize, eta: f64, phi: f64, chi2_per_hit: f64) -> Trajectory {
    Trajectory::new(
        tracker_hits(4, chi2_per_hit),
        4.0 * chi2_per_hit,
        TrajectoryState::new(params_at(eta, phi), Vector3::zeros()),
    )
    .with_track_key(TrackKey(key))
}

/// Outer muon candidate with the given muon hits.
pub fn outer_candidate(key: usize, eta: f64, phi: f64, hits: Vec<Hit>) -> TrackCandidate {
    let params = params_at(eta, phi).with_errors(0.01, 0.01, 0.01);
    let track = Arc::new(Track::new(TrackKey(key), params));
    let trajectory = Trajectory::new(
        hits,
        2.0,
        TrajectoryState::new(params, Vector3::new(400.0, 0.0, 0.0)),
    );
    TrackCandidate::with_trajectory(track, trajectory)
}

pub fn event(
    params: &GlobalMuonParams,
    tracks: Vec<Arc<Track>>,
    trajectories: Vec<Trajectory>,
) -> InMemoryEvent {
    InMemoryEvent::new()
        .with_tracks(params.tracker_track_label.clone(), tracks)
        .with_trajectories(params.tracker_trajectory_label.clone(), trajectories)
}
