//! # External collaborators
//!
//! The global muon builder does not fit tracks, propagate states, or read event data itself.
//! These concerns are delegated to host-provided services described by the traits below:
//!
//! | Trait                         | Role                                                   |
//! |-------------------------------|--------------------------------------------------------|
//! | [`PatternRecognition`]        | grow one tracker trajectory from a seed                |
//! | [`PatternRecognitionRegistry`]| look a pattern-recognition builder up by name          |
//! | [`SeedGenerator`]             | make tracker seeds from the outer trajectory           |
//! | [`ReFitter`]                  | fit a merged hit sequence from a starting state        |
//! | [`TrackConverter`]            | turn a track summary into a trajectory                 |
//! | [`EventSource`]               | provide the event's tracker tracks and trajectories    |
//!
//! The builder holds them as non-owning handles bundled in [`Services`]; the host keeps them
//! alive for the builder's lifetime.
//!
//! ## See also
//! ------------
//! * [`GlobalMuonTrajectoryBuilder::new`](crate::builder::GlobalMuonTrajectoryBuilder::new) – consumes a [`Services`] bundle.
//! * [`InMemoryEvent`] – in-process [`EventSource`].
use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;

use crate::muon_errors::MuonError;
use crate::region::Region;
use crate::tracks::hit::Hit;
use crate::tracks::trajectory::{Trajectory, TrajectoryState};
use crate::tracks::Track;

/// Starting point of a pattern-recognition pass.
///
/// Inside-out seeds remember the tracker track they come from, so the trajectory they grow
/// can be attached back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub state: TrajectoryState,
    pub track: Option<Arc<Track>>,
}

impl Seed {
    /// A seed without originating track (outside-in seeding).
    pub fn new(state: TrajectoryState) -> Self {
        Seed { state, track: None }
    }

    /// An inside-out seed taken at the reference point of a tracker track.
    pub fn from_track(track: Arc<Track>) -> Self {
        Seed {
            state: TrajectoryState::new(track.params, track.reference_point),
            track: Some(track),
        }
    }
}

/// Tracker pattern recognition: grow a trajectory from a seed.
pub trait PatternRecognition {
    /// `None` when the seed does not lead to a trajectory.
    fn build(&self, seed: &Seed) -> Option<Trajectory>;
}

impl<F> PatternRecognition for F
where
    F: Fn(&Seed) -> Option<Trajectory>,
{
    fn build(&self, seed: &Seed) -> Option<Trajectory> {
        self(seed)
    }
}

/// Named lookup of pattern-recognition builders.
pub trait PatternRecognitionRegistry {
    fn resolve(&self, name: &str) -> Option<&dyn PatternRecognition>;
}

/// Simple in-process registry of pattern-recognition builders keyed by name.
#[derive(Default)]
pub struct PatternRegistry {
    builders: HashMap<String, Box<dyn PatternRecognition>, RandomState>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` under `name`, replacing any previous entry.
    pub fn register(
        mut self,
        name: impl Into<String>,
        builder: impl PatternRecognition + 'static,
    ) -> Self {
        self.builders.insert(name.into(), Box::new(builder));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

impl PatternRecognitionRegistry for PatternRegistry {
    fn resolve(&self, name: &str) -> Option<&dyn PatternRecognition> {
        self.builders.get(name).map(|builder| builder.as_ref())
    }
}

/// Makes tracker seeds from the outer trajectory, extrapolated inward into the region.
pub trait SeedGenerator {
    fn seeds(&self, outer: &Trajectory, region: &Region) -> Vec<Seed>;
}

/// Track re-fit of a merged hit sequence.
pub trait ReFitter {
    /// Fit `hits` (already ordered outward) starting from `start`.
    ///
    /// Return
    /// ----------
    /// * the fitted trajectory, or [`MuonError::RefitDidNotConverge`] when the fit fails
    fn refit(&self, hits: &[Hit], start: &TrajectoryState) -> Result<Trajectory, MuonError>;
}

/// Conversion from a track summary to a detailed trajectory.
pub trait TrackConverter {
    fn trajectory(&self, track: &Track) -> Option<Trajectory>;
}

/// Read access to the collections of one event.
///
/// A missing collection is reported as `None`, not as an error.
pub trait EventSource {
    fn tracker_tracks(&self, label: &str) -> Option<&[Arc<Track>]>;

    /// Tracker trajectories; each one is associated with its track through
    /// [`Trajectory::track_key`].
    fn tracker_trajectories(&self, label: &str) -> Option<&[Trajectory]>;
}

/// Event collections held in memory, keyed by label.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvent {
    tracks: HashMap<String, Vec<Arc<Track>>, RandomState>,
    trajectories: HashMap<String, Vec<Trajectory>, RandomState>,
}

impl InMemoryEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(mut self, label: impl Into<String>, tracks: Vec<Arc<Track>>) -> Self {
        self.tracks.insert(label.into(), tracks);
        self
    }

    pub fn with_trajectories(
        mut self,
        label: impl Into<String>,
        trajectories: Vec<Trajectory>,
    ) -> Self {
        self.trajectories.insert(label.into(), trajectories);
        self
    }
}

impl EventSource for InMemoryEvent {
    fn tracker_tracks(&self, label: &str) -> Option<&[Arc<Track>]> {
        self.tracks.get(label).map(Vec::as_slice)
    }

    fn tracker_trajectories(&self, label: &str) -> Option<&[Trajectory]> {
        self.trajectories.get(label).map(Vec::as_slice)
    }
}

/// Non-owning handles to every collaborator the builder calls.
#[derive(Clone, Copy)]
pub struct Services<'s> {
    pub patterns: &'s dyn PatternRecognitionRegistry,
    pub seed_generator: &'s dyn SeedGenerator,
    pub refitter: &'s dyn ReFitter,
    pub converter: &'s dyn TrackConverter,
}

#[cfg(test)]
mod collaborators_test {
    use nalgebra::Vector3;

    use super::*;
    use crate::tracks::{TrackKey, TrackParameters};

    fn state() -> TrajectoryState {
        TrajectoryState::new(TrackParameters::new(0.1, 0.2, 0.1), Vector3::zeros())
    }

    #[test]
    fn test_registry_resolves_by_name() {
        let registry = PatternRegistry::new()
            .register("ckf", |seed: &Seed| {
                Some(Trajectory::new(Vec::new(), 1.0, seed.state.clone()))
            });

        assert!(registry.resolve("ckf").is_some());
        assert!(registry.resolve("other").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["ckf"]);

        let built = registry
            .resolve("ckf")
            .and_then(|builder| builder.build(&Seed::new(state())));
        assert_eq!(built.map(|traj| traj.chi2()), Some(1.0));
    }

    #[test]
    fn test_seed_from_track_keeps_origin() {
        let track = Arc::new(
            Track::new(TrackKey(4), TrackParameters::new(0.5, 0.6, 0.02))
                .with_reference_point(Vector3::new(0.0, 0.1, 2.0)),
        );
        let seed = Seed::from_track(Arc::clone(&track));

        assert_eq!(seed.state.params, track.params);
        assert_eq!(seed.state.position, Vector3::new(0.0, 0.1, 2.0));
        assert_eq!(seed.track.and_then(|t| t.key), Some(TrackKey(4)));
    }

    #[test]
    fn test_in_memory_event_labels() {
        let event = InMemoryEvent::new().with_tracks(
            "tracks",
            vec![Arc::new(Track::new(TrackKey(0), TrackParameters::new(0.0, 0.0, 0.1)))],
        );

        assert_eq!(event.tracker_tracks("tracks").map(<[_]>::len), Some(1));
        assert!(event.tracker_tracks("other").is_none());
        assert!(event.tracker_trajectories("tracks").is_none());
    }
}
