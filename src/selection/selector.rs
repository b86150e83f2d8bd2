use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::selection::scoring::track_probability;
use crate::tracks::trajectory::Trajectory;

type SelectionKey = (
    OrderedFloat<f64>,
    Reverse<usize>,
    Reverse<usize>,
    OrderedFloat<f64>,
);

/// Lexicographic ranking key: score, more muon hits, more valid hits, lower chi-square.
fn selection_key(trajectory: &Trajectory) -> SelectionKey {
    (
        OrderedFloat(track_probability(trajectory)),
        Reverse(trajectory.n_muon_hits()),
        Reverse(trajectory.n_valid_hits()),
        OrderedFloat(trajectory.chi2()),
    )
}

fn best_index(keys: impl Iterator<Item = SelectionKey>) -> Option<usize> {
    keys.enumerate()
        .min_by_key(|(_, key)| *key)
        .map(|(idx, _)| idx)
}

/// Pick the best trajectory among the candidates of one outer track.
///
/// Arguments
/// -----------------
/// * `candidates`: fitted trajectories competing for the same outer track
///
/// Return
/// ----------
/// * the index of the trajectory with the lowest score; ties go to the larger number of
///   accepted muon hits, then to the larger number of valid hits, then to the lower
///   chi-square, then to the earlier candidate
/// * `None` for an empty slice
pub fn choose_trajectory(candidates: &[&Trajectory]) -> Option<usize> {
    best_index(candidates.iter().map(|trajectory| selection_key(trajectory)))
}

/// Same ranking as [`choose_trajectory`], over any record holding a trajectory.
pub fn choose_best<T, F>(items: &[T], trajectory: F) -> Option<usize>
where
    F: Fn(&T) -> &Trajectory,
{
    best_index(items.iter().map(|item| selection_key(trajectory(item))))
}
