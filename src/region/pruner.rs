use crate::region::Region;
use crate::tracks::TrackCandidate;

/// Keep the tracker candidates whose direction lies inside the region of interest.
///
/// This is a hard geometric cut, not a score: it only bounds the number of pairings the
/// combination stage has to evaluate.
///
/// Arguments
/// -----------------
/// * `region`: the region of interest built around the outer track
/// * `candidates`: tracker candidates, in event order
///
/// Return
/// ----------
/// * the order-preserving subsequence of `candidates` inside `region` (empty in, empty out)
pub fn choose_regional_tracker_tracks(
    region: &Region,
    candidates: &[TrackCandidate],
) -> Vec<TrackCandidate> {
    candidates
        .iter()
        .filter(|cand| region.contains(&cand.track.params))
        .cloned()
        .collect()
}

#[cfg(test)]
mod pruner_test {
    use std::sync::Arc;

    use super::*;
    use crate::params::GlobalMuonParams;
    use crate::region::RegionEstimator;
    use crate::tracks::{Track, TrackKey, TrackParameters};

    fn candidate(key: usize, eta: f64, phi: f64) -> TrackCandidate {
        TrackCandidate::new(Arc::new(Track::new(
            TrackKey(key),
            TrackParameters::new(eta, phi, 0.05),
        )))
    }

    fn region() -> Region {
        let params = GlobalMuonParams::builder()
            .region_min_half_width(0.1)
            .build()
            .unwrap();
        let outer = Track::new(TrackKey(0), TrackParameters::new(0.8, 1.0, 0.05));
        RegionEstimator::new(&params).define_region(&outer)
    }

    #[test]
    fn test_inside_and_outside() {
        let kept = choose_regional_tracker_tracks(
            &region(),
            &[candidate(1, 0.82, 1.03), candidate(2, 1.5, 1.0)],
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].track.key, Some(TrackKey(1)));
    }

    #[test]
    fn test_order_is_preserved() {
        let input = vec![
            candidate(5, 0.85, 0.95),
            candidate(6, 3.0, 0.0),
            candidate(2, 0.75, 1.05),
            candidate(9, 0.8, 1.0),
        ];
        let kept = choose_regional_tracker_tracks(&region(), &input);

        let keys: Vec<_> = kept.iter().filter_map(|c| c.track.key).collect();
        assert_eq!(keys, vec![TrackKey(5), TrackKey(2), TrackKey(9)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(choose_regional_tracker_tracks(&region(), &[]).is_empty());
    }
}
