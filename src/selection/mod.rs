//! # Candidate scoring and selection
//!
//! Every combined trajectory of an outer track is ranked by its chi-square probability
//! score ([`scoring::track_probability`]); the best one is kept
//! ([`selector::choose_trajectory`]).
//!
//! ## Ranking
//!
//! 1. lowest `−ln P(χ² ≥ chi2 | ndof)`,
//! 2. then the larger number of valid hits,
//! 3. then the lower raw chi-square.
//!
//! Trajectories without degrees of freedom get the worst finite score
//! ([`ZERO_DOF_SCORE`](crate::constants::ZERO_DOF_SCORE)).
pub mod scoring;
pub mod selector;
