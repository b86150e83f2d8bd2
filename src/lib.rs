//! # Global muon trajectory builder
//!
//! Fuse a track reconstructed in the outer muon system with compatible tracks from the inner
//! tracker into a single, re-fitted global muon trajectory.
//!
//! For every outer candidate the builder
//! 1. opens a region of interest around its direction ([`region`]),
//! 2. keeps the tracker tracks pointing inside it ([`region::pruner`]),
//! 3. makes sure each of them carries a detailed trajectory ([`seeding`]),
//! 4. filters the outer muon hits ([`hit_filter`]),
//! 5. merges and re-fits every outer/inner pairing ([`combination`]),
//! 6. keeps the pairing with the best chi-square probability ([`selection`]).
//!
//! Track fitting, propagation, pattern recognition and event access are delegated to the
//! host through the traits of [`collaborators`]. The entry point is
//! [`builder::GlobalMuonTrajectoryBuilder`].
pub mod builder;
pub mod collaborators;
pub mod combination;
pub mod constants;
pub mod hit_filter;
pub mod muon_errors;
pub mod params;
pub mod region;
pub mod seeding;
pub mod selection;
pub mod tracks;

pub use builder::{
    GlobalMuonEvent, GlobalMuonTrajectoryBuilder, MuonCandidate, MuonTrajectoryBuilder,
};
pub use muon_errors::MuonError;
pub use params::GlobalMuonParams;
