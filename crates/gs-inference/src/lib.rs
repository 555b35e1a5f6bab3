//! # gs-inference
//!
//! Ability/difficulty estimation for gradestat.
//!
//! This crate provides:
//! - a random-walk Metropolis sampler over an item-response pseudo-likelihood
//! - the posterior reduction of its chain (means, correlations, extremal scores)
//! - vote computation from the ability chain

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Chain storage and the persisted chain artifact.
pub mod chain;
/// Shared numeric helpers.
pub mod math;
/// Metropolis sampler.
pub mod metropolis;
/// Posterior summary statistics.
pub mod posterior;
/// Votes derived from abilities.
pub mod voting;

pub use chain::{ChainArtifact, ChainLog, SamplerResult};
pub use metropolis::{MetropolisSampler, Phase, sample_metropolis, sample_metropolis_with_rng};
pub use posterior::{CorrelationSummary, Extreme, MeanStd, PosteriorSummary, summarize};
pub use voting::{VoteScale, similar_students, vote};
