//! Grades ("votes") derived from the ability chain.

use crate::math::mean_std;
use crate::posterior::MeanStd;

/// Vote scale and curve anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteScale {
    /// Ability mapped to `min_vote`.
    pub worst_mean: f64,
    /// Ability mapped to `max_vote`.
    pub perfect_mean: f64,
    /// Lowest vote.
    pub min_vote: f64,
    /// Highest vote.
    pub max_vote: f64,
}

impl VoteScale {
    /// Vote for a single ability value under exponent `gamma`.
    ///
    /// The ability is rescaled so that `worst_mean -> 0` and
    /// `perfect_mean -> 1`, clamped to `[0, 1]`, raised to `gamma`, then
    /// mapped linearly onto `[min_vote, max_vote]`.
    pub fn vote(&self, gamma: f64, ability: f64) -> f64 {
        let x = ((ability - self.worst_mean) / (self.perfect_mean - self.worst_mean)).clamp(0.0, 1.0);
        x.powf(gamma) * (self.max_vote - self.min_vote) + self.min_vote
    }
}

/// Per-student vote mean/std over every chain sample.
///
/// `abilities[t][s]` is the ability of student `s` in sample `t`.
pub fn vote(gamma: f64, abilities: &[Vec<f64>], scale: &VoteScale) -> Vec<MeanStd> {
    let n_students = abilities.first().map_or(0, Vec::len);
    let mut column = Vec::with_capacity(abilities.len());
    (0..n_students)
        .map(|s| {
            column.clear();
            column.extend(abilities.iter().map(|p| scale.vote(gamma, p[s])));
            MeanStd::from(mean_std(&column))
        })
        .collect()
}

/// For each student, the indices of students whose vote is statistically
/// indistinguishable: `(v_a - v_b)^2 < std_a^2 + std_b^2`.
///
/// The relation is symmetric and every student with a positive std is
/// similar to itself.
pub fn similar_students(votes: &[MeanStd]) -> Vec<Vec<usize>> {
    votes
        .iter()
        .map(|a| {
            votes
                .iter()
                .enumerate()
                .filter(|(_, b)| (a.mean - b.mean).powi(2) < a.std.powi(2) + b.std.powi(2))
                .map(|(i, _)| i)
                .collect()
        })
        .collect()
}
