//! Posterior summary of a Metropolis chain.
//!
//! Reduces a [`ChainLog`] to per-parameter mean/std, pairwise correlation
//! summaries and the marginalized ability of idealized perfect and worst
//! examinees. The serialized layout of [`PosteriorSummary`] is the
//! `stats.json` document read by the voting and report stages.

use crate::chain::ChainLog;
use crate::math::{column_mean_std, linspace, mean_std, response_factor};
use serde::{Deserialize, Serialize};

/// A `(mean, std)` pair, serialized as a two-element array.
///
/// Non-finite values serialize as `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPair", into = "RawPair")]
pub struct MeanStd {
    /// Mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl From<(f64, f64)> for MeanStd {
    fn from((mean, std): (f64, f64)) -> Self {
        Self { mean, std }
    }
}

#[derive(Serialize, Deserialize)]
struct RawPair(Option<f64>, Option<f64>);

impl From<RawPair> for MeanStd {
    fn from(raw: RawPair) -> Self {
        Self { mean: nan_if_null(raw.0), std: nan_if_null(raw.1) }
    }
}

impl From<MeanStd> for RawPair {
    fn from(v: MeanStd) -> Self {
        RawPair(Some(v.mean), Some(v.std))
    }
}

fn nan_if_null(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

/// Pairwise correlation data for one parameter family.
///
/// `lower[i]` holds `corr[j, i]` for every `j < i`, so `lower[0]` is empty.
/// `mean`/`std` aggregate the `n (n - 1) / 2` distinct pairs and are NaN
/// when fewer than two parameters exist. Serialized as `[lower, mean, std]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCorrelation", into = "RawCorrelation")]
pub struct CorrelationSummary {
    /// Triangular per-index layout.
    pub lower: Vec<Vec<f64>>,
    /// Mean over all distinct pairs.
    pub mean: f64,
    /// Population std over all distinct pairs.
    pub std: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCorrelation(Vec<Vec<Option<f64>>>, Option<f64>, Option<f64>);

impl From<RawCorrelation> for CorrelationSummary {
    fn from(raw: RawCorrelation) -> Self {
        Self {
            lower: raw.0.into_iter().map(|row| row.into_iter().map(nan_if_null).collect()).collect(),
            mean: nan_if_null(raw.1),
            std: nan_if_null(raw.2),
        }
    }
}

impl From<CorrelationSummary> for RawCorrelation {
    fn from(v: CorrelationSummary) -> Self {
        RawCorrelation(
            v.lower.into_iter().map(|row| row.into_iter().map(Some).collect()).collect(),
            Some(v.mean),
            Some(v.std),
        )
    }
}

impl CorrelationSummary {
    /// Correlation between parameters `i` and `j` (`i != j`).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i > j { self.lower[i][j] } else { self.lower[j][i] }
    }

    /// Number of parameters covered.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// `true` if no parameter is covered.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }
}

/// Symmetric matrix of `mean(x_i x_j) - mean(x_i) mean(x_j)` over the chain.
///
/// `samples[t][i]` is parameter `i` in sample `t`; `means[i]` its chain mean.
pub fn correlation_matrix(samples: &[Vec<f64>], means: &[f64]) -> Vec<Vec<f64>> {
    let n = means.len();
    let n_samples = samples.len() as f64;
    let mut out = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let cross = samples.iter().map(|x| x[i] * x[j]).sum::<f64>() / n_samples;
            let c = cross - means[i] * means[j];
            out[i][j] = c;
            out[j][i] = c;
        }
    }
    out
}

/// Export layout and `i < j` aggregate of a full correlation matrix.
pub fn summarize_correlations(matrix: &[Vec<f64>]) -> CorrelationSummary {
    let n = matrix.len();
    let upper: Vec<f64> =
        (0..n).flat_map(|i| (i + 1..n).map(move |j| matrix[i][j])).collect();
    let (mean, std) = mean_std(&upper);
    let lower = (0..n).map(|i| (0..i).map(|j| matrix[j][i]).collect::<Vec<f64>>()).collect();
    CorrelationSummary { lower, mean, std }
}

/// Idealized examinee whose ability is marginalized over the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    /// Answers every question correctly.
    Perfect,
    /// Answers every question incorrectly.
    Worst,
}

impl Extreme {
    /// Outcome sign used in the response factor.
    pub fn sign(self) -> f64 {
        match self {
            Extreme::Perfect => 1.0,
            Extreme::Worst => -1.0,
        }
    }
}

/// Ability grid over `[0, 1]` and its normalized posterior mass.
///
/// `W[k] = sum_t prod_q 2 / (1 + exp(extreme * alpha_t * (d_t[q] - grid[k])))`,
/// then `W` is scaled to sum to 1.
pub fn extremal_weights(chain: &ChainLog, extreme: Extreme, n_points: usize) -> (Vec<f64>, Vec<f64>) {
    let grid = linspace(0.0, 1.0, n_points);
    let sign = extreme.sign();
    let mut weights: Vec<f64> = grid
        .iter()
        .map(|&ps| {
            chain
                .difficulties()
                .iter()
                .zip(chain.alphas())
                .map(|(ds, &alpha)| {
                    ds.iter().map(|&d| response_factor(sign * alpha * (d - ps))).product::<f64>()
                })
                .sum::<f64>()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    (grid, weights)
}

/// Mean and std of the idealized examinee's ability.
pub fn extremal_score(chain: &ChainLog, extreme: Extreme, n_points: usize) -> MeanStd {
    let (grid, weights) = extremal_weights(chain, extreme, n_points);
    let mean: f64 = weights.iter().zip(&grid).map(|(w, x)| w * x).sum();
    let second: f64 = weights.iter().zip(&grid).map(|(w, x)| w * x * x).sum();
    MeanStd { mean, std: (second - mean * mean).sqrt() }
}

/// Everything downstream stages need from a chain (`stats.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Acceptance ratio of the run.
    pub accept_ratio: f64,
    /// Ability per student.
    pub scores: Vec<MeanStd>,
    /// Marginalized ability of an always-correct examinee.
    pub perfect_score: MeanStd,
    /// Marginalized ability of an always-wrong examinee.
    pub worse_score: MeanStd,
    /// Ability correlations.
    pub scores_corrs: CorrelationSummary,
    /// Difficulty per question.
    pub difficulties: Vec<MeanStd>,
    /// Difficulty correlations.
    pub difficulties_corrs: CorrelationSummary,
    /// Discrimination.
    pub alpha: MeanStd,
}

/// Reduce a finished chain to its [`PosteriorSummary`].
pub fn summarize(chain: &ChainLog, accept_ratio: f64, perfect_scorer_pts: usize) -> PosteriorSummary {
    let scores: Vec<MeanStd> =
        column_mean_std(chain.abilities()).into_iter().map(MeanStd::from).collect();
    let difficulties: Vec<MeanStd> =
        column_mean_std(chain.difficulties()).into_iter().map(MeanStd::from).collect();
    let alpha = MeanStd::from(mean_std(chain.alphas()));

    let p_means: Vec<f64> = scores.iter().map(|s| s.mean).collect();
    let d_means: Vec<f64> = difficulties.iter().map(|s| s.mean).collect();
    let scores_corrs = summarize_correlations(&correlation_matrix(chain.abilities(), &p_means));
    let difficulties_corrs =
        summarize_correlations(&correlation_matrix(chain.difficulties(), &d_means));

    PosteriorSummary {
        accept_ratio,
        perfect_score: extremal_score(chain, Extreme::Perfect, perfect_scorer_pts),
        worse_score: extremal_score(chain, Extreme::Worst, perfect_scorer_pts),
        scores,
        scores_corrs,
        difficulties,
        difficulties_corrs,
        alpha,
    }
}
