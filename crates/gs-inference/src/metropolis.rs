//! Random-walk Metropolis sampler over (difficulties, abilities, discrimination).
//!
//! Target weight (unnormalized):
//!
//! `g(alpha, d, p) = prod_{s,q} 2 / (1 + exp(alpha * r[s,q] * (d[q] - p[s])))`
//!
//! Each iteration perturbs every component with a uniform offset, folds the
//! difficulties and abilities back towards `[0, 1]` with a single reflection,
//! and takes `|alpha|` for the discrimination.

use crate::chain::{ChainLog, SamplerResult};
use crate::math::response_factor;
use gs_core::{ResultsMatrix, Result, SamplerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pseudo-likelihood weight `g(alpha, d, p)`.
pub fn pseudo_likelihood(
    results: &ResultsMatrix,
    alpha: f64,
    difficulties: &[f64],
    abilities: &[f64],
) -> f64 {
    let mut g = 1.0;
    for (s, &p) in abilities.iter().enumerate().take(results.n_students()) {
        for (q, &r) in results.row(s).iter().enumerate() {
            g *= response_factor(alpha * f64::from(r) * (difficulties[q] - p));
        }
    }
    g
}

/// Fold a proposed value towards `[0, 1]`.
///
/// Values above 1 become `1 - x`, then values below 0 become `-x`. Applied
/// once: inputs further than 1 from the interval stay out of range.
#[inline]
pub fn reflect_unit(x: f64) -> f64 {
    let x = if x > 1.0 { 1.0 - x } else { x };
    if x < 0.0 { -x } else { x }
}

/// Metropolis accept/reject on raw weights.
///
/// Accepts if `newg > oldg`; otherwise draws `u ~ U[0,1)` and accepts iff
/// `oldg * u < newg`. No draw happens on the first branch. With `oldg == 0`
/// every strictly positive `newg` is accepted.
#[inline]
pub fn metropolis_accept(oldg: f64, newg: f64, rng: &mut impl Rng) -> bool {
    newg > oldg || oldg * rng.random::<f64>() < newg
}

/// Uniform offset in `[-half_width, half_width)`.
#[inline]
fn uniform_offset(half_width: f64, rng: &mut impl Rng) -> f64 {
    half_width * (2.0 * rng.random::<f64>() - 1.0)
}

/// Run phase, derived from the iteration counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No iteration executed yet.
    Initializing,
    /// Inside the burn-in window; states are not recorded.
    Thermalizing,
    /// Recording states into the chain.
    Sampling,
    /// All `THERM_LEN + SIM_LEN` iterations executed.
    Done,
}

/// Current position of the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    /// Difficulty per question.
    pub difficulties: Vec<f64>,
    /// Ability per student.
    pub abilities: Vec<f64>,
    /// Discrimination.
    pub alpha: f64,
    /// `g` at the current position.
    pub weight: f64,
}

impl ChainState {
    /// All difficulties and abilities at 0.5, discrimination at 0.
    pub fn initial(results: &ResultsMatrix) -> Self {
        let difficulties = vec![0.5; results.n_questions()];
        let abilities = vec![0.5; results.n_students()];
        let alpha = 0.0;
        let weight = pseudo_likelihood(results, alpha, &difficulties, &abilities);
        Self { difficulties, abilities, alpha, weight }
    }
}

/// Metropolis sampler bound to one results matrix and one random stream.
pub struct MetropolisSampler<'a, R: Rng> {
    results: &'a ResultsMatrix,
    config: SamplerConfig,
    rng: R,
    state: ChainState,
    proposal_d: Vec<f64>,
    proposal_p: Vec<f64>,
    iteration: usize,
    accepted: usize,
    chain: ChainLog,
}

impl<'a> MetropolisSampler<'a, StdRng> {
    /// Sampler driven by `StdRng::seed_from_u64(config.seed)`.
    pub fn seeded(results: &'a ResultsMatrix, config: SamplerConfig) -> Self {
        Self::with_rng(results, config, StdRng::seed_from_u64(config.seed))
    }
}

impl<'a, R: Rng> MetropolisSampler<'a, R> {
    /// Sampler driven by a caller-supplied generator. `config.seed` is ignored.
    pub fn with_rng(results: &'a ResultsMatrix, config: SamplerConfig, rng: R) -> Self {
        let state = ChainState::initial(results);
        Self {
            results,
            config,
            rng,
            proposal_d: state.difficulties.clone(),
            proposal_p: state.abilities.clone(),
            state,
            iteration: 0,
            accepted: 0,
            chain: ChainLog::with_capacity(config.sim_len),
        }
    }

    fn total_len(&self) -> usize {
        self.config.therm_len + self.config.sim_len
    }

    /// Phase of the run after the iterations executed so far.
    pub fn phase(&self) -> Phase {
        if self.iteration >= self.total_len() {
            Phase::Done
        } else if self.iteration == 0 {
            Phase::Initializing
        } else if self.iteration <= self.config.therm_len {
            Phase::Thermalizing
        } else {
            Phase::Sampling
        }
    }

    /// Current position.
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Accepted proposals so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Iterations executed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Execute one iteration. Returns whether the proposal was accepted,
    /// or `None` once the run is complete.
    pub fn step(&mut self) -> Option<bool> {
        if self.phase() == Phase::Done {
            return None;
        }

        let delta = self.config.delta;
        for (nd, &d) in self.proposal_d.iter_mut().zip(&self.state.difficulties) {
            *nd = d + uniform_offset(delta, &mut self.rng);
        }
        for (np, &p) in self.proposal_p.iter_mut().zip(&self.state.abilities) {
            *np = p + uniform_offset(delta, &mut self.rng);
        }
        let alpha = self.state.alpha + uniform_offset(self.config.alpha_delta, &mut self.rng);

        for x in self.proposal_d.iter_mut().chain(self.proposal_p.iter_mut()) {
            *x = reflect_unit(*x);
        }
        let alpha = alpha.abs();

        let newg = pseudo_likelihood(self.results, alpha, &self.proposal_d, &self.proposal_p);
        let accepted = metropolis_accept(self.state.weight, newg, &mut self.rng);
        if accepted {
            std::mem::swap(&mut self.state.difficulties, &mut self.proposal_d);
            std::mem::swap(&mut self.state.abilities, &mut self.proposal_p);
            self.state.alpha = alpha;
            self.state.weight = newg;
            self.accepted += 1;
        }

        if self.iteration >= self.config.therm_len {
            self.chain.push(&self.state.difficulties, &self.state.abilities, self.state.alpha);
        }
        self.iteration += 1;
        Some(accepted)
    }

    /// Execute all remaining iterations and return the chain.
    pub fn run(mut self) -> SamplerResult {
        while self.step().is_some() {}
        let accept_ratio = self.accepted as f64 / self.config.sim_len as f64;
        SamplerResult { chain: self.chain, accepted: self.accepted, accept_ratio }
    }
}

/// Run a full Metropolis chain seeded from `config.seed`.
pub fn sample_metropolis(results: &ResultsMatrix, config: SamplerConfig) -> Result<SamplerResult> {
    config.validate()?;
    Ok(MetropolisSampler::seeded(results, config).run())
}

/// Run a full Metropolis chain on a caller-supplied generator.
pub fn sample_metropolis_with_rng<R: Rng>(
    results: &ResultsMatrix,
    config: SamplerConfig,
    rng: R,
) -> Result<SamplerResult> {
    config.validate()?;
    Ok(MetropolisSampler::with_rng(results, config, rng).run())
}
