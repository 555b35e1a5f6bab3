//! Chain storage and the persisted chain artifact.

use gs_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Post-burn-in samples of one Metropolis run.
///
/// Sample `t` is the triple `(difficulties[t], abilities[t], alphas[t])`.
/// The log only grows while the sampler runs and is read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainLog {
    difficulties: Vec<Vec<f64>>,
    abilities: Vec<Vec<f64>>,
    alphas: Vec<f64>,
}

impl ChainLog {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            difficulties: Vec::with_capacity(n),
            abilities: Vec::with_capacity(n),
            alphas: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, difficulties: &[f64], abilities: &[f64], alpha: f64) {
        self.difficulties.push(difficulties.to_vec());
        self.abilities.push(abilities.to_vec());
        self.alphas.push(alpha);
    }

    /// Assemble a chain from externally produced samples.
    ///
    /// All three sequences must have the same length and every sample of a
    /// family the same width.
    pub fn from_samples(
        difficulties: Vec<Vec<f64>>,
        abilities: Vec<Vec<f64>>,
        alphas: Vec<f64>,
    ) -> Result<Self> {
        if difficulties.len() != alphas.len() || abilities.len() != alphas.len() {
            return Err(Error::Validation(format!(
                "chain length mismatch: {} difficulty, {} ability, {} alpha samples",
                difficulties.len(),
                abilities.len(),
                alphas.len()
            )));
        }
        for (name, family) in [("difficulty", &difficulties), ("ability", &abilities)] {
            let width = family.first().map_or(0, Vec::len);
            if family.iter().any(|s| s.len() != width) {
                return Err(Error::Validation(format!("{name} samples have unequal widths")));
            }
        }
        Ok(Self { difficulties, abilities, alphas })
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.alphas.len()
    }

    /// `true` if no sample was recorded.
    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }

    /// Difficulty vectors, one per sample.
    pub fn difficulties(&self) -> &[Vec<f64>] {
        &self.difficulties
    }

    /// Ability vectors, one per sample.
    pub fn abilities(&self) -> &[Vec<f64>] {
        &self.abilities
    }

    /// Discrimination, one per sample.
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Number of questions.
    pub fn n_questions(&self) -> usize {
        self.difficulties.first().map_or(0, Vec::len)
    }

    /// Number of students.
    pub fn n_students(&self) -> usize {
        self.abilities.first().map_or(0, Vec::len)
    }
}

/// Outcome of a completed Metropolis run.
#[derive(Debug, Clone)]
pub struct SamplerResult {
    /// Recorded samples (`SIM_LEN` of them).
    pub chain: ChainLog,
    /// Accepted proposals over the whole run, burn-in included.
    pub accepted: usize,
    /// `accepted / SIM_LEN`. Not clamped: burn-in acceptances can push it above 1.
    pub accept_ratio: f64,
}

impl SamplerResult {
    /// Persistable form of this run.
    pub fn to_artifact(&self) -> ChainArtifact {
        ChainArtifact {
            ds_log: self.chain.difficulties.clone(),
            ps_log: self.chain.abilities.clone(),
            alpha_log: self.chain.alphas.clone(),
            accept_ratio: self.accept_ratio,
        }
    }
}

/// Persisted chain (`montecarlo.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainArtifact {
    /// Difficulty samples, `SIM_LEN x questions`.
    pub ds_log: Vec<Vec<f64>>,
    /// Ability samples, `SIM_LEN x students`.
    pub ps_log: Vec<Vec<f64>>,
    /// Discrimination samples.
    pub alpha_log: Vec<f64>,
    /// Acceptance ratio of the run.
    pub accept_ratio: f64,
}

impl ChainArtifact {
    /// Split into the chain and its acceptance ratio.
    pub fn into_parts(self) -> Result<(ChainLog, f64)> {
        let chain = ChainLog::from_samples(self.ds_log, self.ps_log, self.alpha_log)?;
        Ok((chain, self.accept_ratio))
    }
}
