//! Common data types for gradestat

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Binary exam outcomes, one row per student and one column per question.
///
/// Every cell is `+1` (correct) or `-1` (incorrect). Row and column order is
/// fixed at construction and shared with every derived artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsMatrix {
    n_students: usize,
    n_questions: usize,
    cells: Vec<i8>,
}

impl ResultsMatrix {
    /// Build from row-major cells. Fails unless every cell is `±1`.
    pub fn new(n_students: usize, n_questions: usize, cells: Vec<i8>) -> Result<Self> {
        if cells.len() != n_students * n_questions {
            return Err(Error::Data(format!(
                "expected {} cells ({} students x {} questions), got {}",
                n_students * n_questions,
                n_students,
                n_questions,
                cells.len()
            )));
        }
        if let Some(pos) = cells.iter().position(|&c| !matches!(c, 1 | -1)) {
            return Err(Error::Data(format!(
                "results are not complete: student {} question {} is {}",
                pos / n_questions.max(1),
                pos % n_questions.max(1),
                cells[pos]
            )));
        }
        Ok(Self { n_students, n_questions, cells })
    }

    /// Build from one row per student.
    pub fn from_rows(rows: Vec<Vec<i8>>) -> Result<Self> {
        let n_students = rows.len();
        let n_questions = rows.first().map_or(0, Vec::len);
        if let Some(s) = rows.iter().position(|r| r.len() != n_questions) {
            return Err(Error::Data(format!(
                "row {} has {} entries, expected {}",
                s,
                rows[s].len(),
                n_questions
            )));
        }
        Self::new(n_students, n_questions, rows.into_iter().flatten().collect())
    }

    /// Number of students (rows).
    pub fn n_students(&self) -> usize {
        self.n_students
    }

    /// Number of questions (columns).
    pub fn n_questions(&self) -> usize {
        self.n_questions
    }

    /// Outcome of `student` on `question` as `±1.0`.
    #[inline]
    pub fn get(&self, student: usize, question: usize) -> f64 {
        f64::from(self.cells[student * self.n_questions + question])
    }

    /// Outcomes of one student, in question order.
    pub fn row(&self, student: usize) -> &[i8] {
        let start = student * self.n_questions;
        &self.cells[start..start + self.n_questions]
    }
}

/// Sampler configuration. Immutable once handed to the sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Seed of the single pseudorandom stream.
    pub seed: u64,
    /// Half-width of the uniform difficulty/ability proposal.
    pub delta: f64,
    /// Half-width of the uniform discrimination proposal.
    pub alpha_delta: f64,
    /// Burn-in iterations (discarded).
    pub therm_len: usize,
    /// Recorded iterations.
    pub sim_len: usize,
}

impl SamplerConfig {
    /// Reject values the sampler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sim_len == 0 {
            return Err(Error::Config("SIM_LEN must be > 0".to_string()));
        }
        for (name, v) in [("DELTA", self.delta), ("ALPHADELTA", self.alpha_delta)] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Config(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        Ok(())
    }
}

/// Work-directory configuration (`simsetup.json`).
///
/// Keys keep their historical upper-case names. The sampler keys and
/// `PERFECT_SCORER_PTS` are required; the vote and report keys fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SimSetup {
    /// Sampler seed.
    pub seed: u64,
    /// Difficulty/ability proposal half-width.
    pub delta: f64,
    /// Discrimination proposal half-width.
    #[serde(rename = "ALPHADELTA")]
    pub alpha_delta: f64,
    /// Burn-in length.
    pub therm_len: usize,
    /// Recorded chain length.
    pub sim_len: usize,
    /// Grid resolution for the extremal-score marginalization.
    pub perfect_scorer_pts: usize,
    /// Initial gamma of the vote curve.
    #[serde(default = "default_gamma_start")]
    pub gamma_start: f64,
    /// Lowest vote.
    #[serde(default = "default_min_vote")]
    pub min_vote: f64,
    /// Highest vote.
    #[serde(default = "default_max_vote")]
    pub max_vote: f64,
    /// Correlation outlier threshold, in standard deviations.
    #[serde(default = "default_corrs_warn_threshold")]
    pub corrs_warn_threshold: f64,
}

fn default_gamma_start() -> f64 {
    1.0
}

fn default_min_vote() -> f64 {
    1.0
}

fn default_max_vote() -> f64 {
    10.0
}

fn default_corrs_warn_threshold() -> f64 {
    2.0
}

impl Default for SimSetup {
    fn default() -> Self {
        Self {
            seed: 35,
            delta: 0.25,
            alpha_delta: 1.0,
            therm_len: 1000,
            sim_len: 10000,
            perfect_scorer_pts: 100,
            gamma_start: default_gamma_start(),
            min_vote: default_min_vote(),
            max_vote: default_max_vote(),
            corrs_warn_threshold: default_corrs_warn_threshold(),
        }
    }
}

impl SimSetup {
    /// Parse and check a `simsetup.json` document.
    ///
    /// Missing or non-numeric keys are reported as [`Error::Config`].
    pub fn from_json_str(s: &str) -> Result<Self> {
        let setup: Self = serde_json::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        setup.sampler_config().validate()?;
        if setup.perfect_scorer_pts == 0 {
            return Err(Error::Config("PERFECT_SCORER_PTS must be > 0".to_string()));
        }
        Ok(setup)
    }

    /// The subset of options consumed by the sampler.
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            seed: self.seed,
            delta: self.delta,
            alpha_delta: self.alpha_delta,
            therm_len: self.therm_len,
            sim_len: self.sim_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_matrix_layout() {
        let m = ResultsMatrix::from_rows(vec![vec![1, -1, 1], vec![-1, -1, 1]]).unwrap();
        assert_eq!(m.n_students(), 2);
        assert_eq!(m.n_questions(), 3);
        assert_eq!(m.get(0, 1), -1.0);
        assert_eq!(m.get(1, 2), 1.0);
        assert_eq!(m.row(1), &[-1, -1, 1]);
    }

    #[test]
    fn test_results_matrix_rejects_incomplete() {
        let err = ResultsMatrix::from_rows(vec![vec![1, 0], vec![-1, 1]]).unwrap_err();
        assert!(matches!(err, Error::Data(_)), "got {err}");

        let err = ResultsMatrix::from_rows(vec![vec![1, 1], vec![-1]]).unwrap_err();
        assert!(matches!(err, Error::Data(_)), "got {err}");
    }

    #[test]
    fn test_results_matrix_rejects_out_of_range_cells() {
        for bad in [127i8, -127, i8::MIN, 2] {
            let err = ResultsMatrix::from_rows(vec![vec![1, bad]]).unwrap_err();
            assert!(matches!(err, Error::Data(_)), "cell {bad}: got {err}");
        }
    }

    #[test]
    fn test_setup_roundtrips_historical_keys() {
        let json = serde_json::to_string(&SimSetup::default()).unwrap();
        assert!(json.contains("\"ALPHADELTA\""));
        assert!(json.contains("\"PERFECT_SCORER_PTS\""));
        assert!(json.contains("\"CORRS_WARN_THRESHOLD\""));
        assert_eq!(SimSetup::from_json_str(&json).unwrap(), SimSetup::default());
    }

    #[test]
    fn test_setup_accepts_integer_widths() {
        let json = r#"{
            "SEED": 1, "DELTA": 0.25, "ALPHADELTA": 1,
            "THERM_LEN": 10, "SIM_LEN": 100, "PERFECT_SCORER_PTS": 50,
            "GAMMA_START": 1, "MIN_VOTE": 1, "MAX_VOTE": 10,
            "CORRS_WARN_THRESHOLD": 2.0
        }"#;
        let setup = SimSetup::from_json_str(json).unwrap();
        assert_eq!(setup.alpha_delta, 1.0);
        assert_eq!(setup.sampler_config().sim_len, 100);
    }

    #[test]
    fn test_setup_missing_or_non_numeric_is_config_error() {
        let missing = r#"{"SEED": 1, "DELTA": 0.25}"#;
        assert!(matches!(SimSetup::from_json_str(missing), Err(Error::Config(_))));

        let mut v = serde_json::to_value(SimSetup::default()).unwrap();
        v["DELTA"] = serde_json::json!("wide");
        let err = SimSetup::from_json_str(&v.to_string()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err}");
    }

    #[test]
    fn test_setup_vote_keys_are_optional() {
        let json = r#"{
            "SEED": 7, "DELTA": 0.1, "ALPHADELTA": 0.5,
            "THERM_LEN": 5, "SIM_LEN": 20, "PERFECT_SCORER_PTS": 10
        }"#;
        let setup = SimSetup::from_json_str(json).unwrap();
        let defaults = SimSetup::default();
        assert_eq!(setup.seed, 7);
        assert_eq!(setup.gamma_start, defaults.gamma_start);
        assert_eq!(setup.min_vote, defaults.min_vote);
        assert_eq!(setup.max_vote, defaults.max_vote);
        assert_eq!(setup.corrs_warn_threshold, defaults.corrs_warn_threshold);

        let missing_pts = r#"{
            "SEED": 7, "DELTA": 0.1, "ALPHADELTA": 0.5,
            "THERM_LEN": 5, "SIM_LEN": 20
        }"#;
        assert!(matches!(SimSetup::from_json_str(missing_pts), Err(Error::Config(_))));
    }

    #[test]
    fn test_setup_rejects_empty_chain() {
        let setup = SimSetup { sim_len: 0, ..SimSetup::default() };
        let json = serde_json::to_string(&setup).unwrap();
        assert!(matches!(SimSetup::from_json_str(&json), Err(Error::Config(_))));
    }
}
