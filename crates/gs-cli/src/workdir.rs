//! Work-directory layout: creation, loaders and writers for every stage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gs_core::{Error, Result, ResultsMatrix, SimSetup};
use gs_inference::{ChainArtifact, MeanStd, PosteriorSummary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const SIMINFO: &str = "siminfo.json";
pub const SIMSETUP: &str = "simsetup.json";
pub const COMMENTS: &str = "comments.yml";
pub const RESULTS: &str = "results.csv";
pub const CHAIN: &str = "montecarlo.json";
pub const STATS: &str = "stats.json";
pub const VOTES: &str = "votes.json";
pub const REPORT: &str = "report.txt";
pub const FINAL: &str = "final.yml";

/// Test metadata. Only `name` is required; other keys (class, date,
/// argument, description, ...) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInfo {
    pub name: String,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl TestInfo {
    /// A metadata entry rendered as plain text (empty if absent).
    pub fn detail(&self, key: &str) -> String {
        match self.details.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Exam description: the YAML input of `init` and the `siminfo.json` it writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimInfo {
    pub test: TestInfo,
    pub students: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub long: String,
}

pub type Comments = BTreeMap<String, Comment>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotesFile {
    pub gamma: f64,
    pub votes: Vec<MeanStd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalEntry {
    pub comment: Comment,
    #[serde(rename = "suggested vote")]
    pub suggested_vote: String,
    #[serde(rename = "similar votes")]
    pub similar_votes: Vec<String>,
    pub final_vote: Option<f64>,
}

/// Collapse whitespace and title-case every alphabetic run.
pub fn normalize_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut prev_alpha = false;
    for c in collapsed.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    Ok(serde_yaml_ng::from_slice(&bytes)?)
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, serde_yaml_ng::to_string(value)?)?;
    Ok(())
}

/// Create a work directory from a YAML exam description.
///
/// Without `output`, the directory is a sibling of `input` named after the
/// test. Returns the created directory.
pub fn init(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    if !input.is_file() {
        return Err(Error::Validation(format!("{} is not a file", input.display())));
    }
    let exam: SimInfo = read_yaml(input)?;

    let dir = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_file_name(&exam.test.name),
    };
    if dir.exists() {
        return Err(Error::Validation(format!("{} exists", dir.display())));
    }

    let mut students: Vec<String> = exam.students.iter().map(|s| normalize_name(s)).collect();
    students.sort();
    let questions: Vec<String> = exam.questions.iter().map(|q| q.trim().to_string()).collect();
    let info = SimInfo { test: exam.test, students, questions };

    std::fs::create_dir(&dir)?;
    write_json(&dir.join(SIMINFO), &info)?;
    write_json(&dir.join(SIMSETUP), &SimSetup::default())?;

    let comments: Comments =
        info.students.iter().map(|s| (s.clone(), Comment::default())).collect();
    write_yaml(&dir.join(COMMENTS), &comments)?;

    let mut wtr = csv::Writer::from_path(dir.join(RESULTS))?;
    wtr.write_record(std::iter::once(info.test.name.as_str()).chain(info.questions.iter().map(String::as_str)))?;
    for student in &info.students {
        wtr.write_record(
            std::iter::once(student.as_str()).chain(std::iter::repeat_n("", info.questions.len())),
        )?;
    }
    wtr.flush()?;

    Ok(dir)
}

pub fn load_info(dir: &Path) -> Result<SimInfo> {
    read_json(&dir.join(SIMINFO))
}

pub fn load_setup(dir: &Path) -> Result<SimSetup> {
    let path = dir.join(SIMSETUP);
    let s = std::fs::read_to_string(&path)?;
    SimSetup::from_json_str(&s)
        .map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
}

/// Read `results.csv` into a matrix ordered like `siminfo.json`.
///
/// Cells hold `1` (correct) or `0` (incorrect). Every student/question pair
/// must be filled.
pub fn load_results(dir: &Path, info: &SimInfo) -> Result<ResultsMatrix> {
    let path = dir.join(RESULTS);
    let n_questions = info.questions.len();
    let mut cells = vec![0i8; info.students.len() * n_questions];

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
    let header = rdr.headers()?.clone();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let parse_error = |item: usize, reason: String| {
            Error::Data(format!(
                "error while parsing {}, line {}, item {}: {}",
                path.display(),
                line,
                item,
                reason
            ))
        };

        let student = record.get(0).unwrap_or_default().trim();
        for (j, res) in record.iter().enumerate().skip(1) {
            let s = info
                .students
                .iter()
                .position(|n| n == student)
                .ok_or_else(|| parse_error(j + 1, format!("unknown student {student:?}")))?;
            let qname = header.get(j).unwrap_or_default().trim();
            let q = info
                .questions
                .iter()
                .position(|n| n == qname)
                .ok_or_else(|| parse_error(j + 1, format!("unknown question {qname:?}")))?;
            let r: i64 = res
                .trim()
                .parse()
                .map_err(|e| parse_error(j + 1, format!("{res:?}: {e}")))?;
            // Anything but 0/1 leaves a hole and fails the completeness check.
            cells[s * n_questions + q] = match r {
                0 => -1,
                1 => 1,
                _ => 0,
            };
        }
    }

    ResultsMatrix::new(info.students.len(), n_questions, cells)
}

pub fn load_chain(dir: &Path) -> Result<ChainArtifact> {
    read_json(&dir.join(CHAIN))
}

pub fn load_stats(dir: &Path) -> Result<PosteriorSummary> {
    read_json(&dir.join(STATS))
}

pub fn load_votes(dir: &Path) -> Result<VotesFile> {
    read_json(&dir.join(VOTES))
}

/// Gamma of the last saved votes, or `gamma_start` if none were saved.
pub fn load_gamma(dir: &Path, gamma_start: f64) -> Result<f64> {
    let path = dir.join(VOTES);
    if !path.exists() {
        return Ok(gamma_start);
    }
    Ok(read_json::<VotesFile>(&path)?.gamma)
}

pub fn load_comments(dir: &Path) -> Result<Comments> {
    read_yaml(&dir.join(COMMENTS))
}

pub fn save_comments(dir: &Path, comments: &Comments) -> Result<()> {
    write_yaml(&dir.join(COMMENTS), comments)
}

/// The single student whose name starts with the normalized `prefix`.
pub fn match_student<'a>(students: &'a [String], prefix: &str) -> Result<&'a str> {
    let name = normalize_name(prefix);
    let matching: Vec<&String> = students.iter().filter(|s| s.starts_with(&name)).collect();
    match matching.as_slice() {
        [] => Err(Error::Validation(format!("unknown student {name}"))),
        [one] => Ok(one.as_str()),
        many => Err(Error::Validation(format!(
            "multiple students match {name}: {}",
            many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Set the short comment of the student matching `prefix`. Returns the full name.
pub fn set_comment(dir: &Path, prefix: &str, text: &str) -> Result<String> {
    let info = load_info(dir)?;
    let student = match_student(&info.students, prefix)?.to_string();
    let mut comments = load_comments(dir)?;
    comments.entry(student.clone()).or_default().short = text.trim().to_string();
    save_comments(dir, &comments)?;
    Ok(student)
}

pub fn save_final(dir: &Path, entries: &BTreeMap<String, FinalEntry>) -> Result<()> {
    write_yaml(&dir.join(FINAL), entries)
}
