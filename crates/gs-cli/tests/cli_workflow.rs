use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gradestat"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_ok(args: &[&str]) -> Output {
    let out = run(args);
    assert!(
        out.status.success(),
        "{:?} should succeed, stderr={}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

fn read_json(path: &Path) -> serde_json::Value {
    let s = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    serde_json::from_str(&s).unwrap()
}

const EXAM: &str = "\
test:
  name: algebra
  class: 3B
  date: 2024-05-02
  argument: linear equations
  description: short quiz
students:
  - luca rossi
  - anna   bianchi
  - marco verdi
questions:
  - q1
  - q2
  - q3
";

/// Create a work directory with a filled results table and a short chain.
fn prepared_workdir(root: &Path) -> PathBuf {
    let input = root.join("exam.yml");
    std::fs::write(&input, EXAM).unwrap();
    let dir = root.join("work");
    run_ok(&["init", input.to_str().unwrap(), dir.to_str().unwrap()]);

    std::fs::write(
        dir.join("results.csv"),
        "algebra,q1,q2,q3\nAnna Bianchi,1,1,1\nLuca Rossi,1,0,0\nMarco Verdi,0,1,0\n",
    )
    .unwrap();

    let mut setup = read_json(&dir.join("simsetup.json"));
    setup["THERM_LEN"] = serde_json::json!(20);
    setup["SIM_LEN"] = serde_json::json!(200);
    setup["PERFECT_SCORER_PTS"] = serde_json::json!(30);
    std::fs::write(dir.join("simsetup.json"), setup.to_string()).unwrap();
    dir
}

#[test]
fn init_writes_layout_and_refuses_existing_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("exam.yml");
    std::fs::write(&input, EXAM).unwrap();

    let out = run_ok(&["init", input.to_str().unwrap()]);
    let dir = tmp.path().join("algebra");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), dir.display().to_string());

    let info = read_json(&dir.join("siminfo.json"));
    assert_eq!(info["students"], serde_json::json!(["Anna Bianchi", "Luca Rossi", "Marco Verdi"]));
    assert_eq!(info["test"]["name"], "algebra");

    let setup = read_json(&dir.join("simsetup.json"));
    assert_eq!(setup["SEED"], 35);
    assert_eq!(setup["SIM_LEN"], 10000);
    assert!(dir.join("comments.yml").exists());
    assert!(dir.join("results.csv").exists());

    let again = run(&["init", input.to_str().unwrap()]);
    assert!(!again.status.success(), "init onto an existing directory should fail");
}

#[test]
fn full_workflow() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());
    let d = dir.to_str().unwrap();

    run_ok(&["run", d]);

    let chain = read_json(&dir.join("montecarlo.json"));
    assert_eq!(chain["ps_log"].as_array().unwrap().len(), 200);
    assert_eq!(chain["ds_log"][0].as_array().unwrap().len(), 3);
    assert_eq!(chain["alpha_log"].as_array().unwrap().len(), 200);

    let stats = read_json(&dir.join("stats.json"));
    for key in [
        "accept_ratio",
        "scores",
        "perfect_score",
        "worse_score",
        "scores_corrs",
        "difficulties",
        "difficulties_corrs",
        "alpha",
    ] {
        assert!(stats.get(key).is_some(), "stats.json missing {key}");
    }
    assert_eq!(stats["scores"].as_array().unwrap().len(), 3);
    assert_eq!(stats["scores_corrs"][0][2].as_array().unwrap().len(), 2);
    assert!(stats["accept_ratio"].as_f64().unwrap() >= 0.0);

    let out = run_ok(&["vote", d, "--gamma", "1.5"]);
    let table = String::from_utf8_lossy(&out.stdout);
    assert!(table.starts_with("Gamma: 1.5"), "{table}");
    assert!(table.contains("Anna Bianchi"), "{table}");

    let votes = read_json(&dir.join("votes.json"));
    assert_eq!(votes["gamma"], 1.5);
    let votes = votes["votes"].as_array().unwrap();
    assert_eq!(votes.len(), 3);
    for v in votes {
        let mean = v[0].as_f64().unwrap();
        assert!((1.0..=10.0).contains(&mean), "vote out of scale: {mean}");
    }

    // Without --gamma the saved gamma is reused.
    let out = run_ok(&["vote", d]);
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("Gamma: 1.5"));

    run_ok(&["comment", d, "anna", "excellent"]);
    let comments = std::fs::read_to_string(dir.join("comments.yml")).unwrap();
    assert!(comments.contains("excellent"), "{comments}");

    run_ok(&["report", d]);
    let report = std::fs::read_to_string(dir.join("report.txt")).unwrap();
    assert!(report.starts_with("Result report for \"algebra\":"), "{report}");
    assert!(report.contains("(excellent)"), "{report}");
    assert!(report.contains("SIM_LEN=200"), "{report}");

    run_ok(&["finalize", d]);
    let fin = std::fs::read_to_string(dir.join("final.yml")).unwrap();
    assert!(fin.contains("suggested vote"), "{fin}");
    assert!(fin.contains("similar votes"), "{fin}");
    assert!(fin.contains("final_vote: null"), "{fin}");
}

#[test]
fn sampling_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());
    let d = dir.to_str().unwrap();

    run_ok(&["sample", d]);
    let a = std::fs::read(dir.join("montecarlo.json")).unwrap();
    run_ok(&["sample", d]);
    let b = std::fs::read(dir.join("montecarlo.json")).unwrap();
    assert_eq!(a, b, "montecarlo.json should be identical for the same seed");
}

#[test]
fn incomplete_results_abort_before_sampling() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());
    std::fs::write(dir.join("results.csv"), "algebra,q1,q2,q3\nAnna Bianchi,1,1,1\n").unwrap();

    let out = run(&["sample", dir.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not complete"));
    assert!(!dir.join("montecarlo.json").exists(), "no partial chain may be written");
}

#[test]
fn missing_config_key_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());
    let mut setup = read_json(&dir.join("simsetup.json"));
    setup.as_object_mut().unwrap().remove("DELTA");
    std::fs::write(dir.join("simsetup.json"), setup.to_string()).unwrap();

    let out = run(&["sample", dir.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Configuration error"), "{stderr}");
    assert!(stderr.contains("DELTA"), "{stderr}");
}

#[test]
fn missing_stage_output_names_the_file() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());

    let out = run(&["vote", dir.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("stats.json"), "{stderr}");
    assert!(!dir.join("votes.json").exists());
}

#[test]
fn sampling_ignores_missing_vote_keys() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = prepared_workdir(tmp.path());
    let mut setup = read_json(&dir.join("simsetup.json"));
    setup.as_object_mut().unwrap().remove("MAX_VOTE");
    std::fs::write(dir.join("simsetup.json"), setup.to_string()).unwrap();

    run_ok(&["sample", dir.to_str().unwrap()]);
    assert!(dir.join("montecarlo.json").exists());
}
