//! gradestat CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod report;
mod workdir;

use gs_inference::{VoteScale, sample_metropolis, similar_students, summarize};
use workdir::{FinalEntry, VotesFile};

#[derive(Parser)]
#[command(name = "gradestat")]
#[command(about = "gradestat - Bayesian grading of binary exam results")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a work directory from a YAML exam description
    Init {
        /// Exam description (test metadata, students, questions)
        input: PathBuf,

        /// Work directory to create. Defaults to a sibling named after the test.
        output: Option<PathBuf>,
    },

    /// Run the Metropolis sampler and write montecarlo.json
    Sample {
        /// Work directory
        dir: PathBuf,
    },

    /// Reduce montecarlo.json to stats.json
    Stats {
        /// Work directory
        dir: PathBuf,
    },

    /// Sample, then compute statistics
    Run {
        /// Work directory
        dir: PathBuf,
    },

    /// Compute votes, print the vote table and write votes.json
    Vote {
        /// Work directory
        dir: PathBuf,

        /// Curve exponent. Defaults to the last saved gamma, then GAMMA_START.
        #[arg(long)]
        gamma: Option<f64>,
    },

    /// Set the short comment of a student (empty text clears it)
    Comment {
        /// Work directory
        dir: PathBuf,

        /// Student name or unique prefix
        student: String,

        /// Comment text
        text: String,
    },

    /// Write report.txt
    Report {
        /// Work directory
        dir: PathBuf,
    },

    /// Write final.yml with suggested votes and similar students
    Finalize {
        /// Work directory
        dir: PathBuf,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Init { input, output } => cmd_init(&input, output.as_deref()),
        Commands::Sample { dir } => cmd_sample(&dir),
        Commands::Stats { dir } => cmd_stats(&dir),
        Commands::Run { dir } => {
            cmd_sample(&dir)?;
            cmd_stats(&dir)
        }
        Commands::Vote { dir, gamma } => cmd_vote(&dir, gamma),
        Commands::Comment { dir, student, text } => cmd_comment(&dir, &student, &text),
        Commands::Report { dir } => cmd_report(&dir),
        Commands::Finalize { dir } => cmd_finalize(&dir),
        Commands::Version => {
            println!("gradestat {}", gs_core::VERSION);
            Ok(())
        }
    }
}

fn load_context(dir: &Path, file: &str) -> String {
    format!("failed to load {}", dir.join(file).display())
}

fn cmd_init(input: &Path, output: Option<&Path>) -> Result<()> {
    tracing::info!(path = %input.display(), "reading exam description");
    let dir = workdir::init(input, output)
        .with_context(|| format!("failed to initialize from {}", input.display()))?;
    tracing::info!(dir = %dir.display(), "work directory created");
    println!("{}", dir.display());
    Ok(())
}

fn cmd_sample(dir: &Path) -> Result<()> {
    let setup = workdir::load_setup(dir).with_context(|| load_context(dir, workdir::SIMSETUP))?;
    let info = workdir::load_info(dir).with_context(|| load_context(dir, workdir::SIMINFO))?;
    let results = workdir::load_results(dir, &info).with_context(|| load_context(dir, workdir::RESULTS))?;
    tracing::info!(
        students = results.n_students(),
        questions = results.n_questions(),
        "results loaded"
    );

    let config = setup.sampler_config();
    tracing::debug!(?config, "sampling");
    let run = sample_metropolis(&results, config)?;
    tracing::info!(
        samples = run.chain.len(),
        accepted = run.accepted,
        accept_ratio = run.accept_ratio,
        "sampling complete"
    );

    workdir::write_json(&dir.join(workdir::CHAIN), &run.to_artifact())?;
    Ok(())
}

fn cmd_stats(dir: &Path) -> Result<()> {
    let setup = workdir::load_setup(dir).with_context(|| load_context(dir, workdir::SIMSETUP))?;
    let (chain, accept_ratio) = workdir::load_chain(dir)
        .with_context(|| load_context(dir, workdir::CHAIN))?
        .into_parts()?;
    tracing::info!(samples = chain.len(), "chain loaded");

    let summary = summarize(&chain, accept_ratio, setup.perfect_scorer_pts);
    tracing::info!(
        perfect = summary.perfect_score.mean,
        worst = summary.worse_score.mean,
        alpha = summary.alpha.mean,
        "statistics complete"
    );

    workdir::write_json(&dir.join(workdir::STATS), &summary)?;
    Ok(())
}

fn cmd_vote(dir: &Path, gamma: Option<f64>) -> Result<()> {
    let setup = workdir::load_setup(dir).with_context(|| load_context(dir, workdir::SIMSETUP))?;
    let info = workdir::load_info(dir).with_context(|| load_context(dir, workdir::SIMINFO))?;
    let stats = workdir::load_stats(dir).with_context(|| load_context(dir, workdir::STATS))?;
    let chain = workdir::load_chain(dir).with_context(|| load_context(dir, workdir::CHAIN))?;
    let comments = workdir::load_comments(dir).with_context(|| load_context(dir, workdir::COMMENTS))?;
    let gamma = match gamma {
        Some(g) => g,
        None => workdir::load_gamma(dir, setup.gamma_start).with_context(|| load_context(dir, workdir::VOTES))?,
    };

    let scale = VoteScale {
        worst_mean: stats.worse_score.mean,
        perfect_mean: stats.perfect_score.mean,
        min_vote: setup.min_vote,
        max_vote: setup.max_vote,
    };
    let votes = gs_inference::vote(gamma, &chain.ps_log, &scale);
    tracing::debug!(gamma, students = votes.len(), "votes computed");

    let width = info.students.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    println!("Gamma: {gamma}\n");
    for (name, v) in info.students.iter().zip(&votes) {
        let comment = comments.get(name).map(|c| c.short.trim()).unwrap_or_default();
        if comment.is_empty() {
            println!("{name:<width$}: {:4.2} +- {:4.2}", v.mean, v.std);
        } else {
            println!("{name:<width$}: {:4.2} +- {:4.2} -> {comment}", v.mean, v.std);
        }
    }

    workdir::write_json(&dir.join(workdir::VOTES), &VotesFile { gamma, votes })?;
    Ok(())
}

fn cmd_comment(dir: &Path, student: &str, text: &str) -> Result<()> {
    let name = workdir::set_comment(dir, student, text)?;
    tracing::info!(student = %name, "comment saved");
    Ok(())
}

fn cmd_report(dir: &Path) -> Result<()> {
    let setup = workdir::load_setup(dir).with_context(|| load_context(dir, workdir::SIMSETUP))?;
    let info = workdir::load_info(dir).with_context(|| load_context(dir, workdir::SIMINFO))?;
    let stats = workdir::load_stats(dir).with_context(|| load_context(dir, workdir::STATS))?;
    let votes = workdir::load_votes(dir).with_context(|| load_context(dir, workdir::VOTES))?;
    let comments = workdir::load_comments(dir).with_context(|| load_context(dir, workdir::COMMENTS))?;

    let text = report::render(&report::ReportInput {
        info: &info,
        setup: &setup,
        stats: &stats,
        votes: &votes,
        comments: &comments,
    });
    let path = dir.join(workdir::REPORT);
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

fn cmd_finalize(dir: &Path) -> Result<()> {
    let info = workdir::load_info(dir).with_context(|| load_context(dir, workdir::SIMINFO))?;
    let votes = workdir::load_votes(dir).with_context(|| load_context(dir, workdir::VOTES))?;
    let comments = workdir::load_comments(dir).with_context(|| load_context(dir, workdir::COMMENTS))?;
    if votes.votes.len() != info.students.len() {
        anyhow::bail!(
            "{} holds {} votes for {} students",
            workdir::VOTES,
            votes.votes.len(),
            info.students.len()
        );
    }

    let similar = similar_students(&votes.votes);
    let entries: BTreeMap<String, FinalEntry> = info
        .students
        .iter()
        .zip(&votes.votes)
        .zip(similar)
        .map(|((name, v), peers)| {
            let entry = FinalEntry {
                comment: comments.get(name).cloned().unwrap_or_default(),
                suggested_vote: format!("{} +- {}", v.mean, v.std),
                similar_votes: peers.into_iter().map(|i| info.students[i].clone()).collect(),
                final_vote: None,
            };
            (name.clone(), entry)
        })
        .collect();

    workdir::save_final(dir, &entries)?;
    tracing::info!(students = entries.len(), "final.yml written");
    Ok(())
}
