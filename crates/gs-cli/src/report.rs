//! Plain-text report (`report.txt`).

use gs_core::SimSetup;
use gs_inference::{CorrelationSummary, MeanStd, PosteriorSummary};

use crate::workdir::{Comments, SimInfo, VotesFile};

/// Everything a report is rendered from.
pub struct ReportInput<'a> {
    pub info: &'a SimInfo,
    pub setup: &'a SimSetup,
    pub stats: &'a PosteriorSummary,
    pub votes: &'a VotesFile,
    pub comments: &'a Comments,
}

fn pct(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

fn name_width(names: &[String]) -> usize {
    names.iter().map(|n| n.chars().count()).max().unwrap_or(0)
}

fn student_table(input: &ReportInput<'_>) -> String {
    let width = name_width(&input.info.students);
    input
        .info
        .students
        .iter()
        .zip(&input.stats.scores)
        .zip(&input.votes.votes)
        .map(|((name, score), vote)| {
            let mut line = format!(
                "    {name:<width$}: {:>7} +- {:>7} -> {:5.2} +- {:4.2}",
                pct(score.mean),
                pct(score.std),
                vote.mean,
                vote.std
            );
            if let Some(short) = input.comments.get(name).map(|c| c.short.trim()).filter(|s| !s.is_empty()) {
                line.push_str(&format!(" ({short})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn question_table(questions: &[String], difficulties: &[MeanStd]) -> String {
    let width = name_width(questions);
    questions
        .iter()
        .zip(difficulties)
        .map(|(name, d)| format!("    {name:<width$}: {:6.2} +- {:6.2}", d.mean, d.std))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `true` if `value` lies at least `threshold` standard deviations from the
/// aggregate mean.
pub fn is_outlier(corrs: &CorrelationSummary, value: f64, threshold: f64) -> bool {
    !((value - corrs.mean).abs() < corrs.std * threshold)
}

/// Upper-triangular correlation table; outliers are parenthesized.
pub fn correlation_table(corrs: &CorrelationSummary, names: &[String], threshold: f64) -> String {
    let stride = name_width(names).max(11);
    let mut out = format!("    {}", " ".repeat(stride + 1));
    out.push_str(&names.iter().map(|n| format!("{n:<stride$}")).collect::<Vec<_>>().join(" "));
    for (i, name) in names.iter().enumerate() {
        out.push_str(&format!("\n    {name:<stride$} {}", " ".repeat((i + 1) * (stride + 1))));
        let cells: Vec<String> = (i + 1..names.len())
            .map(|j| {
                let c = corrs.get(i, j);
                let cell =
                    if is_outlier(corrs, c, threshold) { format!("({c:9.2e})") } else { format!(" {c:9.2e} ") };
                format!("{cell:>stride$}")
            })
            .collect();
        out.push_str(&cells.join(" "));
    }
    out
}

pub fn render(input: &ReportInput<'_>) -> String {
    let test = &input.info.test;
    let setup = input.setup;
    let stats = input.stats;
    let threshold = setup.corrs_warn_threshold;

    let mut r = String::new();
    r.push_str(&format!("Result report for \"{}\":\n", test.name));
    r.push_str(&format!(
        "Test given to class {} on {}.\n",
        test.detail("class"),
        test.detail("date")
    ));
    r.push_str(&format!("Arguments:\n    {}\n", test.detail("argument")));
    r.push_str(&format!("Test description:\n    {}\n\n", test.detail("description")));

    r.push_str(&format!("Scores:\n{}\n", student_table(input)));
    r.push_str(&format!(
        "- perfect score is {} +- {}, worse score is {} +- {}\n",
        pct(stats.perfect_score.mean),
        pct(stats.perfect_score.std),
        pct(stats.worse_score.mean),
        pct(stats.worse_score.std)
    ));
    r.push_str(&format!(
        "- gamma used is {}, votes goes from {} to {}\n\n",
        input.votes.gamma, setup.min_vote, setup.max_vote
    ));

    r.push_str(&format!("Score correlations (marked outlier of more than {threshold} sigmas):\n"));
    r.push_str(&correlation_table(&stats.scores_corrs, &input.info.students, threshold));
    r.push_str("\n\n");

    r.push_str(&format!(
        "Difficulties:\n{}\n\n",
        question_table(&input.info.questions, &stats.difficulties)
    ));

    r.push_str(&format!("Difficulty correlations (marked outlier of more than {threshold} sigmas):\n"));
    r.push_str(&correlation_table(&stats.difficulties_corrs, &input.info.questions, threshold));
    r.push_str("\n\n");

    r.push_str("Technical data:\n    Setup used:\n");
    r.push_str(&format!("        SEED={}\n\n", setup.seed));
    r.push_str(&format!("        DELTA={}\n", setup.delta));
    r.push_str(&format!("        ALPHADELTA={}\n", setup.alpha_delta));
    r.push_str(&format!("        THERM_LEN={}\n", setup.therm_len));
    r.push_str(&format!("        SIM_LEN={}\n\n", setup.sim_len));
    r.push_str(&format!("    Accept ratio: {:.0}%\n", stats.accept_ratio * 100.0));
    r.push_str(&format!("    Alpha: {:.2} +- {:.2}", stats.alpha.mean, stats.alpha.std));
    r
}
