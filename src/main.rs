use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};

mod activity;
mod collaboration;
mod config;
mod error;
mod grading;
mod logging;
mod messages;
mod models;
mod patterns;
mod peer_review;
mod report;
mod rng;
mod schedule;
mod stats;
mod store;

use config::GradingConfig;
use peer_review::ReviewBook;

#[derive(Parser)]
#[command(name = "course-grading")]
#[command(about = "Grading, git analysis, peer review and presentation scheduling for a project course", long_about = None)]
struct Cli {
    /// Show debug logs for this crate
    #[arg(long, global = true)]
    verbose: bool,
    /// Log filter, either a level or a full directive
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
    /// Grading policy file (TOML)
    #[arg(long, global = true, env = "GRADING_CONFIG")]
    config: Option<PathBuf>,
    /// Seed for shuffles and draws; omit for a non-reproducible run
    #[arg(long, global = true, env = "GRADING_SEED")]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate final grades and class statistics from a grade sheet
    Grade {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "grades")]
        out_dir: PathBuf,
    },
    /// Analyze one repository's commit export
    Git {
        #[arg(long)]
        commits: PathBuf,
        #[arg(long, default_value_t = 1)]
        team_size: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Analyze the commit export of every student on a roster
    GitBatch {
        #[arg(long)]
        roster: PathBuf,
        /// Directory holding one folder per project
        #[arg(long)]
        base: PathBuf,
        #[arg(long, default_value = "git-analysis.json")]
        out: PathBuf,
    },
    /// Peer review round: assign, submit, score
    Reviews {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// Shuffle the projects onto the presentation days
    Schedule {
        #[arg(long)]
        projects: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Print the schedule instead of only summarizing it
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// Assign reviewer teams and start a new review book
    Assign {
        #[arg(long)]
        roster: PathBuf,
        #[arg(long)]
        reviews_per_team: Option<usize>,
        #[arg(long, default_value = "peer-reviews.json")]
        book: PathBuf,
    },
    /// Record one review from a JSON draft
    Submit {
        #[arg(long, default_value = "peer-reviews.json")]
        book: PathBuf,
        #[arg(long)]
        draft: PathBuf,
    },
    /// Score every team from the submitted reviews
    Score {
        #[arg(long, default_value = "peer-reviews.json")]
        book: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show averages and feedback for one team
    Summary {
        #[arg(long, default_value = "peer-reviews.json")]
        book: PathBuf,
        #[arg(long)]
        team: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json)?;
    let config = GradingConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Grade { input, out_dir } => run_grade(&input, &out_dir, &config)?,
        Commands::Git {
            commits,
            team_size,
            out,
        } => {
            let commits = store::read_commits(&commits)?;
            let analysis = activity::analyze_commits(&commits, team_size.max(1), &config)
                .context("git analysis failed")?;

            println!(
                "{} commits over {} days ({} active), pattern {}",
                analysis.summary.total_commits,
                analysis.summary.activity_span_days,
                analysis.summary.active_days,
                analysis.patterns.activity_pattern
            );
            println!(
                "Message quality {:.1}, collaboration {:.1}",
                analysis.message_quality.quality_score, analysis.collaboration.collaboration_score
            );
            println!("Git activity score: {:.1}/10", analysis.summary.git_activity_score);

            if let Some(out) = out {
                store::write_json(&out, &analysis)?;
                println!("Analysis written to {}.", out.display());
            }
        }
        Commands::GitBatch { roster, base, out } => {
            let roster = store::read_roster(&roster)?;
            let entries = activity::analyze_roster(&roster, &base, &config);
            let unavailable = entries.iter().filter(|entry| entry.error.is_some()).count();
            store::write_json(&out, &entries)?;
            println!(
                "Analyzed {} students ({} without data). Results written to {}.",
                entries.len(),
                unavailable,
                out.display()
            );
        }
        Commands::Reviews { command } => run_reviews(command, cli.seed, &config)?,
        Commands::Schedule {
            projects,
            out_dir,
            preview,
        } => {
            let projects = store::read_projects(&projects)?;
            let mut rng = rng::seeded_rng(cli.seed);
            let slots = schedule::assign_projects_to_dates(&projects, &mut rng)?;
            let markdown = report::build_schedule_report(&slots, cli.seed, Utc::now());

            for slot in &slots {
                println!("{}: {} projects", slot.date, slot.projects.len());
            }
            if preview || out_dir.is_none() {
                println!();
                print!("{markdown}");
            }
            if let Some(out_dir) = out_dir {
                std::fs::create_dir_all(&out_dir)
                    .with_context(|| format!("could not create {}", out_dir.display()))?;
                store::write_json(&out_dir.join("schedule.json"), &slots)?;
                let path = out_dir.join("schedule.md");
                std::fs::write(&path, markdown)?;
                println!("Schedule written to {}.", path.display());
            }
        }
    }

    Ok(())
}

fn run_grade(input: &Path, out_dir: &Path, config: &GradingConfig) -> anyhow::Result<()> {
    let rows = store::read_grade_rows(input)?;
    let grades = grading::grade_all(&rows);
    if grades.is_empty() {
        tracing::warn!(path = %input.display(), "grade sheet has no students");
    }

    let finals: Vec<f64> = grades.iter().map(|grade| grade.final_grade.numeric).collect();
    let statistics = stats::class_statistics(&finals);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("could not create {}", out_dir.display()))?;
    store::write_json(&out_dir.join("final_grades.json"), &grades)?;
    store::write_grades_csv(&out_dir.join("final_grades.csv"), &grades)?;
    if let Some(statistics) = &statistics {
        store::write_json(&out_dir.join("class_statistics.json"), statistics)?;
    }
    let report = report::build_class_report(
        &grades,
        statistics.as_ref(),
        config.passing_grade,
        Utc::now(),
    );
    std::fs::write(out_dir.join("class_report.md"), report)?;

    match &statistics {
        Some(statistics) => println!(
            "Graded {} students: mean {:.2}, median {:.2}, pass rate {:.1}%",
            statistics.count, statistics.mean, statistics.median, statistics.pass_rate
        ),
        None => println!("No students to grade."),
    }
    println!("Top performers:");
    for grade in grading::ranking(&grades).iter().take(5) {
        println!(
            "- {} ({}) {:.2} ({})",
            grade.student.full_name,
            grade.student.student_id,
            grade.final_grade.numeric,
            grade.final_grade.letter
        );
    }
    let failing = grading::failing_students(&grades, config.passing_grade);
    if !failing.is_empty() {
        println!("Below {:.0}: {}", config.passing_grade, failing.len());
    }
    println!("Results written to {}.", out_dir.display());
    Ok(())
}

fn run_reviews(
    command: ReviewCommands,
    seed: Option<u64>,
    config: &GradingConfig,
) -> anyhow::Result<()> {
    match command {
        ReviewCommands::Assign {
            roster,
            reviews_per_team,
            book,
        } => {
            let roster = store::read_roster(&roster)?;
            let teams = peer_review::group_teams(&roster);
            if teams.len() < 2 {
                bail!("need at least two teams to assign reviewers, found {}", teams.len());
            }
            for team in &teams {
                tracing::debug!(team = %team.name, members = team.members.len(), "team found");
            }
            let names: Vec<String> = teams.into_iter().map(|team| team.name).collect();
            let per_team = reviews_per_team.unwrap_or(config.reviews_per_team);

            let mut rng = rng::seeded_rng(seed);
            let assignments =
                peer_review::assign_reviewers(&names, per_team, true, &mut rng);
            for (team, reviewers) in &assignments {
                println!("{team}: {}", reviewers.join(", "));
            }

            ReviewBook::new(assignments, Utc::now()).save(&book)?;
            println!("Review book written to {}.", book.display());
        }
        ReviewCommands::Submit { book, draft } => {
            let mut review_book = ReviewBook::load(&book)?;
            let draft = store::read_json(&draft)?;
            let submission = review_book
                .submit_review(draft, Utc::now())
                .context("review rejected")?
                .clone();
            review_book.save(&book)?;
            println!(
                "Recorded review {} of {} by {}.",
                submission.id, submission.reviewed_team, submission.reviewer_team
            );
        }
        ReviewCommands::Score { book, out } => {
            let review_book = ReviewBook::load(&book)?;
            let scores = review_book.calculate_team_scores(config.outlier_threshold);
            for score in &scores {
                println!(
                    "{}: {:.1} ({} reviews, {})",
                    score.team,
                    score.average_score,
                    score.num_reviews,
                    score.state
                );
            }
            if let Some(out) = out {
                store::write_json(&out, &scores)?;
                println!("Team scores written to {}.", out.display());
            }
        }
        ReviewCommands::Summary { book, team } => {
            let review_book = ReviewBook::load(&book)?;
            let Some(summary) = review_book.summary(&team) else {
                bail!("no reviews submitted for team {team}");
            };
            println!(
                "{}: {} reviews, overall {:.2}",
                summary.team, summary.reviews_received, summary.average_score
            );
            for (key, average) in &summary.component_averages {
                println!("- {key}: {average:.2}");
            }
            for feedback in &summary.feedback {
                println!("> {} says: {}", feedback.reviewer_team, feedback.comments);
            }
        }
    }
    Ok(())
}
