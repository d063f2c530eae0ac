use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::collaboration::{calculate_collaboration, CollaborationMetrics};
use crate::config::GradingConfig;
use crate::error::DataUnavailable;
use crate::grading::round_to;
use crate::messages::{analyze_message_quality, MessageQuality};
use crate::models::{CommitRecord, StudentRecord};
use crate::patterns::{detect_commit_patterns, CommitPatterns};
use crate::store;

/// Commits needed for full commit-count credit.
const FULL_CREDIT_COMMITS: f64 = 20.0;
/// Days of activity span needed for full span credit.
const FULL_CREDIT_SPAN_DAYS: f64 = 30.0;
const CONSISTENT_SCORE: f64 = 100.0;
const INCONSISTENT_SCORE: f64 = 50.0;

pub const COMMIT_EXPORT_FILE: &str = "commits.csv";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityInputs {
    pub commit_count: usize,
    pub activity_span_days: i64,
    /// 0-100
    pub consistency_score: f64,
    /// 0-100
    pub collaboration_score: f64,
    /// 0-100
    pub message_quality: f64,
}

/// Folds the sub-metrics into the 0-10 git activity component, one decimal.
pub fn git_activity_score(inputs: &ActivityInputs) -> f64 {
    let commit_score = (100.0 * inputs.commit_count as f64 / FULL_CREDIT_COMMITS).min(100.0);
    let span_score = if inputs.activity_span_days > 0 {
        (100.0 * inputs.activity_span_days as f64 / FULL_CREDIT_SPAN_DAYS).min(100.0)
    } else {
        0.0
    };

    let overall = 0.30 * commit_score
        + 0.25 * inputs.consistency_score
        + 0.25 * inputs.collaboration_score
        + 0.10 * inputs.message_quality
        + 0.10 * span_score;

    round_to((overall / 10.0).min(10.0), 1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitFrequency {
    pub commits_per_day: f64,
    pub commits_per_week: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitSummary {
    pub total_commits: usize,
    pub git_activity_score: f64,
    pub team_size: usize,
    pub active_days: usize,
    pub activity_span_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitAnalysis {
    pub summary: GitSummary,
    pub first_commit: DateTime<FixedOffset>,
    pub last_commit: DateTime<FixedOffset>,
    pub commit_frequency: CommitFrequency,
    pub patterns: CommitPatterns,
    pub message_quality: MessageQuality,
    pub collaboration: CollaborationMetrics,
}

fn commit_frequency(
    first: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
    count: usize,
) -> CommitFrequency {
    let days = ((last - first).num_days() + 1).max(1) as f64;
    let per_day = count as f64 / days;
    CommitFrequency {
        commits_per_day: per_day,
        commits_per_week: per_day * 7.0,
    }
}

/// Runs all three analyzers over one repository's history and scores it.
pub fn analyze_commits(
    commits: &[CommitRecord],
    team_size: usize,
    config: &GradingConfig,
) -> Result<GitAnalysis, DataUnavailable> {
    let mut ordered = commits.to_vec();
    ordered.sort_by_key(|commit| commit.timestamp);
    let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
        return Err(DataUnavailable::NoCommits);
    };
    let (first_commit, last_commit) = (first.timestamp, last.timestamp);

    let patterns = detect_commit_patterns(&ordered);
    let message_quality = analyze_message_quality(&ordered);
    let collaboration = calculate_collaboration(&ordered, team_size, config.solo_diversity_credit);

    let score = git_activity_score(&ActivityInputs {
        commit_count: ordered.len(),
        activity_span_days: patterns.total_days_span,
        consistency_score: if patterns.is_consistent {
            CONSISTENT_SCORE
        } else {
            INCONSISTENT_SCORE
        },
        collaboration_score: collaboration.collaboration_score,
        message_quality: message_quality.quality_score,
    });

    Ok(GitAnalysis {
        summary: GitSummary {
            total_commits: ordered.len(),
            git_activity_score: score,
            team_size,
            active_days: patterns.active_days,
            activity_span_days: patterns.total_days_span,
        },
        first_commit,
        last_commit,
        commit_frequency: commit_frequency(first_commit, last_commit, ordered.len()),
        patterns,
        message_quality,
        collaboration,
    })
}

/// One roster entry of a batch run. Unavailable repositories score 0 and
/// carry the reason instead of an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct GitBatchEntry {
    pub student: StudentRecord,
    pub export_path: PathBuf,
    pub git_activity_score: f64,
    pub analysis: Option<GitAnalysis>,
    pub error: Option<String>,
}

fn analyze_export(
    path: &Path,
    team_size: usize,
    config: &GradingConfig,
) -> Result<GitAnalysis, DataUnavailable> {
    if !path.is_file() {
        return Err(DataUnavailable::ExportMissing(path.to_path_buf()));
    }
    let commits = store::read_commits(path).map_err(|err| DataUnavailable::Unreadable {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })?;
    analyze_commits(&commits, team_size, config)
}

/// Analyzes `<base>/<project_folder>/commits.csv` for every roster student.
/// Team size is the number of roster members sharing the student's team.
pub fn analyze_roster(
    roster: &[StudentRecord],
    base: &Path,
    config: &GradingConfig,
) -> Vec<GitBatchEntry> {
    let mut team_sizes: HashMap<&str, usize> = HashMap::new();
    for student in roster {
        if let Some(team) = student.team() {
            *team_sizes.entry(team).or_insert(0) += 1;
        }
    }

    roster
        .iter()
        .filter(|student| !student.student_id.trim().is_empty())
        .map(|student| {
            let team_size = student
                .team()
                .and_then(|team| team_sizes.get(team).copied())
                .unwrap_or(1);
            let export_path = base
                .join(student.project_folder.trim())
                .join(COMMIT_EXPORT_FILE);

            match analyze_export(&export_path, team_size, config) {
                Ok(analysis) => {
                    tracing::info!(
                        student_id = %student.student_id,
                        score = analysis.summary.git_activity_score,
                        commits = analysis.summary.total_commits,
                        "analyzed repository"
                    );
                    GitBatchEntry {
                        student: student.clone(),
                        export_path,
                        git_activity_score: analysis.summary.git_activity_score,
                        analysis: Some(analysis),
                        error: None,
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        student_id = %student.student_id,
                        %reason,
                        "repository data unavailable"
                    );
                    GitBatchEntry {
                        student: student.clone(),
                        export_path,
                        git_activity_score: 0.0,
                        analysis: None,
                        error: Some(reason.to_string()),
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::tests::{commit_at, start};
    use chrono::Duration;

    #[test]
    fn full_marks_cap_at_ten() {
        let score = git_activity_score(&ActivityInputs {
            commit_count: 45,
            activity_span_days: 60,
            consistency_score: 100.0,
            collaboration_score: 100.0,
            message_quality: 100.0,
        });
        assert_eq!(score, 10.0);
    }

    #[test]
    fn partial_inputs_weight_each_metric() {
        // commit 50, span 50: 15 + 12.5 + 12.5 + 4 + 5 = 49
        let score = git_activity_score(&ActivityInputs {
            commit_count: 10,
            activity_span_days: 15,
            consistency_score: 50.0,
            collaboration_score: 50.0,
            message_quality: 40.0,
        });
        assert_eq!(score, 4.9);
    }

    #[test]
    fn non_positive_span_earns_nothing() {
        let inputs = ActivityInputs {
            commit_count: 0,
            activity_span_days: 0,
            consistency_score: 0.0,
            collaboration_score: 0.0,
            message_quality: 0.0,
        };
        assert_eq!(git_activity_score(&inputs), 0.0);
        assert_eq!(
            git_activity_score(&ActivityInputs {
                activity_span_days: -3,
                ..inputs
            }),
            0.0
        );
    }

    #[test]
    fn analysis_orders_commits_and_scores_them() {
        let commits: Vec<CommitRecord> = (0..20)
            .rev()
            .map(|day| {
                let author = if day % 2 == 0 { "Ana" } else { "Ivo" };
                commit_at(
                    start() + Duration::days(day),
                    author,
                    "feat: add a tested feature, closes #1",
                )
            })
            .collect();

        let analysis = analyze_commits(&commits, 2, &GradingConfig::default()).unwrap();
        assert_eq!(analysis.first_commit, start());
        assert_eq!(analysis.last_commit, start() + Duration::days(19));
        assert_eq!(analysis.summary.total_commits, 20);
        assert_eq!(analysis.summary.active_days, 20);
        assert_eq!(analysis.summary.activity_span_days, 20);
        assert!(analysis.patterns.is_consistent);
        assert_eq!(analysis.collaboration.collaboration_score, 100.0);
        assert_eq!(analysis.commit_frequency.commits_per_day, 1.0);
        // 30 + 25 + 25 + 10 + 100*20/30*0.1
        assert_eq!(analysis.summary.git_activity_score, 9.7);
    }

    #[test]
    fn empty_history_is_unavailable() {
        assert_eq!(
            analyze_commits(&[], 1, &GradingConfig::default()),
            Err(DataUnavailable::NoCommits)
        );
    }

    #[test]
    fn batch_continues_past_missing_exports() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("alpha");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join(COMMIT_EXPORT_FILE),
            "hash,author,email,timestamp,message\n\
             a1,Ana,ana@example.com,2025-10-01T10:00:00+02:00,init project\n\
             b2,Ivo,ivo@example.com,2025-10-03T11:00:00+02:00,\"feat: add list, closes #2\"\n",
        )
        .unwrap();

        let roster = vec![
            StudentRecord {
                student_id: "s1".into(),
                project_team: "Alpha".into(),
                project_folder: "alpha".into(),
                ..StudentRecord::default()
            },
            StudentRecord {
                student_id: "s2".into(),
                project_team: "Alpha".into(),
                project_folder: "alpha".into(),
                ..StudentRecord::default()
            },
            StudentRecord {
                student_id: "s3".into(),
                project_team: "Beta".into(),
                project_folder: "beta".into(),
                ..StudentRecord::default()
            },
        ];

        let entries = analyze_roster(&roster, dir.path(), &GradingConfig::default());
        assert_eq!(entries.len(), 3);

        let alpha = entries[0].analysis.as_ref().unwrap();
        assert_eq!(alpha.summary.total_commits, 2);
        assert_eq!(alpha.summary.team_size, 2);
        assert!(entries[0].error.is_none());

        assert!(entries[2].analysis.is_none());
        assert_eq!(entries[2].git_activity_score, 0.0);
        assert!(entries[2]
            .error
            .as_deref()
            .unwrap()
            .starts_with("commit export not found"));
    }
}
