use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::CommitRecord;

/// Share of all commits that may land in the final active days before the
/// history counts as last-minute work.
const LAST_MINUTE_SHARE: f64 = 0.7;
const LAST_MINUTE_WINDOW: usize = 5;
/// Per-day commit counts are consistent when their std-dev stays under this
/// fraction of the mean.
const CONSISTENCY_RATIO: f64 = 0.8;
const REGULAR_MIN_ACTIVE_DAYS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPattern {
    None,
    SingleDay,
    LastMinute,
    Consistent,
    Regular,
    Sporadic,
}

impl std::fmt::Display for ActivityPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActivityPattern::None => "none",
            ActivityPattern::SingleDay => "single_day",
            ActivityPattern::LastMinute => "last_minute",
            ActivityPattern::Consistent => "consistent",
            ActivityPattern::Regular => "regular",
            ActivityPattern::Sporadic => "sporadic",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitPatterns {
    pub is_last_minute: bool,
    pub is_consistent: bool,
    pub activity_pattern: ActivityPattern,
    pub active_days: usize,
    pub total_days_span: i64,
    pub commits_by_day: BTreeMap<NaiveDate, usize>,
}

impl CommitPatterns {
    fn empty() -> Self {
        Self {
            is_last_minute: false,
            is_consistent: false,
            activity_pattern: ActivityPattern::None,
            active_days: 0,
            total_days_span: 0,
            commits_by_day: BTreeMap::new(),
        }
    }
}

/// Buckets commits by the calendar day of their own timestamp.
pub fn commits_by_day(commits: &[CommitRecord]) -> BTreeMap<NaiveDate, usize> {
    let mut by_day = BTreeMap::new();
    for commit in commits {
        *by_day.entry(commit.timestamp.date_naive()).or_insert(0) += 1;
    }
    by_day
}

pub fn detect_commit_patterns(commits: &[CommitRecord]) -> CommitPatterns {
    if commits.is_empty() {
        return CommitPatterns::empty();
    }

    let by_day = commits_by_day(commits);
    let days: Vec<NaiveDate> = by_day.keys().copied().collect();
    let counts: Vec<usize> = by_day.values().copied().collect();
    let total_days_span = match (days.first(), days.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days() + 1,
        _ => 0,
    };

    if days.len() < 2 {
        return CommitPatterns {
            activity_pattern: ActivityPattern::SingleDay,
            active_days: days.len(),
            total_days_span,
            commits_by_day: by_day,
            ..CommitPatterns::empty()
        };
    }

    let total = commits.len() as f64;
    let window = LAST_MINUTE_WINDOW.min(counts.len());
    let tail: usize = counts[counts.len() - window..].iter().sum();
    let is_last_minute = tail as f64 > total * LAST_MINUTE_SHARE;

    let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    let variance = counts
        .iter()
        .map(|count| (*count as f64 - mean).powi(2))
        .sum::<f64>()
        / counts.len() as f64;
    let is_consistent = variance.sqrt() < mean * CONSISTENCY_RATIO;

    let activity_pattern = if is_last_minute {
        ActivityPattern::LastMinute
    } else if is_consistent {
        ActivityPattern::Consistent
    } else if days.len() > REGULAR_MIN_ACTIVE_DAYS {
        ActivityPattern::Regular
    } else {
        ActivityPattern::Sporadic
    };

    tracing::debug!(
        active_days = days.len(),
        total_days_span,
        %activity_pattern,
        "detected commit pattern"
    );

    CommitPatterns {
        is_last_minute,
        is_consistent,
        activity_pattern,
        active_days: days.len(),
        total_days_span,
        commits_by_day: by_day,
    }
}
