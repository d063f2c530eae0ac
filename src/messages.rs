use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::CommitRecord;

static CONVENTIONAL: OnceLock<Regex> = OnceLock::new();
static ISSUE_REFERENCE: OnceLock<Regex> = OnceLock::new();

fn conventional_pattern() -> &'static Regex {
    CONVENTIONAL.get_or_init(|| {
        Regex::new(r"^(feat|fix|docs|style|refactor|test|chore)(\(.+\))?: .+")
            .expect("conventional commit pattern is valid")
    })
}

fn issue_pattern() -> &'static Regex {
    ISSUE_REFERENCE.get_or_init(|| {
        Regex::new(r"(?i)#\d+|close[sd]?|fix|resolve").expect("issue reference pattern is valid")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageQuality {
    pub avg_length: f64,
    pub quality_score: f64,
    pub descriptive_ratio: f64,
    pub issue_reference_ratio: f64,
    pub conventional_ratio: f64,
}

/// Longer than ten characters and more than one word.
pub fn is_descriptive(message: &str) -> bool {
    message.chars().count() > 10 && message.contains(' ')
}

pub fn references_issue(message: &str) -> bool {
    issue_pattern().is_match(message)
}

pub fn is_conventional(message: &str) -> bool {
    conventional_pattern().is_match(message)
}

pub fn analyze_message_quality(commits: &[CommitRecord]) -> MessageQuality {
    if commits.is_empty() {
        return MessageQuality::default();
    }

    let mut total_length = 0usize;
    let mut descriptive = 0usize;
    let mut issue_references = 0usize;
    let mut conventional = 0usize;

    for commit in commits {
        let message = commit.message.trim();
        total_length += message.chars().count();
        if is_descriptive(message) {
            descriptive += 1;
        }
        if references_issue(message) {
            issue_references += 1;
        }
        if is_conventional(message) {
            conventional += 1;
        }
    }

    let total = commits.len() as f64;
    let descriptive_ratio = descriptive as f64 / total;
    let issue_reference_ratio = issue_references as f64 / total;
    let conventional_ratio = conventional as f64 / total;

    MessageQuality {
        avg_length: total_length as f64 / total,
        quality_score: (100.0
            * (0.4 * descriptive_ratio + 0.3 * issue_reference_ratio + 0.3 * conventional_ratio))
            .min(100.0),
        descriptive_ratio,
        issue_reference_ratio,
        conventional_ratio,
    }
}
