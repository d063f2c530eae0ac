use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::CommitRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollaborationMetrics {
    pub author_diversity: f64,
    pub participation_ratio: f64,
    pub commit_distribution: BTreeMap<String, usize>,
    pub collaboration_score: f64,
}

/// Scores how evenly a team shares the commit history.
///
/// Diversity is `1 - variance / ideal²` over per-author commit counts, where
/// `ideal` is the even share. A single committer gets `solo_credit` when the
/// team really has one member and nothing otherwise.
pub fn calculate_collaboration(
    commits: &[CommitRecord],
    team_size: usize,
    solo_credit: f64,
) -> CollaborationMetrics {
    if commits.is_empty() {
        return CollaborationMetrics::default();
    }

    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for commit in commits {
        *distribution.entry(commit.author.clone()).or_insert(0) += 1;
    }

    let team_size = team_size.max(1);
    let authors = distribution.len();
    let author_diversity = if authors > 1 {
        let ideal = commits.len() as f64 / authors as f64;
        let variance = distribution
            .values()
            .map(|count| (*count as f64 - ideal).powi(2))
            .sum::<f64>()
            / authors as f64;
        (1.0 - variance / ideal.powi(2)).max(0.0)
    } else if team_size == 1 {
        solo_credit
    } else {
        0.0
    };

    let participation_ratio = authors as f64 / team_size as f64;

    CollaborationMetrics {
        author_diversity,
        participation_ratio,
        commit_distribution: distribution,
        collaboration_score: (100.0 * (0.6 * author_diversity + 0.4 * participation_ratio))
            .min(100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::tests::{commit_at, start};

    fn by_authors(authors: &[&str]) -> Vec<CommitRecord> {
        authors
            .iter()
            .map(|author| commit_at(start(), author, "work"))
            .collect()
    }

    #[test]
    fn even_split_is_fully_diverse() {
        let metrics = calculate_collaboration(&by_authors(&["Ana", "Ivo", "Ana", "Ivo"]), 2, 0.2);
        assert_eq!(metrics.author_diversity, 1.0);
        assert_eq!(metrics.participation_ratio, 1.0);
        assert_eq!(metrics.collaboration_score, 100.0);
        assert_eq!(metrics.commit_distribution["Ana"], 2);
    }

    #[test]
    fn lopsided_split_loses_diversity() {
        // counts 3 and 1: ideal 2, variance 1, diversity 0.75
        let metrics = calculate_collaboration(&by_authors(&["Ana", "Ana", "Ana", "Ivo"]), 3, 0.2);
        assert_eq!(metrics.author_diversity, 0.75);
        assert!((metrics.participation_ratio - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.collaboration_score - (45.0 + 40.0 * 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn solo_project_gets_partial_credit() {
        let metrics = calculate_collaboration(&by_authors(&["Ana", "Ana"]), 1, 0.2);
        assert_eq!(metrics.author_diversity, 0.2);
        assert_eq!(metrics.participation_ratio, 1.0);
        assert!((metrics.collaboration_score - 52.0).abs() < 1e-9);
    }

    #[test]
    fn lone_committer_on_a_team_gets_no_diversity() {
        let metrics = calculate_collaboration(&by_authors(&["Ana", "Ana"]), 4, 0.2);
        assert_eq!(metrics.author_diversity, 0.0);
        assert_eq!(metrics.participation_ratio, 0.25);
        assert!((metrics.collaboration_score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn solo_credit_is_configurable() {
        let metrics = calculate_collaboration(&by_authors(&["Ana"]), 1, 0.5);
        assert_eq!(metrics.author_diversity, 0.5);
    }

    #[test]
    fn more_authors_than_members_is_capped() {
        let metrics = calculate_collaboration(&by_authors(&["Ana", "Ivo", "Eva"]), 1, 0.2);
        assert_eq!(metrics.participation_ratio, 3.0);
        assert_eq!(metrics.collaboration_score, 100.0);
    }

    #[test]
    fn no_commits_scores_zero() {
        assert_eq!(
            calculate_collaboration(&[], 3, 0.2),
            CollaborationMetrics::default()
        );
    }
}
