use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReviewRejected;
use crate::grading::round_to;
use crate::models::{
    ReviewDraft, ReviewState, ReviewSubmission, StudentRecord, Team, TeamReviewScore,
};
use crate::store;

/// Below this many scores a component is averaged without outlier trimming.
const MIN_SCORES_FOR_TRIMMING: usize = 3;
/// Absorbs float error when a score sits exactly on the outlier boundary.
const OUTLIER_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricItem {
    pub key: String,
    pub name: String,
    pub description: String,
    pub max_score: i64,
    pub criteria: Vec<String>,
}

fn rubric_item(key: &str, name: &str, description: &str, criteria: [&str; 4]) -> RubricItem {
    RubricItem {
        key: key.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        max_score: 10,
        criteria: criteria.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn default_rubric() -> Vec<RubricItem> {
    vec![
        rubric_item(
            "code_quality",
            "Code Quality",
            "Cleanliness, readability, structure, and best practices",
            [
                "Code is well-organized and modular",
                "Follows consistent naming conventions",
                "Includes appropriate comments and documentation",
                "Handles errors gracefully",
            ],
        ),
        rubric_item(
            "ui_ux",
            "User Interface/Experience",
            "Usability, design, and user interaction",
            [
                "Interface is intuitive and easy to use",
                "Visual design is appealing and consistent",
                "Provides clear feedback to users",
                "Responsive and performs well",
            ],
        ),
        rubric_item(
            "innovation",
            "Innovation and Creativity",
            "Originality of idea and technical solutions",
            [
                "Addresses a real need or problem",
                "Implements creative or novel features",
                "Uses interesting technologies or approaches",
                "Goes beyond basic requirements",
            ],
        ),
        rubric_item(
            "documentation",
            "Documentation",
            "Quality of project documentation",
            [
                "README is comprehensive and clear",
                "Setup and installation instructions",
                "API documentation (if applicable)",
                "User guide or examples",
            ],
        ),
        rubric_item(
            "overall",
            "Overall Impression",
            "General assessment of the project",
            [
                "Project is complete and functional",
                "Meets stated objectives",
                "Shows effort and attention to detail",
                "Would recommend to others",
            ],
        ),
    ]
}

/// Groups roster rows into teams, sorted by team name. Students without a
/// team are left out.
pub fn group_teams(roster: &[StudentRecord]) -> Vec<Team> {
    let mut teams: BTreeMap<String, Vec<StudentRecord>> = BTreeMap::new();
    for student in roster {
        match student.team() {
            Some(team) => teams
                .entry(team.to_string())
                .or_default()
                .push(student.clone()),
            None => tracing::debug!(student_id = %student.student_id, "student has no team"),
        }
    }
    teams
        .into_iter()
        .map(|(name, members)| Team { name, members })
        .collect()
}

/// Assigns reviewer teams to every team, keyed by the reviewed team.
///
/// After shuffling, reviewer `i` takes slots `j = 0..reviews_per_team` and
/// reviews the team at `(i + j + 1) % n`, shifted by one more when that lands
/// on itself. Teams still short of `reviews_per_team` are topped up with
/// random distinct reviewers; when the pool runs dry the team stays short.
pub fn assign_reviewers<R: Rng + ?Sized>(
    team_names: &[String],
    reviews_per_team: usize,
    avoid_self_review: bool,
    rng: &mut R,
) -> BTreeMap<String, Vec<String>> {
    let mut order = team_names.to_vec();
    order.shuffle(rng);

    let mut assignments: BTreeMap<String, Vec<String>> = order
        .iter()
        .map(|team| (team.clone(), Vec::new()))
        .collect();
    let n = order.len();
    if n == 0 {
        return assignments;
    }

    for (i, reviewer) in order.iter().enumerate() {
        for j in 0..reviews_per_team {
            let mut target = &order[(i + j + 1) % n];
            if avoid_self_review && target == reviewer {
                target = &order[(i + j + 2) % n];
                if target == reviewer {
                    continue;
                }
            }
            if let Some(reviewers) = assignments.get_mut(target) {
                if !reviewers.contains(reviewer) {
                    reviewers.push(reviewer.clone());
                }
            }
        }
    }

    for team in &order {
        let Some(reviewers) = assignments.get_mut(team) else {
            continue;
        };
        while reviewers.len() < reviews_per_team {
            let available: Vec<&String> = order
                .iter()
                .filter(|candidate| *candidate != team && !reviewers.contains(*candidate))
                .collect();
            match available.choose(rng) {
                Some(reviewer) => reviewers.push((*reviewer).clone()),
                None => {
                    tracing::warn!(
                        %team,
                        assigned = reviewers.len(),
                        wanted = reviews_per_team,
                        "not enough teams to fill review quota"
                    );
                    break;
                }
            }
        }
    }

    assignments
}

/// Mean of one rubric component across reviews, one decimal.
///
/// With at least three scores, any score whose distance from the mean reaches
/// `outlier_threshold` population std-devs is dropped first, unless that
/// would drop everything.
pub fn aggregate_component(scores: &[f64], outlier_threshold: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let mut kept = scores.to_vec();
    if scores.len() >= MIN_SCORES_FOR_TRIMMING {
        let center = mean(scores);
        let std_dev = (scores.iter().map(|s| (s - center).powi(2)).sum::<f64>()
            / scores.len() as f64)
            .sqrt();
        if std_dev > 0.0 {
            let limit = outlier_threshold * std_dev - OUTLIER_TOLERANCE;
            let filtered: Vec<f64> = scores
                .iter()
                .copied()
                .filter(|score| (score - center).abs() < limit)
                .collect();
            if !filtered.is_empty() {
                kept = filtered;
            }
        }
    }

    round_to(mean(&kept), 1)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewFeedback {
    pub reviewer_team: String,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReviewSummary {
    pub team: String,
    pub reviews_received: usize,
    pub average_score: f64,
    pub component_averages: BTreeMap<String, f64>,
    pub feedback: Vec<ReviewFeedback>,
}

/// Rubric, reviewer assignments and accepted submissions for one review round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewBook {
    pub rubric: Vec<RubricItem>,
    pub assignments: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub submissions: BTreeMap<String, Vec<ReviewSubmission>>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewBook {
    pub fn new(assignments: BTreeMap<String, Vec<String>>, created_at: DateTime<Utc>) -> Self {
        Self {
            rubric: default_rubric(),
            assignments,
            submissions: BTreeMap::new(),
            updated_at: created_at,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        store::read_json(path)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        store::write_json(path, self)
    }

    /// Checks a draft against every submission rule and records it.
    pub fn submit_review(
        &mut self,
        draft: ReviewDraft,
        submitted_at: DateTime<Utc>,
    ) -> Result<&ReviewSubmission, ReviewRejected> {
        let reviewed_team = required(draft.reviewed_team, "reviewed_team")?;
        let reviewer_team = required(draft.reviewer_team, "reviewer_team")?;
        let comments = draft.comments.ok_or(ReviewRejected::MissingField("comments"))?;

        let mut scores = BTreeMap::new();
        for item in &self.rubric {
            let value = *draft
                .scores
                .get(&item.key)
                .ok_or_else(|| ReviewRejected::MissingScore(item.name.clone()))?;
            if !(0..=item.max_score).contains(&value) {
                return Err(ReviewRejected::ScoreOutOfRange {
                    key: item.key.clone(),
                    value,
                    max: item.max_score,
                });
            }
            scores.insert(item.key.clone(), value);
        }

        let assigned = self
            .assignments
            .get(&reviewed_team)
            .ok_or_else(|| ReviewRejected::UnknownTeam(reviewed_team.clone()))?;
        if !assigned.contains(&reviewer_team) {
            return Err(ReviewRejected::NotAssigned {
                reviewer: reviewer_team,
                reviewed: reviewed_team,
            });
        }

        let received = self.submissions.entry(reviewed_team.clone()).or_default();
        if received
            .iter()
            .any(|existing| existing.reviewer_team == reviewer_team)
        {
            return Err(ReviewRejected::Duplicate {
                reviewer: reviewer_team,
                reviewed: reviewed_team,
            });
        }

        tracing::info!(%reviewed_team, %reviewer_team, "review accepted");
        let index = received.len();
        received.push(ReviewSubmission {
            id: Uuid::new_v4(),
            reviewed_team,
            reviewer_team,
            scores,
            comments,
            submitted_at,
        });
        self.updated_at = submitted_at;

        Ok(&received[index])
    }

    pub fn review_state(&self, team: &str) -> ReviewState {
        let received = self.submissions.get(team).map_or(0, Vec::len);
        let expected = self.assignments.get(team).map_or(0, Vec::len);
        if received == 0 {
            ReviewState::NoReviews
        } else if received < expected {
            ReviewState::ReviewsPending
        } else {
            ReviewState::Scored
        }
    }

    fn teams(&self) -> BTreeSet<&String> {
        self.assignments.keys().chain(self.submissions.keys()).collect()
    }

    fn component_values(&self, reviews: &[ReviewSubmission], key: &str) -> Vec<f64> {
        reviews
            .iter()
            .filter_map(|review| review.scores.get(key))
            .map(|score| *score as f64)
            .collect()
    }

    /// Scores every team; teams nobody reviewed yet get zeros.
    pub fn calculate_team_scores(&self, outlier_threshold: f64) -> Vec<TeamReviewScore> {
        self.teams()
            .into_iter()
            .map(|team| {
                let reviews = self.submissions.get(team).map_or(&[][..], Vec::as_slice);
                let component_scores: BTreeMap<String, f64> = self
                    .rubric
                    .iter()
                    .map(|item| {
                        let values = self.component_values(reviews, &item.key);
                        (item.key.clone(), aggregate_component(&values, outlier_threshold))
                    })
                    .collect();

                let average_score = if reviews.is_empty() || self.rubric.is_empty() {
                    0.0
                } else {
                    round_to(
                        component_scores.values().sum::<f64>() / self.rubric.len() as f64,
                        1,
                    )
                };

                TeamReviewScore {
                    team: team.clone(),
                    state: self.review_state(team),
                    average_score,
                    component_scores,
                    num_reviews: reviews.len(),
                }
            })
            .collect()
    }

    /// Plain (untrimmed) averages and the written feedback for one team.
    pub fn summary(&self, team: &str) -> Option<TeamReviewSummary> {
        let reviews = self.submissions.get(team)?;
        let component_averages: BTreeMap<String, f64> = self
            .rubric
            .iter()
            .filter_map(|item| {
                let values = self.component_values(reviews, &item.key);
                (!values.is_empty()).then(|| (item.key.clone(), round_to(mean(&values), 2)))
            })
            .collect();

        Some(TeamReviewSummary {
            team: team.to_string(),
            reviews_received: reviews.len(),
            average_score: component_averages.get("overall").copied().unwrap_or(0.0),
            component_averages,
            feedback: reviews
                .iter()
                .filter(|review| !review.comments.trim().is_empty())
                .map(|review| ReviewFeedback {
                    reviewer_team: review.reviewer_team.clone(),
                    comments: review.comments.clone(),
                })
                .collect(),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ReviewRejected> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ReviewRejected::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Team {i:02}")).collect()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-20T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn draft(reviewed: &str, reviewer: &str, score: i64) -> ReviewDraft {
        ReviewDraft {
            reviewed_team: Some(reviewed.to_string()),
            reviewer_team: Some(reviewer.to_string()),
            comments: Some("Solid work".to_string()),
            scores: ["code_quality", "ui_ux", "innovation", "documentation", "overall"]
                .iter()
                .map(|key| (key.to_string(), score))
                .collect(),
        }
    }

    fn book() -> ReviewBook {
        let mut assignments = BTreeMap::new();
        assignments.insert(
            "Alpha".to_string(),
            vec!["Beta".to_string(), "Gamma".to_string(), "Delta".to_string()],
        );
        assignments.insert("Beta".to_string(), vec!["Alpha".to_string()]);
        ReviewBook::new(assignments, now())
    }

    #[test]
    fn outlier_on_the_boundary_is_dropped() {
        assert_eq!(aggregate_component(&[8.0, 8.0, 8.0, 8.0, 2.0], 2.0), 8.0);
    }

    #[test]
    fn small_samples_are_not_trimmed() {
        assert_eq!(aggregate_component(&[1.0, 10.0], 2.0), 5.5);
        assert_eq!(aggregate_component(&[7.0, 8.0, 9.0], 2.0), 8.0);
        assert_eq!(aggregate_component(&[6.0, 6.0, 6.0], 2.0), 6.0);
        assert_eq!(aggregate_component(&[], 2.0), 0.0);
    }

    #[test]
    fn averages_round_to_one_decimal() {
        assert_eq!(aggregate_component(&[7.0, 8.0], 2.0), 7.5);
        assert_eq!(aggregate_component(&[7.0, 7.0, 8.0], 2.0), 7.3);
    }

    #[test]
    fn every_team_gets_three_distinct_reviewers() {
        for n in 4..=12 {
            for seed in 0..20 {
                let teams = names(n);
                let mut rng = StdRng::seed_from_u64(seed);
                let assignments = assign_reviewers(&teams, 3, true, &mut rng);

                assert_eq!(assignments.len(), n);
                for (team, reviewers) in &assignments {
                    assert_eq!(reviewers.len(), 3, "{team} with n={n} seed={seed}");
                    assert!(!reviewers.contains(team));
                    let distinct: BTreeSet<&String> = reviewers.iter().collect();
                    assert_eq!(distinct.len(), 3);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_assignments() {
        let teams = names(9);
        let first = assign_reviewers(&teams, 3, true, &mut StdRng::seed_from_u64(42));
        let second = assign_reviewers(&teams, 3, true, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn tiny_pools_stay_under_quota_without_self_review() {
        let teams = names(3);
        let assignments = assign_reviewers(&teams, 3, true, &mut StdRng::seed_from_u64(7));
        for (team, reviewers) in &assignments {
            assert_eq!(reviewers.len(), 2);
            assert!(!reviewers.contains(team));
        }

        let lonely = assign_reviewers(&names(1), 3, true, &mut StdRng::seed_from_u64(7));
        assert!(lonely["Team 00"].is_empty());
        assert!(assign_reviewers(&[], 3, true, &mut StdRng::seed_from_u64(7)).is_empty());
    }

    #[test]
    fn groups_roster_into_sorted_teams() {
        let student = |id: &str, team: &str| StudentRecord {
            student_id: id.to_string(),
            project_team: team.to_string(),
            ..StudentRecord::default()
        };
        let teams = group_teams(&[
            student("s1", "Zeta"),
            student("s2", "Alpha"),
            student("s3", "Zeta"),
            student("s4", "No Team"),
            student("s5", ""),
        ]);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name, "Alpha");
        assert_eq!(teams[1].members.len(), 2);
    }

    #[test]
    fn accepted_review_is_recorded() {
        let mut book = book();
        let submission = book.submit_review(draft("Alpha", "Beta", 8), now()).unwrap();
        assert_eq!(submission.reviewer_team, "Beta");
        assert_eq!(submission.scores["overall"], 8);
        assert_eq!(book.submissions["Alpha"].len(), 1);
        assert_eq!(book.review_state("Alpha"), ReviewState::ReviewsPending);
    }

    #[test]
    fn submission_rules_reject_bad_reviews() {
        let mut book = book();

        let mut missing = draft("Alpha", "Beta", 8);
        missing.comments = None;
        assert_eq!(
            book.submit_review(missing, now()).unwrap_err(),
            ReviewRejected::MissingField("comments")
        );

        let mut no_score = draft("Alpha", "Beta", 8);
        no_score.scores.remove("ui_ux");
        assert_eq!(
            book.submit_review(no_score, now()).unwrap_err(),
            ReviewRejected::MissingScore("User Interface/Experience".to_string())
        );

        assert!(matches!(
            book.submit_review(draft("Alpha", "Beta", 11), now()),
            Err(ReviewRejected::ScoreOutOfRange { value: 11, .. })
        ));
        assert!(matches!(
            book.submit_review(draft("Alpha", "Beta", -1), now()),
            Err(ReviewRejected::ScoreOutOfRange { value: -1, .. })
        ));
        assert_eq!(
            book.submit_review(draft("Omega", "Beta", 8), now())
                .unwrap_err(),
            ReviewRejected::UnknownTeam("Omega".to_string())
        );
        assert!(matches!(
            book.submit_review(draft("Beta", "Gamma", 8), now()),
            Err(ReviewRejected::NotAssigned { .. })
        ));

        book.submit_review(draft("Alpha", "Beta", 8), now()).unwrap();
        assert!(matches!(
            book.submit_review(draft("Alpha", "Beta", 9), now()),
            Err(ReviewRejected::Duplicate { .. })
        ));
        assert_eq!(book.submissions["Alpha"].len(), 1);
    }

    #[test]
    fn team_scores_trim_outliers_and_cover_unreviewed_teams() {
        let mut book = book();
        book.assignments.get_mut("Alpha").unwrap().extend([
            "Epsilon".to_string(),
            "Zeta".to_string(),
        ]);
        for reviewer in ["Beta", "Gamma", "Delta", "Epsilon"] {
            book.submit_review(draft("Alpha", reviewer, 8), now()).unwrap();
        }
        book.submit_review(draft("Alpha", "Zeta", 2), now()).unwrap();

        let scores = book.calculate_team_scores(2.0);
        assert_eq!(scores.len(), 2);

        let alpha = &scores[0];
        assert_eq!(alpha.team, "Alpha");
        assert_eq!(alpha.num_reviews, 5);
        assert_eq!(alpha.state, ReviewState::Scored);
        assert_eq!(alpha.component_scores["code_quality"], 8.0);
        assert_eq!(alpha.average_score, 8.0);

        let beta = &scores[1];
        assert_eq!(beta.state, ReviewState::NoReviews);
        assert_eq!(beta.average_score, 0.0);
        assert_eq!(beta.num_reviews, 0);
        assert_eq!(beta.component_scores.len(), 5);
        assert!(beta.component_scores.values().all(|score| *score == 0.0));
    }

    #[test]
    fn summary_lists_feedback() {
        let mut book = book();
        book.submit_review(draft("Alpha", "Beta", 7), now()).unwrap();
        let mut quiet = draft("Alpha", "Gamma", 8);
        quiet.comments = Some("  ".to_string());
        book.submit_review(quiet, now()).unwrap();

        let summary = book.summary("Alpha").unwrap();
        assert_eq!(summary.reviews_received, 2);
        assert_eq!(summary.average_score, 7.5);
        assert_eq!(summary.feedback.len(), 1);
        assert_eq!(summary.feedback[0].reviewer_team, "Beta");
        assert!(book.summary("Beta").is_none());
    }

    #[test]
    fn book_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        let mut book = book();
        book.submit_review(draft("Alpha", "Beta", 9), now()).unwrap();
        book.save(&path).unwrap();

        let loaded = ReviewBook::load(&path).unwrap();
        assert_eq!(loaded, book);
    }
}
