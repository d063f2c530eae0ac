use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::{Component, GradeComponents};

/// One commit as exported from a repository's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

/// A roster row. Unknown columns are ignored and absent ones default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentRecord {
    pub student_id: String,
    pub full_name: String,
    pub github_username: String,
    pub project_team: String,
    pub project_title: String,
    pub project_folder: String,
}

impl StudentRecord {
    /// The team this student belongs to, if they are on one.
    pub fn team(&self) -> Option<&str> {
        let team = self.project_team.trim();
        if team.is_empty() || team == "No Team" {
            None
        } else {
            Some(team)
        }
    }
}

/// A grade-input row: roster columns plus the raw cell for every component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GradeRow {
    pub student_id: String,
    pub full_name: String,
    pub github_username: String,
    pub project_team: String,
    pub project_title: String,
    pub project_folder: String,
    pub seminar_grade: Option<String>,
    pub code_quality_grade: Option<String>,
    pub innovation_grade: Option<String>,
    pub documentation_grade: Option<String>,
    pub attendance_grade: Option<String>,
    pub git_activity_grade: Option<String>,
    pub peer_review_grade: Option<String>,
    pub git_quiz_grade: Option<String>,
}

impl GradeRow {
    pub fn student(&self) -> StudentRecord {
        StudentRecord {
            student_id: self.student_id.clone(),
            full_name: self.full_name.clone(),
            github_username: self.github_username.clone(),
            project_team: self.project_team.clone(),
            project_title: self.project_title.clone(),
            project_folder: self.project_folder.clone(),
        }
    }

    pub fn cell(&self, component: Component) -> Option<&str> {
        let cell = match component {
            Component::Seminar => &self.seminar_grade,
            Component::CodeQuality => &self.code_quality_grade,
            Component::Innovation => &self.innovation_grade,
            Component::Documentation => &self.documentation_grade,
            Component::Attendance => &self.attendance_grade,
            Component::GitActivity => &self.git_activity_grade,
            Component::PeerReview => &self.peer_review_grade,
            Component::GitQuiz => &self.git_quiz_grade,
        };
        cell.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub name: String,
    pub members: Vec<StudentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 5] = [
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    pub fn is_passing(self) -> bool {
        self != LetterGrade::F
    }
}

impl std::fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeStatus {
    Excellent,
    Good,
    Pass,
    Fail,
}

impl std::fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            GradeStatus::Excellent => "Excellent",
            GradeStatus::Good => "Good",
            GradeStatus::Pass => "Pass",
            GradeStatus::Fail => "Fail",
        };
        f.write_str(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalGrade {
    pub numeric: f64,
    pub letter: LetterGrade,
    pub status: GradeStatus,
}

/// Per-component audit trail behind a final grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBreakdown {
    pub components: BTreeMap<Component, f64>,
    pub weights: BTreeMap<Component, f64>,
    pub weighted_scores: BTreeMap<Component, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentGrade {
    pub student: StudentRecord,
    pub components: GradeComponents,
    pub final_grade: FinalGrade,
    pub breakdown: GradeBreakdown,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub grade_distribution: BTreeMap<LetterGrade, usize>,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub team_name: String,
    pub students: Vec<String>,
    pub project_title: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default = "default_project_status")]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

fn default_project_status() -> String {
    "In Progress".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationSlot {
    pub date: NaiveDate,
    pub projects: Vec<Project>,
}

/// A review as submitted by a reviewer team, before any business rule ran.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewDraft {
    pub reviewed_team: Option<String>,
    pub reviewer_team: Option<String>,
    pub comments: Option<String>,
    pub scores: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub id: Uuid,
    pub reviewed_team: String,
    pub reviewer_team: String,
    pub scores: BTreeMap<String, i64>,
    pub comments: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    NoReviews,
    ReviewsPending,
    Scored,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReviewState::NoReviews => "no reviews",
            ReviewState::ReviewsPending => "reviews pending",
            ReviewState::Scored => "scored",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReviewScore {
    pub team: String,
    pub state: ReviewState,
    pub average_score: f64,
    pub component_scores: BTreeMap<String, f64>,
    pub num_reviews: usize,
}
