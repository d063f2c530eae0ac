use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    FinalGrade, GradeBreakdown, GradeRow, GradeStatus, LetterGrade, StudentGrade,
};

/// The eight graded components of the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Seminar,
    CodeQuality,
    Innovation,
    Documentation,
    Attendance,
    GitActivity,
    PeerReview,
    GitQuiz,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::Seminar,
        Component::CodeQuality,
        Component::Innovation,
        Component::Documentation,
        Component::Attendance,
        Component::GitActivity,
        Component::PeerReview,
        Component::GitQuiz,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Component::Seminar => "seminar",
            Component::CodeQuality => "code_quality",
            Component::Innovation => "innovation",
            Component::Documentation => "documentation",
            Component::Attendance => "attendance",
            Component::GitActivity => "git_activity",
            Component::PeerReview => "peer_review",
            Component::GitQuiz => "git_quiz",
        }
    }

    pub fn max_score(self) -> f64 {
        match self {
            Component::CodeQuality => 30.0,
            _ => 10.0,
        }
    }

    /// Weight in whole percent; the eight values add up to exactly 100.
    pub fn weight_percent(self) -> u32 {
        match self {
            Component::CodeQuality => 30,
            _ => 10,
        }
    }

    pub fn weight(self) -> f64 {
        f64::from(self.weight_percent()) / 100.0
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Component scores on each component's own scale (0..=max_score).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeComponents {
    scores: BTreeMap<Component, f64>,
}

impl GradeComponents {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, component: Component, score: f64) -> Self {
        self.insert(component, score);
        self
    }

    pub fn insert(&mut self, component: Component, score: f64) {
        self.scores.insert(component, score);
    }

    pub fn get(&self, component: Component) -> Option<f64> {
        self.scores.get(&component).copied()
    }
}

impl FromIterator<(Component, f64)> for GradeComponents {
    fn from_iter<I: IntoIterator<Item = (Component, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradeWarning {
    Missing {
        component: Component,
    },
    NotNumeric {
        component: Component,
        raw: String,
    },
    OutOfRange {
        component: Component,
        value: f64,
        max: f64,
    },
}

impl std::fmt::Display for GradeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeWarning::Missing { component } => {
                write!(f, "missing grade component: {component}")
            }
            GradeWarning::NotNumeric { component, raw } => {
                write!(f, "grade for {component} must be numeric (got {raw:?})")
            }
            GradeWarning::OutOfRange {
                component,
                value,
                max,
            } => write!(
                f,
                "grade for {component} ({value}) is outside valid range (0-{max})"
            ),
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn numeric_to_letter(numeric: f64) -> LetterGrade {
    if numeric >= 90.0 {
        LetterGrade::A
    } else if numeric >= 80.0 {
        LetterGrade::B
    } else if numeric >= 70.0 {
        LetterGrade::C
    } else if numeric >= 60.0 {
        LetterGrade::D
    } else {
        LetterGrade::F
    }
}

pub fn numeric_to_status(numeric: f64) -> GradeStatus {
    if numeric >= 90.0 {
        GradeStatus::Excellent
    } else if numeric >= 80.0 {
        GradeStatus::Good
    } else if numeric >= 60.0 {
        GradeStatus::Pass
    } else {
        GradeStatus::Fail
    }
}

/// Contribution of one raw component score to the final grade.
fn weighted_contribution(component: Component, score: f64) -> f64 {
    component.weight() * score
}

/// Weighted sum of the raw scores over all eight components; missing ones
/// count as 0. Scores are not rescaled to their maximum, so a full record
/// sums to 16.
pub fn calculate_final_grade(components: &GradeComponents) -> FinalGrade {
    let total: f64 = Component::ALL
        .iter()
        .map(|component| {
            weighted_contribution(*component, components.get(*component).unwrap_or(0.0))
        })
        .sum();
    let numeric = round_to(total, 2);

    FinalGrade {
        numeric,
        letter: numeric_to_letter(numeric),
        status: numeric_to_status(numeric),
    }
}

pub fn validate_grades(components: &GradeComponents) -> Vec<GradeWarning> {
    let mut warnings = Vec::new();

    for component in Component::ALL {
        match components.get(component) {
            None => warnings.push(GradeWarning::Missing { component }),
            Some(value) if !(0.0..=component.max_score()).contains(&value) => {
                warnings.push(GradeWarning::OutOfRange {
                    component,
                    value,
                    max: component.max_score(),
                })
            }
            Some(_) => {}
        }
    }

    warnings
}

pub fn grade_breakdown(components: &GradeComponents) -> GradeBreakdown {
    let mut breakdown = GradeBreakdown {
        components: BTreeMap::new(),
        weights: BTreeMap::new(),
        weighted_scores: BTreeMap::new(),
    };

    for component in Component::ALL {
        let score = components.get(component).unwrap_or(0.0);
        breakdown.components.insert(component, score);
        breakdown.weights.insert(component, component.weight());
        breakdown
            .weighted_scores
            .insert(component, round_to(weighted_contribution(component, score), 2));
    }

    breakdown
}

/// Reads the raw cells of a grade row. Blank cells are left out, unparseable
/// ones are left out and reported.
pub fn parse_components(row: &GradeRow) -> (GradeComponents, Vec<GradeWarning>) {
    let mut components = GradeComponents::new();
    let mut warnings = Vec::new();

    for component in Component::ALL {
        let Some(raw) = row.cell(component) else {
            continue;
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => components.insert(component, value),
            _ => warnings.push(GradeWarning::NotNumeric {
                component,
                raw: raw.to_string(),
            }),
        }
    }

    (components, warnings)
}

pub fn grade_student(row: &GradeRow) -> StudentGrade {
    let (components, mut warnings) = parse_components(row);
    warnings.extend(
        validate_grades(&components)
            .into_iter()
            .filter(|warning| match warning {
                // already reported as non-numeric
                GradeWarning::Missing { component } => row.cell(*component).is_none(),
                _ => true,
            }),
    );

    for warning in &warnings {
        tracing::warn!(student_id = %row.student_id, %warning, "grade validation warning");
    }

    let final_grade = calculate_final_grade(&components);
    let breakdown = grade_breakdown(&components);

    StudentGrade {
        student: row.student(),
        components,
        final_grade,
        breakdown,
        warnings: warnings.iter().map(ToString::to_string).collect(),
    }
}

/// Grades every row with a student id; blank rows are skipped.
pub fn grade_all(rows: &[GradeRow]) -> Vec<StudentGrade> {
    rows.iter()
        .filter(|row| {
            let keep = !row.student_id.trim().is_empty();
            if !keep {
                tracing::debug!("skipping grade row without a student id");
            }
            keep
        })
        .map(grade_student)
        .collect()
}

/// Highest final grade first; equal grades fall back to student id order.
pub fn ranking(grades: &[StudentGrade]) -> Vec<&StudentGrade> {
    let mut ranked: Vec<&StudentGrade> = grades.iter().collect();
    ranked.sort_by(|a, b| {
        b.final_grade
            .numeric
            .partial_cmp(&a.final_grade.numeric)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.student.student_id.cmp(&b.student.student_id))
    });
    ranked
}

pub fn failing_students(grades: &[StudentGrade], passing_grade: f64) -> Vec<&StudentGrade> {
    grades
        .iter()
        .filter(|grade| grade.final_grade.numeric < passing_grade)
        .collect()
}

/// Mean of each component over the students that have it.
pub fn component_averages(grades: &[StudentGrade]) -> BTreeMap<Component, f64> {
    Component::ALL
        .iter()
        .map(|component| {
            let values: Vec<f64> = grades
                .iter()
                .filter_map(|grade| grade.components.get(*component))
                .collect();
            let average = if values.is_empty() {
                0.0
            } else {
                round_to(values.iter().sum::<f64>() / values.len() as f64, 2)
            };
            (*component, average)
        })
        .collect()
}
