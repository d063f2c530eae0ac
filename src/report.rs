use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::grading::{self, Component};
use crate::models::{ClassStatistics, LetterGrade, PresentationSlot, StudentGrade};

const TOP_PERFORMERS: usize = 5;

pub fn build_class_report(
    grades: &[StudentGrade],
    statistics: Option<&ClassStatistics>,
    passing_grade: f64,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Grade Report");
    let _ = writeln!(
        output,
        "Generated {} for {} students",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        grades.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Statistics");

    match statistics {
        None => {
            let _ = writeln!(output, "No graded students.");
        }
        Some(stats) => {
            let _ = writeln!(output, "- Mean: {:.2}", stats.mean);
            let _ = writeln!(output, "- Median: {:.2}", stats.median);
            let _ = writeln!(output, "- Standard deviation: {:.2}", stats.std_dev);
            let _ = writeln!(output, "- Range: {:.2} to {:.2}", stats.min, stats.max);
            let _ = writeln!(output, "- Pass rate: {:.1}%", stats.pass_rate);

            let _ = writeln!(output);
            let _ = writeln!(output, "## Grade Distribution");
            for letter in LetterGrade::ALL {
                let count = stats.grade_distribution.get(&letter).copied().unwrap_or(0);
                let share = if stats.count == 0 {
                    0.0
                } else {
                    100.0 * count as f64 / stats.count as f64
                };
                let _ = writeln!(output, "- {letter}: {count} ({share:.1}%)");
            }
        }
    }

    let averages = grading::component_averages(grades);
    let graded_components: Vec<Component> = Component::ALL
        .into_iter()
        .filter(|component| grades.iter().any(|g| g.components.get(*component).is_some()))
        .collect();
    if !graded_components.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Component Averages");
        for component in graded_components {
            let average = averages.get(&component).copied().unwrap_or(0.0);
            let _ = writeln!(
                output,
                "- {component}: {average:.2} / {}",
                component.max_score()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    let ranked = grading::ranking(grades);
    if ranked.is_empty() {
        let _ = writeln!(output, "No graded students.");
    } else {
        for (place, grade) in ranked.iter().take(TOP_PERFORMERS).enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}) {:.2} ({})",
                place + 1,
                grade.student.full_name,
                grade.student.student_id,
                grade.final_grade.numeric,
                grade.final_grade.letter
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Below {passing_grade:.0}");
    let failing = grading::failing_students(grades, passing_grade);
    if failing.is_empty() {
        let _ = writeln!(output, "Every student passed.");
    } else {
        for grade in failing {
            let _ = writeln!(
                output,
                "- {} ({}) {:.2} ({})",
                grade.student.full_name,
                grade.student.student_id,
                grade.final_grade.numeric,
                grade.final_grade.letter
            );
        }
    }

    let flagged: Vec<&StudentGrade> = grades.iter().filter(|g| !g.warnings.is_empty()).collect();
    if !flagged.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Validation Warnings");
        for grade in flagged {
            let _ = writeln!(
                output,
                "- {}: {}",
                grade.student.student_id,
                grade.warnings.join("; ")
            );
        }
    }

    output
}

pub fn build_schedule_report(
    slots: &[PresentationSlot],
    seed: Option<u64>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Project Presentation Schedule");
    let _ = writeln!(
        output,
        "Generated {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    match seed {
        Some(seed) => {
            let _ = writeln!(output, "Random seed: {seed}");
        }
        None => {
            let _ = writeln!(output, "Random seed: none (not reproducible)");
        }
    }

    let mut number = 0;
    for slot in slots {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} ({} projects)",
            slot.date.format("%A, %d %B %Y"),
            slot.projects.len()
        );
        for project in &slot.projects {
            number += 1;
            let _ = writeln!(
                output,
                "{number}. **{}** ({}): {}",
                project.project_title,
                project.team_name,
                project.students.join(", ")
            );
        }
    }

    let projects: usize = slots.iter().map(|slot| slot.projects.len()).sum();
    let students: BTreeSet<&str> = slots
        .iter()
        .flat_map(|slot| slot.projects.iter())
        .flat_map(|project| project.students.iter().map(String::as_str))
        .collect();
    let average_team = if projects == 0 {
        0.0
    } else {
        students.len() as f64 / projects as f64
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Presentation days: {}", slots.len());
    let _ = writeln!(output, "- Projects: {projects}");
    let _ = writeln!(output, "- Students: {}", students.len());
    let _ = writeln!(output, "- Average team size: {average_team:.1}");

    output
}
