use std::collections::BTreeMap;

use crate::grading::{numeric_to_letter, round_to};
use crate::models::{ClassStatistics, LetterGrade};

/// Summarises a set of final grades. Returns `None` for an empty class.
///
/// The median is the element at sorted index `n / 2`; for an even count that
/// is the upper of the two middle grades, not their average.
pub fn class_statistics(final_grades: &[f64]) -> Option<ClassStatistics> {
    if final_grades.is_empty() {
        return None;
    }

    let n = final_grades.len() as f64;
    let mean = final_grades.iter().sum::<f64>() / n;
    let variance = final_grades
        .iter()
        .map(|grade| (grade - mean).powi(2))
        .sum::<f64>()
        / n;

    let mut sorted = final_grades.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut grade_distribution: BTreeMap<LetterGrade, usize> =
        LetterGrade::ALL.iter().map(|letter| (*letter, 0)).collect();
    for grade in final_grades {
        *grade_distribution
            .entry(numeric_to_letter(*grade))
            .or_insert(0) += 1;
    }

    let passing: usize = grade_distribution
        .iter()
        .filter(|(letter, _)| letter.is_passing())
        .map(|(_, count)| *count)
        .sum();

    Some(ClassStatistics {
        count: final_grades.len(),
        mean: round_to(mean, 2),
        median: round_to(sorted[sorted.len() / 2], 2),
        std_dev: round_to(variance.sqrt(), 2),
        min: round_to(sorted[0], 2),
        max: round_to(sorted[sorted.len() - 1], 2),
        grade_distribution,
        pass_rate: round_to(passing as f64 / n * 100.0, 1),
    })
}
