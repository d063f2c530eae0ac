use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ScheduleError;
use crate::models::{PresentationSlot, Project};

pub const EXPECTED_PROJECTS: usize = 22;

/// Presentation days as (year, month, day, project count), in order.
const PRESENTATION_DAYS: [(i32, u32, u32, usize); 3] =
    [(2026, 1, 26, 8), (2026, 2, 2, 7), (2026, 2, 9, 7)];

/// Shuffles exactly 22 projects and deals them out 8/7/7 over the three
/// presentation days. Any other count is refused outright.
pub fn assign_projects_to_dates<R: Rng + ?Sized>(
    projects: &[Project],
    rng: &mut R,
) -> Result<Vec<PresentationSlot>, ScheduleError> {
    if projects.len() != EXPECTED_PROJECTS {
        return Err(ScheduleError::ProjectCount {
            expected: EXPECTED_PROJECTS,
            found: projects.len(),
        });
    }

    let mut shuffled = projects.to_vec();
    shuffled.shuffle(rng);

    let mut remaining = shuffled.into_iter();
    let mut slots = Vec::with_capacity(PRESENTATION_DAYS.len());
    for (year, month, day, count) in PRESENTATION_DAYS {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ScheduleError::InvalidDate { year, month, day })?;
        slots.push(PresentationSlot {
            date,
            projects: remaining.by_ref().take(count).collect(),
        });
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::rng::seeded_rng;

    fn projects(n: usize) -> Vec<Project> {
        (0..n)
            .map(|i| Project {
                team_name: format!("Team {i}"),
                students: vec![format!("Student {i}a"), format!("Student {i}b")],
                project_title: format!("Project {i}"),
                folder: format!("project-{i}"),
                status: "In Progress".to_string(),
                description: String::new(),
            })
            .collect()
    }

    #[test]
    fn deals_eight_seven_seven_without_losing_projects() {
        let input = projects(22);
        for seed in [1, 42, 2026] {
            let slots = assign_projects_to_dates(&input, &mut seeded_rng(Some(seed))).unwrap();
            let sizes: Vec<usize> = slots.iter().map(|slot| slot.projects.len()).collect();
            assert_eq!(sizes, vec![8, 7, 7]);

            let assigned: Vec<&str> = slots
                .iter()
                .flat_map(|slot| slot.projects.iter().map(|p| p.project_title.as_str()))
                .collect();
            let unique: BTreeSet<&str> = assigned.iter().copied().collect();
            let expected: BTreeSet<&str> = input.iter().map(|p| p.project_title.as_str()).collect();
            assert_eq!(assigned.len(), 22);
            assert_eq!(unique, expected);
        }
    }

    #[test]
    fn dates_are_fixed_and_ordered() {
        let slots = assign_projects_to_dates(&projects(22), &mut seeded_rng(Some(3))).unwrap();
        let dates: Vec<String> = slots.iter().map(|slot| slot.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-01-26", "2026-02-02", "2026-02-09"]);
    }

    #[test]
    fn same_seed_same_schedule() {
        let input = projects(22);
        let first = assign_projects_to_dates(&input, &mut seeded_rng(Some(9))).unwrap();
        let second = assign_projects_to_dates(&input, &mut seeded_rng(Some(9))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn wrong_project_count_is_refused() {
        for n in [0, 21, 23] {
            assert_eq!(
                assign_projects_to_dates(&projects(n), &mut seeded_rng(Some(1))),
                Err(ScheduleError::ProjectCount {
                    expected: 22,
                    found: n,
                })
            );
        }
    }
}
