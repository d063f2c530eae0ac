use std::path::Path;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::grading::Component;
use crate::models::{CommitRecord, GradeRow, Project, StudentGrade, StudentRecord};

pub fn read_roster(csv_path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("could not open roster {}", csv_path.display()))?;
    require_columns(&mut reader, csv_path, &["student_id", "project_team"])?;

    let mut students = Vec::new();
    for result in reader.deserialize::<StudentRecord>() {
        students.push(result.with_context(|| format!("bad roster row in {}", csv_path.display()))?);
    }
    tracing::debug!(count = students.len(), path = %csv_path.display(), "loaded roster");
    Ok(students)
}

pub fn read_grade_rows(csv_path: &Path) -> anyhow::Result<Vec<GradeRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("could not open grade sheet {}", csv_path.display()))?;
    require_columns(&mut reader, csv_path, &["student_id"])?;

    let headers = reader.headers()?.clone();
    for component in Component::ALL {
        let column = format!("{}_grade", component.key());
        if !headers.iter().any(|header| header == column) {
            tracing::warn!(%column, "grade sheet has no column for component");
        }
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<GradeRow>() {
        rows.push(result.with_context(|| format!("bad grade row in {}", csv_path.display()))?);
    }
    tracing::info!(count = rows.len(), path = %csv_path.display(), "loaded grade rows");
    Ok(rows)
}

/// Reads a commit export and returns it oldest first.
pub fn read_commits(csv_path: &Path) -> anyhow::Result<Vec<CommitRecord>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("could not open commit export {}", csv_path.display()))?;

    let mut commits = Vec::new();
    for result in reader.deserialize::<CommitRecord>() {
        commits.push(result.with_context(|| format!("bad commit row in {}", csv_path.display()))?);
    }
    commits.sort_by_key(|commit| commit.timestamp);
    Ok(commits)
}

pub fn read_projects(json_path: &Path) -> anyhow::Result<Vec<Project>> {
    read_json(json_path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("could not write {}", path.display()))
}

/// One row per student: id, name, team, every component, final grade, letter, status.
pub fn write_grades_csv(path: &Path, grades: &[StudentGrade]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("could not create {}", path.display()))?;

    let mut header = vec![
        "student_id".to_string(),
        "full_name".to_string(),
        "project_team".to_string(),
    ];
    header.extend(Component::ALL.iter().map(|c| format!("{}_grade", c.key())));
    header.extend(["final_grade", "final_grade_letter", "status"].map(String::from));
    writer.write_record(&header)?;

    for grade in grades {
        let mut record = vec![
            grade.student.student_id.clone(),
            grade.student.full_name.clone(),
            grade.student.project_team.clone(),
        ];
        record.extend(Component::ALL.iter().map(|component| {
            grade
                .components
                .get(*component)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        record.push(format!("{:.2}", grade.final_grade.numeric));
        record.push(grade.final_grade.letter.to_string());
        record.push(grade.final_grade.status.to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn require_columns<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    required: &[&str],
) -> anyhow::Result<()> {
    let headers = reader
        .headers()
        .with_context(|| format!("could not read header of {}", path.display()))?;
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            bail!("{} is missing required column {column}", path.display());
        }
    }
    Ok(())
}
