use std::path::PathBuf;

use thiserror::Error;

/// The presentation calendar only accepts its exact project count.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("expected {expected} projects, found {found}")]
    ProjectCount { expected: usize, found: usize },
    #[error("invalid presentation date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Why a peer review submission was not recorded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewRejected {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("missing score for {0}")]
    MissingScore(String),
    #[error("invalid score for {key}: {value} (allowed 0-{max})")]
    ScoreOutOfRange { key: String, value: i64, max: i64 },
    #[error("team {0} not found in assignments")]
    UnknownTeam(String),
    #[error("team {reviewer} is not assigned to review {reviewed}")]
    NotAssigned { reviewer: String, reviewed: String },
    #[error("team {reviewer} has already submitted a review for {reviewed}")]
    Duplicate { reviewer: String, reviewed: String },
}

/// A repository that produced nothing to analyze.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUnavailable {
    #[error("commit export not found at {0}")]
    ExportMissing(PathBuf),
    #[error("commit export {path} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("no commits found")]
    NoCommits,
}
