use chrono::{DateTime, Utc};
use db::models::submission::SubmissionState;
use sea_orm::DbErr;
use thiserror::Error;

/// Business-rule rejections surfaced to callers. All variants except `Db` are
/// expected outcomes the caller can act on; none should crash the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("student is not actively enrolled in course {course_id}")]
    NotEnrolled { course_id: i64 },

    #[error("assessment {assessment_id} is not published")]
    NotPublished { assessment_id: i64 },

    #[error("assessment {assessment_id} is outside its open window")]
    OutsideWindow { assessment_id: i64 },

    /// Duplicate start: callers should redirect to the existing open attempt
    /// rather than treat this as a failure.
    #[error("an attempt is already open (submission {submission_id})")]
    AlreadyOpenAttempt { submission_id: i64 },

    #[error("all {allowed} allowed attempts have been used")]
    AttemptsExhausted { used: i64, allowed: i64 },

    #[error("retakes are disabled for this assessment")]
    RetakeDisabled,

    #[error("cooldown active until {until}")]
    CooldownActive { until: DateTime<Utc> },

    #[error("submission {submission_id} is not open (state: {state})")]
    SubmissionNotOpen {
        submission_id: i64,
        state: SubmissionState,
    },

    #[error("submission {submission_id} cannot be graded (state: {state})")]
    SubmissionNotGradable {
        submission_id: i64,
        state: SubmissionState,
    },

    #[error("invalid answer value: {0}")]
    InvalidAnswerValue(String),

    #[error("invalid grade: {0}")]
    InvalidGrade(String),

    #[error("assessment cannot be published: {0}")]
    NotPublishable(String),

    #[error("assessment {0} not found")]
    AssessmentNotFound(i64),

    #[error("submission {0} not found")]
    SubmissionNotFound(i64),

    #[error("question {0} not found")]
    QuestionNotFound(i64),

    #[error("answer {0} not found")]
    AnswerNotFound(i64),

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// SQLite reports the one-open-attempt index as a unique-constraint failure;
/// the policy layer maps it back to `AlreadyOpenAttempt`.
pub fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().to_lowercase().contains("unique")
}
