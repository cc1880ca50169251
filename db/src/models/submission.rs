use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of one attempt. Transitions only move forward:
///
/// `InProgress -> Submitted | Expired -> AutoGraded | PendingManualGrading -> Graded -> Released`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "submission_state")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubmissionState {
    /// Open: accepting answers.
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Closed by the learner.
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Closed by the time limit.
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Every answer resolved automatically.
    #[sea_orm(string_value = "auto_graded")]
    AutoGraded,
    /// At least one answer awaits a human grade.
    #[sea_orm(string_value = "pending_manual_grading")]
    PendingManualGrading,
    /// All scores in, aggregate final.
    #[sea_orm(string_value = "graded")]
    Graded,
    /// Score and feedback visible to the learner.
    #[sea_orm(string_value = "released")]
    Released,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self::InProgress
    }
}

impl SubmissionState {
    /// Monotonic ordering of the lifecycle. Submitted and Expired share a
    /// rank, as do the two post-grading states.
    pub fn rank(&self) -> u8 {
        match self {
            SubmissionState::InProgress => 0,
            SubmissionState::Submitted | SubmissionState::Expired => 1,
            SubmissionState::AutoGraded | SubmissionState::PendingManualGrading => 2,
            SubmissionState::Graded => 3,
            SubmissionState::Released => 4,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SubmissionState::InProgress)
    }

    /// Closed means the attempt counts toward attempt numbering and cooldown.
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Forward-only transition check.
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        next.rank() > self.rank()
    }
}

/// One learner's attempt at an assessment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    /// 1-based, per (assessment, student), gapless over closed attempts.
    pub attempt_number: i32,
    pub state: SubmissionState,
    /// Ordered question id list, fixed at creation and immutable thereafter.
    pub question_set: Json,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    /// End of the attempt; for expiry this is `started_at + time_limit`, not
    /// the instant the expiry was noticed.
    pub finished_at: Option<DateTime<Utc>>,
    pub is_late: bool,
    /// Aggregate score; null until graded.
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessment::Entity",
        from = "Column::AssessmentId",
        to = "super::assessment::Column::Id"
    )]
    Assessment,

    #[sea_orm(has_many = "super::answer::Entity")]
    Answer,
}

impl Related<super::assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assessment.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn question_ids(&self) -> Vec<i64> {
        serde_json::from_value(self.question_set.clone()).unwrap_or_default()
    }

    /// When the attempt ended, whichever way it closed.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.finished_at.or(self.submitted_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_only_move_forward() {
        use SubmissionState::*;

        assert!(InProgress.can_transition_to(Submitted));
        assert!(InProgress.can_transition_to(Expired));
        assert!(Submitted.can_transition_to(PendingManualGrading));
        assert!(Expired.can_transition_to(AutoGraded));
        assert!(PendingManualGrading.can_transition_to(Graded));
        assert!(Graded.can_transition_to(Released));

        assert!(!Submitted.can_transition_to(InProgress));
        assert!(!Graded.can_transition_to(Submitted));
        assert!(!Released.can_transition_to(Graded));
        // Same rank is not a forward move.
        assert!(!Submitted.can_transition_to(Expired));
    }

    #[test]
    fn open_and_closed() {
        assert!(SubmissionState::InProgress.is_open());
        assert!(SubmissionState::Expired.is_closed());
        assert!(SubmissionState::Released.is_closed());
    }

    #[test]
    fn question_ids_roundtrip() {
        let m = Model {
            id: 1,
            assessment_id: 1,
            student_id: 2,
            attempt_number: 1,
            state: SubmissionState::InProgress,
            question_set: serde_json::json!([3, 1, 2]),
            started_at: Utc::now(),
            submitted_at: None,
            finished_at: None,
            is_late: false,
            score: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(m.question_ids(), vec![3, 1, 2]);
    }
}
