use crate::models::submission::{self, Entity as Submission, SubmissionState};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

pub struct SubmissionRepository;

impl SubmissionRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<submission::Model>, DbErr> {
        Submission::find_by_id(id).one(db).await
    }

    /// The single open attempt for a (assessment, student) pair, if any.
    /// The partial unique index guarantees at most one row matches.
    pub async fn find_open<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<submission::Model>, DbErr> {
        Submission::find()
            .filter(submission::Column::AssessmentId.eq(assessment_id))
            .filter(submission::Column::StudentId.eq(student_id))
            .filter(submission::Column::State.eq(SubmissionState::InProgress))
            .one(db)
            .await
    }

    /// Closed attempts drive attempt numbering, the max-attempts check and
    /// cooldown.
    pub async fn count_closed<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;

        Submission::find()
            .filter(submission::Column::AssessmentId.eq(assessment_id))
            .filter(submission::Column::StudentId.eq(student_id))
            .filter(submission::Column::State.ne(SubmissionState::InProgress))
            .count(db)
            .await
    }

    /// End time of the most recently finished attempt, for cooldown checks.
    pub async fn latest_closed_end<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Option<DateTime<Utc>>, DbErr> {
        let closed = Submission::find()
            .filter(submission::Column::AssessmentId.eq(assessment_id))
            .filter(submission::Column::StudentId.eq(student_id))
            .filter(submission::Column::State.ne(SubmissionState::InProgress))
            .all(db)
            .await?;

        Ok(closed.iter().filter_map(|s| s.end_time()).max())
    }

    pub async fn list_for_student<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Vec<submission::Model>, DbErr> {
        Submission::find()
            .filter(submission::Column::AssessmentId.eq(assessment_id))
            .filter(submission::Column::StudentId.eq(student_id))
            .order_by_asc(submission::Column::AttemptNumber)
            .all(db)
            .await
    }

    /// Every open attempt, for the proactive expiry sweep.
    pub async fn list_in_progress<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<submission::Model>, DbErr> {
        Submission::find()
            .filter(submission::Column::State.eq(SubmissionState::InProgress))
            .all(db)
            .await
    }
}
