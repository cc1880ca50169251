use crate::models::assessment_override::{self, Entity as AssessmentOverride, OverrideType};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

pub struct OverrideRepository;

impl OverrideRepository {
    /// The active override of one type for a (assessment, student) pair.
    ///
    /// If several are active the most recently granted wins; the id ordering
    /// is the explicit tie-break for identical grant times, not an accident
    /// of storage order.
    pub async fn active_for<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
        override_type: OverrideType,
        now: DateTime<Utc>,
    ) -> Result<Option<assessment_override::Model>, DbErr> {
        let grants = AssessmentOverride::find()
            .filter(assessment_override::Column::AssessmentId.eq(assessment_id))
            .filter(assessment_override::Column::StudentId.eq(student_id))
            .filter(assessment_override::Column::OverrideType.eq(override_type))
            .order_by_desc(assessment_override::Column::GrantedAt)
            .order_by_desc(assessment_override::Column::Id)
            .all(db)
            .await?;

        // `Model::is_active` is the one place the expiry predicate lives.
        Ok(grants.into_iter().find(|o| o.is_active(now)))
    }

    /// Full history for staff/audit views; expired rows included.
    pub async fn list_for<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<Vec<assessment_override::Model>, DbErr> {
        AssessmentOverride::find()
            .filter(assessment_override::Column::AssessmentId.eq(assessment_id))
            .filter(assessment_override::Column::StudentId.eq(student_id))
            .order_by_desc(assessment_override::Column::GrantedAt)
            .all(db)
            .await
    }
}
