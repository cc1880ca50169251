use crate::models::enrollment::{self, Entity as Enrollment};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub struct EnrollmentRepository;

impl EnrollmentRepository {
    pub async fn is_actively_enrolled<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool, DbErr> {
        let row = Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(enrollment::Column::Active.eq(true))
            .one(db)
            .await?;

        Ok(row.is_some())
    }
}
