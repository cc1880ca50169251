use async_trait::async_trait;
use db::repositories::enrollment_repository::EnrollmentRepository;
use sea_orm::{DatabaseConnection, DbErr};

/// External enrollment collaborator. The engine only asks membership
/// questions; roster management lives elsewhere.
#[async_trait]
pub trait EnrollmentGateway: Send + Sync {
    async fn is_actively_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, DbErr>;

    /// Whether the student has met the course's prerequisite chain for this
    /// assessment. Defaults to true; deployments with prerequisite tracking
    /// override it. A prerequisite-bypass override skips this check entirely.
    async fn prerequisites_met(&self, _student_id: i64, _assessment_id: i64) -> Result<bool, DbErr> {
        Ok(true)
    }
}

/// Gateway backed by the local `enrollments` table.
pub struct DbEnrollmentGateway {
    db: DatabaseConnection,
}

impl DbEnrollmentGateway {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EnrollmentGateway for DbEnrollmentGateway {
    async fn is_actively_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, DbErr> {
        EnrollmentRepository::is_actively_enrolled(&self.db, student_id, course_id).await
    }
}
