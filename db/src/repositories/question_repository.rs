use crate::models::question::{self, Entity as Question};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

pub struct QuestionRepository;

impl QuestionRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<question::Model>, DbErr> {
        Question::find_by_id(id).one(db).await
    }

    /// Questions of an assessment in stored order.
    pub async fn list_for_assessment<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
    ) -> Result<Vec<question::Model>, DbErr> {
        Question::find()
            .filter(question::Column::AssessmentId.eq(assessment_id))
            .order_by_asc(question::Column::Position)
            .order_by_asc(question::Column::Id)
            .all(db)
            .await
    }
}
