use crate::models::answer::{self, Entity as Answer};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

pub struct AnswerRepository;

impl AnswerRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<answer::Model>, DbErr> {
        Answer::find_by_id(id).one(db).await
    }

    pub async fn find_for_question<C: ConnectionTrait>(
        db: &C,
        submission_id: i64,
        question_id: i64,
    ) -> Result<Option<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::SubmissionId.eq(submission_id))
            .filter(answer::Column::QuestionId.eq(question_id))
            .one(db)
            .await
    }

    pub async fn list_for_submission<C: ConnectionTrait>(
        db: &C,
        submission_id: i64,
    ) -> Result<Vec<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::SubmissionId.eq(submission_id))
            .order_by_asc(answer::Column::QuestionId)
            .all(db)
            .await
    }
}
