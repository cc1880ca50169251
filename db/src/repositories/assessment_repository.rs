use crate::models::assessment::{self, Entity as Assessment};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

pub struct AssessmentRepository;

impl AssessmentRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<assessment::Model>, DbErr> {
        Assessment::find_by_id(id).one(db).await
    }
}
