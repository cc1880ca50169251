use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608100001_create_enrollments::Migration),
            Box::new(migrations::m202608100002_create_assessments::Migration),
            Box::new(migrations::m202608100003_create_questions::Migration),
            Box::new(migrations::m202608100004_create_submissions::Migration),
            Box::new(migrations::m202608100005_create_answers::Migration),
            Box::new(migrations::m202608100006_create_assessment_overrides::Migration),
        ]
    }
}
