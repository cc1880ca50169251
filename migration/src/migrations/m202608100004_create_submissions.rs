use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608100004_create_submissions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("submissions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("assessment_id"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("student_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("attempt_number")).integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("state"))
                            .enumeration(
                                Alias::new("submission_state"),
                                vec![
                                    Alias::new("in_progress"),
                                    Alias::new("submitted"),
                                    Alias::new("expired"),
                                    Alias::new("auto_graded"),
                                    Alias::new("pending_manual_grading"),
                                    Alias::new("graded"),
                                    Alias::new("released"),
                                ],
                            )
                            .not_null()
                            .default("in_progress"),
                    )
                    .col(ColumnDef::new(Alias::new("question_set")).json().not_null())
                    .col(ColumnDef::new(Alias::new("started_at")).timestamp().not_null())
                    .col(ColumnDef::new(Alias::new("submitted_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("finished_at")).timestamp().null())
                    .col(
                        ColumnDef::new(Alias::new("is_late"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alias::new("score")).double().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("submissions"), Alias::new("assessment_id"))
                            .to(Alias::new("assessments"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_student")
                    .table(Alias::new("submissions"))
                    .col(Alias::new("assessment_id"))
                    .col(Alias::new("student_id"))
                    .to_owned(),
            )
            .await?;

        // Storage-level guard for the one-open-attempt invariant: two
        // concurrent starts race past the policy check, the second insert
        // must fail here.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_submissions_one_open \
                 ON submissions (assessment_id, student_id) \
                 WHERE state = 'in_progress'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("submissions")).to_owned())
            .await
    }
}
