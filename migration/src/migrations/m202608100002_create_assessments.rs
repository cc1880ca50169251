use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608100002_create_assessments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("assessments"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("course_id")).big_integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("scope_type"))
                            .enumeration(
                                Alias::new("assessment_scope_type"),
                                vec![
                                    Alias::new("course"),
                                    Alias::new("unit"),
                                    Alias::new("lesson"),
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("scope_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("title")).string().not_null())
                    .col(ColumnDef::new(Alias::new("description")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("assessment_status"),
                                vec![
                                    Alias::new("draft"),
                                    Alias::new("published"),
                                    Alias::new("archived"),
                                ],
                            )
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Alias::new("available_from")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("deadline")).timestamp().null())
                    .col(
                        ColumnDef::new(Alias::new("tolerance_minutes"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("time_limit_minutes"))
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("max_attempts")).integer().null())
                    .col(
                        ColumnDef::new(Alias::new("cooldown_minutes"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("retake_enabled"))
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Alias::new("review_mode"))
                            .enumeration(
                                Alias::new("review_mode"),
                                vec![
                                    Alias::new("immediate"),
                                    Alias::new("deferred"),
                                    Alias::new("hidden"),
                                ],
                            )
                            .not_null()
                            .default("immediate"),
                    )
                    .col(ColumnDef::new(Alias::new("late_penalty_percent")).double().null())
                    .col(
                        ColumnDef::new(Alias::new("randomization"))
                            .enumeration(
                                Alias::new("randomization_type"),
                                vec![
                                    Alias::new("static"),
                                    Alias::new("random_order"),
                                    Alias::new("bank"),
                                ],
                            )
                            .not_null()
                            .default("static"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("question_bank_count"))
                            .integer()
                            .null(),
                    )
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
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assessments_course")
                    .table(Alias::new("assessments"))
                    .col(Alias::new("course_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("assessments")).to_owned())
            .await
    }
}
