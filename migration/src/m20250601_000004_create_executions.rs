//! Daily execution aggregates, one row per (workflow, date).
//!
//! Rows are written only by the execution sync; the unique index is the upsert key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Executions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Executions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Executions::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Executions::WorkflowId).uuid().not_null())
                    .col(ColumnDef::new(Executions::ExecutionDate).date().not_null())
                    .col(
                        ColumnDef::new(Executions::TotalCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Executions::SuccessCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Executions::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Executions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_executions_client")
                            .from(Executions::Table, Executions::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_executions_workflow")
                            .from(Executions::Table, Executions::WorkflowId)
                            .to(Workflows::Table, Workflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_executions_workflow_date")
                    .table(Executions::Table)
                    .col(Executions::WorkflowId)
                    .col(Executions::ExecutionDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_executions_client_date")
                    .table(Executions::Table)
                    .col(Executions::ClientId)
                    .col(Executions::ExecutionDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Executions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Executions {
    Table,
    Id,
    ClientId,
    WorkflowId,
    ExecutionDate,
    TotalCount,
    SuccessCount,
    ErrorCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Workflows {
    Table,
    Id,
}
