use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workflows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Workflows::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Workflows::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Workflows::WorkflowName).string_len(255).not_null())
                    // External n8n id, the key execution sync resolves against
                    .col(
                        ColumnDef::new(Workflows::N8nWorkflowId)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Workflows::N8nWorkflowUrl).string_len(500).null())
                    .col(ColumnDef::new(Workflows::Description).text().null())
                    .col(
                        ColumnDef::new(Workflows::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Workflows::LastExecution)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Workflows::ExecutionCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Workflows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Workflows::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflows_client")
                            .from(Workflows::Table, Workflows::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflows_client_id")
                    .table(Workflows::Table)
                    .col(Workflows::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Workflows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Workflows {
    Table,
    Id,
    ClientId,
    WorkflowName,
    N8nWorkflowId,
    N8nWorkflowUrl,
    Description,
    Status,
    LastExecution,
    ExecutionCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}
