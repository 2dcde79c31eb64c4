use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Clients::CompanyName).string_len(255).not_null())
                    .col(ColumnDef::new(Clients::ContactName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Clients::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Clients::Phone).string_len(50).null())
                    .col(
                        ColumnDef::new(Clients::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Clients::PlanTier).string_len(100).not_null())
                    .col(ColumnDef::new(Clients::SetupFee).decimal_len(10, 2).not_null())
                    .col(ColumnDef::new(Clients::MonthlyFee).decimal_len(10, 2).not_null())
                    .col(
                        ColumnDef::new(Clients::BillingCycle)
                            .string_len(20)
                            .not_null()
                            .default("monthly"),
                    )
                    .col(ColumnDef::new(Clients::NextBillingDate).date().not_null())
                    .col(ColumnDef::new(Clients::Notes).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Clients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_clients_status")
                    .table(Clients::Table)
                    .col(Clients::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    CompanyName,
    ContactName,
    Email,
    Phone,
    Status,
    PlanTier,
    SetupFee,
    MonthlyFee,
    BillingCycle,
    NextBillingDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}
