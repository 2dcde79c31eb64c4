use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiCredentials::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ApiCredentials::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ApiCredentials::ClientId).uuid().not_null())
                    .col(ColumnDef::new(ApiCredentials::ServiceName).string_len(100).not_null())
                    .col(ColumnDef::new(ApiCredentials::CredentialType).string_len(20).not_null())
                    // base64(nonce || AES-256-GCM ciphertext)
                    .col(ColumnDef::new(ApiCredentials::EncryptedData).text().not_null())
                    .col(
                        ColumnDef::new(ApiCredentials::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ApiCredentials::LastVerified)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApiCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiCredentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_credentials_client")
                            .from(ApiCredentials::Table, ApiCredentials::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiCredentials::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiCredentials {
    Table,
    Id,
    ClientId,
    ServiceName,
    CredentialType,
    EncryptedData,
    Status,
    LastVerified,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}
