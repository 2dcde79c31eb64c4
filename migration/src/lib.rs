pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_clients;
mod m20250601_000002_create_workflows;
mod m20250601_000003_create_api_credentials;
mod m20250601_000004_create_executions;
mod m20250601_000005_create_invoices;
mod m20250601_000006_create_support_tickets;
mod m20250601_000007_create_users_and_profiles;
mod m20250615_000001_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_clients::Migration),
            Box::new(m20250601_000002_create_workflows::Migration),
            Box::new(m20250601_000003_create_api_credentials::Migration),
            Box::new(m20250601_000004_create_executions::Migration),
            Box::new(m20250601_000005_create_invoices::Migration),
            Box::new(m20250601_000006_create_support_tickets::Migration),
            Box::new(m20250601_000007_create_users_and_profiles::Migration),
            Box::new(m20250615_000001_create_sync_status::Migration),
        ]
    }
}
