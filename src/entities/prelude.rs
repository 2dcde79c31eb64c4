pub use super::api_credentials::Entity as ApiCredentials;
pub use super::client_profiles::Entity as ClientProfiles;
pub use super::clients::Entity as Clients;
pub use super::executions::Entity as Executions;
pub use super::invoices::Entity as Invoices;
pub use super::support_tickets::Entity as SupportTickets;
pub use super::sync_status::Entity as SyncStatus;
pub use super::users::Entity as Users;
pub use super::workflows::Entity as Workflows;
