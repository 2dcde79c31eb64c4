//! Who may see or change what
//!
//! Every client-owned row resolves to its owning client through `Resource::owner`.
//! Staff see everything; a client user sees rows of their own client and writes
//! nothing except new support tickets for that client.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    api_credentials, clients, executions, invoices, support_tickets, workflows,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// `user_id` is `None` for the `ADMIN_API_KEY` principal
    Staff { user_id: Option<i32> },
    ClientUser { user_id: i32, client_id: Option<Uuid> },
}

/// Which rows a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Client(Uuid),
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Client(&'a clients::Model),
    Workflow(&'a workflows::Model),
    Credential(&'a api_credentials::Model),
    Execution(&'a executions::Model),
    Invoice(&'a invoices::Model),
    Ticket(&'a support_tickets::Model),
}

impl Resource<'_> {
    /// Owning client
    pub fn owner(&self) -> Uuid {
        match self {
            Resource::Client(m) => m.id,
            Resource::Workflow(m) => m.client_id,
            Resource::Credential(m) => m.client_id,
            Resource::Execution(m) => m.client_id,
            Resource::Invoice(m) => m.client_id,
            Resource::Ticket(m) => m.client_id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("staff access required")]
    StaffOnly,
    #[error("user is not linked to a client")]
    NoClient,
    #[error("resource belongs to another client")]
    NotOwner,
}

impl Principal {
    pub fn is_staff(&self) -> bool {
        matches!(self, Principal::Staff { .. })
    }

    pub fn client_id(&self) -> Option<Uuid> {
        match self {
            Principal::Staff { .. } => None,
            Principal::ClientUser { client_id, .. } => *client_id,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Principal::Staff { .. } => Scope::All,
            Principal::ClientUser { client_id: Some(id), .. } => Scope::Client(*id),
            Principal::ClientUser { client_id: None, .. } => Scope::Nothing,
        }
    }

    pub fn require_staff(&self) -> Result<(), AuthzError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AuthzError::StaffOnly)
        }
    }

    pub fn authorize(&self, resource: Resource<'_>, access: Access) -> Result<(), AuthzError> {
        match (self, access) {
            (Principal::Staff { .. }, _) => Ok(()),
            (Principal::ClientUser { .. }, Access::Write) => Err(AuthzError::StaffOnly),
            (Principal::ClientUser { client_id: None, .. }, Access::Read) => {
                Err(AuthzError::NoClient)
            }
            (Principal::ClientUser { client_id: Some(own), .. }, Access::Read) => {
                if resource.owner() == *own {
                    Ok(())
                } else {
                    Err(AuthzError::NotOwner)
                }
            }
        }
    }

    /// Client a new support ticket is filed under.
    ///
    /// Staff must name one; client users are always bound to their own.
    pub fn ticket_client(&self, requested: Option<Uuid>) -> Result<Uuid, AuthzError> {
        match self {
            Principal::Staff { .. } => requested.ok_or(AuthzError::NoClient),
            Principal::ClientUser { client_id: None, .. } => Err(AuthzError::NoClient),
            Principal::ClientUser { client_id: Some(own), .. } => match requested {
                Some(other) if other != *own => Err(AuthzError::NotOwner),
                _ => Ok(*own),
            },
        }
    }
}

impl Scope {
    /// Restrict a select to this scope. `None` means the result is empty.
    pub fn apply<E, C>(&self, select: Select<E>, client_column: C) -> Option<Select<E>>
    where
        E: EntityTrait,
        C: ColumnTrait,
    {
        match self {
            Scope::All => Some(select),
            Scope::Client(id) => Some(select.filter(client_column.eq(*id))),
            Scope::Nothing => None,
        }
    }

    pub fn allows(&self, client_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Client(id) => *id == client_id,
            Scope::Nothing => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn invoice_for(client_id: Uuid) -> invoices::Model {
        let now = Utc::now().fixed_offset();
        invoices::Model {
            id: Uuid::new_v4(),
            client_id,
            invoice_number: "INV-2024-001".to_string(),
            amount: Decimal::new(50000, 2),
            invoice_type: "monthly".to_string(),
            status: "pending".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            paid_date: None,
            stripe_invoice_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_staff_can_do_anything() {
        let staff = Principal::Staff { user_id: Some(1) };
        let invoice = invoice_for(Uuid::new_v4());
        assert_eq!(staff.scope(), Scope::All);
        assert!(staff.authorize(Resource::Invoice(&invoice), Access::Read).is_ok());
        assert!(staff.authorize(Resource::Invoice(&invoice), Access::Write).is_ok());
    }

    #[test]
    fn test_client_user_reads_only_own_rows() {
        let own = Uuid::new_v4();
        let user = Principal::ClientUser { user_id: 7, client_id: Some(own) };
        let mine = invoice_for(own);
        let theirs = invoice_for(Uuid::new_v4());

        assert_eq!(user.scope(), Scope::Client(own));
        assert!(user.authorize(Resource::Invoice(&mine), Access::Read).is_ok());
        assert_eq!(
            user.authorize(Resource::Invoice(&theirs), Access::Read),
            Err(AuthzError::NotOwner)
        );
        assert_eq!(
            user.authorize(Resource::Invoice(&mine), Access::Write),
            Err(AuthzError::StaffOnly)
        );
    }

    #[test]
    fn test_user_without_client_sees_nothing() {
        let user = Principal::ClientUser { user_id: 8, client_id: None };
        let invoice = invoice_for(Uuid::new_v4());
        assert_eq!(user.scope(), Scope::Nothing);
        assert!(!user.scope().allows(invoice.client_id));
        assert_eq!(
            user.authorize(Resource::Invoice(&invoice), Access::Read),
            Err(AuthzError::NoClient)
        );
    }

    #[test]
    fn test_ticket_client_binding() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = Principal::ClientUser { user_id: 7, client_id: Some(own) };
        assert_eq!(user.ticket_client(None), Ok(own));
        assert_eq!(user.ticket_client(Some(own)), Ok(own));
        assert_eq!(user.ticket_client(Some(other)), Err(AuthzError::NotOwner));

        let staff = Principal::Staff { user_id: None };
        assert_eq!(staff.ticket_client(Some(other)), Ok(other));
        assert_eq!(staff.ticket_client(None), Err(AuthzError::NoClient));
    }
}
