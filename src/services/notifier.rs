//! Domain events and their delivery
//!
//! Write paths return the events they produced; the caller hands them to the
//! `Notifier`, which renders each one into notifications and pushes them
//! through every sink that accepts them. Delivery problems are logged and
//! never undo the write.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::PortalSettings;
use crate::entities::{clients, invoices, support_tickets, workflows};
use crate::services::billing::ReminderKind;
use crate::services::health::{HealthIssue, Severity};

#[derive(Debug, Clone)]
pub enum DomainEvent {
    TicketCreated {
        ticket: support_tickets::Model,
        client: clients::Model,
    },
    TicketResolved {
        ticket: support_tickets::Model,
        client: clients::Model,
    },
    InvoiceCreated {
        invoice: invoices::Model,
        client: clients::Model,
    },
    InvoiceReminder {
        invoice: invoices::Model,
        client: clients::Model,
        kind: ReminderKind,
    },
    WorkflowEnteredError {
        workflow: workflows::Model,
        client: clients::Model,
    },
    HealthAlert {
        issues: Vec<HealthIssue>,
        workflows_checked: usize,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TicketCreated { .. } => "ticket_created",
            DomainEvent::TicketResolved { .. } => "ticket_resolved",
            DomainEvent::InvoiceCreated { .. } => "invoice_created",
            DomainEvent::InvoiceReminder { .. } => "invoice_reminder",
            DomainEvent::WorkflowEnteredError { .. } => "workflow_entered_error",
            DomainEvent::HealthAlert { .. } => "health_alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A client's contact address
    Client(String),
    /// The operations team
    Admin(String),
}

impl Recipient {
    pub fn address(&self) -> &str {
        match self {
            Recipient::Client(address) | Recipient::Admin(address) => address,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Recipient::Admin(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: &'static str,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{sink} delivery failed: {reason}")]
    Delivery { sink: &'static str, reason: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepts(&self, _notification: &Notification) -> bool {
        true
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes every notification to the log. Stands in for the mail transport.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            event = notification.event,
            to = notification.recipient.address(),
            subject = %notification.subject,
            "Notification"
        );
        tracing::debug!(body = %notification.body, "Notification body");
        Ok(())
    }
}

/// Posts admin-facing notifications to a Slack incoming webhook
pub struct SlackSink {
    client: Client,
    webhook_url: String,
}

impl SlackSink {
    pub fn new(webhook_url: String) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Delivery {
                sink: "slack",
                reason: e.to_string(),
            })?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn accepts(&self, notification: &Notification) -> bool {
        notification.recipient.is_admin()
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = json!({
            "text": format!("*{}*\n{}", notification.subject, notification.body),
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery {
                sink: "slack",
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery {
                sink: "slack",
                reason: format!("webhook returned {}", response.status()),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    settings: Arc<PortalSettings>,
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new(settings: Arc<PortalSettings>, sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { settings, sinks }
    }

    /// Log sink always, Slack when a webhook is configured
    pub fn from_settings(settings: Arc<PortalSettings>) -> Self {
        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink)];
        if let Some(url) = &settings.slack_webhook_url {
            match SlackSink::new(url.clone()) {
                Ok(sink) => sinks.push(Arc::new(sink)),
                Err(e) => tracing::warn!(error = %e, "Slack notifications disabled"),
            }
        }
        Self::new(settings, sinks)
    }

    fn signature(&self) -> String {
        format!("Best regards,\nThe {} Team", self.settings.company_name)
    }

    pub fn render(&self, event: &DomainEvent) -> Vec<Notification> {
        let settings = &self.settings;
        let admin = || Recipient::Admin(settings.admin_email.clone());
        let name = event.name();

        match event {
            DomainEvent::TicketCreated { ticket, client } => vec![
                Notification {
                    event: name,
                    recipient: Recipient::Client(client.email.clone()),
                    subject: format!("Support Ticket Created: {}", ticket.subject),
                    body: format!(
                        "Dear {},\n\nWe have received your support ticket.\n\n\
                         Ticket ID: {}\nSubject: {}\nPriority: {}\nStatus: {}\n\n\
                         Our team will review your request and respond as soon as possible.\n\n{}",
                        client.contact_name,
                        ticket.id,
                        ticket.subject,
                        ticket.priority,
                        ticket.status,
                        self.signature()
                    ),
                },
                Notification {
                    event: name,
                    recipient: admin(),
                    subject: format!("New Support Ticket from {}", client.company_name),
                    body: format!(
                        "A new support ticket has been created.\n\n\
                         Client: {}\nContact: {}\nEmail: {}\n\n\
                         Ticket ID: {}\nSubject: {}\nPriority: {}\n\nDescription:\n{}",
                        client.company_name,
                        client.contact_name,
                        client.email,
                        ticket.id,
                        ticket.subject,
                        ticket.priority,
                        ticket.description
                    ),
                },
            ],
            DomainEvent::TicketResolved { ticket, client } => vec![Notification {
                event: name,
                recipient: Recipient::Client(client.email.clone()),
                subject: format!("Support Ticket Resolved: {}", ticket.subject),
                body: format!(
                    "Dear {},\n\nYour support ticket has been resolved.\n\n\
                     Ticket ID: {}\nSubject: {}\n\n\
                     If you have any further questions, please open a new ticket.\n\n{}",
                    client.contact_name,
                    ticket.id,
                    ticket.subject,
                    self.signature()
                ),
            }],
            DomainEvent::InvoiceCreated { invoice, client } => vec![Notification {
                event: name,
                recipient: Recipient::Client(client.email.clone()),
                subject: format!("New Invoice: {}", invoice.invoice_number),
                body: format!(
                    "Dear {},\n\nA new invoice has been generated for your account.\n\n\
                     Invoice Number: {}\nAmount: ${}\nType: {}\nDue Date: {}\n\n\
                     You can view this invoice in your client portal at {}.\n\n{}",
                    client.contact_name,
                    invoice.invoice_number,
                    invoice.amount,
                    invoice.invoice_type,
                    invoice.due_date.format("%B %d, %Y"),
                    settings.portal_url,
                    self.signature()
                ),
            }],
            DomainEvent::InvoiceReminder {
                invoice,
                client,
                kind,
            } => vec![Notification {
                event: name,
                recipient: Recipient::Client(client.email.clone()),
                subject: format!(
                    "{}Invoice {} Payment Reminder",
                    kind.subject_prefix(),
                    invoice.invoice_number
                ),
                body: format!(
                    "Dear {},\n\n{}\n\nInvoice Details:\n- Invoice Number: {}\n- Amount: ${}\n\
                     - Due Date: {}\n- Type: {}\n\n\
                     If you have already made this payment, please disregard this reminder.\n\
                     Questions? Contact us at {}.\n\n{}",
                    client.contact_name,
                    kind.message(),
                    invoice.invoice_number,
                    invoice.amount,
                    invoice.due_date.format("%B %d, %Y"),
                    invoice.invoice_type,
                    settings.support_email,
                    self.signature()
                ),
            }],
            DomainEvent::WorkflowEnteredError { workflow, client } => vec![Notification {
                event: name,
                recipient: admin(),
                subject: format!("Workflow Error Alert: {}", workflow.workflow_name),
                body: format!(
                    "Alert: A workflow has entered an error state.\n\n\
                     Client: {}\nWorkflow: {}\nn8n Workflow ID: {}\n\n\
                     Investigate in n8n: {}",
                    client.company_name,
                    workflow.workflow_name,
                    workflow.n8n_workflow_id,
                    settings.workflow_editor_url(&workflow.n8n_workflow_id)
                ),
            }],
            DomainEvent::HealthAlert {
                issues,
                workflows_checked,
            } => vec![Notification {
                event: name,
                recipient: admin(),
                subject: format!("Workflow Health Alert: {} Issue(s) Detected", issues.len()),
                body: self.render_health_body(issues, *workflows_checked),
            }],
        }
    }

    fn render_health_body(&self, issues: &[HealthIssue], workflows_checked: usize) -> String {
        let mut body = format!(
            "Workflow Health Check Alert\n\n{} issue(s) detected across {} workflow(s):\n",
            issues.len(),
            workflows_checked
        );

        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            let matching: Vec<&HealthIssue> =
                issues.iter().filter(|i| i.severity == severity).collect();
            if matching.is_empty() {
                continue;
            }
            body.push_str(&format!(
                "\n{} SEVERITY ({}):\n",
                severity.as_str().to_uppercase(),
                matching.len()
            ));
            for issue in matching {
                body.push_str(&format!(
                    "- {} (Client: {})\n  Issue: {}\n  n8n URL: {}\n",
                    issue.workflow_name,
                    issue.client_name,
                    issue.message,
                    self.settings.workflow_editor_url(&issue.n8n_workflow_id)
                ));
            }
        }

        body.push_str("\nPlease investigate these issues in the admin panel or n8n instance.\n");
        body
    }

    /// Render and deliver one event; returns the number of successful deliveries
    /// or the first failure.
    pub async fn deliver(&self, event: &DomainEvent) -> Result<usize, NotifyError> {
        let mut delivered = 0;
        let mut first_error = None;

        for notification in self.render(event) {
            if !notification.recipient.is_admin() && !self.settings.enable_email_notifications {
                tracing::debug!(
                    event = notification.event,
                    "Client notifications disabled, dropping"
                );
                continue;
            }

            for sink in self.sinks.iter().filter(|s| s.accepts(&notification)) {
                match sink.deliver(&notification).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            event = notification.event,
                            sink = sink.name(),
                            error = %e,
                            "Notification delivery failed"
                        );
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    /// Fire-and-log delivery of everything a write produced
    pub async fn notify(&self, events: Vec<DomainEvent>) {
        for event in &events {
            if let Err(e) = self.deliver(event).await {
                tracing::error!(event = event.name(), error = %e, "Failed to deliver notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingSink {
        seen: Mutex<Vec<Notification>>,
        admin_only: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn accepts(&self, notification: &Notification) -> bool {
            !self.admin_only || notification.recipient.is_admin()
        }

        async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn settings(enable_email: bool) -> Arc<PortalSettings> {
        let mut settings = PortalSettings::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "ADMIN_EMAIL" => Some("ops@monoliet.cloud".to_string()),
            _ => None,
        })
        .unwrap();
        settings.enable_email_notifications = enable_email;
        Arc::new(settings)
    }

    fn client() -> clients::Model {
        let now = Utc::now().fixed_offset();
        clients::Model {
            id: Uuid::new_v4(),
            company_name: "Acme BV".to_string(),
            contact_name: "Jan".to_string(),
            email: "jan@acme.test".to_string(),
            phone: None,
            status: "active".to_string(),
            plan_tier: "Business Process".to_string(),
            setup_fee: Decimal::new(100000, 2),
            monthly_fee: Decimal::new(25000, 2),
            billing_cycle: "monthly".to_string(),
            next_billing_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn ticket(client_id: Uuid) -> support_tickets::Model {
        let now = Utc::now().fixed_offset();
        support_tickets::Model {
            id: Uuid::new_v4(),
            client_id,
            subject: "Sync broken".to_string(),
            description: "Orders stopped arriving".to_string(),
            status: "open".to_string(),
            priority: "high".to_string(),
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ticket_created_goes_to_client_and_admin() {
        let notifier = Notifier::new(settings(true), vec![]);
        let client = client();
        let event = DomainEvent::TicketCreated {
            ticket: ticket(client.id),
            client: client.clone(),
        };
        let rendered = notifier.render(&event);
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].recipient, Recipient::Client("jan@acme.test".to_string()));
        assert_eq!(rendered[0].subject, "Support Ticket Created: Sync broken");
        assert!(rendered[0].body.contains("The Monoliet Team"));
        assert_eq!(rendered[1].recipient, Recipient::Admin("ops@monoliet.cloud".to_string()));
        assert!(rendered[1].body.contains("Orders stopped arriving"));
    }

    #[tokio::test]
    async fn test_disabled_email_only_reaches_admin() {
        let sink = Arc::new(RecordingSink {
            seen: Mutex::new(vec![]),
            admin_only: false,
        });
        let notifier = Notifier::new(settings(false), vec![sink.clone()]);
        let client = client();
        let delivered = notifier
            .deliver(&DomainEvent::TicketCreated {
                ticket: ticket(client.id),
                client,
            })
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        let seen = sink.seen.lock().unwrap();
        assert!(seen[0].recipient.is_admin());
    }

    #[tokio::test]
    async fn test_admin_only_sink_filters() {
        let sink = Arc::new(RecordingSink {
            seen: Mutex::new(vec![]),
            admin_only: true,
        });
        let notifier = Notifier::new(settings(true), vec![Arc::new(LogSink), sink.clone()]);
        let client = client();
        let delivered = notifier
            .deliver(&DomainEvent::TicketResolved {
                ticket: ticket(client.id),
                client,
            })
            .await
            .unwrap();

        // log sink only; the resolution mail is client-facing
        assert_eq!(delivered, 1);
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_health_alert_groups_by_severity() {
        let notifier = Notifier::new(settings(true), vec![]);
        let issue = |severity, message: &str| HealthIssue {
            workflow_id: Uuid::new_v4(),
            workflow_name: "Order sync".to_string(),
            client_name: "Acme BV".to_string(),
            n8n_workflow_id: "wf-1".to_string(),
            severity,
            kind: crate::services::health::IssueKind::ErrorStatus,
            message: message.to_string(),
        };
        let rendered = notifier.render(&DomainEvent::HealthAlert {
            issues: vec![
                issue(Severity::Low, "No executions in the last 9 days"),
                issue(Severity::High, "Workflow is in ERROR state"),
            ],
            workflows_checked: 4,
        });
        assert_eq!(rendered.len(), 1);
        let body = &rendered[0].body;
        let high = body.find("HIGH SEVERITY (1)").unwrap();
        let low = body.find("LOW SEVERITY (1)").unwrap();
        assert!(high < low);
        assert!(!body.contains("MEDIUM SEVERITY"));
        assert!(body.contains("/workflow/wf-1"));
    }
}
