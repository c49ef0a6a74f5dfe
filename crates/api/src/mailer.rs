//! Outgoing mail: welcome messages and order confirmations.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use domain::User;
use fulfillment::{EnrichedOrder, Notifier, NotifyError};
use store::{UserId, UserStore};
use thiserror::Error;
use tokio::sync::RwLock;

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("mail transport error: {0}")]
pub struct MailError(pub String);

/// Hands rendered messages to whatever delivers them.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Transport that writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail dispatched"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    sent: Vec<MailMessage>,
    fail_on_send: bool,
}

/// In-memory transport for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<RwLock<InMemoryTransportState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the transport to fail every send until reset.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Returns every message sent so far.
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.state.read().await.sent.clone()
    }
}

#[async_trait]
impl MailTransport for InMemoryTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut state = self.state.write().await;
        if state.fail_on_send {
            return Err(MailError("relay refused connection".to_string()));
        }
        state.sent.push(message.clone());
        Ok(())
    }
}

/// Renders storefront messages and sends them through a transport.
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>, from: impl Into<String>) -> Self {
        Self {
            transport,
            from: from.into(),
        }
    }

    pub fn welcome(&self, user: &User) -> MailMessage {
        MailMessage {
            from: self.from.clone(),
            to: user.email.clone(),
            subject: "Welcome!".to_string(),
            body: format!(
                "Hi {},\n\nWelcome to the store! We're very excited to have you on board.\n\n\
                 Need help, or have questions? Just reply to this email.\n",
                user.name
            ),
        }
    }

    pub fn order_confirmation(&self, user: &User, order: &EnrichedOrder) -> MailMessage {
        let mut body = format!(
            "Hi {},\n\nYou just placed an order! Order id: {}\n\n",
            user.name, order.id
        );
        for item in &order.items {
            let name = item
                .product
                .as_ref()
                .map_or_else(|| item.product_id.to_string(), |p| p.name.clone());
            let _ = writeln!(body, "  {} x {}", item.ordered_quantity, name);
        }
        body.push_str("\nNeed help, or have questions? Just reply to this email.\n");

        MailMessage {
            from: self.from.clone(),
            to: user.email.clone(),
            subject: "Order has been placed successfully!".to_string(),
            body,
        }
    }

    pub async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.transport.send(message).await
    }

    /// Sends the welcome message on a detached task.
    pub fn send_welcome(&self, user: &User) {
        let mailer = self.clone();
        let message = self.welcome(user);
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&message).await {
                metrics::counter!("welcome_mail_failures_total").increment(1);
                tracing::warn!(%user_id, error = %err, "welcome mail failed");
            }
        });
    }
}

/// Sends order confirmations by email.
pub struct EmailNotifier<U> {
    users: U,
    mailer: Mailer,
}

impl<U: UserStore> EmailNotifier<U> {
    pub fn new(users: U, mailer: Mailer) -> Self {
        Self { users, mailer }
    }
}

#[async_trait]
impl<U: UserStore> Notifier for EmailNotifier<U> {
    async fn notify_order_placed(
        &self,
        order: &EnrichedOrder,
        user_id: UserId,
    ) -> Result<(), NotifyError> {
        let record = self
            .users
            .get(user_id)
            .await
            .map_err(|e| NotifyError(e.to_string()))?
            .ok_or_else(|| NotifyError(format!("user {user_id} not found")))?;

        let message = self
            .mailer
            .order_confirmation(&User::from(record), order);
        self.mailer
            .send(&message)
            .await
            .map_err(|e| NotifyError(e.to_string()))
    }
}
