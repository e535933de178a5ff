//! Outbound notifications about account and order decisions.
//!
//! Notifiers are called after the owning transaction has committed and are
//! fire-and-forget: an implementation must never block or fail the request.

use std::{str::FromStr, sync::Arc};

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    UserApproved {
        user_id: Uuid,
        username: String,
        email: String,
    },
    UserRejected {
        username: String,
        email: String,
    },
    OrderApproved {
        order_id: Uuid,
        username: String,
        email: String,
        product_name: String,
        quantity: i32,
    },
    OrderRejected {
        order_id: Uuid,
        username: String,
        email: String,
        product_name: String,
        quantity: i32,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::UserApproved { email, .. }
            | Notification::UserRejected { email, .. }
            | Notification::OrderApproved { email, .. }
            | Notification::OrderRejected { email, .. } => email,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Notification::UserApproved { .. } => "Your account has been approved",
            Notification::UserRejected { .. } => "Your account request was rejected",
            Notification::OrderApproved { .. } => "Your order has been approved",
            Notification::OrderRejected { .. } => "Your order was rejected",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Writes each notification to the tracing log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            recipient = %notification.recipient(),
            subject = notification.subject(),
            ?notification,
            "notification"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifierKind {
    #[default]
    None,
    Log,
}

impl FromStr for NotifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "noop" => Ok(NotifierKind::None),
            "log" => Ok(NotifierKind::Log),
            other => Err(anyhow::anyhow!("unknown NOTIFIER value: {other}")),
        }
    }
}

pub fn build_notifier(kind: NotifierKind) -> Arc<dyn Notifier> {
    match kind {
        NotifierKind::None => Arc::new(NoopNotifier),
        NotifierKind::Log => Arc::new(LogNotifier),
    }
}
