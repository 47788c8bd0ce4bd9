//! Notification dispatcher.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::EventBus)
//! and, for every [`MinistryEvent`], inserts a `pending` row into
//! `notifications`, resolves the recipient's contact details, pushes the
//! message over each configured channel, and records the outcome.
//! Failures are logged; nothing is reported back to the publisher.

use std::sync::Arc;

use rkids_core::notification::{DELIVERY_FAILED, DELIVERY_PENDING, DELIVERY_SENT};
use rkids_core::types::DbId;
use rkids_db::models::notification::CreateNotification;
use rkids_db::repositories::{GuardianRepo, NotificationRepo, UserRepo};
use rkids_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::MinistryEvent;
use crate::delivery::{ChannelKind, Contact, DeliveryChannel};

/// Which channels succeeded for one notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempted: bool,
    pub email_sent: bool,
    pub sms_sent: bool,
}

impl DeliveryOutcome {
    /// `sent` if any channel succeeded, `failed` if every attempt failed,
    /// `pending` if nothing could be attempted.
    pub fn status(&self) -> &'static str {
        if self.email_sent || self.sms_sent {
            DELIVERY_SENT
        } else if self.attempted {
            DELIVERY_FAILED
        } else {
            DELIVERY_PENDING
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: DbPool,
    channels: Vec<Arc<dyn DeliveryChannel>>,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Run the dispatch loop until the bus is dropped.
    ///
    /// Each event is handled on its own task so a slow SMTP or SMS gateway
    /// does not hold up the events behind it.
    pub async fn run(self, mut receiver: broadcast::Receiver<MinistryEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let dispatcher = self.clone();
                    tokio::spawn(async move { dispatcher.handle(event).await });
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, event: MinistryEvent) {
        let input = notification_row(&event);
        let notification = match NotificationRepo::create(&self.pool, event.church_id, &input).await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type,
                    "Failed to store notification"
                );
                return;
            }
        };

        let contact = match self.resolve_contact(&event).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                tracing::debug!(
                    notification_id = %notification.id,
                    "Notification has no reachable recipient"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, notification_id = %notification.id, "Recipient lookup failed");
                return;
            }
        };

        let outcome = deliver_all(&self.channels, &contact, &event).await;
        if let Err(e) = NotificationRepo::record_delivery(
            &self.pool,
            notification.id,
            outcome.email_sent,
            outcome.sms_sent,
            outcome.status(),
        )
        .await
        {
            tracing::warn!(error = %e, notification_id = %notification.id, "Failed to record delivery");
        }

        tracing::info!(
            notification_id = %notification.id,
            event_type = %event.event_type,
            email_sent = outcome.email_sent,
            sms_sent = outcome.sms_sent,
            "Notification dispatched"
        );
    }

    /// Guardian contact when the event names a guardian, otherwise the
    /// addressed user's.
    async fn resolve_contact(&self, event: &MinistryEvent) -> Result<Option<Contact>, sqlx::Error> {
        if let Some(guardian_id) = event.guardian_id {
            return Ok(GuardianRepo::find_by_id(&self.pool, event.church_id, guardian_id)
                .await?
                .map(|g| Contact {
                    name: Some(g.name),
                    email: g.email,
                    phone: g.phone,
                }));
        }
        if let Some(user_id) = event.user_id {
            return Ok(user_contact(&self.pool, event.church_id, user_id).await?);
        }
        Ok(None)
    }
}

/// The `notifications` row for an event. Secrets in the delivered body are
/// replaced by the message's stored body.
fn notification_row(event: &MinistryEvent) -> CreateNotification {
    CreateNotification {
        kind: event.message.kind.as_str().to_string(),
        content: event.message.stored_content(),
        child_id: event.child_id,
        guardian_id: event.guardian_id,
        user_id: event.user_id,
    }
}

async fn user_contact(
    pool: &DbPool,
    church_id: DbId,
    user_id: DbId,
) -> Result<Option<Contact>, sqlx::Error> {
    Ok(UserRepo::find_by_id(pool, church_id, user_id)
        .await?
        .map(|u| Contact {
            name: Some(u.name),
            email: Some(u.email),
            phone: u.phone,
        }))
}

/// Push `event` over every channel the contact has an address for.
pub async fn deliver_all(
    channels: &[Arc<dyn DeliveryChannel>],
    contact: &Contact,
    event: &MinistryEvent,
) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome::default();
    for channel in channels {
        let kind = channel.kind();
        let Some(address) = contact.address(kind) else {
            continue;
        };
        outcome.attempted = true;
        match channel.send(address, &event.message).await {
            Ok(()) => match kind {
                ChannelKind::Email => outcome.email_sent = true,
                ChannelKind::Sms => outcome.sms_sent = true,
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    channel = ?kind,
                    event_type = %event.event_type,
                    "Notification delivery failed"
                );
            }
        }
    }
    outcome
}
