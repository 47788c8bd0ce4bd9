//! External delivery channels for notifications.
//!
//! Each channel implements [`DeliveryChannel`]. Channels that are not
//! configured are never constructed, so the dispatcher only sees the ones
//! that can actually send.

pub mod email;
pub mod sms;

use async_trait::async_trait;
use rkids_core::notification::NotificationMessage;

use self::email::EmailError;
use self::sms::SmsError;

/// Which contact field a channel delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Email,
    Sms,
}

/// Contact details of a notification recipient.
#[derive(Debug, Clone, Default)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    /// Address for `kind`, ignoring blank values.
    pub fn address(&self, kind: ChannelKind) -> Option<&str> {
        let value = match kind {
            ChannelKind::Email => self.email.as_deref(),
            ChannelKind::Sms => self.phone.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Sms(#[from] SmsError),
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Send `message` to `to` (an email address or phone number).
    async fn send(&self, to: &str, message: &NotificationMessage) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_skips_blank_values() {
        let contact = Contact {
            name: None,
            email: Some("  ".into()),
            phone: Some(" +15551234567 ".into()),
        };
        assert_eq!(contact.address(ChannelKind::Email), None);
        assert_eq!(contact.address(ChannelKind::Sms), Some("+15551234567"));
    }
}
