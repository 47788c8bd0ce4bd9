//! Event bus and notification delivery for the ministry backend.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`MinistryEvent`]: a composed notification plus who it concerns.
//! - [`NotificationDispatcher`]: background service that stores every
//!   event as a `notifications` row and pushes it over the configured
//!   [`delivery`] channels.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{EventBus, MinistryEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::sms::{SmsConfig, SmsDelivery};
pub use delivery::{ChannelKind, Contact, DeliveryChannel, DeliveryError};
pub use dispatcher::NotificationDispatcher;
