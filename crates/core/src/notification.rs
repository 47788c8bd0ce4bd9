//! Notification types and message composition.
//!
//! A [`NotificationMessage`] is what gets stored in `notifications.content`
//! and sent over email. SMS receives only the body, without the title or
//! the code footer. Messages carrying a login secret keep a separate
//! stored body so the secret never reaches the `notifications` table.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Notification categories allowed by the `chk_notifications_type` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    CheckIn,
    CheckOut,
    Birthday,
    Reminder,
    #[serde(rename = "OTP")]
    Otp,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::CheckIn => "CheckIn",
            NotificationType::CheckOut => "CheckOut",
            NotificationType::Birthday => "Birthday",
            NotificationType::Reminder => "Reminder",
            NotificationType::Otp => "OTP",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "CheckIn" => Ok(NotificationType::CheckIn),
            "CheckOut" => Ok(NotificationType::CheckOut),
            "Birthday" => Ok(NotificationType::Birthday),
            "Reminder" => Ok(NotificationType::Reminder),
            "OTP" => Ok(NotificationType::Otp),
            other => Err(CoreError::Validation(format!(
                "Unknown notification type '{other}'"
            ))),
        }
    }
}

/// Delivery status values for `notifications.delivery_status`.
pub const DELIVERY_PENDING: &str = "pending";
pub const DELIVERY_SENT: &str = "sent";
pub const DELIVERY_FAILED: &str = "failed";

/// Keys that are bookkeeping and never rendered into the content footer.
const HIDDEN_EXTRA_KEYS: [&str; 2] = ["action", "timestamp"];

/// A composed notification ready to be persisted and delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    /// Ordered key/value pairs rendered as a footer (e.g. pickup codes).
    pub extras: Vec<(String, String)>,
    /// Persisted in place of `body` when the body holds a secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_body: Option<String>,
}

impl NotificationMessage {
    pub fn new(kind: NotificationType, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            extras: Vec::new(),
            stored_body: None,
        }
    }

    /// Store `body` instead of the delivered body.
    pub fn with_stored_body(mut self, body: impl Into<String>) -> Self {
        self.stored_body = Some(body.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }

    /// Full delivered content: title, blank line, body, then the footer line.
    pub fn content(&self) -> String {
        self.render(&self.body)
    }

    /// Content written to `notifications.content`. Same as [`content`](Self::content)
    /// unless a stored body was set.
    pub fn stored_content(&self) -> String {
        self.render(self.stored_body.as_deref().unwrap_or(&self.body))
    }

    fn render(&self, body: &str) -> String {
        let mut content = if self.title.is_empty() {
            body.to_string()
        } else {
            format!("{}\n\n{body}", self.title)
        };

        let footer: Vec<String> = self
            .extras
            .iter()
            .filter(|(k, _)| !HIDDEN_EXTRA_KEYS.contains(&k.as_str()))
            .map(|(k, v)| format!("{}: {v}", extra_label(k)))
            .collect();

        if !footer.is_empty() {
            content.push_str("\n\n");
            content.push_str(&footer.join(", "));
        }
        content
    }

    /// Email subject line.
    pub fn subject(&self) -> String {
        if self.title.is_empty() {
            format!("Ministry Notification: {}", self.kind.as_str())
        } else {
            self.title.clone()
        }
    }

    /// Short text for SMS: body plus any codes, no title.
    pub fn sms_text(&self) -> String {
        let codes: Vec<String> = self
            .extras
            .iter()
            .filter(|(k, _)| k.starts_with("pickup_"))
            .map(|(k, v)| format!("{}: {v}", extra_label(k)))
            .collect();
        if codes.is_empty() {
            self.body.clone()
        } else {
            format!("{} {}", self.body, codes.join(", "))
        }
    }
}

fn extra_label(key: &str) -> &str {
    match key {
        "pickup_qr" => "Pickup QR",
        "pickup_otp" => "Pickup OTP",
        other => other,
    }
}

fn display_name(child_name: Option<&str>) -> &str {
    child_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Your child")
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

pub fn check_in_message(child_name: Option<&str>) -> NotificationMessage {
    NotificationMessage::new(
        NotificationType::CheckIn,
        "Child Checked In",
        format!(
            "Your child {} has been checked in successfully.",
            display_name(child_name)
        ),
    )
}

pub fn pickup_ready_message(
    child_name: Option<&str>,
    pickup_qr: Option<&str>,
    pickup_otp: Option<&str>,
) -> NotificationMessage {
    let mut message = NotificationMessage::new(
        NotificationType::Reminder,
        "Ready for Pickup",
        format!(
            "Your child {} is ready for pickup. Please proceed to the pickup area.",
            display_name(child_name)
        ),
    );
    if let Some(qr) = pickup_qr {
        message = message.with_extra("pickup_qr", qr);
    }
    if let Some(otp) = pickup_otp {
        message = message.with_extra("pickup_otp", otp);
    }
    message
}

pub fn checkout_message(child_name: Option<&str>) -> NotificationMessage {
    NotificationMessage::new(
        NotificationType::CheckOut,
        "Check-Out Complete",
        format!(
            "You have successfully picked up {}.",
            display_name(child_name)
        ),
    )
}

pub fn child_approved_message(child_name: Option<&str>) -> NotificationMessage {
    NotificationMessage::new(
        NotificationType::Reminder,
        "Child Approved",
        format!(
            "Great news! {} has been approved and is now active in the ministry.",
            display_name(child_name)
        ),
    )
}

pub fn child_rejected_message(child_name: Option<&str>, reason: Option<&str>) -> NotificationMessage {
    let mut body = format!(
        "{}'s registration has been reviewed. Please contact the ministry for more information.",
        display_name(child_name)
    );
    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        body.push_str(&format!(" Reason: {reason}"));
    }
    NotificationMessage::new(NotificationType::Reminder, "Registration Update", body)
}

pub fn invitation_message(user_name: &str) -> NotificationMessage {
    NotificationMessage::new(
        NotificationType::Reminder,
        "Account Invitation",
        format!(
            "Hello {user_name}, you have been invited to the R-KIDS ministry portal. \
             Sign in with this email address to finish setting up your account."
        ),
    )
}

pub fn mfa_code_message(code: &str) -> NotificationMessage {
    NotificationMessage::new(
        NotificationType::Otp,
        "Your verification code",
        format!("Your R-KIDS verification code is {code}. It expires in 10 minutes."),
    )
    .with_stored_body("A verification code was sent. It expires in 10 minutes.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_title_blank_line_body() {
        let message = check_in_message(Some("Ada"));
        assert_eq!(
            message.content(),
            "Child Checked In\n\nYour child Ada has been checked in successfully."
        );
    }

    #[test]
    fn pickup_content_renders_code_footer() {
        let message = pickup_ready_message(Some("Ada"), Some("QRTOKEN"), Some("123456"));
        assert_eq!(
            message.content(),
            "Ready for Pickup\n\nYour child Ada is ready for pickup. Please proceed to the pickup area.\n\nPickup QR: QRTOKEN, Pickup OTP: 123456"
        );
        assert_eq!(message.kind, NotificationType::Reminder);
    }

    #[test]
    fn hidden_extras_are_skipped() {
        let message = NotificationMessage::new(NotificationType::Reminder, "T", "B")
            .with_extra("action", "pickup_ready")
            .with_extra("timestamp", "now")
            .with_extra("room", "B2");
        assert_eq!(message.content(), "T\n\nB\n\nroom: B2");
    }

    #[test]
    fn missing_child_name_reads_naturally() {
        assert_eq!(
            checkout_message(None).body,
            "You have successfully picked up Your child."
        );
        assert_eq!(
            check_in_message(Some("  ")).body,
            "Your child Your child has been checked in successfully."
        );
    }

    #[test]
    fn rejection_appends_reason() {
        let message = child_rejected_message(Some("Sam"), Some("Missing consent form"));
        assert!(message.body.starts_with("Sam's registration has been reviewed."));
        assert!(message.body.ends_with("Reason: Missing consent form"));
        assert!(!child_rejected_message(Some("Sam"), None)
            .body
            .contains("Reason"));
    }

    #[test]
    fn sms_text_omits_title_but_keeps_codes() {
        let message = pickup_ready_message(Some("Ada"), None, Some("654321"));
        let sms = message.sms_text();
        assert!(!sms.contains("Ready for Pickup"));
        assert!(sms.ends_with("Pickup OTP: 654321"));
    }

    #[test]
    fn mfa_code_is_delivered_but_not_stored() {
        let message = mfa_code_message("482913");
        assert!(message.content().contains("482913"));
        assert!(!message.stored_content().contains("482913"));
        assert!(message.stored_content().starts_with("Your verification code\n\n"));
    }

    #[test]
    fn stored_content_defaults_to_delivered_content() {
        let message = pickup_ready_message(Some("Ada"), Some("QRTOKEN"), Some("123456"));
        assert_eq!(message.stored_content(), message.content());
    }

    #[test]
    fn type_wire_names() {
        assert_eq!(NotificationType::Otp.as_str(), "OTP");
        assert_eq!(
            NotificationType::parse("CheckOut").unwrap(),
            NotificationType::CheckOut
        );
        assert!(NotificationType::parse("Pickup").is_err());
    }
}
