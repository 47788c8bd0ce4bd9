//! Generation of the codes handed to families and staff.
//!
//! - QR tokens: 43 URL-safe characters (roughly 256 bits of entropy).
//! - OTP codes: numeric, six digits by default.
//! - Parent codes: `RS001` for primary guardians, `SEC_1A2B3C4D` for
//!   secondary guardians.
//! - Registration ids: `RS001/02` (parent code + per-family child number).

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Length of a generated QR token.
pub const QR_TOKEN_LEN: usize = 43;

/// Default length of a generated OTP code.
pub const OTP_LEN: usize = 6;

/// Minutes a check-in QR token stays valid.
pub const CHECKIN_CODE_EXPIRY_MINS: i64 = 15;

/// Minutes a pickup QR/OTP pair stays valid.
pub const PICKUP_CODE_EXPIRY_MINS: i64 = 30;

/// Minutes an MFA challenge stays valid.
pub const MFA_CODE_EXPIRY_MINS: i64 = 10;

/// Parent code used when a child's guardian has none.
pub const FALLBACK_PARENT_CODE: &str = "RS000";

/// Prefix of parent codes assigned to secondary guardians.
pub const SECONDARY_CODE_PREFIX: &str = "SEC_";

/// Generate a random URL-safe token for QR codes and MFA challenges.
pub fn generate_qr_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), QR_TOKEN_LEN)
}

/// Generate a numeric one-time code of `len` digits. Leading zeros are kept.
pub fn generate_otp(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Parent code for the next primary guardian, given how many exist.
pub fn primary_parent_code(existing_count: i64) -> String {
    format!("RS{:03}", existing_count + 1)
}

/// Random parent code for a secondary guardian.
pub fn secondary_parent_code() -> String {
    let n: u32 = rand::rng().random();
    format!("{SECONDARY_CODE_PREFIX}{n:08X}")
}

/// Registration id for a family's `child_number`-th child (1-based).
pub fn registration_id(parent_code: Option<&str>, child_number: i64) -> String {
    let code = parent_code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_PARENT_CODE);
    format!("{code}/{child_number:02}")
}

/// Compare a submitted code against the expected one without short-circuiting
/// on the first differing byte.
pub fn codes_match(expected: &str, submitted: &str) -> bool {
    let a = expected.as_bytes();
    let b = submitted.trim().as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
