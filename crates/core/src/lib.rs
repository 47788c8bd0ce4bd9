//! Domain logic for the R-KIDS ministry backend.
//!
//! Everything in this crate is pure: no database access, no network I/O.
//! The `db`, `events` and `api` crates build on these types.

pub mod checkin;
pub mod codes;
pub mod error;
pub mod groups;
pub mod notification;
pub mod reports;
pub mod roles;
pub mod search;
pub mod types;
pub mod validation;
