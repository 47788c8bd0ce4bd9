//! Row models and DTOs, one module per table.
//!
//! Rows that are returned to API clients serialize with camelCase keys.

pub mod attendance;
pub mod audit;
pub mod booking;
pub mod check_in;
pub mod child;
pub mod group;
pub mod guardian;
pub mod notification;
pub mod pending_code;
pub mod session;
pub mod user;
