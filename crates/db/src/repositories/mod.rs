//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Every query that touches
//! church-owned data is scoped by `church_id`.

pub mod attendance_repo;
pub mod audit_repo;
pub mod booking_repo;
pub mod check_in_repo;
pub mod child_repo;
pub mod group_repo;
pub mod guardian_repo;
pub mod notification_repo;
pub mod pending_code_repo;
pub mod session_repo;
pub mod user_repo;

pub use attendance_repo::AttendanceRepo;
pub use audit_repo::AuditRepo;
pub use booking_repo::BookingRepo;
pub use check_in_repo::CheckInRepo;
pub use child_repo::ChildRepo;
pub use group_repo::GroupRepo;
pub use guardian_repo::GuardianRepo;
pub use notification_repo::NotificationRepo;
pub use pending_code_repo::PendingCodeRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
