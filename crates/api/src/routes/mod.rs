pub mod analytics;
pub mod attendance;
pub mod audit;
pub mod auth;
pub mod bookings;
pub mod checkin;
pub mod checkout;
pub mod children;
pub mod groups;
pub mod guardians;
pub mod health;
pub mod notifications;
pub mod parents;
pub mod reports;
pub mod sessions;
pub mod teachers;
pub mod teens;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                  service + database health (public)
///
/// /auth/login                              login, starts MFA (public)
/// /auth/verify-mfa                         exchange MFA code for token (public)
/// /auth/logout                             logout (requires auth)
///
/// /users                                   list, create (admin)
/// /users/profile                           update own profile
/// /users/change-password                   change own password
/// /users/resend-invitation                 resend invitation (admin)
/// /users/{id}                              get, update (admin)
/// /users/{id}/suspend                      suspend (admin)
/// /users/{id}/activate                     activate (admin)
///
/// /parents                                 list (staff), create (admin)
/// /parents/{id}                            get (staff), delete (admin)
///
/// /guardians                               list, create secondary guardian
/// /guardians/{id}                          get
/// /guardians/{id}/renew                    extend active_until
///
/// /children                                list, register
/// /children/{id}                           get, update, delete
/// /children/{id}/approve                   approve (admin)
/// /children/{id}/reject                    reject (admin)
/// /children/{id}/bookings                  bookings for a child
///
/// /groups                                  list, create (admin)
/// /groups/{id}                             get, update, delete (admin)
/// /groups/{id}/stats                       child count + recent attendance
///
/// /checkin/generate-qr                     issue QR + OTP
/// /checkin/scan-qr                         check in by QR (staff)
/// /checkin/manual                          check in by parent id (staff)
/// /checkin/verify-otp                      check in by OTP (staff)
/// /checkin/active                          open records today (staff)
/// /checkin/status/{child_id}               today's state for a child
///
/// /checkout/notify/{child_id}              issue pickup codes (staff)
/// /checkout/pickup-code/{child_id}         alias of notify
/// /checkout/verify                         verify pickup code (staff)
/// /checkout/release/{child_id}             check out (staff)
///
/// /sessions                                list, create
/// /sessions/{id}                           get, update, delete
/// /sessions/{id}/children                  eligible children
/// /sessions/{id}/history                   check-in history
/// /sessions/{id}/bookings                  bookings for a session
/// /sessions/{id}/book                      book children
///
/// /bookings/{id}                           get, cancel
///
/// /notifications                           caller's notifications
/// /notifications/read-all                  mark all read
/// /notifications/unread-count              unread count
/// /notifications/{id}                      get
/// /notifications/{id}/read                 mark read
///
/// /attendance                              summaries or records (staff)
/// /attendance/submit                       upsert daily summary (staff)
///
/// /reports/attendance                      summaries with rates (staff)
/// /reports/export                          CSV or JSON export (staff)
///
/// /analytics/admin                         church totals (admin)
/// /analytics/teacher                       teacher totals (staff)
/// /analytics/group/{name}                  group totals (staff)
/// /analytics/child/{id}                    child attendance rate
///
/// /teachers/groups                         caller's groups (staff)
/// /teachers/children                       children in caller's groups
/// /teachers/checkins                       today's check-ins for them
///
/// /teens/profile                           linked child's profile (teen)
/// /teens/attendance                        own check-in history (teen)
/// /teens/attendance/submit                 self check-in (teen)
/// /teens/stats                             30-day attendance (teen)
/// /teens/dashboard                         profile + history + stats (teen)
///
/// /audit                                   list audit logs (admin)
/// /audit/export                            export audit logs (admin)
/// /audit/{id}                              get audit log (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/parents", parents::router())
        .nest("/guardians", guardians::router())
        .nest("/children", children::router())
        .nest("/groups", groups::router())
        .nest("/checkin", checkin::router())
        .nest("/checkout", checkout::router())
        .nest("/sessions", sessions::router())
        .nest("/bookings", bookings::router())
        .nest("/notifications", notifications::router())
        .nest("/attendance", attendance::router())
        .nest("/reports", reports::router())
        .nest("/analytics", analytics::router())
        .nest("/teachers", teachers::router())
        .nest("/teens", teens::router())
        .nest("/audit", audit::router())
}
