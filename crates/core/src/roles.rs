//! Well-known role name constants and role predicates.
//!
//! These must match the `chk_users_role` constraint in the users migration.

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_PARENT: &str = "parent";
pub const ROLE_TEEN: &str = "teen";

/// Every role a user row may carry.
pub const ALL_ROLES: [&str; 5] = [
    ROLE_SUPER_ADMIN,
    ROLE_ADMIN,
    ROLE_TEACHER,
    ROLE_PARENT,
    ROLE_TEEN,
];

/// Map legacy spellings (`Admin`, `SuperAdmin`, `superadmin`) to the
/// canonical lowercase role name. Unknown roles are lowercased and returned.
pub fn normalize_role(role: &str) -> String {
    let lower = role.trim().to_lowercase();
    match lower.as_str() {
        "superadmin" | "super-admin" => ROLE_SUPER_ADMIN.to_string(),
        _ => lower,
    }
}

/// Whether `role` is one of [`ALL_ROLES`] after normalization.
pub fn is_known_role(role: &str) -> bool {
    let normalized = normalize_role(role);
    ALL_ROLES.contains(&normalized.as_str())
}

/// Admins and super admins pass every admin check.
pub fn is_admin(role: &str) -> bool {
    matches!(normalize_role(role).as_str(), ROLE_ADMIN | ROLE_SUPER_ADMIN)
}

/// Staff may operate check-in desks: teachers and anyone with admin rights.
pub fn is_staff(role: &str) -> bool {
    is_admin(role) || normalize_role(role) == ROLE_TEACHER
}
