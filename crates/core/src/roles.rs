//! Well-known role name constants.
//!
//! Roles are issued by the external auth service and arrive in the bearer
//! token's `role` claim.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PRODUCTION_MANAGER: &str = "production_manager";
pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_QUALITY_INSPECTOR: &str = "quality_inspector";

/// Roles allowed to edit or delete comments they did not author.
pub const ADMIN_EQUIVALENT_ROLES: &[&str] = &[ROLE_ADMIN];

/// Roles allowed to create notifications by hand and force a marketplace re-send.
pub const MANAGER_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_PRODUCTION_MANAGER];

/// Whether `role` may moderate content authored by someone else.
pub fn is_admin_equivalent(role: &str) -> bool {
    ADMIN_EQUIVALENT_ROLES.contains(&role)
}

/// Whether `role` has production-manager privileges.
pub fn is_manager(role: &str) -> bool {
    MANAGER_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_admin_equivalent() {
        assert!(is_admin_equivalent(ROLE_ADMIN));
        assert!(!is_admin_equivalent(ROLE_PRODUCTION_MANAGER));
        assert!(!is_admin_equivalent(ROLE_OPERATOR));
    }

    #[test]
    fn managers_include_admin() {
        assert!(is_manager(ROLE_ADMIN));
        assert!(is_manager(ROLE_PRODUCTION_MANAGER));
        assert!(!is_manager(ROLE_QUALITY_INSPECTOR));
    }
}
