//! User roles

use serde::{Deserialize, Serialize};

use crate::error::text_enum;

/// Role carried in the access token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Cashier,
}

text_enum!(Role, "role", {
    SuperAdmin => "SUPER_ADMIN",
    Admin => "ADMIN",
    Cashier => "CASHIER",
});

impl Role {
    /// Admins may overdraw Karobar accounts, delete statements and decide refunds
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_roles() {
        assert!(Role::SuperAdmin.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(!Role::Cashier.is_privileged());
    }

    #[test]
    fn test_role_parses_stored_text() {
        assert_eq!("SUPER_ADMIN".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!("cashier".parse::<Role>(), Ok(Role::Cashier));
        assert!("MANAGER".parse::<Role>().is_err());
    }
}
