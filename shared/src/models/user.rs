//! Access control models
//!
//! Permissions are carried in the access token as `resource:action` strings.
//! Tokens that only carry a role fall back to that role's defaults.

use serde::{Deserialize, Serialize};

/// Role allowed to access every branch
pub const ADMIN_ROLE: &str = "admin";

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Branches,
    Ingredients,
    Vendors,
    Purchases,
    VendorPayments,
    Expenses,
    Stock,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Branches,
        Resource::Ingredients,
        Resource::Vendors,
        Resource::Purchases,
        Resource::VendorPayments,
        Resource::Expenses,
        Resource::Stock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Branches => "branches",
            Resource::Ingredients => "ingredients",
            Resource::Vendors => "vendors",
            Resource::Purchases => "purchases",
            Resource::VendorPayments => "vendor_payments",
            Resource::Expenses => "expenses",
            Resource::Stock => "stock",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

/// Permission key as it appears in tokens, e.g. `purchases:write`
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

/// Default permissions of the built-in roles
pub fn default_permissions(role: &str) -> Vec<String> {
    let grant = |resources: &[Resource], actions: &[Action]| -> Vec<String> {
        resources
            .iter()
            .flat_map(|r| actions.iter().map(move |a| permission_key(*r, *a)))
            .collect()
    };

    match role {
        ADMIN_ROLE => grant(&Resource::ALL, &[Action::Read, Action::Write]),
        "manager" => {
            let mut perms = grant(&Resource::ALL, &[Action::Read]);
            perms.extend(grant(
                &[
                    Resource::Ingredients,
                    Resource::Vendors,
                    Resource::Purchases,
                    Resource::VendorPayments,
                    Resource::Expenses,
                    Resource::Stock,
                ],
                &[Action::Write],
            ));
            perms
        }
        "storekeeper" => {
            let mut perms = grant(
                &[Resource::Branches, Resource::Ingredients, Resource::Vendors, Resource::Stock],
                &[Action::Read],
            );
            perms.extend(grant(&[Resource::Stock, Resource::Purchases], &[Action::Write]));
            perms.push(permission_key(Resource::Purchases, Action::Read));
            perms
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_key_format() {
        assert_eq!(
            permission_key(Resource::VendorPayments, Action::Write),
            "vendor_payments:write"
        );
    }

    #[test]
    fn test_admin_has_everything() {
        let perms = default_permissions(ADMIN_ROLE);
        assert_eq!(perms.len(), Resource::ALL.len() * 2);
        assert!(perms.contains(&"branches:write".to_string()));
    }

    #[test]
    fn test_manager_cannot_create_branches() {
        let perms = default_permissions("manager");
        assert!(perms.contains(&"branches:read".to_string()));
        assert!(!perms.contains(&"branches:write".to_string()));
        assert!(perms.contains(&"vendor_payments:write".to_string()));
    }

    #[test]
    fn test_unknown_role_has_nothing() {
        assert!(default_permissions("guest").is_empty());
    }
}
