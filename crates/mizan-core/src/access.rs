//! # Access Control
//!
//! Role to resource matrix used by the HTTP layer.
//!
//! ```text
//! ┌─────────────┬─────────────────────────────────────────────────────────────┐
//! │ Role        │ Resources                                                   │
//! ├─────────────┼─────────────────────────────────────────────────────────────┤
//! │ admin       │ everything                                                  │
//! │ sales       │ dashboard, products, sales, customers, debts                │
//! │ accountant  │ dashboard, sales, purchases, customers, suppliers, debts,   │
//! │             │ reports                                                     │
//! │ warehouse   │ dashboard, products, categories, purchases, suppliers       │
//! └─────────────┴─────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
    Accountant,
    Warehouse,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Accountant => "accountant",
            Role::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "sales" => Ok(Role::Sales),
            "accountant" => Ok(Role::Accountant),
            "warehouse" => Ok(Role::Warehouse),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![
                    "admin".into(),
                    "sales".into(),
                    "accountant".into(),
                    "warehouse".into(),
                ],
            }),
        }
    }
}

/// A guarded area of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Dashboard,
    Products,
    Categories,
    Sales,
    Purchases,
    Customers,
    Suppliers,
    Debts,
    Reports,
    Settings,
    Users,
}

impl Resource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Resource::Dashboard => "dashboard",
            Resource::Products => "products",
            Resource::Categories => "categories",
            Resource::Sales => "sales",
            Resource::Purchases => "purchases",
            Resource::Customers => "customers",
            Resource::Suppliers => "suppliers",
            Resource::Debts => "debts",
            Resource::Reports => "reports",
            Resource::Settings => "settings",
            Resource::Users => "users",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `role` may use `resource`.
///
/// ```rust
/// use mizan_core::{can_access, Resource, Role};
///
/// assert!(can_access(Role::Sales, Resource::Debts));
/// assert!(!can_access(Role::Sales, Resource::Reports));
/// ```
pub fn can_access(role: Role, resource: Resource) -> bool {
    use Resource::*;

    match role {
        Role::Admin => true,
        Role::Sales => matches!(resource, Dashboard | Products | Sales | Customers | Debts),
        Role::Accountant => matches!(
            resource,
            Dashboard | Sales | Purchases | Customers | Suppliers | Debts | Reports
        ),
        Role::Warehouse => matches!(
            resource,
            Dashboard | Products | Categories | Purchases | Suppliers
        ),
    }
}
