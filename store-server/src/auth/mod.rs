//! Authentication and actor identity

pub mod customer;
pub mod staff;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff role carried in the staff JWT
///
/// Parsed at the auth boundary so handlers never deal with raw role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    /// Day-to-day fulfillment work
    Staff,
    /// Full control, including cancellations past confirmation and refunds
    Manager,
}

impl StaffRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::Manager => "MANAGER",
        }
    }

    pub const fn is_manager(&self) -> bool {
        matches!(self, Self::Manager)
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = shared::order::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAFF" => Ok(Self::Staff),
            "MANAGER" => Ok(Self::Manager),
            other => Err(shared::order::ParseStatusError(other.to_string())),
        }
    }
}

/// Who is performing an order action
///
/// Every state-changing operation records its actor in the audit trail,
/// and the planner uses it to enforce role rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Staff {
        id: i64,
        name: String,
        role: StaffRole,
    },
    Customer {
        id: i64,
        name: String,
    },
    /// Gateway callbacks and other non-interactive flows
    System,
}

impl Actor {
    /// Name recorded in the audit trail
    pub fn display_name(&self) -> &str {
        match self {
            Actor::Staff { name, .. } => name,
            Actor::Customer { name, .. } => name,
            Actor::System => "system",
        }
    }

    /// Stored in `order_audit_logs.actor_type`
    pub fn actor_type(&self) -> &'static str {
        match self {
            Actor::Staff { .. } => "STAFF",
            Actor::Customer { .. } => "CUSTOMER",
            Actor::System => "SYSTEM",
        }
    }

    pub fn actor_id(&self) -> Option<i64> {
        match self {
            Actor::Staff { id, .. } | Actor::Customer { id, .. } => Some(*id),
            Actor::System => None,
        }
    }

    pub fn staff_role(&self) -> Option<StaffRole> {
        match self {
            Actor::Staff { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(
            self,
            Actor::Staff {
                role: StaffRole::Manager,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role_parse() {
        assert_eq!("STAFF".parse::<StaffRole>().unwrap(), StaffRole::Staff);
        assert_eq!("MANAGER".parse::<StaffRole>().unwrap(), StaffRole::Manager);
        assert!("ADMIN".parse::<StaffRole>().is_err());
        assert!("manager".parse::<StaffRole>().is_err());
        assert!("".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_staff_role_str() {
        assert_eq!(StaffRole::Staff.as_str(), "STAFF");
        assert_eq!(StaffRole::Manager.as_str(), "MANAGER");
        assert!(StaffRole::Manager.is_manager());
        assert!(!StaffRole::Staff.is_manager());
    }

    #[test]
    fn test_actor_helpers() {
        let staff = Actor::Staff {
            id: 7,
            name: "Ana".into(),
            role: StaffRole::Manager,
        };
        assert_eq!(staff.display_name(), "Ana");
        assert_eq!(staff.actor_type(), "STAFF");
        assert_eq!(staff.actor_id(), Some(7));
        assert!(staff.is_manager());
        assert_eq!(staff.staff_role(), Some(StaffRole::Manager));

        let customer = Actor::Customer {
            id: 42,
            name: "Binh".into(),
        };
        assert_eq!(customer.actor_type(), "CUSTOMER");
        assert_eq!(customer.actor_id(), Some(42));
        assert!(!customer.is_manager());
        assert_eq!(customer.staff_role(), None);

        assert_eq!(Actor::System.display_name(), "system");
        assert_eq!(Actor::System.actor_type(), "SYSTEM");
        assert_eq!(Actor::System.actor_id(), None);
        assert!(!Actor::System.is_manager());
    }
}
