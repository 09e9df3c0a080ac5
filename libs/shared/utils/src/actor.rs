use std::fmt;

use serde::{Deserialize, Serialize};

use shared_models::auth::User;

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Option<String>,
    /// Privileged callers bypass the mutation legality rules.
    pub privileged: bool,
}

impl Actor {
    pub fn from_user(user: &User, privileged_role: &str) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role.clone(),
            privileged: user.has_role(privileged_role),
        }
    }

    pub fn staff(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Some("staff".to_string()),
            privileged: false,
        }
    }

    pub fn super_admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Some("super_admin".to_string()),
            privileged: true,
        }
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("anonymous")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Cancel,
    Delete,
    Reschedule,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::View => write!(f, "view"),
            Action::Create => write!(f, "create"),
            Action::Edit => write!(f, "edit"),
            Action::Cancel => write!(f, "cancel"),
            Action::Delete => write!(f, "delete"),
            Action::Reschedule => write!(f, "reschedule"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Appointment,
    ScheduleBlock,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Appointment => write!(f, "appointment"),
            ResourceType::ScheduleBlock => write!(f, "schedule block"),
        }
    }
}

/// Capability check answered by the clinic's permission system.
pub trait PermissionChecker: Send + Sync {
    fn can_perform(&self, actor: &Actor, action: Action, resource: ResourceType) -> bool;
}

/// Role table used when no external permission service is wired in.
#[derive(Debug, Default, Clone)]
pub struct RolePermissionChecker;

impl PermissionChecker for RolePermissionChecker {
    fn can_perform(&self, actor: &Actor, action: Action, resource: ResourceType) -> bool {
        if actor.privileged {
            return true;
        }

        match (actor.role(), resource) {
            ("admin" | "staff" | "receptionist", _) => true,
            ("doctor", ResourceType::ScheduleBlock) => true,
            ("doctor", ResourceType::Appointment) => action != Action::Delete,
            ("patient", ResourceType::Appointment) => matches!(
                action,
                Action::View | Action::Create | Action::Cancel | Action::Reschedule
            ),
            ("patient", ResourceType::ScheduleBlock) => action == Action::View,
            _ => action == Action::View,
        }
    }
}
