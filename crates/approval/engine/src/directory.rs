//! User directory: resolves approver and initiator identities

use approval_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user as seen by the approval engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(id),
            username: username.into(),
            display_name: display_name.into(),
            department: None,
            role: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Read-only lookup into the organisation's user store
pub trait UserDirectory: Send + Sync {
    /// `None` when the id is unknown or the directory is unavailable
    fn find_user(&self, id: &UserId) -> Option<UserProfile>;
}

/// Directory over a fixed set of profiles
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<UserId, UserProfile>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }

    pub fn with_user(mut self, profile: UserProfile) -> Self {
        self.insert(profile);
        self
    }
}

impl FromIterator<UserProfile> for StaticUserDirectory {
    fn from_iter<I: IntoIterator<Item = UserProfile>>(iter: I) -> Self {
        let mut directory = Self::new();
        for profile in iter {
            directory.insert(profile);
        }
        directory
    }
}

impl UserDirectory for StaticUserDirectory {
    fn find_user(&self, id: &UserId) -> Option<UserProfile> {
        self.users.get(id).cloned()
    }
}
