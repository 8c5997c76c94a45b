use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capability tier of a profile. Stored as its display name in `user_profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Manager,
    Director,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Manager, Role::Director, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Manager => "Manager",
            Role::Director => "Director",
            Role::Admin => "Admin",
        }
    }

    /// Roles that count as a team leader.
    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Manager | Role::Director | Role::Admin)
    }

    /// Roles a Director may hand out or edit.
    pub fn is_director_assignable(&self) -> bool {
        matches!(self, Role::User | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Manager" => Ok(Role::Manager),
            "Director" => Ok(Role::Director),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
