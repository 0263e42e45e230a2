//! The user profile returned by the API at log-in.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::api::wire::deserialize_id;

/// What a user is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can only see the total of today's transactions.
    Guest,
    /// Can create, edit, delete and filter transactions.
    SuperAdmin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Guest => write!(f, "guest"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

/// A user of the application. Created and owned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The ID the API assigned to the user.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// The user's display name.
    pub name: String,
    /// The email the user logs in with.
    pub email: String,
    /// What the user is allowed to see.
    pub role: Role,
}

impl User {
    /// Whether the user may manage transactions.
    pub fn is_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}
