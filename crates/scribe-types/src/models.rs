use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse role distinction. There is no API path that grants Admin;
/// elevation happens directly in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Member => "Member",
        }
    }

    /// Unknown values fall back to Member rather than failing the read.
    pub fn parse(s: &str) -> Role {
        match s {
            "Admin" => Role::Admin,
            _ => Role::Member,
        }
    }
}

/// Per-post visibility. Private posts are readable only by their owner
/// and by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "Public",
            Privacy::Private => "Private",
        }
    }

    pub fn parse(s: &str) -> Privacy {
        match s {
            "Private" => Privacy::Private,
            _ => Privacy::Public,
        }
    }
}

/// The resolved actor behind a request. The password hash stays in the
/// store layer and is not part of this model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Reaction counters are persisted but no exposed operation mutates them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Reactions {
    pub like: i64,
    pub dislike: i64,
}
