//! Actors and the append-only Activity Log

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Roles an actor can hold when touching a record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Role {
    Admin,
    Quality,
    Sales,
    Technical,
    #[default]
    Staff,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Quality => write!(f, "quality"),
            Role::Sales => write!(f, "sales"),
            Role::Technical => write!(f, "technical"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "quality" => Ok(Role::Quality),
            "sales" => Ok(Role::Sales),
            "technical" => Ok(Role::Technical),
            "staff" => Ok(Role::Staff),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Whoever is performing a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Kind of Activity Log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Recorded automatically when a record changes
    Log,
    /// Free-text remark left by a user
    Comment,
}

/// One entry of a record's Activity Log
///
/// Entries are only ever appended; the list keeps insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub role: Role,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, text: impl Into<String>, actor: &Actor) -> Self {
        Self {
            id: Ulid::new().to_string(),
            kind,
            text: text.into(),
            timestamp: Utc::now(),
            author: actor.name.clone(),
            role: actor.role,
        }
    }

    pub fn log(text: impl Into<String>, actor: &Actor) -> Self {
        Self::new(ActivityKind::Log, text, actor)
    }

    pub fn comment(text: impl Into<String>, actor: &Actor) -> Self {
        Self::new(ActivityKind::Comment, text, actor)
    }
}
