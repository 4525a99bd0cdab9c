//! User domain model.
//!
//! # Responsibility
//! - Define the identity record used for team membership and jury duty.
//! - Normalize and validate usernames.
//!
//! # Invariants
//! - `id` is stable and never reused for another user.
//! - Usernames are compared case-insensitively everywhere in core.

use super::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,32}$").expect("valid username regex"));

/// Stable identifier for users.
pub type UserId = Uuid;

/// Role granted at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May own projects and is eligible for jury duty on other teams.
    Student,
    /// Sees anonymous results for every project; never sits on a jury.
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
        }
    }
}

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display spelling as registered; comparisons ignore case.
    pub username: String,
    pub role: Role,
}

impl User {
    /// Creates a user with a generated id.
    ///
    /// # Errors
    /// - `InvalidUsername` when the trimmed name is empty or has characters
    ///   outside `[A-Za-z0-9_.-]`.
    pub fn new(username: &str, role: Role) -> Result<Self, ModelValidationError> {
        let username = normalize_username(username)?;
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            role,
        })
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Case-insensitive username comparison.
    pub fn has_username(&self, username: &str) -> bool {
        usernames_match(&self.username, username)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        normalize_username(&self.username).map(|_| ())
    }
}

/// Trims and validates one username.
pub fn normalize_username(value: &str) -> Result<String, ModelValidationError> {
    let trimmed = value.trim();
    if !USERNAME_RE.is_match(trimmed) {
        return Err(ModelValidationError::InvalidUsername(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn usernames_match(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[cfg(test)]
mod tests {
    use super::{normalize_username, Role, User};

    #[test]
    fn new_user_trims_username() {
        let user = User::new("  ana ", Role::Student).unwrap();
        assert_eq!(user.username, "ana");
        assert!(user.is_student());
    }

    #[test]
    fn username_rejects_blank_and_spaces() {
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username("ana maria").is_err());
        assert!(normalize_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn username_match_ignores_case() {
        let user = User::new("Bogdan", Role::Staff).unwrap();
        assert!(user.has_username("bogdan"));
        assert!(user.has_username(" BOGDAN "));
        assert!(!user.has_username("bogdana"));
    }
}
