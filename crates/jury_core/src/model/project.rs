//! Project domain model.
//!
//! # Invariants
//! - `team_usernames` is non-empty and deduplicated case-insensitively.
//! - The owner's username is a team member.
//! - Team membership never changes after creation.

use super::user::{usernames_match, UserId};
use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for projects.
pub type ProjectId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    /// Team spelled as entered; first spelling wins on case-insensitive duplicates.
    pub team_usernames: Vec<String>,
    pub owner_id: UserId,
}

impl Project {
    /// Creates a project owned by `owner_id`.
    ///
    /// Team names are expected to be normalized already (see
    /// [`parse_team_usernames`]).
    pub fn new(
        title: &str,
        team_usernames: Vec<String>,
        owner_id: UserId,
        owner_username: &str,
    ) -> Result<Self, ModelValidationError> {
        let project = Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            team_usernames: dedup_usernames(team_usernames),
            owner_id,
        };
        project.validate()?;
        if !project.has_member(owner_username) {
            return Err(ModelValidationError::OwnerNotInTeam(
                owner_username.trim().to_string(),
            ));
        }
        Ok(project)
    }

    /// Case-insensitive team membership test.
    pub fn has_member(&self, username: &str) -> bool {
        self.team_usernames
            .iter()
            .any(|member| usernames_match(member, username))
    }

    /// Checks record-local invariants. Owner membership needs the owner's
    /// username and is checked by `State::validate()`.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::EmptyTitle);
        }
        if self.team_usernames.is_empty() {
            return Err(ModelValidationError::EmptyTeam);
        }
        Ok(())
    }
}

/// Splits a comma-separated team list, trimming blanks and duplicates.
pub fn parse_team_usernames(raw: &str) -> Vec<String> {
    dedup_usernames(
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn dedup_usernames(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_string();
        if name.is_empty() || unique.iter().any(|kept| usernames_match(kept, &name)) {
            continue;
        }
        unique.push(name);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::{parse_team_usernames, Project};
    use crate::model::ModelValidationError;
    use uuid::Uuid;

    #[test]
    fn parse_team_drops_blanks_and_case_duplicates() {
        let team = parse_team_usernames(" ana, Bogdan ,,ANA, bogdan ,cris");
        assert_eq!(team, vec!["ana", "Bogdan", "cris"]);
    }

    #[test]
    fn owner_must_be_in_team() {
        let err = Project::new(
            "Web App",
            vec!["bogdan".to_string()],
            Uuid::new_v4(),
            "ana",
        )
        .unwrap_err();
        assert_eq!(err, ModelValidationError::OwnerNotInTeam("ana".to_string()));
    }

    #[test]
    fn membership_is_case_insensitive() {
        let project = Project::new(
            " Web App ",
            vec!["Ana".to_string(), "bogdan".to_string()],
            Uuid::new_v4(),
            "ANA",
        )
        .unwrap();
        assert_eq!(project.title, "Web App");
        assert!(project.has_member("ana"));
        assert!(project.has_member("BOGDAN"));
        assert!(!project.has_member("cris"));
    }

    #[test]
    fn empty_team_is_rejected() {
        let err = Project::new("Web App", Vec::new(), Uuid::new_v4(), "ana").unwrap_err();
        assert_eq!(err, ModelValidationError::EmptyTeam);
    }
}
