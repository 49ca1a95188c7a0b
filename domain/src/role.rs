//! Caller roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization class attached to a user account.
///
/// `Donor` is the least privileged role and the default whenever a role is
/// unknown, still loading, or failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Donor,
    Volunteer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Donor, Role::Volunteer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Volunteer => "volunteer",
            Role::Admin => "admin",
        }
    }

    /// Volunteers and admins may manage every donation request.
    pub fn is_privileged(&self) -> bool {
        match self {
            Role::Donor => false,
            Role::Volunteer | Role::Admin => true,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Parses a stored or remote role value, falling back to `Donor`.
    pub fn parse_or_default(value: &str) -> Role {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "donor" => Ok(Role::Donor),
            "volunteer" => Ok(Role::Volunteer),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" volunteer ".parse::<Role>().unwrap(), Role::Volunteer);
        assert!("Voletree".parse::<Role>().is_err());
    }

    #[test]
    fn test_unknown_role_fails_closed_to_donor() {
        assert_eq!(Role::parse_or_default("superuser"), Role::Donor);
        assert_eq!(Role::parse_or_default(""), Role::Donor);
        assert_eq!(Role::default(), Role::Donor);
    }

    #[test]
    fn test_privilege_table() {
        assert!(!Role::Donor.is_privileged());
        assert!(Role::Volunteer.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(!Role::Volunteer.is_admin());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Volunteer).unwrap(), "\"volunteer\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
