//! Requesters, roles and privileged actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::identity::PropertyId;

/// Role attached to an authenticated requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only integration (search, landing pages).
    Viewer,
    /// Property owner or operator allowed to edit availability.
    Owner,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Viewer => "viewer",
            Role::Owner => "owner",
            Role::Admin => "admin",
        };
        f.write_str(label)
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(ConfigError::InvalidValue {
                field: "role".to_string(),
                value: other.to_string(),
                reason: "expected one of viewer, owner, admin".to_string(),
            }),
        }
    }
}

/// Identity of the caller, as established by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requester {
    Anonymous,
    Authenticated { subject: String, role: Role },
}

impl Requester {
    pub fn authenticated(subject: impl Into<String>, role: Role) -> Self {
        Self::Authenticated {
            subject: subject.into(),
            role,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated { subject, .. } => f.write_str(subject),
        }
    }
}

/// Privileged operation subject to authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    UpdateAvailability(PropertyId),
    ClearPropertyCache(PropertyId),
    ClearAllCaches,
}

impl Action {
    pub fn property_id(&self) -> Option<&PropertyId> {
        match self {
            Self::UpdateAvailability(id) | Self::ClearPropertyCache(id) => Some(id),
            Self::ClearAllCaches => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateAvailability(id) => write!(f, "update availability of {}", id),
            Self::ClearPropertyCache(id) => write!(f, "clear the cache of {}", id),
            Self::ClearAllCaches => f.write_str("clear all caches"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" owner ".parse::<Role>().unwrap(), Role::Owner);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_requester_role() {
        assert_eq!(Requester::Anonymous.role(), None);
        let requester = Requester::authenticated("ops", Role::Admin);
        assert_eq!(requester.role(), Some(Role::Admin));
        assert_eq!(requester.to_string(), "ops");
    }

    #[test]
    fn test_action_display() {
        let id = PropertyId::new("P1").unwrap();
        assert_eq!(
            Action::UpdateAvailability(id.clone()).to_string(),
            "update availability of P1"
        );
        assert_eq!(Action::ClearPropertyCache(id.clone()).property_id(), Some(&id));
        assert_eq!(Action::ClearAllCaches.property_id(), None);
    }
}
