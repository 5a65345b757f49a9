//! Authentication Module
//!
//! API key authentication (via the `X-API-Key` header) and the authorization
//! capability consulted by the write path.
//!
//! Keys are configured as `key:role[:subject]` entries. A request without a
//! key is served as [`Requester::Anonymous`]; reads stay open and privileged
//! operations are refused by the [`Authorizer`].

use std::collections::HashMap;
use std::sync::Arc;

use kost_core::{Action, ConfigError, Requester, Role};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// AUTHORIZATION
// ============================================================================

/// Decides whether a requester may perform a privileged action.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, requester: &Requester, action: &Action) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Requester, &Action) -> bool + Send + Sync,
{
    fn is_authorized(&self, requester: &Requester, action: &Action) -> bool {
        self(requester, action)
    }
}

/// Role based policy.
///
/// Owners and admins may edit availability and clear one property's cache.
/// Only admins may clear every cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn is_authorized(&self, requester: &Requester, action: &Action) -> bool {
        let Some(role) = requester.role() else {
            return false;
        };
        match action {
            Action::UpdateAvailability(_) | Action::ClearPropertyCache(_) => {
                matches!(role, Role::Owner | Role::Admin)
            }
            Action::ClearAllCaches => role == Role::Admin,
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Identity bound to one API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyGrant {
    pub subject: String,
    pub role: Role,
}

/// Authentication configuration.
#[derive(Clone, Default)]
pub struct AuthConfig {
    api_keys: HashMap<String, ApiKeyGrant>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .finish()
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `KOST_API_KEYS`: comma-separated `key:role[:subject]` entries
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("KOST_API_KEYS") {
            Ok(raw) => Self::parse_keys(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a comma-separated `key:role[:subject]` list.
    pub fn parse_keys(raw: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (index, entry) in raw.split(',').map(str::trim).filter(|e| !e.is_empty()).enumerate() {
            let mut parts = entry.splitn(3, ':');
            let key = parts.next().map(str::trim).unwrap_or_default();
            let role = parts.next().ok_or_else(|| ConfigError::InvalidValue {
                field: "KOST_API_KEYS".to_string(),
                value: format!("entry #{}", index + 1),
                reason: "expected key:role[:subject]".to_string(),
            })?;
            if key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "KOST_API_KEYS".to_string(),
                    value: format!("entry #{}", index + 1),
                    reason: "key must not be empty".to_string(),
                });
            }
            let role: Role = role.parse()?;
            let subject = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("api-key-{}", index + 1));
            config.add_api_key(key, subject, role);
        }
        Ok(config)
    }

    pub fn add_api_key(&mut self, key: impl Into<String>, subject: impl Into<String>, role: Role) {
        self.api_keys.insert(
            key.into(),
            ApiKeyGrant {
                subject: subject.into(),
                role,
            },
        );
    }

    pub fn with_api_key(mut self, key: impl Into<String>, subject: impl Into<String>, role: Role) -> Self {
        self.add_api_key(key, subject, role);
        self
    }

    /// Requester bound to a key, `None` when the key is unknown.
    pub fn resolve(&self, api_key: &str) -> Option<Requester> {
        self.api_keys
            .get(api_key)
            .map(|grant| Requester::authenticated(grant.subject.clone(), grant.role))
    }

    pub fn key_count(&self) -> usize {
        self.api_keys.len()
    }

    /// Validate the configuration for production use.
    ///
    /// Production deployments must configure at least one key, otherwise
    /// nobody could ever update availability.
    pub fn validate_for_production(&self, is_production: bool) -> ApiResult<()> {
        if self.api_keys.is_empty() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production without API keys. Set KOST_API_KEYS.",
                ));
            }
            tracing::warn!(
                "No API keys configured - every request is anonymous and writes are refused.\n\
                 Set KOST_API_KEYS to enable availability updates."
            );
        }
        Ok(())
    }
}

/// Shared authorizer handle.
pub type SharedAuthorizer = Arc<dyn Authorizer>;
