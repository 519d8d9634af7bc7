//!
//! src/auth.rs  Andrew Belles  Oct 4th, 2025
//!
//! Request scoped credentials. Tokens are acquired by the caller and handed
//! to a single conversion, nothing here outlives that call.
//!

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::errors::ConvertError;
use crate::types::ServiceKind;

/// Tokens are treated as expired this long before they actually expire
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Longest lifetime a credential may claim, larger values are clamped
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct Credential {
    pub service: ServiceKind,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>
}

impl Credential {
    pub fn new(service: ServiceKind, token: &str, expires_in_secs: i64) -> Self {
        let lifetime = expires_in_secs.clamp(-MAX_TOKEN_LIFETIME_SECS, MAX_TOKEN_LIFETIME_SECS);
        Self {
            service,
            token: token.to_string(),
            expires_at: Utc::now() + Duration::seconds(lifetime),
            scopes: Vec::new()
        }
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether the token was issued with `scope`. A credential with no
    /// recorded scopes is assumed to carry what the catalog needs.
    pub fn grants(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| s == scope)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty()
            && now < self.expires_at - Duration::seconds(EXPIRY_BUFFER_SECS)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Text shown when asking the user to grant access to a catalog
    pub fn explanation(service: ServiceKind) -> String {
        format!(
            "We need access to your {} account to create the playlist. We only request \
             the minimum permissions needed and don't store any data.",
            service.display_name()
        )
    }
}

/// Credentials for every catalog one conversion touches
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    by_service: HashMap<ServiceKind, Credential>
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential: Credential) -> Self {
        self.insert(credential);
        self
    }

    pub fn insert(&mut self, credential: Credential) {
        self.by_service.insert(credential.service, credential);
    }

    /// Valid credential for `service`, or `AuthenticationFailed` if it is
    /// missing or within the expiry buffer
    pub fn require(&self, service: ServiceKind) -> Result<&Credential, ConvertError> {
        self.by_service
            .get(&service)
            .filter(|c| c.is_valid())
            .ok_or_else(|| ConvertError::AuthenticationFailed(service.to_string()))
    }
}
