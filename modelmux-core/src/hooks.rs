//! Collaborators the configuration core calls out to.
//!
//! - `IdGenerator` hands out ids for newly created records.
//! - `SessionInvalidator` is told when existing sessions must be dropped,
//!   e.g. after the router's API key changes.

use std::fmt;

use tracing::debug;

/// Source of opaque ids for new records.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator: random UUID v4 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Why sessions are being invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The router's `api_key` setting changed.
    CredentialsRotated,
    /// The whole configuration was replaced by an import.
    ConfigImported,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::CredentialsRotated => write!(f, "credentials_rotated"),
            InvalidationReason::ConfigImported => write!(f, "config_imported"),
        }
    }
}

/// Hook into the auth layer. Called after the triggering change is committed.
pub trait SessionInvalidator: Send + Sync {
    fn invalidate_sessions(&self, reason: InvalidationReason);
}

/// Invalidator that does nothing; used when no auth layer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl SessionInvalidator for NoopInvalidator {
    fn invalidate_sessions(&self, reason: InvalidationReason) {
        debug!(reason = %reason, "No session invalidator attached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_generator_unique() {
        let ids = UuidGenerator;
        let generated: HashSet<String> = (0..100).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 100);
    }

    #[test]
    fn test_uuid_generator_format() {
        let id = UuidGenerator.next_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            InvalidationReason::CredentialsRotated.to_string(),
            "credentials_rotated"
        );
        assert_eq!(InvalidationReason::ConfigImported.to_string(), "config_imported");
    }
}
