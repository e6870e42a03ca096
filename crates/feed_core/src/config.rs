//! Feed service configuration.
//!
//! # Responsibility
//! - Hold tunables for validation, identity enrichment and store retries.
//! - Provide serde-friendly defaults so partial configs deserialize.
//!
//! # Invariants
//! - A validated config has non-zero attempts, timeout, body cap and
//!   identity pool sizes.
//! - Services refuse configs that fail `validate()`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Smallest accepted page size.
pub const PAGE_LIMIT_MIN: u32 = 1;
/// Largest accepted page size.
pub const PAGE_LIMIT_MAX: u32 = 100;

/// Runtime tunables shared by the feed services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum item body length in characters.
    pub max_body_chars: usize,
    /// Deadline for resolving all authors on one page.
    pub identity_timeout_ms: u64,
    /// Lifetime of cached identity lookups; 0 disables caching.
    pub identity_cache_ttl_secs: u64,
    /// Long-lived threads serving identity lookups.
    pub identity_workers: usize,
    /// Lookups that may wait for a free worker; further ones degrade at once.
    pub identity_queue_capacity: usize,
    /// Total attempts for a store operation hitting lock contention.
    pub store_max_attempts: u32,
    /// Base backoff between attempts; grows linearly per attempt.
    pub store_retry_backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_body_chars: 280,
            identity_timeout_ms: 300,
            identity_cache_ttl_secs: 60,
            identity_workers: 8,
            identity_queue_capacity: 64,
            store_max_attempts: 3,
            store_retry_backoff_ms: 20,
        }
    }
}

impl FeedConfig {
    /// Checks that every tunable is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_chars == 0 {
            return Err(ConfigError::ZeroValue("max_body_chars"));
        }
        if self.identity_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("identity_timeout_ms"));
        }
        if self.identity_workers == 0 {
            return Err(ConfigError::ZeroValue("identity_workers"));
        }
        if self.identity_queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("identity_queue_capacity"));
        }
        if self.store_max_attempts == 0 {
            return Err(ConfigError::ZeroValue("store_max_attempts"));
        }
        Ok(())
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }

    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.store_retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Config validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroValue(field) => write!(f, "config field `{field}` must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}
