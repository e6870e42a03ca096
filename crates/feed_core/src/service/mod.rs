//! Feed use-case services.
//!
//! # Responsibility
//! - Validate caller input and identity before any store access.
//! - Orchestrate repository calls into request-scoped operations.
//! - Retry transient store contention a bounded number of times.
//!
//! # Invariants
//! - Services hold no cross-request state; every mutation is one store
//!   transaction owned by a repository.
//! - Validation and authorization failures are never retried.

pub mod compose_service;
pub mod error;
pub mod feed_service;
pub mod like_service;

use crate::config::FeedConfig;
use crate::model::item::ItemId;
use crate::repo::RepoResult;
use crate::service::error::{ServiceError, ValidationError};
use log::{error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::thread;

const MAX_USER_ID_CHARS: usize = 128;

static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:@|-]+$").expect("valid user id regex"));

/// Checks an authenticated caller id and returns it trimmed.
pub(crate) fn authenticated_caller(user_id: &str) -> Result<&str, ServiceError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Unauthorized("caller identity is missing"));
    }
    if trimmed.chars().count() > MAX_USER_ID_CHARS || !USER_ID_RE.is_match(trimmed) {
        return Err(ServiceError::Unauthorized("caller identity is malformed"));
    }
    Ok(trimmed)
}

pub(crate) fn parse_item_id(value: &str) -> Result<ItemId, ValidationError> {
    ItemId::parse_str(value.trim())
        .map_err(|_| ValidationError::MalformedItemId(value.to_string()))
}

/// Runs `op`, retrying lock contention up to `store_max_attempts` in total.
pub(crate) fn with_store_retry<T>(
    config: &FeedConfig,
    operation: &'static str,
    mut op: impl FnMut() -> RepoResult<T>,
) -> Result<T, ServiceError> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.store_max_attempts => {
                warn!(
                    "event=store_retry module=service status=retry operation={operation} attempt={attempt} error={err}"
                );
                thread::sleep(config.retry_backoff(attempt));
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                error!(
                    "event=store_retry module=service status=error operation={operation} attempts={attempt} error_code=store_unavailable error={err}"
                );
                return Err(ServiceError::StoreUnavailable {
                    operation,
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
}
