//! Composer use-case service.
//!
//! # Responsibility
//! - Validate caller identity and body text before any write.
//! - Persist a new item and its content as one atomic unit.
//!
//! # Invariants
//! - Empty/whitespace-only bodies never reach the store.
//! - Bodies are stored trimmed.
//! - No edit/delete path exists; composed items are immutable.

use crate::config::{ConfigError, FeedConfig};
use crate::model::item::{Item, ItemContent, ItemId};
use crate::repo::item_repo::ItemRepository;
use crate::service::error::{ServiceError, ValidationError};
use crate::service::{authenticated_caller, with_store_retry};
use chrono::Utc;
use log::{error, info};
use std::time::Instant;

/// Composer service over an item repository.
pub struct ComposeService<R: ItemRepository> {
    repo: R,
    config: FeedConfig,
}

impl<R: ItemRepository> ComposeService<R> {
    /// Creates a service with default configuration.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            config: FeedConfig::default(),
        }
    }

    /// Creates a service with `config`, rejecting unusable tunables.
    pub fn with_config(repo: R, config: FeedConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { repo, config })
    }

    /// Composes a top-level item for `user_id` and returns its id.
    ///
    /// # Errors
    /// - `Unauthorized` when `user_id` is missing or malformed.
    /// - `Validation` when `body` is blank or over the length cap.
    /// - `StoreUnavailable`/`Store` when the write cannot commit; nothing
    ///   is persisted in that case.
    pub fn compose(&mut self, user_id: &str, body: &str) -> Result<ItemId, ServiceError> {
        let author_id = authenticated_caller(user_id)?;
        let body = validate_body(body, self.config.max_body_chars)?;

        let started_at = Instant::now();
        let item = Item::new(author_id, Utc::now().timestamp_millis());
        let content = ItemContent::for_item(&item, body);
        let result = with_store_retry(&self.config, "compose", || {
            self.repo.create_item_with_content(&item, &content)
        });

        match &result {
            Ok(item_id) => info!(
                "event=compose module=service status=ok item_id={} body_chars={} duration_ms={}",
                item_id,
                body.chars().count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=compose module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

fn validate_body(body: &str, max_chars: usize) -> Result<&str, ValidationError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let actual_chars = trimmed.chars().count();
    if actual_chars > max_chars {
        return Err(ValidationError::BodyTooLong {
            max_chars,
            actual_chars,
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::validate_body;
    use crate::service::error::ValidationError;

    #[test]
    fn body_is_trimmed_and_capped_by_characters() {
        assert_eq!(validate_body("  hi \n", 5).unwrap(), "hi");
        assert_eq!(validate_body("ééééé", 5).unwrap(), "ééééé");
        assert_eq!(
            validate_body("ééééé!", 5),
            Err(ValidationError::BodyTooLong {
                max_chars: 5,
                actual_chars: 6
            })
        );
        assert_eq!(validate_body(" \t\n ", 5), Err(ValidationError::EmptyBody));
    }
}
