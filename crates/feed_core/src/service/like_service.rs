//! Engagement toggle use-case service.
//!
//! # Responsibility
//! - Authorize the caller and parse the target item id.
//! - Delegate the atomic flip to the like repository, retrying contention.
//!
//! # Invariants
//! - Toggling twice returns opposite states.
//! - Uniqueness conflicts are converged by the repository and never
//!   surface here.

use crate::config::{ConfigError, FeedConfig};
use crate::model::item::LikeMark;
use crate::repo::like_repo::LikeRepository;
use crate::service::error::ServiceError;
use crate::service::{authenticated_caller, parse_item_id, with_store_retry};
use log::{error, info};
use std::time::Instant;

/// Like toggle service over a like repository.
pub struct LikeService<R: LikeRepository> {
    repo: R,
    config: FeedConfig,
}

impl<R: LikeRepository> LikeService<R> {
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

    /// Flips the caller's like on `item_id` and returns the new state.
    pub fn toggle_like(&mut self, user_id: &str, item_id: &str) -> Result<bool, ServiceError> {
        let user_id = authenticated_caller(user_id)?;
        let item_id = parse_item_id(item_id)?;

        let mark = LikeMark::new(user_id, item_id);
        let started_at = Instant::now();
        let result = with_store_retry(&self.config, "toggle_like", || {
            self.repo.toggle_like(&mark)
        });
        match &result {
            Ok(liked) => info!(
                "event=like_toggle module=service status=ok item_id={} liked={} duration_ms={}",
                item_id,
                liked,
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.is_client_fault() => info!(
                "event=like_toggle module=service status=rejected item_id={} error={}",
                item_id, err
            ),
            Err(err) => error!(
                "event=like_toggle module=service status=error item_id={} duration_ms={} error={}",
                item_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Returns 1 when `user_id` currently likes `item_id`, else 0.
    ///
    /// A blank `user_id` is an anonymous viewer and always reads 0.
    pub fn like_state(&self, user_id: &str, item_id: &str) -> Result<u8, ServiceError> {
        let item_id = parse_item_id(item_id)?;
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Ok(0);
        }
        let mark = LikeMark::new(user_id, item_id);
        with_store_retry(&self.config, "like_state", || self.repo.like_state(&mark))
    }
}
