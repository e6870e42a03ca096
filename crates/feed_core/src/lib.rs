//! Feed pagination, like toggling and composing over a transactional store.
//! This crate owns the feed invariants; transport and UI live elsewhere.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, FeedConfig, PAGE_LIMIT_MAX, PAGE_LIMIT_MIN};
pub use identity::{
    AuthorDirectory, CachedIdentityResolver, IdentityError, IdentityResolver,
    StaticIdentityResolver, UserProfile,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::cursor::{decode_cursor, encode_cursor, CursorError, FeedPosition};
pub use model::item::{
    AuthorProfile, Item, ItemContent, ItemId, ItemRow, ItemSummary, LikeMark, UserId,
};
pub use repo::item_repo::{ItemRepository, SqliteItemRepository};
pub use repo::like_repo::{LikeRepository, SqliteLikeRepository};
pub use repo::{RepoError, RepoResult};
pub use service::compose_service::ComposeService;
pub use service::error::{ServiceError, ValidationError};
pub use service::feed_service::{FeedPage, FeedService};
pub use service::like_service::LikeService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
