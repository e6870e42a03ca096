//! Pagination engine use-case service.
//!
//! # Responsibility
//! - Resolve `(limit, cursor)` into one keyset page in feed order.
//! - Enrich rows with author display data without letting the identity
//!   collaborator fail the page.
//!
//! # Invariants
//! - Order is `created_at DESC, seq DESC`; equal timestamps never cause
//!   duplicates or gaps across pages.
//! - An absent cursor admits only items created strictly before the
//!   request's start time, so items composed mid-scroll, including in the
//!   same millisecond, never enter an ongoing page sequence.
//! - `next_cursor` is absent once a page returns fewer than `limit` items.
//! - No state is kept between calls; the cursor carries the boundary.

use crate::config::{ConfigError, FeedConfig, PAGE_LIMIT_MAX, PAGE_LIMIT_MIN};
use crate::identity::AuthorDirectory;
use crate::model::cursor::{decode_cursor, encode_cursor, FeedPosition};
use crate::model::item::{AuthorProfile, ItemSummary};
use crate::repo::item_repo::ItemRepository;
use crate::service::error::{ServiceError, ValidationError};
use crate::service::{parse_item_id, with_store_retry};
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::time::Instant;

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    /// Items in feed order.
    pub items: Vec<ItemSummary>,
    /// Cursor resuming after the last item; `None` at end of feed.
    pub next_cursor: Option<String>,
}

/// Feed pagination service.
pub struct FeedService<R: ItemRepository> {
    repo: R,
    authors: AuthorDirectory,
    config: FeedConfig,
}

impl<R: ItemRepository> FeedService<R> {
    /// Creates a service with default configuration.
    pub fn new(repo: R, authors: AuthorDirectory) -> Self {
        Self {
            repo,
            authors,
            config: FeedConfig::default(),
        }
    }

    /// Creates a service with `config`, rejecting unusable tunables.
    pub fn with_config(
        repo: R,
        authors: AuthorDirectory,
        config: FeedConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            repo,
            authors,
            config,
        })
    }

    /// Returns the page after `cursor`, or the newest page when absent.
    ///
    /// # Errors
    /// - `Validation` for a limit outside `1..=100` or a malformed cursor.
    /// - `StoreUnavailable`/`Store` when the read cannot be served.
    pub fn get_page(&self, limit: u32, cursor: Option<&str>) -> Result<FeedPage, ServiceError> {
        if !(PAGE_LIMIT_MIN..=PAGE_LIMIT_MAX).contains(&limit) {
            return Err(ValidationError::LimitOutOfRange {
                limit,
                min: PAGE_LIMIT_MIN,
                max: PAGE_LIMIT_MAX,
            }
            .into());
        }
        let before = match cursor {
            Some(value) => decode_cursor(value).map_err(ValidationError::MalformedCursor)?,
            None => FeedPosition::before_time(Utc::now().timestamp_millis()),
        };

        let started_at = Instant::now();
        let rows = with_store_retry(&self.config, "get_page", || {
            self.repo.list_page(before, limit)
        })?;

        let next_cursor = if rows.len() < limit as usize {
            None
        } else {
            rows.last()
                .map(|row| encode_cursor(FeedPosition::after_row(row.item.created_at, row.seq)))
        };

        let authors = self.authors.resolve(
            rows.iter().map(|row| row.item.author_id.as_str()),
            self.config.identity_timeout(),
        );
        let items: Vec<ItemSummary> = rows
            .into_iter()
            .map(|row| {
                let author = authors
                    .get(&row.item.author_id)
                    .cloned()
                    .unwrap_or_else(AuthorProfile::placeholder);
                ItemSummary::from_row(row, author)
            })
            .collect();

        info!(
            "event=get_page module=service status=ok limit={} returned={} has_more={} duration_ms={}",
            limit,
            items.len(),
            next_cursor.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(FeedPage { items, next_cursor })
    }

    /// Returns one item with counts and author data.
    pub fn get_item(&self, item_id: &str) -> Result<ItemSummary, ServiceError> {
        let item_id = parse_item_id(item_id)?;
        let row = with_store_retry(&self.config, "get_item", || self.repo.get_item(item_id))?
            .ok_or(ServiceError::NotFound(item_id))?;
        let author = self.author_profile(&row.item.author_id);
        Ok(ItemSummary::from_row(row, author))
    }

    /// Resolves display data for one user, degrading to a placeholder.
    pub fn author_profile(&self, user_id: &str) -> AuthorProfile {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return AuthorProfile::placeholder();
        }
        self.authors
            .resolve([user_id], self.config.identity_timeout())
            .remove(user_id)
            .unwrap_or_else(AuthorProfile::placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::FeedService;
    use crate::config::{ConfigError, FeedConfig};
    use crate::identity::{AuthorDirectory, StaticIdentityResolver};
    use crate::model::cursor::FeedPosition;
    use crate::model::item::{Item, ItemContent, ItemId, ItemRow};
    use crate::repo::item_repo::ItemRepository;
    use crate::repo::RepoResult;
    use crate::service::error::{ServiceError, ValidationError};
    use chrono::Utc;
    use std::cell::RefCell;
    use std::sync::Arc;

    /// Records the boundary each page query receives.
    #[derive(Default)]
    struct RecordingRepo {
        seen: RefCell<Vec<(FeedPosition, u32)>>,
        rows: Vec<ItemRow>,
    }

    impl ItemRepository for RecordingRepo {
        fn create_item_with_content(
            &mut self,
            item: &Item,
            _content: &ItemContent,
        ) -> RepoResult<ItemId> {
            Ok(item.id)
        }

        fn list_page(&self, before: FeedPosition, limit: u32) -> RepoResult<Vec<ItemRow>> {
            self.seen.borrow_mut().push((before, limit));
            Ok(self
                .rows
                .iter()
                .filter(|row| FeedPosition::after_row(row.item.created_at, row.seq) < before)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        fn get_item(&self, _id: ItemId) -> RepoResult<Option<ItemRow>> {
            Ok(None)
        }
    }

    fn identity() -> AuthorDirectory {
        AuthorDirectory::new(
            Arc::new(StaticIdentityResolver::new().with_user("u1", "Ada", None)),
            &FeedConfig::default(),
        )
    }

    fn row(created_at: i64, seq: i64) -> ItemRow {
        ItemRow {
            item: Item::new("u1", created_at),
            seq,
            body: Some(format!("post {seq}")),
            like_count: 0,
            child_count: 0,
        }
    }

    #[test]
    fn limit_outside_range_is_rejected_before_store_access() {
        let service = FeedService::new(RecordingRepo::default(), identity());
        for limit in [0, 101] {
            let err = service.get_page(limit, None).unwrap_err();
            assert!(matches!(
                err,
                ServiceError::Validation(ValidationError::LimitOutOfRange { .. })
            ));
        }
        assert!(service.repo.seen.borrow().is_empty());
    }

    #[test]
    fn malformed_cursor_is_a_client_fault() {
        let service = FeedService::new(RecordingRepo::default(), identity());
        let err = service.get_page(10, Some("not-a-time")).unwrap_err();
        assert!(err.is_client_fault());
        assert!(service.repo.seen.borrow().is_empty());
    }

    #[test]
    fn absent_cursor_admits_only_items_before_request_time() {
        let service = FeedService::new(RecordingRepo::default(), identity());
        let before_call = Utc::now().timestamp_millis();
        let page = service.get_page(5, None).unwrap();
        let after_call = Utc::now().timestamp_millis();
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
        let seen = service.repo.seen.borrow();
        assert_eq!(seen.len(), 1);
        let (boundary, limit) = seen[0];
        assert_eq!(boundary, FeedPosition::before_time(boundary.created_at));
        assert!((before_call..=after_call).contains(&boundary.created_at));
        assert_eq!(limit, 5);
    }

    #[test]
    fn item_stamped_with_request_time_is_excluded() {
        let now = Utc::now().timestamp_millis();
        let repo = RecordingRepo {
            rows: vec![row(now + 60_000, 3), row(now, 2), row(now - 1, 1)],
            ..RecordingRepo::default()
        };
        let service = FeedService::new(repo, identity());
        let page = service.get_page(10, None).unwrap();
        // The request clock may tick past `now`, but never reaches `now + 60s`.
        assert!(page.items.iter().all(|item| item.created_at <= now));
        assert_eq!(page.items.last().map(|item| item.created_at), Some(now - 1));
    }

    #[test]
    fn unusable_config_is_refused() {
        let config = FeedConfig {
            store_max_attempts: 0,
            ..FeedConfig::default()
        };
        assert!(matches!(
            FeedService::with_config(RecordingRepo::default(), identity(), config),
            Err(ConfigError::ZeroValue("store_max_attempts"))
        ));
        assert!(
            FeedService::with_config(RecordingRepo::default(), identity(), FeedConfig::default())
                .is_ok()
        );
    }

    #[test]
    fn full_page_yields_cursor_of_last_row() {
        let repo = RecordingRepo {
            rows: vec![row(30, 3), row(20, 2), row(10, 1)],
            ..RecordingRepo::default()
        };
        let service = FeedService::new(repo, identity());
        let page = service.get_page(2, None).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].author.display_name, "Ada");
        assert_eq!(
            page.next_cursor.as_deref(),
            Some("1970-01-01T00:00:00.020Z~2")
        );

        let rest = service.get_page(2, page.next_cursor.as_deref()).unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].created_at, 10);
        assert_eq!(rest.next_cursor, None);
    }

    #[test]
    fn missing_item_is_not_found() {
        let service = FeedService::new(RecordingRepo::default(), identity());
        let id = ItemId::new_v4();
        let err = service.get_item(&id.to_string()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(found) if found == id));
        assert!(matches!(
            service.get_item("nope"),
            Err(ServiceError::Validation(ValidationError::MalformedItemId(_)))
        ));
    }
}
