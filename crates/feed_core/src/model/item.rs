//! Item, content and like-mark records plus the feed read model.
//!
//! # Invariants
//! - An item is immutable after creation.
//! - A composed item has exactly one content row.
//! - `(user_id, item_id)` identifies at most one like mark.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a feed item.
pub type ItemId = Uuid;

/// Opaque user identifier supplied by the identity provider.
pub type UserId = String;

/// Persisted feed item header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub author_id: UserId,
    /// Item this one replies to, if any.
    pub parent_id: Option<ItemId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Item {
    /// Creates a top-level item with a generated id.
    pub fn new(author_id: impl Into<UserId>, created_at: i64) -> Self {
        Self::with_id(Uuid::new_v4(), author_id, created_at)
    }

    /// Creates an item with a caller-provided id.
    ///
    /// Used by tests and import paths that need deterministic identity.
    pub fn with_id(id: ItemId, author_id: impl Into<UserId>, created_at: i64) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            parent_id: None,
            created_at,
        }
    }

    /// Marks this item as a reply to `parent_id`.
    pub fn replying_to(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Body text stored 1:1 with an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContent {
    pub item_id: ItemId,
    pub body: String,
}

impl ItemContent {
    /// Content row owned by `item`.
    pub fn for_item(item: &Item, body: impl Into<String>) -> Self {
        Self {
            item_id: item.id,
            body: body.into(),
        }
    }
}

/// One user's like on one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeMark {
    pub user_id: UserId,
    pub item_id: ItemId,
}

impl LikeMark {
    pub fn new(user_id: impl Into<UserId>, item_id: ItemId) -> Self {
        Self {
            user_id: user_id.into(),
            item_id,
        }
    }
}

/// Display metadata for an item author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// `false` when the identity collaborator could not supply data in time.
    pub resolved: bool,
}

impl AuthorProfile {
    pub const PLACEHOLDER_NAME: &'static str = "Unknown user";

    /// Degraded profile used when identity resolution fails or times out.
    pub fn placeholder() -> Self {
        Self {
            display_name: Self::PLACEHOLDER_NAME.to_string(),
            avatar_url: None,
            resolved: false,
        }
    }
}

/// Store-level row for one feed entry before identity enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub item: Item,
    /// Insertion sequence; secondary ordering key.
    pub seq: i64,
    /// `None` only for items written outside the composer.
    pub body: Option<String>,
    pub like_count: u64,
    pub child_count: u64,
}

/// Feed entry returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: ItemId,
    pub author_id: UserId,
    pub author: AuthorProfile,
    pub parent_id: Option<ItemId>,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub like_count: u64,
    pub child_count: u64,
}

impl ItemSummary {
    pub(crate) fn from_row(row: ItemRow, author: AuthorProfile) -> Self {
        Self {
            id: row.item.id,
            author_id: row.item.author_id,
            author,
            parent_id: row.item.parent_id,
            content: row.body.unwrap_or_default(),
            created_at: row.item.created_at,
            like_count: row.like_count,
            child_count: row.child_count,
        }
    }

    /// Creation time as an RFC 3339 UTC string with millisecond precision.
    pub fn created_at_rfc3339(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
