//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist an item and its content as one atomic unit.
//! - Serve keyset-paginated feed reads with derived counts.
//!
//! # Invariants
//! - `item` and `item_content` rows are written in one transaction; a failed
//!   content write leaves no item behind.
//! - Feed reads are a single statement, so counts and rows come from one
//!   snapshot.
//! - Feed order is `created_at DESC, seq DESC`.

use crate::model::cursor::FeedPosition;
use crate::model::item::{Item, ItemContent, ItemId, ItemRow};
use crate::repo::{
    count_to_u64, ensure_connection_ready, parse_item_id, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

const ITEM_ROW_SELECT_SQL: &str = "SELECT
    i.seq AS seq,
    i.id AS id,
    i.author_id AS author_id,
    i.parent_id AS parent_id,
    i.created_at AS created_at,
    c.body AS body,
    (SELECT COUNT(*) FROM like_marks l WHERE l.item_id = i.id) AS like_count,
    (SELECT COUNT(*) FROM items ch WHERE ch.parent_id = i.id) AS child_count
FROM items i
LEFT JOIN item_content c ON c.item_id = i.id";

/// Repository interface for item persistence and feed reads.
pub trait ItemRepository {
    /// Inserts `item` and its content atomically and returns the item id.
    fn create_item_with_content(
        &mut self,
        item: &Item,
        content: &ItemContent,
    ) -> RepoResult<ItemId>;
    /// Returns up to `limit` rows strictly after `before` in feed order.
    fn list_page(&self, before: FeedPosition, limit: u32) -> RepoResult<Vec<ItemRow>>;
    /// Gets one item with derived counts.
    fn get_item(&self, id: ItemId) -> RepoResult<Option<ItemRow>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                ("items", &["seq", "id", "author_id", "parent_id", "created_at"]),
                ("item_content", &["item_id", "body"]),
                ("like_marks", &["user_id", "item_id"]),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item_with_content(
        &mut self,
        item: &Item,
        content: &ItemContent,
    ) -> RepoResult<ItemId> {
        if content.item_id != item.id {
            return Err(RepoError::InvalidData(format!(
                "content for item {} cannot be attached to item {}",
                content.item_id, item.id
            )));
        }
        if item.author_id.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "item author_id must not be blank".to_string(),
            ));
        }
        if content.body.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "item body must not be blank".to_string(),
            ));
        }

        let item_id = item.id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO items (id, author_id, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                item_id.as_str(),
                item.author_id.as_str(),
                item.parent_id.map(|parent| parent.to_string()),
                item.created_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO item_content (item_id, body) VALUES (?1, ?2);",
            params![item_id.as_str(), content.body.as_str()],
        )?;
        // Dropping `tx` on any error above rolls both inserts back.
        tx.commit()?;

        debug!("event=item_insert module=repo status=ok item_id={item_id}");
        Ok(item.id)
    }

    fn list_page(&self, before: FeedPosition, limit: u32) -> RepoResult<Vec<ItemRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_ROW_SELECT_SQL}
             WHERE i.created_at < ?1
                OR (i.created_at = ?1 AND i.seq < ?2)
             ORDER BY i.created_at DESC, i.seq DESC
             LIMIT ?3;"
        ))?;

        let mut rows = stmt.query(params![before.created_at, before.seq, i64::from(limit)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<ItemRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_ROW_SELECT_SQL} WHERE i.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }
}

/// Returns whether an item with `id` exists, using any connection or transaction.
pub(crate) fn item_exists(conn: &Connection, id: ItemId) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM items WHERE id = ?1;",
            [id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ItemRow> {
    let id_text: String = row.get("id")?;
    let parent_id = match row.get::<_, Option<String>>("parent_id")? {
        Some(value) => Some(parse_item_id(&value, "items.parent_id")?),
        None => None,
    };

    Ok(ItemRow {
        item: Item {
            id: parse_item_id(&id_text, "items.id")?,
            author_id: row.get("author_id")?,
            parent_id,
            created_at: row.get("created_at")?,
        },
        seq: row.get("seq")?,
        body: row.get("body")?,
        like_count: count_to_u64(row.get("like_count")?, "like_marks")?,
        child_count: count_to_u64(row.get("child_count")?, "items.parent_id")?,
    })
}
