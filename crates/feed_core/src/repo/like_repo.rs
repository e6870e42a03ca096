//! Like-mark repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Flip one user's like on one item inside a single write transaction.
//! - Report current like state for a `(user, item)` pair.
//!
//! # Invariants
//! - The toggle takes the store write lock before reading, so two toggles
//!   on the same pair can never both observe the same prior state.
//! - `UNIQUE(user_id, item_id)` backs the invariant; an insert that hits it
//!   converges to "liked" instead of failing.
//! - `like_state` is always 0 or 1.

use crate::db::is_unique_violation;
use crate::model::item::{ItemId, LikeMark};
use crate::repo::item_repo::item_exists;
use crate::repo::{count_to_u64, ensure_connection_ready, RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::{params, Connection, TransactionBehavior};

/// Repository interface for like toggling.
pub trait LikeRepository {
    /// Flips `mark` into or out of existence and returns whether it exists.
    fn toggle_like(&mut self, mark: &LikeMark) -> RepoResult<bool>;
    /// Returns 1 when `mark` exists, else 0.
    fn like_state(&self, mark: &LikeMark) -> RepoResult<u8>;
    /// Returns the number of like marks on `item_id`.
    fn like_count(&self, item_id: ItemId) -> RepoResult<u64>;
}

/// SQLite-backed like repository.
pub struct SqliteLikeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteLikeRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                ("items", &["id"]),
                ("like_marks", &["user_id", "item_id"]),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl LikeRepository for SqliteLikeRepository<'_> {
    fn toggle_like(&mut self, mark: &LikeMark) -> RepoResult<bool> {
        let user_id = mark.user_id.as_str();
        let item_id = mark.item_id;
        let item_id_text = item_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !item_exists(&tx, item_id)? {
            return Err(RepoError::NotFound(item_id));
        }

        // Deleting reports whether a mark existed; check and flip in one step.
        let removed = tx.execute(
            "DELETE FROM like_marks WHERE user_id = ?1 AND item_id = ?2;",
            params![user_id, item_id_text.as_str()],
        )?;
        let liked = if removed > 0 {
            false
        } else {
            insert_like_converging(&tx, user_id, item_id_text.as_str())?
        };
        tx.commit()?;

        debug!("event=like_toggle module=repo status=ok item_id={item_id_text} liked={liked}");
        Ok(liked)
    }

    fn like_state(&self, mark: &LikeMark) -> RepoResult<u8> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM like_marks WHERE user_id = ?1 AND item_id = ?2;",
            params![mark.user_id.as_str(), mark.item_id.to_string()],
            |row| row.get(0),
        )?;
        match count {
            0 => Ok(0),
            1 => Ok(1),
            other => Err(RepoError::InvalidData(format!(
                "{other} like marks for one (user, item) pair"
            ))),
        }
    }

    fn like_count(&self, item_id: ItemId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM like_marks WHERE item_id = ?1;",
            [item_id.to_string()],
            |row| row.get(0),
        )?;
        count_to_u64(count, "like_marks")
    }
}

/// Inserts a like mark; a uniqueness conflict means the pair is already liked.
fn insert_like_converging(conn: &Connection, user_id: &str, item_id: &str) -> RepoResult<bool> {
    match conn.execute(
        "INSERT INTO like_marks (user_id, item_id) VALUES (?1, ?2);",
        params![user_id, item_id],
    ) {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => {
            warn!("event=like_insert module=repo status=converged item_id={item_id} reason=unique_conflict");
            Ok(true)
        }
        Err(err) => Err(err.into()),
    }
}
