#![allow(dead_code)]

use feed_core::db::open_db_in_memory;
use feed_core::{
    AuthorDirectory, FeedConfig, FeedPage, FeedService, Item, ItemContent, ItemId,
    ItemRepository, SqliteItemRepository, StaticIdentityResolver,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub fn memory_db() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn identity() -> AuthorDirectory {
    AuthorDirectory::new(
        Arc::new(
            StaticIdentityResolver::new()
                .with_user("u1", "Ada", Some("https://img.example/ada.png".to_string()))
                .with_user("u2", "Grace", None),
        ),
        &FeedConfig::default(),
    )
}

/// Inserts a composed item with a fixed timestamp.
pub fn insert_item(conn: &mut Connection, author: &str, created_at: i64, body: &str) -> ItemId {
    let mut repo = SqliteItemRepository::try_new(conn).unwrap();
    let item = Item::new(author, created_at);
    repo.create_item_with_content(&item, &ItemContent::for_item(&item, body))
        .unwrap()
}

pub fn insert_reply(
    conn: &mut Connection,
    author: &str,
    created_at: i64,
    parent: ItemId,
) -> ItemId {
    let mut repo = SqliteItemRepository::try_new(conn).unwrap();
    let item = Item::new(author, created_at).replying_to(parent);
    repo.create_item_with_content(&item, &ItemContent::for_item(&item, "reply"))
        .unwrap()
}

pub fn page(conn: &mut Connection, limit: u32, cursor: Option<&str>) -> FeedPage {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    FeedService::new(repo, identity())
        .get_page(limit, cursor)
        .unwrap()
}

/// Walks the feed from the top until the cursor runs out.
pub fn walk_feed(conn: &mut Connection, limit: u32) -> Vec<FeedPage> {
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let next = page(conn, limit, cursor.as_deref());
        cursor = next.next_cursor.clone();
        pages.push(next);
        if cursor.is_none() {
            return pages;
        }
    }
}

/// Lets the wall clock pass the timestamp of anything composed so far.
pub fn let_clock_advance() {
    thread::sleep(Duration::from_millis(5));
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
