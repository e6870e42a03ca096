//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `feed_core` linkage by composing, paging and toggling once
//!   against an in-memory store.
//! - Keep output deterministic apart from generated ids.
//!
//! Set `FEED_LOG_DIR` to an absolute directory to capture core logs.

use feed_core::db::open_db_in_memory;
use feed_core::{
    default_log_level, init_logging, AuthorDirectory, CachedIdentityResolver, ComposeService,
    FeedConfig, FeedService, LikeService, SqliteItemRepository, SqliteLikeRepository,
    StaticIdentityResolver,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SMOKE_USER: &str = "smoke-user";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("FEED_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("feed_cli logging disabled: {err}");
        }
    }

    println!("feed_core version={}", feed_core::core_version());
    match run_smoke() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("feed_cli smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_smoke() -> Result<(), Box<dyn Error>> {
    let config = FeedConfig::default();
    let mut conn = open_db_in_memory()?;
    let resolver = CachedIdentityResolver::from_config(
        StaticIdentityResolver::new().with_user(SMOKE_USER, "Smoke Tester", None),
        &config,
    );
    let authors = AuthorDirectory::new(Arc::new(resolver), &config);

    let item_id = {
        let repo = SqliteItemRepository::try_new(&mut conn)?;
        ComposeService::with_config(repo, config.clone())?
            .compose(SMOKE_USER, "hello from feed_cli")?
    };
    println!("compose item_id={item_id}");

    let liked = {
        let repo = SqliteLikeRepository::try_new(&mut conn)?;
        LikeService::with_config(repo, config.clone())?
            .toggle_like(SMOKE_USER, &item_id.to_string())?
    };
    println!("toggle_like liked={liked}");

    // First pages only admit items older than the request.
    thread::sleep(Duration::from_millis(2));
    let repo = SqliteItemRepository::try_new(&mut conn)?;
    let page = FeedService::with_config(repo, authors, config)?.get_page(10, None)?;
    for item in &page.items {
        println!(
            "feed item_id={} author={} likes={} replies={}",
            item.id, item.author.display_name, item.like_count, item.child_count
        );
    }
    println!("feed next_cursor={}", page.next_cursor.as_deref().unwrap_or("-"));

    info!(
        "event=cli_smoke module=cli status=ok items={}",
        page.items.len()
    );
    Ok(())
}
