mod common;

use common::{count_rows, insert_item, memory_db};
use feed_core::db::open_db;
use feed_core::{
    ConfigError, FeedConfig, ItemId, LikeRepository, LikeService, ServiceError,
    SqliteLikeRepository, ValidationError,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn toggling_twice_returns_opposite_states() {
    let mut conn = memory_db();
    let item = insert_item(&mut conn, "u1", 10, "A").to_string();

    let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
    let mut service = LikeService::new(repo);
    assert_eq!(service.like_state("u2", &item).unwrap(), 0);

    assert!(service.toggle_like("u2", &item).unwrap());
    assert_eq!(service.like_state("u2", &item).unwrap(), 1);

    assert!(!service.toggle_like("u2", &item).unwrap());
    assert_eq!(service.like_state("u2", &item).unwrap(), 0);

    assert!(service.toggle_like("u2", &item).unwrap());
    assert_eq!(service.like_state("u2", &item).unwrap(), 1);
}

#[test]
fn likes_are_tracked_per_user() {
    let mut conn = memory_db();
    let item_id = insert_item(&mut conn, "u1", 10, "A");
    let item = item_id.to_string();
    {
        let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
        let mut service = LikeService::new(repo);
        assert!(service.toggle_like("u1", &item).unwrap());
        assert!(service.toggle_like("u2", &item).unwrap());
        assert_eq!(service.like_state("u3", &item).unwrap(), 0);
        assert_eq!(service.like_state("", &item).unwrap(), 0);
    }

    let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
    assert_eq!(repo.like_count(item_id).unwrap(), 2);
}

#[test]
fn unknown_item_is_not_found_and_writes_nothing() {
    let mut conn = memory_db();
    let missing = ItemId::new_v4();
    {
        let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
        let mut service = LikeService::new(repo);
        let err = service.toggle_like("u1", &missing.to_string()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == missing));
        assert!(err.is_client_fault());
    }
    assert_eq!(count_rows(&conn, "like_marks"), 0);
}

#[test]
fn bad_caller_or_item_id_is_rejected_before_store() {
    let mut conn = memory_db();
    let item = insert_item(&mut conn, "u1", 10, "A").to_string();
    {
        let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
        let mut service = LikeService::new(repo);
        assert!(matches!(
            service.toggle_like("  ", &item),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            service.toggle_like("u1", "not-a-uuid"),
            Err(ServiceError::Validation(ValidationError::MalformedItemId(_)))
        ));
        assert!(matches!(
            service.like_state("u1", "not-a-uuid"),
            Err(ServiceError::Validation(ValidationError::MalformedItemId(_)))
        ));
    }
    assert_eq!(count_rows(&conn, "like_marks"), 0);
}

#[test]
fn concurrent_toggles_on_one_pair_serialize() {
    const TOGGLERS: usize = 9;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let mut setup = open_db(&path).unwrap();
    let item = insert_item(&mut setup, "author", 10, "contended").to_string();

    let connections: Vec<_> = (0..TOGGLERS).map(|_| open_db(&path).unwrap()).collect();
    let barrier = Arc::new(Barrier::new(TOGGLERS));
    let handles: Vec<_> = connections
        .into_iter()
        .map(|mut conn| {
            let barrier = Arc::clone(&barrier);
            let item = item.clone();
            thread::spawn(move || {
                let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
                let mut service = LikeService::new(repo);
                barrier.wait();
                service.toggle_like("fan", &item).unwrap()
            })
        })
        .collect();
    let outcomes: Vec<bool> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    // Serialized flips from "not liked" alternate true/false.
    let liked = outcomes.iter().filter(|liked| **liked).count();
    assert_eq!(liked, TOGGLERS.div_ceil(2));
    assert!(count_rows(&setup, "like_marks") <= 1);

    let repo = SqliteLikeRepository::try_new(&mut setup).unwrap();
    let service = LikeService::new(repo);
    let expected_state = u8::from(TOGGLERS % 2 == 1);
    assert_eq!(service.like_state("fan", &item).unwrap(), expected_state);
}

#[test]
fn concurrent_toggles_from_distinct_users_all_land() {
    const USERS: usize = 8;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let mut setup = open_db(&path).unwrap();
    let item_id = insert_item(&mut setup, "author", 10, "popular");

    let handles: Vec<_> = (0..USERS)
        .map(|idx| {
            let mut conn = open_db(&path).unwrap();
            let item = item_id.to_string();
            thread::spawn(move || {
                let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
                LikeService::new(repo)
                    .toggle_like(&format!("user-{idx}"), &item)
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let repo = SqliteLikeRepository::try_new(&mut setup).unwrap();
    assert_eq!(repo.like_count(item_id).unwrap(), USERS as u64);
}

#[test]
fn persistent_lock_contention_surfaces_store_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let mut holder = open_db(&path).unwrap();
    let item = insert_item(&mut holder, "author", 10, "locked").to_string();

    let mut contender = open_db(&path).unwrap();
    contender.busy_timeout(Duration::from_millis(20)).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let config = FeedConfig {
        store_max_attempts: 2,
        store_retry_backoff_ms: 1,
        ..FeedConfig::default()
    };
    {
        let repo = SqliteLikeRepository::try_new(&mut contender).unwrap();
        let mut service = LikeService::with_config(repo, config).unwrap();
        let err = service.toggle_like("fan", &item).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::StoreUnavailable {
                operation: "toggle_like",
                attempts: 2,
                ..
            }
        ));
        assert!(!err.is_client_fault());
    }

    holder.execute_batch("ROLLBACK;").unwrap();
    assert_eq!(count_rows(&contender, "like_marks"), 0);

    let repo = SqliteLikeRepository::try_new(&mut contender).unwrap();
    assert!(LikeService::new(repo).toggle_like("fan", &item).unwrap());
}

#[test]
fn zero_store_attempts_are_refused() {
    let mut conn = memory_db();
    let repo = SqliteLikeRepository::try_new(&mut conn).unwrap();
    let config = FeedConfig {
        store_max_attempts: 0,
        ..FeedConfig::default()
    };
    assert!(matches!(
        LikeService::with_config(repo, config),
        Err(ConfigError::ZeroValue("store_max_attempts"))
    ));
}
