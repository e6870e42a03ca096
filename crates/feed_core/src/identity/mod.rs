//! Identity collaborator seam.
//!
//! # Responsibility
//! - Define the injected `IdentityResolver` capability that maps an opaque
//!   user id to display metadata.
//! - Provide in-memory and caching resolver implementations.
//! - Resolve a batch of authors under one deadline with per-author
//!   placeholder fallback, on a bounded long-lived worker pool.
//!
//! # Invariants
//! - Identity data is presentation-only; it never gates authorization.
//! - A failed or late lookup degrades that author only, never the caller.
//! - Lookup threads are fixed at pool start; a hung provider cannot grow them.

use crate::config::FeedConfig;
use crate::model::item::{AuthorProfile, UserId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Display metadata supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<UserProfile> for AuthorProfile {
    fn from(value: UserProfile) -> Self {
        Self {
            display_name: value.display_name,
            avatar_url: value.avatar_url,
            resolved: true,
        }
    }
}

/// Identity lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Provider has no record for the user id.
    UnknownUser(String),
    /// Provider could not be reached or answered with an error.
    Unavailable(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(id) => write!(f, "unknown user: {id}"),
            Self::Unavailable(message) => write!(f, "identity provider unavailable: {message}"),
        }
    }
}

impl Error for IdentityError {}

/// External capability resolving user ids to display metadata.
///
/// Implementations may block on I/O; callers bound the wait themselves.
pub trait IdentityResolver: Send + Sync {
    fn resolve_user(&self, user_id: &str) -> Result<UserProfile, IdentityError>;
}

/// Map-backed resolver for tests, demos and fixed deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    profiles: HashMap<UserId, UserProfile>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces one profile.
    pub fn with_user(
        mut self,
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        self.profiles.insert(
            user_id.into(),
            UserProfile {
                display_name: display_name.into(),
                avatar_url,
            },
        );
        self
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve_user(&self, user_id: &str) -> Result<UserProfile, IdentityError> {
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(user_id.to_string()))
    }
}

/// Resolver wrapper caching successful lookups for `ttl`.
///
/// Failures are not cached, so a recovering provider is retried on the
/// next page.
pub struct CachedIdentityResolver<R: IdentityResolver> {
    inner: R,
    ttl: Duration,
    entries: Mutex<HashMap<UserId, (Instant, UserProfile)>>,
}

impl<R: IdentityResolver> CachedIdentityResolver<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Wraps `inner` with the TTL from `identity_cache_ttl_secs`.
    pub fn from_config(inner: R, config: &FeedConfig) -> Self {
        Self::new(inner, config.identity_cache_ttl())
    }

    /// Drops every cached profile.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, user_id: &str) -> Option<UserProfile> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(user_id)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, profile)| profile.clone())
    }
}

impl<R: IdentityResolver> IdentityResolver for CachedIdentityResolver<R> {
    fn resolve_user(&self, user_id: &str) -> Result<UserProfile, IdentityError> {
        if let Some(profile) = self.cached(user_id) {
            return Ok(profile);
        }

        // Lock is not held across the provider call.
        let profile = self.inner.resolve_user(user_id)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), (Instant::now(), profile.clone()));
        Ok(profile)
    }
}

type Lookup = (UserId, Result<UserProfile, IdentityError>);

/// Long-lived lookup pool enriching feed pages with author profiles.
///
/// A fixed set of worker threads serves a bounded queue. Concurrent
/// requests for the same id share one provider call. Lookups that find the
/// queue full, or that miss the caller's deadline, degrade to
/// [`AuthorProfile::placeholder`], so a hung provider holds at most
/// `identity_workers` threads however many pages are served.
///
/// Cloning is cheap; clones share workers. Workers exit once every clone
/// is dropped and their current lookup returns.
#[derive(Clone)]
pub struct AuthorDirectory {
    shared: Arc<DirectoryShared>,
    jobs: SyncSender<UserId>,
    workers: usize,
    max_waiters: usize,
}

struct DirectoryShared {
    resolver: Arc<dyn IdentityResolver>,
    /// Callers waiting on each queued or running lookup.
    in_flight: Mutex<HashMap<UserId, Vec<Sender<Lookup>>>>,
}

impl AuthorDirectory {
    /// Starts `config.identity_workers` workers over `resolver`.
    pub fn new(resolver: Arc<dyn IdentityResolver>, config: &FeedConfig) -> Self {
        let (jobs, queue) = mpsc::sync_channel(config.identity_queue_capacity);
        let queue = Arc::new(Mutex::new(queue));
        let shared = Arc::new(DirectoryShared {
            resolver,
            in_flight: Mutex::new(HashMap::new()),
        });

        let mut workers = 0usize;
        for index in 0..config.identity_workers {
            let shared = Arc::clone(&shared);
            let queue = Arc::clone(&queue);
            let spawned = thread::Builder::new()
                .name(format!("identity-worker-{index}"))
                .spawn(move || run_worker(&shared, &queue));
            match spawned {
                Ok(_) => workers += 1,
                Err(err) => warn!(
                    "event=identity_pool module=identity status=error error_code=spawn_failed error={err}"
                ),
            }
        }
        debug!("event=identity_pool module=identity status=ok workers={workers}");

        Self {
            shared,
            jobs,
            workers,
            max_waiters: config.identity_queue_capacity,
        }
    }

    /// Number of worker threads serving lookups.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Resolves every distinct id and waits at most `timeout`.
    ///
    /// Ids that fail, are shed, or have not answered by the deadline map
    /// to [`AuthorProfile::placeholder`].
    pub fn resolve<'a>(
        &self,
        user_ids: impl IntoIterator<Item = &'a str>,
        timeout: Duration,
    ) -> HashMap<UserId, AuthorProfile> {
        let distinct: BTreeSet<&str> = user_ids.into_iter().collect();
        let mut resolved: HashMap<UserId, AuthorProfile> = HashMap::with_capacity(distinct.len());
        if distinct.is_empty() {
            return resolved;
        }

        let started_at = Instant::now();
        let deadline = started_at + timeout;
        let (sender, receiver) = mpsc::channel();
        let mut pending = 0usize;
        let mut shed = 0usize;
        {
            // Held across enqueueing so a worker cannot finish a job before
            // its waiter is registered.
            let mut in_flight = self
                .shared
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for &user_id in &distinct {
                if let Some(waiters) = in_flight.get_mut(user_id) {
                    if waiters.len() < self.max_waiters {
                        waiters.push(sender.clone());
                        pending += 1;
                    } else {
                        shed += 1;
                    }
                    continue;
                }
                match self.jobs.try_send(user_id.to_string()) {
                    Ok(()) => {
                        in_flight.insert(user_id.to_string(), vec![sender.clone()]);
                        pending += 1;
                    }
                    Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => shed += 1,
                }
            }
        }
        drop(sender);

        let mut failed = 0usize;
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((user_id, Ok(profile))) => {
                    pending -= 1;
                    resolved.insert(user_id, profile.into());
                }
                Ok((_, Err(err))) => {
                    pending -= 1;
                    failed += 1;
                    debug!("event=identity_resolve module=identity status=error error={err}");
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if resolved.len() < distinct.len() {
            warn!(
                "event=identity_resolve module=identity status=degraded requested={} failed={} shed={} timed_out={} duration_ms={}",
                distinct.len(),
                failed,
                shed,
                pending,
                started_at.elapsed().as_millis()
            );
        }
        for user_id in distinct {
            resolved
                .entry(user_id.to_string())
                .or_insert_with(AuthorProfile::placeholder);
        }
        resolved
    }
}

fn run_worker(shared: &DirectoryShared, queue: &Mutex<Receiver<UserId>>) {
    loop {
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(user_id) = next else {
            return;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.resolver.resolve_user(&user_id)
        }))
        .unwrap_or_else(|_| Err(IdentityError::Unavailable("resolver panicked".to_string())));

        let waiters = shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
            .unwrap_or_default();
        for waiter in waiters {
            // Waiters past their deadline have dropped the receiver.
            let _ = waiter.send((user_id.clone(), result.clone()));
        }
    }
}
