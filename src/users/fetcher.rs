//! Keyed stale-while-revalidate cache for the users list.
//!
//! Every request is keyed by its [`QueryParams`]. Fetches run as tokio tasks
//! and report back over a channel tagged with the key they were started for,
//! so a slow response for an old search can fill the cache but never replace
//! what the current search shows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::mpsc;

use super::pagination::PageDescriptor;
use super::query::{CacheKey, QueryParams};
use crate::api::{ApiError, PaginatedResult, User};
use crate::config::AppConfig;

pub type UserPage = PaginatedResult<User>;

/// Anything that can produce a page of users
#[async_trait]
pub trait UserSource: Send + Sync + 'static {
    async fn list_users(&self, params: &QueryParams) -> Result<UserPage, ApiError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Identical requests started within this window are not repeated
    pub dedupe_interval: Duration,
    pub error_retry_interval: Duration,
    /// `None` retries transient failures indefinitely
    pub error_retry_count: Option<u32>,
    /// Show the last loaded page while a new key has nothing yet
    pub keep_previous_data: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            dedupe_interval: Duration::from_secs(2),
            error_retry_interval: Duration::from_secs(5),
            error_retry_count: None,
            keep_previous_data: true,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            dedupe_interval: config.dedupe_interval(),
            error_retry_interval: config.error_retry_interval(),
            error_retry_count: config.error_retry_count,
            keep_previous_data: true,
        }
    }
}

/// Backoff before retry `attempt` (1-based), with `jitter` in `[0.5, 1.5)`.
///
/// The multiplier is `floor(jitter * 2^min(attempt, 8))`.
pub fn retry_delay(interval: Duration, attempt: u32, jitter: f64) -> Duration {
    let factor = (jitter * f64::from(1u32 << attempt.min(8))).floor();
    interval.mul_f64(factor.max(0.0))
}

/// What the view should show for the current key
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub data: Option<Arc<UserPage>>,
    pub error: Option<Arc<ApiError>>,
    /// A request for the current key is in flight
    pub is_validating: bool,
    /// `data` belongs to an earlier key and is shown until the current one loads
    pub is_stale: bool,
}

impl FetchResponse {
    pub fn items(&self) -> &[User] {
        self.data.as_deref().map_or(&[], |page| page.items.as_slice())
    }

    pub fn pagination(&self) -> Option<&PageDescriptor> {
        self.data.as_deref().map(|page| &page.pagination)
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    params: QueryParams,
    data: Option<Arc<UserPage>>,
    error: Option<Arc<ApiError>>,
    started_at: Option<Instant>,
    in_flight: bool,
    failures: u32,
    retry_at: Option<Instant>,
}

struct Completion {
    key: CacheKey,
    result: Result<UserPage, ApiError>,
}

pub struct UserListFetcher<S> {
    source: Arc<S>,
    config: FetchConfig,
    cache: HashMap<CacheKey, CacheEntry>,
    current: Option<CacheKey>,
    previous_data: Option<Arc<UserPage>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    requests_started: u64,
}

impl<S: UserSource> UserListFetcher<S> {
    pub fn new(source: Arc<S>, config: FetchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            config,
            cache: HashMap::new(),
            current: None,
            previous_data: None,
            tx,
            rx,
            requests_started: 0,
        }
    }

    /// Make `params` the current key and fetch it unless a recent or
    /// in-flight request already covers it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&mut self, params: QueryParams, now: Instant) {
        let key = params.cache_key();
        if self.current.as_ref() == Some(&key) {
            return;
        }

        if let Some(data) = self.current_entry().and_then(|entry| entry.data.clone()) {
            self.previous_data = Some(data);
        }
        self.current = Some(key.clone());

        let entry = self.cache.entry(key.clone()).or_insert_with(|| CacheEntry {
            params,
            ..CacheEntry::default()
        });
        if entry.in_flight {
            return;
        }

        let deduped = entry
            .started_at
            .is_some_and(|started| now.saturating_duration_since(started) < self.config.dedupe_interval);
        if !deduped {
            self.spawn_fetch(key, now);
        }
    }

    /// Refetch the current key unless it is already loading
    pub fn refresh(&mut self, now: Instant) {
        let Some(key) = self.current.clone() else {
            return;
        };
        if self.cache.get(&key).is_some_and(|entry| !entry.in_flight) {
            self.spawn_fetch(key, now);
        }
    }

    /// Apply finished fetches and fire a due retry. Returns whether anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            self.complete(completion, now);
            changed = true;
        }

        if let Some(key) = self.current.clone()
            && self.cache.get(&key).is_some_and(|entry| {
                !entry.in_flight && entry.retry_at.is_some_and(|at| now >= at)
            })
        {
            self.spawn_fetch(key, now);
            changed = true;
        }

        changed
    }

    /// Wait for the next fetch to finish and apply it
    pub async fn next_completion(&mut self) {
        if let Some(completion) = self.rx.recv().await {
            self.complete(completion, Instant::now());
        }
    }

    pub fn response(&self) -> FetchResponse {
        let Some(entry) = self.current_entry() else {
            return FetchResponse::default();
        };

        let (data, is_stale) = match (&entry.data, &entry.error) {
            (Some(data), _) => (Some(Arc::clone(data)), false),
            (None, None) if self.config.keep_previous_data => {
                (self.previous_data.clone(), self.previous_data.is_some())
            }
            _ => (None, false),
        };

        FetchResponse {
            data,
            error: entry.error.clone(),
            is_validating: entry.in_flight,
            is_stale,
        }
    }

    pub fn current_params(&self) -> Option<&QueryParams> {
        self.current_entry().map(|entry| &entry.params)
    }

    /// Cached page for `params`, whether or not it is current
    pub fn cached(&self, params: &QueryParams) -> Option<Arc<UserPage>> {
        self.cache
            .get(&params.cache_key())
            .and_then(|entry| entry.data.clone())
    }

    /// When the current key's pending retry is due
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.current_entry().and_then(|entry| entry.retry_at)
    }

    pub fn requests_started(&self) -> u64 {
        self.requests_started
    }

    fn current_entry(&self) -> Option<&CacheEntry> {
        self.current.as_ref().and_then(|key| self.cache.get(key))
    }

    fn spawn_fetch(&mut self, key: CacheKey, now: Instant) {
        let Some(entry) = self.cache.get_mut(&key) else {
            return;
        };
        entry.in_flight = true;
        entry.started_at = Some(now);
        entry.retry_at = None;

        let params = entry.params.clone();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.requests_started += 1;

        tokio::spawn(async move {
            let result = source.list_users(&params).await;
            // The receiver lives as long as the fetcher; a closed channel means nobody is listening
            let _ = tx.send(Completion { key, result });
        });
    }

    fn complete(&mut self, completion: Completion, now: Instant) {
        let Some(entry) = self.cache.get_mut(&completion.key) else {
            return;
        };
        entry.in_flight = false;

        match completion.result {
            Ok(page) => {
                entry.data = Some(Arc::new(page));
                entry.error = None;
                entry.failures = 0;
                entry.retry_at = None;
            }
            Err(err) => {
                entry.failures += 1;
                let retry = err.is_transient()
                    && self
                        .config
                        .error_retry_count
                        .is_none_or(|max| entry.failures <= max);
                entry.retry_at = retry.then(|| {
                    let jitter = rand::thread_rng().gen_range(0.5..1.5);
                    now + retry_delay(self.config.error_retry_interval, entry.failures, jitter)
                });
                entry.error = Some(Arc::new(err));
            }
        }
    }
}
