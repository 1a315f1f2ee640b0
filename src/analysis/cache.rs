//! Per-repository configuration with time-based expiry.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::github::GitHubApi;
use crate::pr::RepoRef;

/// Location of the per-repository config file.
pub const REPO_CONFIG_PATH: &str = ".github/inclusive_lang.yaml";

/// Contents of [`REPO_CONFIG_PATH`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    /// `.gitignore`-style patterns of paths to skip
    pub ignore: Vec<String>,
}

#[derive(Deserialize)]
struct RawRepoConfig {
    ignore: Option<Vec<String>>,
}

impl RepoConfig {
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawRepoConfig = serde_yaml::from_str(yaml)?;
        Ok(Self {
            ignore: raw.ignore.unwrap_or_default(),
        })
    }
}

struct CacheEntry {
    value: RepoConfig,
    /// `None` when the TTL is too large to represent; such entries never expire
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Thread-safe map of repository id to [`RepoConfig`].
///
/// Misses fetch the config file from the repository. Fetch and parse errors
/// are cached as an empty config, so a repository without the file costs one
/// request per TTL window. Concurrent misses for the same repository may each
/// fetch; the last writer wins.
pub struct RepoConfigCache {
    ttl: Duration,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

impl RepoConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Unexpired value for `repo_id`, if any. Expired entries are dropped.
    pub fn lookup(&self, repo_id: u64) -> Option<RepoConfig> {
        let mut entries = self.entries.lock();
        match entries.get(&repo_id) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&repo_id);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, repo_id: u64, value: RepoConfig) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(self.ttl),
        };
        self.entries.lock().insert(repo_id, entry);
    }

    /// Config for `repo`, fetched at `at_ref` on a miss. Never fails.
    pub async fn get(&self, api: &dyn GitHubApi, repo: &RepoRef, at_ref: &str) -> RepoConfig {
        if let Some(config) = self.lookup(repo.id) {
            debug!(repo = %repo, "repo config cache hit");
            return config;
        }

        let config = match api.fetch_file(repo, REPO_CONFIG_PATH, at_ref).await {
            Ok(raw) => RepoConfig::parse(&raw).unwrap_or_else(|err| {
                warn!(repo = %repo, error = %err, "unparseable repo config, using empty config");
                RepoConfig::default()
            }),
            Err(err) => {
                debug!(repo = %repo, error = %err, "no repo config, using empty config");
                RepoConfig::default()
            }
        };
        self.insert(repo.id, config.clone());
        config
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Periodically purge expired entries until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let period = period.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = cache.len(), "swept repo config cache");
                }
            }
        })
    }
}
