//! # Lock Services
//!
//! Named exclusive locks with scope-bound release.
//!
//! ## Lock Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   let _guard = locks.acquire_exclusive(&key).await?;   ← blocks while   │
//! │        │                                                  another scope │
//! │        │  check-then-act under the lock                   holds `key`   │
//! │        ▼                                                                │
//! │   scope ends (return, `?`, panic)                                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   LockGuard::drop → release                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - [`LocalLockService`]: per-key `tokio::sync::Mutex`, one process
//! - [`RedisLockService`]: `SET NX PX` lease, any number of processes
//!
//! Acquisition never times out. The Redis lease bounds how long a crashed
//! holder can keep a key, not how long a caller waits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{LockBackend, SyncConfig};
use crate::error::{SyncError, SyncResult};

/// Lock key for writes to the product called `name`.
///
/// `product:` followed by the lowercase hex SHA-256 of the name, so keys
/// have a fixed length whatever the name.
pub fn lock_key_for_name(name: &str) -> String {
    format!("product:{:x}", Sha256::digest(name.as_bytes()))
}

// =============================================================================
// Lock Guard
// =============================================================================

/// Holds a lock until dropped.
pub struct LockGuard {
    key: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    /// Creates a guard that runs `release` exactly once, on drop.
    pub fn new(key: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        LockGuard {
            key: key.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!(key = %self.key, "Lock released");
        }
    }
}

// =============================================================================
// Lock Service
// =============================================================================

/// Named exclusive-lock acquisition.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Waits until `key` is free and takes it.
    async fn acquire_exclusive(&self, key: &str) -> SyncResult<LockGuard>;
}

/// Builds the lock service selected by `config.lock.backend`.
pub fn from_config(config: &SyncConfig) -> SyncResult<Arc<dyn LockService>> {
    match config.lock.backend {
        LockBackend::Local => {
            info!("Using in-process lock service");
            Ok(Arc::new(LocalLockService::new()))
        }
        LockBackend::Redis => {
            let url = config.lock.redis_url.as_deref().ok_or_else(|| {
                SyncError::InvalidConfig("lock.redis_url is not set".into())
            })?;
            info!("Using Redis lock service");
            Ok(Arc::new(RedisLockService::new(
                url,
                Duration::from_millis(config.lock.lease_ms),
                Duration::from_millis(config.lock.retry_interval_ms),
            )?))
        }
    }
}

// =============================================================================
// Local Lock Service
// =============================================================================

type LockRegistry = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// In-process lock service.
///
/// Waiters on one key are served in arrival order. A key's entry is removed
/// once nobody holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct LocalLockService {
    locks: LockRegistry,
}

impl LocalLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held or waited on.
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LockService for LocalLockService {
    async fn acquire_exclusive(&self, key: &str) -> SyncResult<LockGuard> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        let held = mutex.lock_owned().await;
        debug!(key, "Local lock acquired");

        let registry = Arc::clone(&self.locks);
        let owned_key = key.to_string();
        Ok(LockGuard::new(key, move || {
            let mut locks = registry.lock().unwrap_or_else(PoisonError::into_inner);
            drop(held);
            // Waiters clone the entry under this map lock, so a count of one
            // means the map holds the only reference.
            if locks
                .get(&owned_key)
                .is_some_and(|entry| Arc::strong_count(entry) == 1)
            {
                locks.remove(&owned_key);
            }
        }))
    }
}

// =============================================================================
// Redis Lock Service
// =============================================================================

/// Deletes the key only if it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lock service backed by Redis, shared across processes.
#[derive(Debug, Clone)]
pub struct RedisLockService {
    client: redis::Client,
    lease: Duration,
    retry_interval: Duration,
}

impl RedisLockService {
    pub fn new(url: &str, lease: Duration, retry_interval: Duration) -> SyncResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(RedisLockService {
            client,
            lease,
            retry_interval,
        })
    }
}

#[async_trait]
impl LockService for RedisLockService {
    async fn acquire_exclusive(&self, key: &str) -> SyncResult<LockGuard> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let lease_ms = self.lease.as_millis() as u64;

        let mut attempts: u64 = 0;
        loop {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(lease_ms)
                .query_async(&mut conn)
                .await?;

            if acquired.is_some() {
                break;
            }

            attempts += 1;
            if attempts % 100 == 0 {
                debug!(key, attempts, "Still waiting for Redis lock");
            }
            tokio::time::sleep(self.retry_interval).await;
        }

        debug!(key, "Redis lock acquired");

        let owned_key = key.to_string();
        Ok(LockGuard::new(key, move || {
            let handle = match tokio::runtime::Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    warn!(key = %owned_key, "No runtime to release Redis lock; it expires with its lease");
                    return;
                }
            };
            handle.spawn(async move {
                let script = redis::Script::new(RELEASE_SCRIPT);
                let result: redis::RedisResult<i64> = script
                    .key(&owned_key)
                    .arg(&token)
                    .invoke_async(&mut conn)
                    .await;
                if let Err(e) = result {
                    warn!(key = %owned_key, error = %e, "Failed to release Redis lock");
                }
            });
        }))
    }
}
