//! Quorum-backed, non-blocking distributed mutex.
//!
//! ## Protocol
//!
//! ```text
//! try_acquire(name)
//!   token <- fresh uuid
//!   ask every replica: lock(name, token, ttl)      (bounded by replica_timeout)
//!   validity = ttl - elapsed - drift
//!   granted >= quorum && validity > 0  -> Lease
//!   otherwise                          -> unlock everywhere, Contention
//! ```
//!
//! Acquisition never waits for a holder to go away. Replicas only release
//! locks whose token matches, so a late unlock can never free another
//! worker's lease.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::time::Instant;
use uuid::Uuid;

/// A single lock-service replica.
#[async_trait]
pub trait LockReplica: Send + Sync {
    /// Set `resource` to `token` if it is free; `Ok(false)` if it is held.
    async fn try_lock(&self, resource: &str, token: &str, ttl: Duration) -> Result<bool, ReplicaError>;

    /// Delete `resource` if it still holds `token`; `Ok(false)` otherwise.
    async fn unlock(&self, resource: &str, token: &str) -> Result<bool, ReplicaError>;

    /// Human-readable address for logs.
    fn describe(&self) -> String;
}

/// Replica-level failure. Counts as a refused vote, never propagates.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReplicaError {
    /// The replica could not be reached or rejected the command.
    #[error("replica unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LockError {
    /// Quorum was not reached; someone else holds the resource.
    #[error("lock contention on {resource}: {granted}/{quorum} replicas granted")]
    Contention {
        /// Resource name.
        resource: String,
        /// Replicas that granted the lock.
        granted: usize,
        /// Replicas required.
        quorum: usize,
    },
    /// No replicas configured.
    #[error("no lock replicas configured")]
    NoReplicas,
    /// Quorum cannot be satisfied by the configured replicas.
    #[error("quorum {quorum} is invalid for {replicas} replicas")]
    InvalidQuorum {
        /// Requested quorum.
        quorum: usize,
        /// Configured replicas.
        replicas: usize,
    },
    /// Drift factor is not a finite fraction in `[0, 1)`.
    #[error("clock drift factor {0} is not in [0, 1)")]
    InvalidDriftFactor(f64),
}

/// Quorum lock configuration.
#[derive(Debug, Clone)]
pub struct QuorumConfig {
    /// Lease time-to-live (default: 100s).
    pub ttl: Duration,
    /// Replicas that must agree; `None` means a strict majority.
    pub quorum: Option<usize>,
    /// Per-replica call budget (default: 250ms).
    pub replica_timeout: Duration,
    /// Clock drift allowance as a fraction of the TTL (default: 0.01).
    pub clock_drift_factor: f64,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(100),
            quorum: None,
            replica_timeout: Duration::from_millis(250),
            clock_drift_factor: 0.01,
        }
    }
}

impl QuorumConfig {
    /// Set the lease TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set an explicit quorum.
    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = Some(quorum);
        self
    }

    /// Set the clock drift allowance.
    pub fn with_clock_drift_factor(mut self, factor: f64) -> Self {
        self.clock_drift_factor = factor;
        self
    }

    /// Set the per-replica call budget.
    pub fn with_replica_timeout(mut self, timeout: Duration) -> Self {
        self.replica_timeout = timeout;
        self
    }
}

type Replicas = Arc<[Arc<dyn LockReplica>]>;

/// Distributed mutex over a fixed replica set.
pub struct QuorumMutex {
    replicas: Replicas,
    config: QuorumConfig,
    quorum: usize,
}

impl QuorumMutex {
    /// Create a mutex over `replicas`.
    pub fn new(replicas: Vec<Arc<dyn LockReplica>>, config: QuorumConfig) -> Result<Self, LockError> {
        if replicas.is_empty() {
            return Err(LockError::NoReplicas);
        }

        let quorum = config.quorum.unwrap_or(replicas.len() / 2 + 1);
        if quorum == 0 || quorum > replicas.len() {
            return Err(LockError::InvalidQuorum { quorum, replicas: replicas.len() });
        }

        let factor = config.clock_drift_factor;
        if !(factor.is_finite() && (0.0..1.0).contains(&factor)) {
            return Err(LockError::InvalidDriftFactor(factor));
        }

        tracing::info!(
            replicas = replicas.len(),
            quorum = quorum,
            ttl_ms = config.ttl.as_millis() as u64,
            "Quorum mutex initialized"
        );

        Ok(Self {
            replicas: replicas.into(),
            config,
            quorum,
        })
    }

    /// Replicas required for a grant.
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Try once to take `name`. Never waits on a current holder.
    pub async fn try_acquire(&self, name: &str) -> Result<Lease, LockError> {
        let token = Uuid::new_v4().simple().to_string();
        let ttl = self.config.ttl;
        let start = Instant::now();

        let token_ref = token.as_str();
        let votes = join_all(self.replicas.iter().map(|replica| async move {
            match tokio::time::timeout(
                self.config.replica_timeout,
                replica.try_lock(name, token_ref, ttl),
            )
            .await
            {
                Ok(Ok(granted)) => granted,
                Ok(Err(e)) => {
                    tracing::debug!(replica = %replica.describe(), error = %e, "Lock vote failed");
                    false
                }
                Err(_) => {
                    tracing::debug!(replica = %replica.describe(), "Lock vote timed out");
                    false
                }
            }
        }))
        .await;

        let granted = votes.into_iter().filter(|g| *g).count();
        let drift = ttl.mul_f64(self.config.clock_drift_factor) + Duration::from_millis(2);
        let validity = ttl
            .checked_sub(start.elapsed() + drift)
            .filter(|v| !v.is_zero());

        match validity {
            Some(validity) if granted >= self.quorum => Ok(Lease {
                resource: name.to_string(),
                token,
                replicas: Arc::clone(&self.replicas),
                replica_timeout: self.config.replica_timeout,
                valid_until: start + validity,
                released: false,
            }),
            _ => {
                release_all(&self.replicas, name, &token, self.config.replica_timeout).await;
                Err(LockError::Contention {
                    resource: name.to_string(),
                    granted,
                    quorum: self.quorum,
                })
            }
        }
    }
}

async fn release_all(replicas: &[Arc<dyn LockReplica>], resource: &str, token: &str, timeout: Duration) {
    join_all(replicas.iter().map(|replica| async move {
        match tokio::time::timeout(timeout, replica.unlock(resource, token)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::debug!(replica = %replica.describe(), error = %e, "Unlock failed");
            }
            Err(_) => {
                tracing::debug!(replica = %replica.describe(), "Unlock timed out");
            }
        }
    }))
    .await;
}

/// Exclusive, time-bounded ownership of a named resource.
///
/// Call [`Lease::release`] on every exit path. A lease dropped unreleased
/// schedules its release on the current runtime; if there is none, the
/// replicas expire it after the TTL.
pub struct Lease {
    resource: String,
    token: String,
    replicas: Replicas,
    replica_timeout: Duration,
    valid_until: Instant,
    released: bool,
}

impl Lease {
    /// Locked resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether the lease is held and inside its validity window.
    pub fn is_valid(&self) -> bool {
        !self.released && Instant::now() < self.valid_until
    }

    /// Remaining validity, zero once expired or released.
    pub fn remaining(&self) -> Duration {
        if self.released {
            return Duration::ZERO;
        }
        self.valid_until.saturating_duration_since(Instant::now())
    }

    /// Release on every replica. Idempotent.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        release_all(&self.replicas, &self.resource, &self.token, self.replica_timeout).await;
        tracing::trace!(resource = %self.resource, "Lease released");
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(resource = %self.resource, "Lease dropped outside a runtime; left to expire");
            return;
        };

        let replicas = Arc::clone(&self.replicas);
        let resource = std::mem::take(&mut self.resource);
        let token = std::mem::take(&mut self.token);
        let timeout = self.replica_timeout;
        handle.spawn(async move {
            release_all(&replicas, &resource, &token, timeout).await;
        });
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("resource", &self.resource)
            .field("released", &self.released)
            .field("remaining", &self.remaining())
            .finish()
    }
}

pub use memory::InMemoryLockReplica;

#[cfg(feature = "redis")]
pub use self::redis::RedisLockReplica;
