//! In-process lock replica for testing and single-host runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{LockReplica, ReplicaError};

#[derive(Debug)]
struct Held {
    token: String,
    expires_at: Instant,
}

/// Lock replica backed by a process-local map.
///
/// Share one `Arc<InMemoryLockReplica>` between several
/// [`QuorumMutex`](super::QuorumMutex) instances to model competing workers.
#[derive(Debug)]
pub struct InMemoryLockReplica {
    name: String,
    held: Mutex<HashMap<String, Held>>,
    available: Mutex<bool>,
}

impl InMemoryLockReplica {
    /// Create an empty, available replica.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            held: Mutex::new(HashMap::new()),
            available: Mutex::new(true),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    /// Whether `resource` is currently held (and not expired).
    pub fn is_held(&self, resource: &str) -> bool {
        self.held
            .lock()
            .get(resource)
            .is_some_and(|h| h.expires_at > Instant::now())
    }

    fn check_available(&self) -> Result<(), ReplicaError> {
        if *self.available.lock() {
            Ok(())
        } else {
            Err(ReplicaError::Unavailable(self.name.clone()))
        }
    }
}

#[async_trait]
impl LockReplica for InMemoryLockReplica {
    async fn try_lock(&self, resource: &str, token: &str, ttl: Duration) -> Result<bool, ReplicaError> {
        self.check_available()?;

        let now = Instant::now();
        let mut held = self.held.lock();
        if held.get(resource).is_some_and(|h| h.expires_at > now) {
            return Ok(false);
        }

        held.insert(
            resource.to_string(),
            Held { token: token.to_string(), expires_at: now + ttl },
        );
        Ok(true)
    }

    async fn unlock(&self, resource: &str, token: &str) -> Result<bool, ReplicaError> {
        self.check_available()?;

        let mut held = self.held.lock();
        match held.get(resource) {
            Some(h) if h.token == token => {
                held.remove(resource);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn describe(&self) -> String {
        format!("memory://{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlock_requires_matching_token() {
        let replica = InMemoryLockReplica::new("r");
        assert!(replica.try_lock("obj", "t1", Duration::from_secs(10)).await.unwrap());
        assert!(!replica.try_lock("obj", "t2", Duration::from_secs(10)).await.unwrap());

        assert!(!replica.unlock("obj", "t2").await.unwrap());
        assert!(replica.is_held("obj"));
        assert!(replica.unlock("obj", "t1").await.unwrap());
        assert!(!replica.is_held("obj"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_retaken() {
        let replica = InMemoryLockReplica::new("r");
        assert!(replica.try_lock("obj", "t1", Duration::from_secs(5)).await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!replica.is_held("obj"));
        assert!(replica.try_lock("obj", "t2", Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_replica_errors() {
        let replica = InMemoryLockReplica::new("r");
        replica.set_available(false);
        assert!(replica.try_lock("obj", "t1", Duration::from_secs(1)).await.is_err());
    }
}
