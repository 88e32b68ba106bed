//! Redis lock replica.
//!
//! Locks are plain keys: `SET key token NX PX ttl` to take, and a
//! compare-and-delete script to release.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::{LockReplica, ReplicaError};

const UNLOCK_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// One Redis server acting as a lock replica.
pub struct RedisLockReplica {
    address: String,
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisLockReplica {
    /// Open a replica at `address` (`host`, `host:port` or a `redis://` URL).
    ///
    /// The connection is established lazily on first use.
    pub fn open(address: &str) -> Result<Self, ReplicaError> {
        let url = normalize_address(address);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| ReplicaError::Unavailable(format!("{url}: {e}")))?;

        Ok(Self {
            address: url,
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, ReplicaError> {
        self.connection
            .get_or_try_init(|| async {
                tracing::debug!(replica = %self.address, "Connecting to lock replica");
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .cloned()
            .map_err(|e| ReplicaError::Unavailable(format!("{}: {e}", self.address)))
    }
}

fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    }
}

#[async_trait]
impl LockReplica for RedisLockReplica {
    async fn try_lock(&self, resource: &str, token: &str, ttl: Duration) -> Result<bool, ReplicaError> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(resource)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| ReplicaError::Unavailable(format!("{}: {e}", self.address)))?;

        Ok(reply.is_some())
    }

    async fn unlock(&self, resource: &str, token: &str) -> Result<bool, ReplicaError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = redis::Script::new(UNLOCK_SCRIPT)
            .key(resource)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ReplicaError::Unavailable(format!("{}: {e}", self.address)))?;

        Ok(deleted == 1)
    }

    fn describe(&self) -> String {
        self.address.clone()
    }
}
