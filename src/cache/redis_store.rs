//! Redis backend for [`CacheStore`](super::store::CacheStore).
//!
//! Connections come from a `deadpool-redis` pool. Pool exhaustion or a
//! refused connection surfaces as [`CacheStoreError::Unavailable`] so the
//! read-through layer can fail open.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;

use super::store::{CacheStore, CacheStoreError};

const SCAN_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    key_prefix: String,
}

impl RedisStore {
    pub fn connect(url: &str) -> Result<Self, CacheStoreError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheStoreError::Backend(format!("failed to create Redis pool: {err}")))?;

        Ok(Self {
            pool,
            key_prefix: String::new(),
        })
    }

    /// Namespaces every key with `{prefix}:` so several deployments can share
    /// one Redis database.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn connection(&self) -> Result<Connection, CacheStoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheStoreError::Unavailable(err.to_string()))
    }

    async fn unlink_matching(
        &self,
        conn: &mut Connection,
        pattern: &str,
    ) -> Result<u64, CacheStoreError> {
        let mut cursor: u64 = 0;
        let mut removed = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut **conn)
                .await
                .map_err(backend)?;

            if !keys.is_empty() {
                let unlinked: u64 = redis::cmd("UNLINK")
                    .arg(&keys)
                    .query_async(&mut **conn)
                    .await
                    .map_err(backend)?;
                removed += unlinked;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }
}

fn backend(err: redis::RedisError) -> CacheStoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
        CacheStoreError::Unavailable(err.to_string())
    } else {
        CacheStoreError::Backend(err.to_string())
    }
}

/// Escapes glob metacharacters so a literal prefix can be used in `SCAN MATCH`.
fn escape_glob(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError> {
        let mut conn = self.connection().await?;
        conn.exists(self.build_key(key)).await.map_err(backend)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let mut conn = self.connection().await?;
        conn.get(self.build_key(key)).await.map_err(backend)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheStoreError> {
        let full_key = self.build_key(key);
        let mut conn = self.connection().await?;

        match ttl {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(full_key, value, ttl.as_secs().max(1))
                    .await
                    .map_err(backend)?;
            }
            None => {
                let _: () = conn.set(full_key, value).await.map_err(backend)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheStoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let full_keys: Vec<String> = keys.iter().map(|key| self.build_key(key)).collect();
        let mut conn = self.connection().await?;
        let _: () = conn.del(full_keys).await.map_err(backend)?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError> {
        let pattern = format!("{}*", escape_glob(&self.build_key(prefix)));
        let mut conn = self.connection().await?;
        self.unlink_matching(&mut conn, &pattern).await
    }

    async fn flush(&self) -> Result<(), CacheStoreError> {
        let mut conn = self.connection().await?;

        if self.key_prefix.is_empty() {
            let _: () = redis::cmd("FLUSHDB")
                .query_async(&mut *conn)
                .await
                .map_err(backend)?;
        } else {
            let pattern = format!("{}:*", escape_glob(&self.key_prefix));
            self.unlink_matching(&mut conn, &pattern).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_glob_escapes_metacharacters() {
        assert_eq!(escape_glob("public:"), "public:");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[tokio::test]
    async fn build_key_applies_instance_prefix() {
        let store = RedisStore::connect("redis://127.0.0.1:6379")
            .expect("pool creation does not connect")
            .with_key_prefix("inkpost");
        assert_eq!(store.build_key("public:articles:all"), "inkpost:public:articles:all");
    }
}
