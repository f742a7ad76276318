//! Document store adapter.
//!
//! One [`Store`] wraps a [`ConnectionManager`] and a key prefix. The manager
//! multiplexes a single shared connection; cloning the handle (or the store)
//! reuses it, so constructing engine components from one store is cheap and
//! safe to do repeatedly. The handle is passed in explicitly - there is no
//! process-wide singleton.

use redis::{aio::ConnectionManager, cmd};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::EngineError;
use crate::keys::{KeyContext, SERVICE};
use crate::scripts::{APPEND_REF_SCRIPT, CLAIM_SLOT_SCRIPT, RELEASE_SLOT_SCRIPT};

/// Outcome of an idempotent back-reference append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The id was appended to the array field.
    Appended,
    /// The id was already present; nothing was written.
    AlreadyPresent,
    /// The target document (or the array field) does not exist.
    MissingDocument,
}

/// Outcome of claiming a unique-value key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The key was free and is now owned by the caller.
    Claimed,
    /// The caller already owned the key.
    Held,
    /// Another document owns the key.
    Taken { owner: String },
}

#[derive(Clone)]
pub struct Store {
    conn: ConnectionManager,
    prefix: String,
}

impl Store {
    /// Open a connection manager against `url` and wrap it with the given key
    /// prefix.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, EngineError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, prefix.into()))
    }

    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager, prefix: String) -> Self {
        Self { conn, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, SERVICE)
    }

    /// Clone of the underlying connection handle for raw commands.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Write one entity as a JSON document, replacing any previous value.
    pub async fn put_json<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), EngineError> {
        let payload = serde_json::to_string(doc).map_err(|err| EngineError::Corrupt {
            key: key.to_string(),
            message: format!("failed to serialize document: {err}").into(),
        })?;
        let mut conn = self.connection();
        let _: () = cmd("JSON.SET").arg(key).arg("$").arg(payload).query_async(&mut conn).await?;
        Ok(())
    }

    /// Fetch one entity document, `None` when the key does not exist.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EngineError> {
        let mut conn = self.connection();
        let result: Option<String> = cmd("JSON.GET").arg(key).query_async(&mut conn).await?;
        match result {
            Some(json) => {
                let value = serde_json::from_str::<T>(&json).map_err(|err| EngineError::Corrupt {
                    key: key.to_string(),
                    message: format!("failed to deserialize document: {err}").into(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Fetch documents one key at a time, preserving input order and skipping
    /// misses. Resolution is an explicit multi-round-trip join; the store
    /// performs none itself.
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<T>, EngineError> {
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(doc) = self.get_json::<T>(key).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, EngineError> {
        let mut conn = self.connection();
        let exists: i64 = cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(exists == 1)
    }

    /// Plain string read, used for unique/lookup keys.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, EngineError> {
        let mut conn = self.connection();
        let value: Option<String> = cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    // -- index primitives ---------------------------------------------------

    pub async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), EngineError> {
        let mut conn = self.connection();
        let _: () = cmd("ZADD").arg(key).arg(score).arg(member).query_async(&mut conn).await?;
        Ok(())
    }

    /// Members ordered by score ascending; equal scores fall back to
    /// lexicographic member order, which keeps pagination deterministic.
    pub async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, EngineError> {
        let mut conn = self.connection();
        let members: Vec<String> = cmd("ZRANGE").arg(key).arg(start).arg(stop).query_async(&mut conn).await?;
        Ok(members)
    }

    /// Members ordered by score descending.
    pub async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, EngineError> {
        let mut conn = self.connection();
        let members: Vec<String> = cmd("ZREVRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    pub async fn zcard(&self, key: &str) -> Result<u64, EngineError> {
        let mut conn = self.connection();
        let count: u64 = cmd("ZCARD").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    pub async fn sadd(&self, key: &str, member: &str) -> Result<(), EngineError> {
        let mut conn = self.connection();
        let _: () = cmd("SADD").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, EngineError> {
        let mut conn = self.connection();
        let members: Vec<String> = cmd("SMEMBERS").arg(key).query_async(&mut conn).await?;
        Ok(members)
    }

    // -- scripted primitives ------------------------------------------------

    /// Append `member` to the array at `path` inside the document at `key`,
    /// unless it is already there. Set-union semantics make a retried saga
    /// step safe.
    pub async fn append_ref(&self, key: &str, path: &str, member: &str) -> Result<AppendOutcome, EngineError> {
        let mut conn = self.connection();
        let mut invocation = APPEND_REF_SCRIPT.prepare_invoke();
        invocation.key(key).arg(path).arg(member);
        let raw: String = invocation.invoke_async(&mut conn).await?;
        match raw.as_str() {
            "appended" => Ok(AppendOutcome::Appended),
            "present" => Ok(AppendOutcome::AlreadyPresent),
            "missing" => Ok(AppendOutcome::MissingDocument),
            other => Err(EngineError::Corrupt {
                key: key.to_string(),
                message: format!("unexpected append_ref reply: {other}").into(),
            }),
        }
    }

    /// Atomically claim a unique-value key for `owner`.
    pub async fn claim_slot(&self, key: &str, owner: &str) -> Result<ClaimOutcome, EngineError> {
        let mut conn = self.connection();
        let mut invocation = CLAIM_SLOT_SCRIPT.prepare_invoke();
        invocation.key(key).arg(owner);
        let raw: String = invocation.invoke_async(&mut conn).await?;
        match raw.as_str() {
            "claimed" => Ok(ClaimOutcome::Claimed),
            "held" => Ok(ClaimOutcome::Held),
            other => match other.strip_prefix("owner:") {
                Some(owner) => Ok(ClaimOutcome::Taken { owner: owner.to_string() }),
                None => Err(EngineError::Corrupt {
                    key: key.to_string(),
                    message: format!("unexpected claim_slot reply: {other}").into(),
                }),
            },
        }
    }

    /// Release a unique-value key if `owner` still holds it.
    pub async fn release_slot(&self, key: &str, owner: &str) -> Result<bool, EngineError> {
        let mut conn = self.connection();
        let mut invocation = RELEASE_SLOT_SCRIPT.prepare_invoke();
        invocation.key(key).arg(owner);
        let released: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(released == 1)
    }

    /// Delete every key under this store's namespace (test cleanup).
    ///
    /// SCAN + DEL so the server is never blocked on a large keyspace.
    pub async fn cleanup_namespace(&self) -> Result<u64, EngineError> {
        const SCAN_COUNT: usize = 1000;
        let pattern = self.keys().service_pattern();
        let mut conn = self.connection();
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(total_deleted)
    }
}
