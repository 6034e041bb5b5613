//! Redis lease store.
//!
//! - create: `SET key token NX PX ttl`
//! - renew: Lua `GET == token` then `PEXPIRE`
//! - release: Lua `GET == token` then `DEL`
//!
//! Redis expires the key itself, so a crashed holder's lease disappears after
//! its TTL without any cleanup on our side.

use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Connection, Script};
use tracing::warn;

use super::{LeaseStore, OwnerToken, StoreError, FAR_FUTURE};

const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const MAX_IDLE_CONNECTIONS: usize = 8;

/// Lease store talking to a single Redis instance over blocking connections.
///
/// Connections are checked out of a small idle pool for the duration of one
/// command, so concurrent calls for different keys never queue behind each
/// other. A connection that saw an error is dropped instead of being returned.
pub struct RedisLeaseStore {
    client: Client,
    idle: Mutex<Vec<Connection>>,
    connect_timeout: Duration,
    renew: Script,
    release: Script,
}

impl RedisLeaseStore {
    /// Create a store for the given URL, e.g. `redis://127.0.0.1/`.
    ///
    /// Opens one connection eagerly so a bad URL or unreachable server is
    /// reported here rather than on the first acquire.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let store = RedisLeaseStore {
            client,
            idle: Mutex::new(Vec::new()),
            connect_timeout: Duration::from_secs(2),
            renew: Script::new(RENEW_SCRIPT),
            release: Script::new(RELEASE_SCRIPT),
        };
        let conn = store.checkout()?;
        store.checkin(conn);
        Ok(store)
    }

    fn checkout(&self) -> Result<Connection, StoreError> {
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        match pooled {
            Some(conn) => Ok(conn),
            None => Ok(self
                .client
                .get_connection_with_timeout(self.connect_timeout)?),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_CONNECTIONS {
                idle.push(conn);
            }
        }
    }

    fn with_connection<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self.checkout()?;
        match f(&mut conn) {
            Ok(value) => {
                self.checkin(conn);
                Ok(value)
            }
            Err(err) => {
                warn!(op, error = %err, "redis lease command failed");
                Err(err.into())
            }
        }
    }
}

// Redis rejects expiries that overflow its clock, so cap at FAR_FUTURE.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.min(FAR_FUTURE).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

impl LeaseStore for RedisLeaseStore {
    fn try_create_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let reply: Option<String> = self.with_connection("create", |conn| {
            redis::cmd("SET")
                .arg(key)
                .arg(owner.as_str())
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query(conn)
        })?;
        match reply.as_deref() {
            None => Ok(false),
            Some("OK") => Ok(true),
            Some(other) => Err(StoreError::UnexpectedReply(other.to_string())),
        }
    }

    fn renew_lease(
        &self,
        key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let renewed: i64 = self.with_connection("renew", |conn| {
            self.renew
                .key(key)
                .arg(owner.as_str())
                .arg(ttl_millis(ttl))
                .invoke(conn)
        })?;
        Ok(renewed == 1)
    }

    fn release_lease(&self, key: &str, owner: &OwnerToken) -> Result<bool, StoreError> {
        let deleted: i64 = self.with_connection("release", |conn| {
            self.release.key(key).arg(owner.as_str()).invoke(conn)
        })?;
        Ok(deleted == 1)
    }
}
