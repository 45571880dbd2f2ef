//! Redis store backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use redis::Commands;
use tracing::debug;
use tyosis_core::{Error, Result, Store};

fn store_err(err: redis::RedisError) -> Error {
    Error::store(err.to_string())
}

/// Store backed by a single Redis connection.
///
/// Commands from concurrently imported sources are serialised on the
/// connection.
pub struct RedisStore {
    conn: Mutex<redis::Connection>,
}

impl RedisStore {
    /// Connect to `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("redis://{host}:{port}/");
        let client = redis::Client::open(addr.as_str()).map_err(store_err)?;
        let conn = client.get_connection().map_err(store_err)?;
        debug!("Connected to {}", addr);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, redis::Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::store("redis connection lock poisoned"))
    }
}

impl Store for RedisStore {
    fn select(&self, database: i64) -> Result<()> {
        let mut conn = self.lock()?;
        redis::cmd("SELECT")
            .arg(database)
            .query::<()>(&mut *conn)
            .map_err(store_err)
    }

    fn get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.lock()?;
        conn.hgetall(key).map_err(store_err)
    }

    fn set_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Err(Error::store(format!("no fields given for key {key}")));
        }
        let mut conn = self.lock()?;
        conn.hset_multiple::<_, _, _, ()>(key, fields)
            .map_err(store_err)
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.lock()?;
        conn.hget(key, field).map_err(store_err)
    }
}
