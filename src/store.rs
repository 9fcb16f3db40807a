use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Opens (creating if needed) the workspace's key/value store.
///
/// The store is a single table of string keys to string values; every
/// get/set/remove is one SQL statement, so each call is atomic on its own.
pub fn open_store(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("reportcard.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO kv(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, value),
    )?;
    Ok(())
}

pub fn kv_remove(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
    Ok(())
}

/// Outcome of decoding a stored blob. Malformed is kept distinct from
/// NotFound so callers can log it, but both resolve as absence: a corrupt
/// draft or archive list starts the user fresh instead of wedging startup.
#[derive(Debug)]
pub enum Decoded<T> {
    Found(T),
    NotFound,
    Malformed,
}

impl<T> Decoded<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Decoded::Found(v) => Some(v),
            Decoded::NotFound | Decoded::Malformed => None,
        }
    }
}

/// Reads `key` and strictly decodes it as `T`. Parse failures are logged
/// and reported as `Malformed`; they never propagate as errors.
pub fn kv_get_decoded<T: DeserializeOwned>(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Decoded<T>> {
    let Some(raw) = kv_get(conn, key)? else {
        return Ok(Decoded::NotFound);
    };
    match serde_json::from_str::<T>(&raw) {
        Ok(v) => Ok(Decoded::Found(v)),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored value failed structural decode; treating as absent");
            Ok(Decoded::Malformed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> Connection {
        let dir = std::env::temp_dir().join(format!(
            "reportcard-store-test-{}",
            uuid::Uuid::new_v4()
        ));
        open_store(&dir).expect("open store")
    }

    #[test]
    fn set_get_remove_round_trip() {
        let conn = temp_store();
        assert!(kv_get(&conn, "draft/P3").expect("get").is_none());
        kv_set(&conn, "draft/P3", "{\"a\":1}").expect("set");
        assert_eq!(
            kv_get(&conn, "draft/P3").expect("get").as_deref(),
            Some("{\"a\":1}")
        );
        kv_set(&conn, "draft/P3", "{\"a\":2}").expect("overwrite");
        assert_eq!(
            kv_get(&conn, "draft/P3").expect("get").as_deref(),
            Some("{\"a\":2}")
        );
        kv_remove(&conn, "draft/P3").expect("remove");
        assert!(kv_get(&conn, "draft/P3").expect("get").is_none());
    }

    #[test]
    fn decoded_distinguishes_missing_from_malformed() {
        let conn = temp_store();
        match kv_get_decoded::<serde_json::Value>(&conn, "nope").expect("decode") {
            Decoded::NotFound => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        kv_set(&conn, "bad", "{not json").expect("set");
        match kv_get_decoded::<serde_json::Value>(&conn, "bad").expect("decode") {
            Decoded::Malformed => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
        assert!(kv_get_decoded::<serde_json::Value>(&conn, "bad")
            .expect("decode")
            .into_option()
            .is_none());
    }
}
