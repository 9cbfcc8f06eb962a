//! SQLite-backed store.

use crate::error::{StoreError, StoreResult};
use crate::models::{Product, Session, Tag, User};
use crate::TrackingStore;
use chrono::{DateTime, Utc};
use danceparty_crypto::Handle;
use danceparty_keys::{ActivationRecord, ActivationStore, KeyCode, KeyError, KeyResult};
use danceparty_types::Environment;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const KEY_COLUMNS: &str = "key_code, environment, privilege_list, privilege_name, description, \
     game_code, max_activations, activation_count, owner_mac, activated_at";

/// Persistent store backed by a SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite store");
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                product_handle TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                code TEXT NOT NULL,
                password TEXT NOT NULL,
                token TEXT NOT NULL,
                environment TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS products_credentials
                ON products (code, password, environment);

            CREATE TABLE IF NOT EXISTS users (
                user_handle TEXT PRIMARY KEY,
                mac_address TEXT NOT NULL,
                shard_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                session_handle TEXT PRIMARY KEY,
                user_mac TEXT NOT NULL,
                user_handle TEXT NOT NULL,
                ipv4 TEXT NOT NULL,
                product_handle TEXT NOT NULL,
                environment TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                attributes TEXT NOT NULL,
                delta INTEGER NOT NULL,
                sequence INTEGER NOT NULL,
                session_handle TEXT NOT NULL,
                product_handle TEXT NOT NULL,
                environment TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS tags_session ON tags (session_handle);

            CREATE TABLE IF NOT EXISTS unique_keys (
                key_code TEXT PRIMARY KEY,
                environment TEXT NOT NULL,
                privilege_list INTEGER NOT NULL CHECK (privilege_list >= 0),
                privilege_name TEXT NOT NULL,
                description TEXT NOT NULL,
                game_code TEXT NOT NULL,
                max_activations INTEGER NOT NULL CHECK (max_activations >= 1),
                activation_count INTEGER NOT NULL
                    CHECK (activation_count >= 0 AND activation_count <= max_activations),
                owner_mac TEXT,
                activated_at TEXT
            );
            CREATE INDEX IF NOT EXISTS unique_keys_env ON unique_keys (key_code, environment);
            ",
        )?;
        Ok(())
    }
}

// ── Row decoding ─────────────────────────────────────────────────

fn parse_handle(text: &str) -> StoreResult<Handle> {
    Handle::parse(text).map_err(|e| StoreError::InvalidData(e.to_string()))
}

fn parse_environment(text: &str) -> StoreResult<Environment> {
    text.parse()
        .map_err(|e: danceparty_types::Error| StoreError::InvalidData(e.to_string()))
}

fn timestamp(text: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp `{text}`: {e}")))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_error(err: rusqlite::Error, key: &str) -> StoreError {
    if is_constraint_violation(&err) {
        StoreError::Duplicate(key.to_string())
    } else {
        StoreError::Database(err)
    }
}

struct KeyRow {
    key_code: String,
    environment: String,
    privilege_list: u32,
    privilege_name: String,
    description: String,
    game_code: String,
    max_activations: u32,
    activation_count: u32,
    owner_mac: Option<String>,
    activated_at: Option<String>,
}

impl KeyRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key_code: row.get(0)?,
            environment: row.get(1)?,
            privilege_list: row.get(2)?,
            privilege_name: row.get(3)?,
            description: row.get(4)?,
            game_code: row.get(5)?,
            max_activations: row.get(6)?,
            activation_count: row.get(7)?,
            owner_mac: row.get(8)?,
            activated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> StoreResult<ActivationRecord> {
        let key_code = KeyCode::parse(&self.key_code)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(ActivationRecord {
            key_code,
            environment: parse_environment(&self.environment)?,
            privilege_list: self.privilege_list,
            privilege_name: self.privilege_name,
            description: self.description,
            game_code: self.game_code,
            max_activations: self.max_activations,
            activation_count: self.activation_count,
            owner_mac: self.owner_mac,
            activated_at: self.activated_at.as_deref().map(timestamp).transpose()?,
        })
    }
}

fn select_key(
    conn: &Connection,
    code: &KeyCode,
    env: Environment,
) -> StoreResult<Option<ActivationRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {KEY_COLUMNS} FROM unique_keys WHERE key_code = ?1 AND environment = ?2"),
            params![code.as_str(), env.as_str()],
            KeyRow::read,
        )
        .optional()?;
    row.map(KeyRow::into_record).transpose()
}

// ── ActivationStore ──────────────────────────────────────────────

impl ActivationStore for SqliteStore {
    fn insert_key(&self, record: ActivationRecord) -> KeyResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO unique_keys ({KEY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                record.key_code.as_str(),
                record.environment.as_str(),
                record.privilege_list,
                record.privilege_name,
                record.description,
                record.game_code,
                record.max_activations,
                record.activation_count,
                record.owner_mac,
                record.activated_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| insert_error(e, record.key_code.as_str()))?;
        Ok(())
    }

    fn find_key(&self, code: &KeyCode, env: Environment) -> KeyResult<Option<ActivationRecord>> {
        let conn = self.conn()?;
        Ok(select_key(&conn, code, env)?)
    }

    fn update_key(
        &self,
        code: &KeyCode,
        env: Environment,
        mutate: &mut dyn FnMut(&mut ActivationRecord) -> KeyResult<()>,
    ) -> KeyResult<ActivationRecord> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let current = select_key(&tx, code, env)?.ok_or(KeyError::KeyNotFound)?;
        let mut next = current.clone();
        mutate(&mut next)?;

        // Compare-and-set on the counter read above.
        let changed = tx
            .execute(
                "UPDATE unique_keys
                 SET activation_count = ?1, owner_mac = ?2, activated_at = ?3
                 WHERE key_code = ?4 AND environment = ?5 AND activation_count = ?6",
                params![
                    next.activation_count,
                    next.owner_mac,
                    next.activated_at.map(|t| t.to_rfc3339()),
                    code.as_str(),
                    env.as_str(),
                    current.activation_count,
                ],
            )
            .map_err(StoreError::from)?;
        if changed != 1 {
            return Err(KeyError::Store("key changed during update".to_string()));
        }

        tx.commit().map_err(StoreError::from)?;
        Ok(next)
    }
}

// ── TrackingStore ────────────────────────────────────────────────

impl TrackingStore for SqliteStore {
    fn insert_product(&self, product: Product) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO products (product_handle, name, code, password, token, environment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.product_handle.as_str(),
                product.name,
                product.code,
                product.password,
                product.token.as_str(),
                product.environment.as_str(),
            ],
        )
        .map_err(|e| insert_error(e, product.product_handle.as_str()))?;
        Ok(())
    }

    fn find_product(
        &self,
        code: &str,
        password: &str,
        env: Environment,
    ) -> StoreResult<Option<Product>> {
        let conn = self.conn()?;
        query_product(
            &conn,
            "WHERE code = ?1 AND password = ?2 AND environment = ?3",
            params![code, password, env.as_str()],
        )
    }

    fn find_product_by_handle(&self, handle: &Handle) -> StoreResult<Option<Product>> {
        let conn = self.conn()?;
        query_product(&conn, "WHERE product_handle = ?1", params![handle.as_str()])
    }

    fn find_user(&self, handle: &Handle) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        select_user(&conn, handle)
    }

    fn find_or_create_user(&self, user: User) -> StoreResult<(User, bool)> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (user_handle, mac_address, shard_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.user_handle.as_str(),
                user.mac_address,
                user.shard_id,
                user.created_at.to_rfc3339(),
            ],
        )?;
        if inserted == 1 {
            return Ok((user, true));
        }
        let existing = select_user(&conn, &user.user_handle)?.ok_or_else(|| {
            StoreError::InvalidData(format!("user {} vanished", user.user_handle))
        })?;
        Ok((existing, false))
    }

    fn insert_session(&self, session: Session) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions
             (session_handle, user_mac, user_handle, ipv4, product_handle, environment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.session_handle.as_str(),
                session.user_mac,
                session.user_handle.as_str(),
                session.ipv4,
                session.product_handle.as_str(),
                session.environment.as_str(),
                session.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, session.session_handle.as_str()))?;
        Ok(())
    }

    fn find_session(&self, handle: &Handle) -> StoreResult<Option<Session>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT session_handle, user_mac, user_handle, ipv4, product_handle, environment, created_at
                 FROM sessions WHERE session_handle = ?1",
                params![handle.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(sh, mac, uh, ipv4, ph, env, created)| -> StoreResult<Session> {
            Ok(Session {
                session_handle: parse_handle(&sh)?,
                user_mac: mac,
                user_handle: parse_handle(&uh)?,
                ipv4,
                product_handle: parse_handle(&ph)?,
                environment: parse_environment(&env)?,
                created_at: timestamp(&created)?,
            })
        })
        .transpose()
    }

    fn insert_tag(&self, tag: Tag) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags
             (name, attributes, delta, sequence, session_handle, product_handle, environment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tag.name,
                tag.attributes,
                tag.delta,
                tag.sequence,
                tag.session_handle.as_str(),
                tag.product_handle.as_str(),
                tag.environment.as_str(),
                tag.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_tags(&self, session: &Handle) -> StoreResult<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, attributes, delta, sequence, session_handle, product_handle, environment, created_at
             FROM tags WHERE session_handle = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut tags = Vec::new();
        for row in rows {
            let (name, attributes, delta, sequence, sh, ph, env, created) = row?;
            tags.push(Tag {
                name,
                attributes,
                delta,
                sequence,
                session_handle: parse_handle(&sh)?,
                product_handle: parse_handle(&ph)?,
                environment: parse_environment(&env)?,
                created_at: timestamp(&created)?,
            });
        }
        Ok(tags)
    }
}

fn query_product(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::ToSql],
) -> StoreResult<Option<Product>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT product_handle, name, code, password, token, environment FROM products {filter}"
            ),
            params,
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    row.map(|(ph, name, code, password, token, env)| -> StoreResult<Product> {
        Ok(Product {
            product_handle: parse_handle(&ph)?,
            name,
            code,
            password,
            token: parse_handle(&token)?,
            environment: parse_environment(&env)?,
        })
    })
    .transpose()
}

fn select_user(conn: &Connection, user: &Handle) -> StoreResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT user_handle, mac_address, shard_id, created_at FROM users WHERE user_handle = ?1",
            params![user.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(uh, mac, shard, created)| -> StoreResult<User> {
        Ok(User {
            user_handle: parse_handle(&uh)?,
            mac_address: mac,
            shard_id: shard,
            created_at: timestamp(&created)?,
        })
    })
    .transpose()
}
