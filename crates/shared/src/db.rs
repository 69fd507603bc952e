//! Store handle - connection, schema migration, and provisioning seed.
//!
//! The schema and seed run as an explicit provisioning step, not at every
//! process start; both are idempotent.

use std::fs;
use std::path::PathBuf;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::Role;
use crate::auth::hash_password;
use crate::ids::new_entity_id;
use crate::types::HealthResult;

/// Location of the SQLite store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/trackmyhealth.db"),
        }
    }
}

/// Bootstrap admin credentials created by [`Db::seed`].
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT
);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    gender TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS hospitals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL
);

-- hospital_id also carries the EXTERNAL sentinel, so it has no FK
CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    hospital_id TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL,
    external_hospital_info TEXT
);

CREATE TABLE IF NOT EXISTS health_records (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    recorded_at TEXT NOT NULL,
    record_type TEXT NOT NULL,
    value TEXT NOT NULL,
    notes TEXT
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_hospital ON appointments(hospital_id);
CREATE INDEX IF NOT EXISTS idx_health_records_patient
    ON health_records(patient_id, recorded_at);
";

/// Handle over the single relational store.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open the store at the configured path, creating parent directories
    /// as needed, with foreign key enforcement on.
    pub fn open(config: &StoreConfig) -> HealthResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by the test suites.
    pub fn open_in_memory() -> HealthResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Create the schema. Idempotent.
    pub fn migrate(&self) -> HealthResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Provision the bootstrap admin account. Idempotent.
    pub fn seed(&self) -> HealthResult<()> {
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![BOOTSTRAP_ADMIN_USERNAME],
            |row| row.get(0),
        )?;
        if existing == 0 {
            self.conn.execute(
                "INSERT INTO users (id, username, password_hash, role, name, email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new_entity_id("USR_ADM"),
                    BOOTSTRAP_ADMIN_USERNAME,
                    hash_password(BOOTSTRAP_ADMIN_PASSWORD),
                    Role::Admin.as_str(),
                    "Administrator",
                    Option::<String>::None,
                ],
            )?;
            info!(
                username = BOOTSTRAP_ADMIN_USERNAME,
                "seeded bootstrap admin account"
            );
        }
        Ok(())
    }
}
