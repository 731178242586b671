use crate::model::StorageError;
use crate::telemetry::TelemetryConfig;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

const KEY_API_KEY: &str = "gemini_api_key";
const KEY_TELEMETRY_SECRET: &str = "langfuse_secret_key";
const KEY_TELEMETRY_PUBLIC: &str = "langfuse_public_key";
const KEY_TELEMETRY_HOST: &str = "langfuse_host";

/// User credentials, read once per session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub telemetry: TelemetryConfig,
}

/// Durable key-value store for [`Settings`].
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    /// Opens the database and creates the settings table if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// When the settings were last saved, if ever.
    pub fn last_saved(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT MAX(updated_at) FROM settings", [], |row| row.get(0))?;
        Ok(value)
    }

    /// Reads every setting; missing keys come back as empty strings.
    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let read = |key: &str| -> Result<String, StorageError> {
            Ok(self.get(key)?.unwrap_or_default())
        };
        Ok(Settings {
            api_key: read(KEY_API_KEY)?,
            telemetry: TelemetryConfig {
                secret_key: read(KEY_TELEMETRY_SECRET)?,
                public_key: read(KEY_TELEMETRY_PUBLIC)?,
                host: read(KEY_TELEMETRY_HOST)?,
            },
        })
    }

    /// Saves all settings at once. The API key is mandatory; telemetry fields
    /// may be blank.
    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let api_key = settings.api_key.trim();
        if api_key.is_empty() {
            return Err(StorageError::MissingApiKey);
        }

        let now = Utc::now();
        let tx = self.conn.transaction()?;
        for (key, value) in [
            (KEY_API_KEY, api_key),
            (KEY_TELEMETRY_SECRET, settings.telemetry.secret_key.trim()),
            (KEY_TELEMETRY_PUBLIC, settings.telemetry.public_key.trim()),
            (KEY_TELEMETRY_HOST, settings.telemetry.host.trim()),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )?;
        }
        tx.commit()?;

        info!(
            "Settings saved (telemetry {})",
            if settings.telemetry.is_complete() { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}
