// Key-value persistence for the board document and theme

use crate::models::{Document, Theme};
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key holding the serialized document
pub const STATE_KEY: &str = "taskboard.state";

/// Key holding the theme name as a bare string
pub const THEME_KEY: &str = "taskboard.theme";

/// Name of the board directory created under the chosen path
pub const BOARD_DIR: &str = ".taskboard";

/// Durable string-to-string storage
pub trait KvBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value entirely
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Serialize the document and write it under [`STATE_KEY`]
pub fn save(backend: &mut dyn KvBackend, document: &Document) -> Result<()> {
    let json = serde_json::to_string(document).context("Failed to serialize document")?;
    backend.set(STATE_KEY, &json)?;
    debug!(tasks = document.tasks.len(), bytes = json.len(), "Saved document");
    Ok(())
}

/// Read the persisted document
///
/// Any access or parse failure is logged and reported as `None`, so callers
/// fall back to the seed document.
pub fn load(backend: &dyn KvBackend) -> Option<Document> {
    let json = match backend.get(STATE_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = ?e, "Failed to read persisted document, ignoring");
            return None;
        }
    };

    match serde_json::from_str::<Document>(&json) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!(error = ?e, "Failed to parse persisted document, ignoring");
            None
        }
    }
}

/// Read the persisted theme; missing or unknown values give the default
pub fn load_theme(backend: &dyn KvBackend) -> Theme {
    match backend.get(THEME_KEY) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
            warn!(error = ?e, "Ignoring unknown persisted theme");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            warn!(error = ?e, "Failed to read persisted theme, using default");
            Theme::default()
        }
    }
}

pub fn save_theme(backend: &mut dyn KvBackend, theme: Theme) -> Result<()> {
    backend.set(THEME_KEY, theme.as_str())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Volatile backend, mainly for tests and throwaway boards
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Durable backend: one `kv` table in `<path>/.taskboard/taskboard.db`
pub struct SqliteKv {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteKv {
    /// Open or create the board database under the given path
    ///
    /// The database lives in a `.taskboard` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(BOARD_DIR);

        fs::create_dir_all(&base_path).context("Failed to create board directory")?;

        let db_path = base_path.join("taskboard.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let kv = Self { base_path, db };
        kv.create_schema()?;
        kv.create_gitignore()?;

        debug!(path = ?kv.base_path, "Opened board database");
        Ok(kv)
    }

    /// Get the board directory of this backend
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "taskboard.db\ntaskboard.db-shm\ntaskboard.db-wal\nlock\n")?;
        }
        Ok(())
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read key from board database")?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .context("Failed to write key to board database")?;
        Ok(())
    }
}

// ============================================================================
// Process lock
// ============================================================================

/// Exclusive lock on a board directory, held until dropped
pub struct BoardLock {
    _file: File,
}

impl BoardLock {
    /// Take the lock, failing immediately if another process holds it
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(BOARD_DIR);
        fs::create_dir_all(&base_path).context("Failed to create board directory")?;

        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(base_path.join("lock"))
            .context("Failed to open board lock file")?;

        file.try_lock_exclusive()
            .map_err(|_| eyre!("Board at {} is in use by another process", base_path.display()))?;

        // Lock is released when the file is dropped
        Ok(Self { _file: file })
    }
}
