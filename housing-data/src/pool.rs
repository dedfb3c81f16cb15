//! Pooled SQLite connections.
//!
//! Repository calls borrow one connection for the lifetime of a single
//! transaction and return it to the pool when the guard drops.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use r2d2_sqlite::SqliteConnectionManager;

use crate::RepositoryError;

/// A borrowed connection; returned to the pool on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Sizing and timeouts for a [`ConnectionPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Upper bound on open connections.
    pub max_size: u32,
    /// How long a checkout waits for a free connection.
    pub connection_timeout: Duration,
    /// How long SQLite retries a locked database before failing a statement.
    pub busy_timeout: Duration,
}

impl PoolConfig {
    /// Defaults for the database at `database_path`.
    #[must_use]
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_size: 8,
            connection_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Override the pool size.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Shared pool of SQLite connections with foreign keys enforced.
///
/// Cloning is cheap; clones share the same connections.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    path: PathBuf,
    inner: r2d2::Pool<SqliteConnectionManager>,
}

impl ConnectionPool {
    /// Open a pool over the database described by `config`.
    ///
    /// The database file is created when missing. Every connection enables
    /// `foreign_keys` so deleting a lot cascades to its rooms and living
    /// places.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Connection`] when the initial connections
    /// cannot be opened.
    pub fn open(config: &PoolConfig) -> Result<Self, RepositoryError> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.database_path).with_init(
            move |connection| {
                connection.pragma_update(None, "foreign_keys", true)?;
                connection.busy_timeout(busy_timeout)
            },
        );
        Self::build(&config.database_path, manager, config)
    }

    /// A single-connection pool over a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Connection`] when SQLite cannot allocate
    /// the database.
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|connection| connection.pragma_update(None, "foreign_keys", true));
        let config = PoolConfig::new(":memory:").with_max_size(1);
        Self::build(Path::new(":memory:"), manager, &config)
    }

    fn build(
        path: &Path,
        manager: SqliteConnectionManager,
        config: &PoolConfig,
    ) -> Result<Self, RepositoryError> {
        let mut builder = r2d2::Pool::builder()
            .max_size(config.max_size.max(1))
            .connection_timeout(config.connection_timeout);
        if path == Path::new(":memory:") {
            // Recycling the only connection would discard the database.
            builder = builder.max_lifetime(None).idle_timeout(None);
        }
        let inner = builder
            .build(manager)
            .map_err(|source| RepositoryError::Connection {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!(
            "opened SQLite pool at {} with up to {} connections",
            path.display(),
            inner.max_size()
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Borrow a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Connection`] when no connection frees up
    /// before the checkout timeout.
    pub fn get(&self) -> Result<PooledConnection, RepositoryError> {
        self.inner
            .get()
            .map_err(|source| RepositoryError::Connection {
                path: self.path.clone(),
                source,
            })
    }

    /// Database the pool targets.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
