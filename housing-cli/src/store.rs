//! Store settings shared by every subcommand.

use camino::Utf8PathBuf;
use housing_core::{SpatialConfig, spatial::MAX_LEVEL};
use housing_data::{ConnectionPool, LotRepository, PoolConfig, RepositoryConfig};

use crate::CliError;

pub(crate) const DEFAULT_DATABASE: &str = "housing.db";
pub(crate) const DEFAULT_POOL_SIZE: u32 = 4;

/// Resolved database settings.
///
/// The storage level must stay the same for the lifetime of a database:
/// stored cells are only matched by coverings at the same level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) storage_level: u8,
    pub(crate) pool_size: u32,
}

impl StoreConfig {
    /// Fill unset options with defaults and validate the result.
    pub(crate) fn resolve(
        database: Option<Utf8PathBuf>,
        storage_level: Option<u8>,
        pool_size: Option<u32>,
    ) -> Result<Self, CliError> {
        let level = storage_level.unwrap_or_else(|| SpatialConfig::default().storage_level);
        if level > MAX_LEVEL {
            return Err(CliError::InvalidStorageLevel {
                level,
                max: MAX_LEVEL,
            });
        }
        let size = pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        if size == 0 {
            return Err(CliError::InvalidPoolSize);
        }
        Ok(Self {
            database: database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            storage_level: level,
            pool_size: size,
        })
    }

    /// Open the repository and make sure the schema exists.
    pub(crate) fn open(&self) -> Result<LotRepository, CliError> {
        let pool_config =
            PoolConfig::new(self.database.as_std_path()).with_max_size(self.pool_size);
        let repository = LotRepository::new(
            ConnectionPool::open(&pool_config)?,
            RepositoryConfig {
                spatial: SpatialConfig::with_storage_level(self.storage_level),
            },
        );
        repository.initialise()?;
        log::debug!(
            "opened listing store {} at storage level {}",
            self.database,
            self.storage_level
        );
        Ok(repository)
    }
}
