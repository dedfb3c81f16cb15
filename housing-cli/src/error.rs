//! Error types emitted by the housing CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use housing_core::ValidationError;
use housing_data::RepositoryError;
use thiserror::Error;

/// Errors emitted by the housing CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Name of the missing option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// The storage level lies outside the S2 hierarchy.
    #[error("storage level {level} exceeds the finest S2 level {max}")]
    InvalidStorageLevel {
        /// Requested level.
        level: u8,
        /// Finest supported level.
        max: u8,
    },
    /// The pool must hold at least one connection.
    #[error("pool size must be positive")]
    InvalidPoolSize,
    /// Search or update input was rejected before reaching storage.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
    /// The repository call failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Opening a JSON input file failed.
    #[error("failed to open {path:?}: {source}")]
    OpenInput {
        /// File that could not be opened.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// A JSON input file could not be decoded.
    #[error("failed to parse JSON at {path:?}: {source}")]
    ParseInput {
        /// File that failed to decode.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
