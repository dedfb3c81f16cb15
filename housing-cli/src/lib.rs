//! Command-line interface for the housing listing store.
//!
//! Every subcommand layers its options from CLI flags, `HOUSING_*`
//! environment variables and configuration files through `ortho_config`,
//! then resolves them into a validated configuration before touching the
//! database.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

mod error;
mod json;
mod lot;
mod search;
mod store;

pub use error::CliError;

use lot::{CreateArgs, DeleteArgs, PublishArgs, ShowArgs, UpdateArgs};
use search::SearchArgs;
use store::StoreConfig;

const ARG_LOT: &str = "lot";
const ARG_ID: &str = "id";
const ARG_FIELDS: &str = "fields";
const ARG_REQUEST: &str = "request";
const ENV_LOT: &str = "HOUSING_CMDS_CREATE_LOT";
const ENV_SHOW_ID: &str = "HOUSING_CMDS_SHOW_ID";
const ENV_UPDATE_ID: &str = "HOUSING_CMDS_UPDATE_ID";
const ENV_UPDATE_FIELDS: &str = "HOUSING_CMDS_UPDATE_FIELDS";
const ENV_REQUEST: &str = "HOUSING_CMDS_PUBLISH_REQUEST";
const ENV_DELETE_ID: &str = "HOUSING_CMDS_DELETE_ID";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Run the housing CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, when
/// the store rejects the operation, or when output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &mut stdout)
}

fn run_command(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Init(args) => run_init(args, writer),
        Command::Create(args) => lot::run_create(args, writer),
        Command::Search(args) => search::run_search(args, writer),
        Command::Show(args) => lot::run_show(args, writer),
        Command::Update(args) => lot::run_update(args, writer),
        Command::Publish(args) => lot::run_publish(args, writer),
        Command::Delete(args) => lot::run_delete(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "housing",
    about = "Manage housing listings stored in SQLite",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the listing schema.
    Init(InitArgs),
    /// Store a listing read from JSON.
    Create(CreateArgs),
    /// Search listings.
    Search(SearchArgs),
    /// Print one listing.
    Show(ShowArgs),
    /// Update listing columns.
    Update(UpdateArgs),
    /// Publish a template as an advertisement.
    Publish(PublishArgs),
    /// Delete a listing.
    Delete(DeleteArgs),
}

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create the listing tables in the configured database. \
                 Running it against an initialised database is a no-op.",
    about = "Create the listing schema"
)]
#[ortho_config(prefix = "HOUSING")]
struct InitArgs {
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pool_size: Option<u32>,
}

impl InitArgs {
    fn into_config(self) -> Result<StoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        StoreConfig::resolve(merged.database, merged.storage_level, merged.pool_size)
    }
}

fn run_init(args: InitArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.open()?;
    writeln!(writer, "initialised {}", config.database).map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
