//! Single-listing commands: create, show, update, publish and delete.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use housing_core::{
    CallContext, Lot, RecordId,
    query::{FieldMap, LotColumn},
};
use housing_data::PublishRequest;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_FIELDS, ARG_ID, ARG_LOT, ARG_REQUEST, CliError, ENV_DELETE_ID, ENV_LOT, ENV_REQUEST,
    ENV_SHOW_ID, ENV_UPDATE_FIELDS, ENV_UPDATE_ID,
    json::{read_json, write_json},
    store::StoreConfig,
};

/// CLI arguments for the `create` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Store a listing read from a JSON file. Identifiers, the grid \
                 cell and timestamps are assigned by the store; the stored \
                 listing is printed as JSON.",
    about = "Create a listing"
)]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct CreateArgs {
    /// JSON file holding the listing with its rooms and living places.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) lot: Option<Utf8PathBuf>,
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) pool_size: Option<u32>,
}

/// Resolved `create` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateConfig {
    pub(crate) store: StoreConfig,
    pub(crate) lot: Utf8PathBuf,
}

impl TryFrom<CreateArgs> for CreateConfig {
    type Error = CliError;

    fn try_from(args: CreateArgs) -> Result<Self, Self::Error> {
        let lot = args.lot.ok_or(CliError::MissingArgument {
            field: ARG_LOT,
            env: ENV_LOT,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?,
            lot,
        })
    }
}

pub(crate) fn run_create(args: CreateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CreateConfig::try_from(merged)?;
    let lot: Lot = read_json(&config.lot)?;
    let created = config
        .store
        .open()?
        .create(&CallContext::background(), &lot)?;
    log::info!("created lot {}", created.id);
    write_json(writer, &created)
}

/// CLI arguments for the `show` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Print one listing with its rooms and living places")]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct ShowArgs {
    /// Listing identifier.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<RecordId>,
    /// Look the identifier up among templates.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) template: Option<bool>,
    /// Include hidden listings and rooms.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) owner: Option<bool>,
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) pool_size: Option<u32>,
}

/// Resolved `show` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShowConfig {
    pub(crate) store: StoreConfig,
    pub(crate) id: RecordId,
    pub(crate) is_constructor: bool,
    pub(crate) is_owner: bool,
}

impl TryFrom<ShowArgs> for ShowConfig {
    type Error = CliError;

    fn try_from(args: ShowArgs) -> Result<Self, Self::Error> {
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ID,
            env: ENV_SHOW_ID,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?,
            id,
            is_constructor: args.template.unwrap_or(false),
            is_owner: args.owner.unwrap_or(false),
        })
    }
}

pub(crate) fn run_show(args: ShowArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ShowConfig::try_from(merged)?;
    let lot = config.store.open()?.get_flat_ad(
        &CallContext::background(),
        config.id,
        config.is_constructor,
        config.is_owner,
    )?;
    write_json(writer, &lot)
}

/// CLI arguments for the `update` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Apply a partial update read from a JSON object mapping \
                 column names to values. An empty object leaves the listing \
                 untouched.",
    about = "Update listing columns"
)]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct UpdateArgs {
    /// Listing identifier.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<RecordId>,
    /// JSON file holding the column assignments.
    #[arg(long = ARG_FIELDS, value_name = "path")]
    #[serde(default)]
    pub(crate) fields: Option<Utf8PathBuf>,
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) pool_size: Option<u32>,
}

/// Resolved `update` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateConfig {
    pub(crate) store: StoreConfig,
    pub(crate) id: RecordId,
    pub(crate) fields: Utf8PathBuf,
}

impl TryFrom<UpdateArgs> for UpdateConfig {
    type Error = CliError;

    fn try_from(args: UpdateArgs) -> Result<Self, Self::Error> {
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ID,
            env: ENV_UPDATE_ID,
        })?;
        let fields = args.fields.ok_or(CliError::MissingArgument {
            field: ARG_FIELDS,
            env: ENV_UPDATE_FIELDS,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?,
            id,
            fields,
        })
    }
}

pub(crate) fn run_update(args: UpdateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = UpdateConfig::try_from(merged)?;
    let fields: FieldMap<LotColumn> = read_json(&config.fields)?;
    config
        .store
        .open()?
        .update_flat(&CallContext::background(), config.id, &fields)?;
    writeln!(writer, "updated lot {} ({} columns)", config.id, fields.len())
        .map_err(CliError::WriteOutput)
}

/// CLI arguments for the `publish` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Turn a template into a published advertisement. The JSON \
                 request names the lot, the lot columns to assign and any \
                 room updates; everything is applied in one transaction.",
    about = "Publish a template"
)]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct PublishArgs {
    /// JSON file holding the publish request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request: Option<Utf8PathBuf>,
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) pool_size: Option<u32>,
}

/// Resolved `publish` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublishConfig {
    pub(crate) store: StoreConfig,
    pub(crate) request: Utf8PathBuf,
}

impl TryFrom<PublishArgs> for PublishConfig {
    type Error = CliError;

    fn try_from(args: PublishArgs) -> Result<Self, Self::Error> {
        let request = args.request.ok_or(CliError::MissingArgument {
            field: ARG_REQUEST,
            env: ENV_REQUEST,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?,
            request,
        })
    }
}

pub(crate) fn run_publish(args: PublishArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = PublishConfig::try_from(merged)?;
    let request: PublishRequest = read_json(&config.request)?;
    config
        .store
        .open()?
        .create_ad(&CallContext::background(), &request)?;
    writeln!(writer, "published lot {}", request.lot_id).map_err(CliError::WriteOutput)
}

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Delete a listing with its rooms and living places")]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct DeleteArgs {
    /// Listing identifier.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<RecordId>,
    /// SQLite database file.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// S2 level at which lot cells are stored.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) storage_level: Option<u8>,
    /// Maximum number of pooled connections.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) pool_size: Option<u32>,
}

/// Resolved `delete` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeleteConfig {
    pub(crate) store: StoreConfig,
    pub(crate) id: RecordId,
}

impl TryFrom<DeleteArgs> for DeleteConfig {
    type Error = CliError;

    fn try_from(args: DeleteArgs) -> Result<Self, Self::Error> {
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ID,
            env: ENV_DELETE_ID,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?,
            id,
        })
    }
}

pub(crate) fn run_delete(args: DeleteArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = DeleteConfig::try_from(merged)?;
    config
        .store
        .open()?
        .delete_lot(&CallContext::background(), config.id)?;
    writeln!(writer, "deleted lot {}", config.id).map_err(CliError::WriteOutput)
}
