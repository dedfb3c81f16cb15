//! Search command implementation.

use std::{io::Write, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use housing_core::{
    CallContext, SearchArea,
    query::{Filter, FlatSearch, OrderBy},
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    CliError, DEFAULT_PAGE_SIZE,
    json::write_json,
    store::StoreConfig,
};

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Search listings page by page. Filters take the form \
                 column:operator:value (for example area:>=:15); the radius \
                 options restrict results to a disc around a point.",
    about = "Search listings"
)]
#[ortho_config(prefix = "HOUSING")]
pub(crate) struct SearchArgs {
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
    /// Page size.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<u32>,
    /// One-based page number.
    #[arg(long, value_name = "number")]
    #[serde(default)]
    pub(crate) page: Option<u32>,
    /// Filter expression; repeat for several filters.
    #[arg(long = "filter", value_name = "column:op:value")]
    #[serde(default)]
    pub(crate) filters: Vec<String>,
    /// Sort column, optionally followed by `:asc` or `:desc`.
    #[arg(long, value_name = "column[:direction]")]
    #[serde(default)]
    pub(crate) order_by: Option<String>,
    /// Longitude of the search centre.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) longitude: Option<f64>,
    /// Latitude of the search centre.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) latitude: Option<f64>,
    /// Search radius in metres.
    #[arg(long, value_name = "metres")]
    #[serde(default)]
    pub(crate) radius: Option<f64>,
    /// Search templates instead of published advertisements.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) template: Option<bool>,
    /// Include hidden listings and rooms.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) owner: Option<bool>,
    /// Abort the search after this many milliseconds.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) timeout_ms: Option<u64>,
}

impl SearchArgs {
    pub(crate) fn into_config(self) -> Result<SearchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SearchConfig::try_from(merged)
    }
}

/// Resolved `search` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchConfig {
    pub(crate) store: StoreConfig,
    pub(crate) search: FlatSearch,
    pub(crate) timeout: Option<Duration>,
}

impl TryFrom<SearchArgs> for SearchConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let store = StoreConfig::resolve(args.database, args.storage_level, args.pool_size)?;
        let mut search = FlatSearch::new(
            args.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            args.page.unwrap_or(1),
        )
        .constructor(args.template.unwrap_or(false))
        .owner(args.owner.unwrap_or(false));

        for expression in &args.filters {
            search = search.filter(expression.parse::<Filter>()?);
        }
        if let Some(order) = args.order_by.as_deref() {
            search = search.order_by(parse_order(order)?);
        }
        if let Some(radius) = args.radius {
            search = search.within(SearchArea::new(
                args.longitude.unwrap_or_default(),
                args.latitude.unwrap_or_default(),
                radius,
            ));
        }
        search.validate()?;

        Ok(Self {
            store,
            search,
            timeout: args.timeout_ms.map(Duration::from_millis),
        })
    }
}

fn parse_order(raw: &str) -> Result<OrderBy, CliError> {
    let (column, direction) = raw.split_once(':').unwrap_or((raw, "desc"));
    Ok(OrderBy::parse(column, direction)?)
}

pub(crate) fn run_search(args: SearchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let repository = config.store.open()?;
    let ctx = config
        .timeout
        .map_or_else(CallContext::background, CallContext::with_timeout);
    let page = repository.get_flats(&ctx, &config.search)?;
    log::info!(
        "page {} of {} holds {} listings",
        page.current_page,
        page.num_pages,
        page.data.len()
    );
    write_json(writer, &page)
}

#[cfg(test)]
pub(crate) fn search_config_from_layers(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SearchConfig, CliError> {
    let merged = SearchArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SearchConfig::try_from(merged)
}
