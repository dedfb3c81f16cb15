//! Focused unit tests covering CLI configuration resolution.

use super::*;
use crate::{
    lot::{CreateConfig, ShowConfig},
    search::{SearchConfig, search_config_from_layers},
    store::{DEFAULT_DATABASE, DEFAULT_POOL_SIZE},
};
use housing_core::{
    SearchArea, ValidationError,
    query::{CompareOp, Filter, FlatSearch, LotColumn, OrderBy, SortDirection},
};
use rstest::rstest;

#[rstest]
fn store_defaults_fill_unset_options() {
    let config = StoreConfig::resolve(None, None, None).expect("defaults resolve");
    assert_eq!(config.database, Utf8PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.storage_level, 13);
    assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
}

#[rstest]
fn store_rejects_levels_beyond_the_hierarchy() {
    let err = StoreConfig::resolve(None, Some(31), None).expect_err("level 31 is invalid");
    match err {
        CliError::InvalidStorageLevel { level, max } => {
            assert_eq!(level, 31);
            assert_eq!(max, 30);
        }
        other => panic!("expected InvalidStorageLevel, found {other:?}"),
    }
}

#[rstest]
fn store_rejects_an_empty_pool() {
    let err = StoreConfig::resolve(None, None, Some(0)).expect_err("empty pool is invalid");
    assert!(matches!(err, CliError::InvalidPoolSize), "found {err:?}");
}

#[rstest]
fn create_without_lot_file_errors() {
    let err = CreateConfig::try_from(CreateArgs::default()).expect_err("lot path is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_LOT);
            assert_eq!(env, ENV_LOT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn show_defaults_to_visitor_lookup_of_advertisements() {
    let args = ShowArgs {
        id: Some(7),
        ..ShowArgs::default()
    };
    let config = ShowConfig::try_from(args).expect("config should build");
    assert_eq!(config.id, 7);
    assert!(!config.is_constructor);
    assert!(!config.is_owner);
}

#[rstest]
fn search_args_build_the_listing_query() {
    let args = SearchArgs {
        limit: Some(3),
        page: Some(2),
        filters: vec!["area:>=:15".into(), "repair:=:2".into()],
        order_by: Some("area:asc".into()),
        longitude: Some(37.6),
        latitude: Some(55.7),
        radius: Some(2_000.0),
        owner: Some(true),
        ..SearchArgs::default()
    };
    let config = SearchConfig::try_from(args).expect("config should build");

    let expected = FlatSearch::new(3, 2)
        .constructor(false)
        .owner(true)
        .filter(Filter::new(LotColumn::Area, CompareOp::Ge, 15).expect("area filter"))
        .filter(Filter::new(LotColumn::Repair, CompareOp::Eq, 2).expect("repair filter"))
        .order_by(OrderBy::new(LotColumn::Area, SortDirection::Asc))
        .within(SearchArea::new(37.6, 55.7, 2_000.0));
    assert_eq!(config.search, expected);
    assert_eq!(config.timeout, None);
}

#[rstest]
#[case::unknown_column("floor_area:>=:15")]
#[case::unknown_operator("area:~:15")]
#[case::malformed("area>=15")]
#[case::mistyped_value("area:>=:large")]
fn search_rejects_bad_filters(#[case] expression: &str) {
    let args = SearchArgs {
        filters: vec![expression.into()],
        ..SearchArgs::default()
    };
    let err = SearchConfig::try_from(args).expect_err("filter should be rejected");
    assert!(matches!(err, CliError::InvalidInput(_)), "found {err:?}");
}

#[rstest]
fn search_rejects_a_centre_off_the_globe() {
    let args = SearchArgs {
        latitude: Some(95.0),
        radius: Some(1_000.0),
        ..SearchArgs::default()
    };
    let err = SearchConfig::try_from(args).expect_err("latitude 95 is invalid");
    assert!(
        matches!(
            err,
            CliError::InvalidInput(ValidationError::InvalidCoordinates { .. })
        ),
        "found {err:?}"
    );
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "limit": "many" }));

    let err = search_config_from_layers(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "database": "from-file.db",
            "limit": 5,
            "storage_level": 12,
        }),
        None,
    );
    composer.push_environment(json!({
        "database": "from-env.db",
        "page": 2,
    }));
    composer.push_cli(json!({ "limit": 7 }));

    let config = search_config_from_layers(composer.layers()).expect("merged config");
    assert_eq!(config.store.database, Utf8PathBuf::from("from-env.db"));
    assert_eq!(config.store.storage_level, 12);
    assert_eq!(config.search.limit, 7);
    assert_eq!(config.search.page, 2);
}
