//! Behaviour-driven step definitions driving the listing command scenarios.

use super::helpers::{Workspace, invoke};
use super::*;
use housing_core::{Lot, Pagination};
use housing_data::test_support::sample_lot;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Command scenario state shared across steps.
struct CommandWorld {
    workspace: Workspace,
    lot_file: RefCell<Option<Utf8PathBuf>>,
    created: RefCell<Option<Lot>>,
    outcome: RefCell<Option<Result<String, CliError>>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            lot_file: RefCell::new(None),
            created: RefCell::new(None),
            outcome: RefCell::new(None),
        }
    }

    fn database(&self) -> Utf8PathBuf {
        self.workspace.database()
    }

    fn created(&self) -> Lot {
        self.created.borrow().clone().expect("a listing was created")
    }

    fn search_output(&self) -> Pagination<Lot> {
        let borrowed = self.outcome.borrow();
        let output = borrowed
            .as_ref()
            .expect("command ran")
            .as_ref()
            .expect("expected success");
        serde_json::from_str(output).expect("search prints a page")
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("an initialised listing database")]
fn initialised_database(#[from(world)] world: &CommandWorld) {
    let database = world.database();
    invoke(&["init", "--database", database.as_str()]).expect("init should succeed");
}

#[given("a listing file for a flat in Moscow")]
fn moscow_flat_file(#[from(world)] world: &CommandWorld) {
    world
        .lot_file
        .replace(Some(world.workspace.write_moscow_lot()));
}

#[given("a listing file for a template in Moscow")]
fn moscow_template_file(#[from(world)] world: &CommandWorld) {
    let path = world
        .workspace
        .write_lot("template.json", &sample_lot(37.6, 55.7, &[18]));
    world.lot_file.replace(Some(path));
}

#[when("I run the create command")]
fn run_create(#[from(world)] world: &CommandWorld) {
    let database = world.database();
    let lot_file = world.lot_file.borrow().clone().expect("listing file written");
    let output = invoke(&["create", lot_file.as_str(), "--database", database.as_str()])
        .expect("create should succeed");
    let created: Lot = serde_json::from_str(&output).expect("create prints the stored lot");
    world.created.replace(Some(created));
}

#[when("I run the create command without a listing file")]
fn run_create_without_file(#[from(world)] world: &CommandWorld) {
    let database = world.database();
    let outcome = invoke(&["create", "--database", database.as_str()]);
    world.outcome.replace(Some(outcome));
}

#[when("I publish the created template at a price of 120000")]
fn publish_template(#[from(world)] world: &CommandWorld) {
    let database = world.database();
    let request = world.workspace.path("publish.json");
    let payload = serde_json::json!({
        "lot_id": world.created().id,
        "fields": { "price": 120_000 },
    });
    super::helpers::write_utf8(&request, payload.to_string().as_bytes());
    invoke(&["publish", request.as_str(), "--database", database.as_str()])
        .expect("publish should succeed");
}

#[when("I search published listings within 2000 metres of the flat")]
fn search_nearby(#[from(world)] world: &CommandWorld) {
    let database = world.database();
    let outcome = invoke(&[
        "search",
        "--longitude",
        "37.601",
        "--latitude",
        "55.701",
        "--radius",
        "2000",
        "--database",
        database.as_str(),
    ]);
    world.outcome.replace(Some(outcome));
}

#[then("the search output lists the created flat")]
fn lists_created(#[from(world)] world: &CommandWorld) {
    let page = world.search_output();
    let ids: Vec<_> = page.data.iter().map(|lot| lot.id).collect();
    assert_eq!(ids, vec![world.created().id]);
}

#[then("the search output lists the created flat at a price of 120000")]
fn lists_published(#[from(world)] world: &CommandWorld) {
    let page = world.search_output();
    let lot = page.data.first().expect("published lot listed");
    assert_eq!(lot.id, world.created().id);
    assert_eq!(lot.price, 120_000);
    assert!(!lot.is_constructor);
}

#[then("the CLI reports that the \"lot\" argument is missing")]
fn reports_missing_lot(#[from(world)] world: &CommandWorld) {
    let borrowed = world.outcome.borrow();
    let error = borrowed
        .as_ref()
        .expect("command ran")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_LOT),
        other => panic!("unexpected error {other:?}"),
    }
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/listing_commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(radius_search, "finding a created listing by radius");
register_command_scenario!(publishing_template, "publishing a template");
register_command_scenario!(
    missing_listing_file,
    "rejecting a create command without a listing file"
);
