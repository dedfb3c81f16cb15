//! Listing repository.
//!
//! Every call borrows one pooled connection, runs inside one transaction and
//! commits only when every statement succeeded. Dropping the transaction on
//! an error path rolls it back, so no call leaves a partial graph behind.
//!
//! Reads begin deferred. Writes begin immediate so the write lock is taken
//! up front: a deferred writer that has already read holds a shared lock
//! SQLite cannot upgrade while another writer waits, and the busy handler
//! does not apply to that upgrade.

use std::fmt;

use chrono::Utc;
use geo::Coord;
use housing_core::{
    CallContext, Lot, Pagination, RecordId, SpatialConfig, ValidationError,
    query::{Column, FieldMap, FieldValue, FlatSearch, ListingPredicate, LotColumn, RoomColumn},
    spatial::{cell_of, ranges_covering},
};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::{
    ConnectionPool, RepositoryError,
    aggregate::{self, PageWindow, RoomVisibility},
    error::query_failed,
    rows::{SqlParam, optional_text},
};

/// SQLite virtual machine steps between two interrupt probes.
const PROGRESS_INTERVAL: i32 = 1_000;

/// Tunables for a [`LotRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Grid used to store lot cells and to cover search discs.
    pub spatial: SpatialConfig,
}

/// Partial update of one room, applied by [`LotRepository::create_ad`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdate {
    /// Room to update.
    pub id: RecordId,
    /// Columns to assign.
    #[serde(default)]
    pub fields: FieldMap<RoomColumn>,
}

/// Promotion of a template into a published advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Lot to publish.
    pub lot_id: RecordId,
    /// Columns to assign on the lot.
    #[serde(default)]
    pub fields: FieldMap<LotColumn>,
    /// Room updates applied in the same transaction.
    #[serde(default)]
    pub rooms: Vec<RoomUpdate>,
}

/// Persistence entry point for listings.
///
/// # Examples
/// ```
/// use housing_core::{CallContext, Coordinates, Lot};
/// use housing_data::{ConnectionPool, LotRepository, RepositoryConfig};
///
/// # fn main() -> Result<(), housing_data::RepositoryError> {
/// let repository = LotRepository::new(ConnectionPool::in_memory()?, RepositoryConfig::default());
/// repository.initialise()?;
/// let ctx = CallContext::background();
/// let created = repository.create(
///     &ctx,
///     &Lot {
///         address: "Nakhimovsky prospekt 23".into(),
///         coordinates: Coordinates::new(37.6, 55.7),
///         ..Lot::default()
///     },
/// )?;
/// let fetched = repository.get_flat_ad(&ctx, created.id, true, true)?;
/// assert_eq!(fetched.address, "Nakhimovsky prospekt 23");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LotRepository {
    pool: ConnectionPool,
    config: RepositoryConfig,
}

impl fmt::Debug for LotRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LotRepository")
            .field("database", &self.pool.path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LotRepository {
    /// Repository over `pool`.
    #[must_use]
    pub const fn new(pool: ConnectionPool, config: RepositoryConfig) -> Self {
        Self { pool, config }
    }

    /// Create or verify the listing schema.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Connection`] or a schema error.
    pub fn initialise(&self) -> Result<(), RepositoryError> {
        let mut connection = self.pool.get()?;
        crate::initialise_schema(&mut connection)
    }

    /// Tunables in effect.
    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// One page of lots matching `search`, with rooms but without living
    /// places.
    ///
    /// A bounded search area restricts results to lots stored inside the
    /// cell ranges covering the disc; lots near the rim may be included even
    /// when they lie just outside it. The predicate size depends on
    /// [`SpatialConfig::max_cells`], not on the radius.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] for a zero limit or page or an
    /// invalid search centre, otherwise connection, query or context errors.
    pub fn get_flats(
        &self,
        ctx: &CallContext,
        search: &FlatSearch,
    ) -> Result<Pagination<Lot>, RepositoryError> {
        search.validate()?;
        let clause = ListingPredicate::new(search.is_constructor)
            .ranges(ranges_covering(&search.area, &self.config.spatial))
            .filters(search.filters.iter().cloned())
            .owner(search.is_owner)
            .build();
        log::debug!("listing search where {}", clause.sql);

        let window = PageWindow {
            order_by: &search.order_by,
            limit: search.limit,
            page: search.page,
        };
        self.read_transaction(ctx, "search listings", |transaction| {
            aggregate::fetch_page(
                transaction,
                &clause,
                window,
                RoomVisibility::for_caller(search.is_owner),
            )
        })
    }

    /// One lot with its rooms and living places.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no lot with `id` matches the
    /// listing type, or when it is hidden and the caller is not its owner.
    pub fn get_flat_ad(
        &self,
        ctx: &CallContext,
        id: RecordId,
        is_constructor: bool,
        is_owner: bool,
    ) -> Result<Lot, RepositoryError> {
        let clause = ListingPredicate::new(is_constructor)
            .id(id)
            .owner(is_owner)
            .build();
        self.read_transaction(ctx, "read listing", |transaction| {
            aggregate::fetch_one(transaction, &clause, RoomVisibility::for_caller(is_owner))
        })?
        .ok_or(RepositoryError::NotFound { entity: "lot", id })
    }

    /// Persist `lot` with its rooms and living places.
    ///
    /// Identifiers, the grid cell and both timestamps are assigned here;
    /// values supplied for them are ignored. The returned lot carries the
    /// stored values.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] for invalid coordinates. Any
    /// storage failure rolls back the whole graph.
    pub fn create(&self, ctx: &CallContext, lot: &Lot) -> Result<Lot, RepositoryError> {
        let cell_id = cell_of(lot.coordinates.location, self.config.spatial.storage_level)?;
        let now = Utc::now();
        let mut stored = lot.clone();
        stored.coordinates.cell_id = cell_id;
        stored.created_at = now;
        stored.updated_at = now;

        self.write_transaction(ctx, "create listing", |transaction| {
            insert_graph(transaction, &mut stored)
        })?;
        log::debug!(
            "created lot {} with {} rooms and {} living places",
            stored.id,
            stored.rooms.len(),
            stored.living_place_count()
        );
        Ok(stored)
    }

    /// Apply a partial update to a lot.
    ///
    /// An empty map succeeds without touching storage. Assigning either
    /// coordinate recomputes the grid cell; every write bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the lot does not exist and
    /// [`RepositoryError::Validation`] when the new coordinates are invalid.
    pub fn update_flat(
        &self,
        ctx: &CallContext,
        id: RecordId,
        fields: &FieldMap<LotColumn>,
    ) -> Result<(), RepositoryError> {
        if fields.is_empty() {
            log::debug!("empty update for lot {id}; nothing to do");
            return Ok(());
        }
        self.write_transaction(ctx, "update listing", |transaction| {
            update_lot(transaction, id, fields, &self.config.spatial)
        })
    }

    /// Publish a template: apply the lot and room updates and clear
    /// `is_constructor` in one transaction.
    ///
    /// An empty lot field map succeeds without touching storage. Room updates
    /// with empty maps are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] for a missing lot or for a room
    /// that does not belong to it.
    pub fn create_ad(
        &self,
        ctx: &CallContext,
        request: &PublishRequest,
    ) -> Result<(), RepositoryError> {
        if request.fields.is_empty() {
            log::debug!("empty publish request for lot {}; nothing to do", request.lot_id);
            return Ok(());
        }
        let fields = request
            .fields
            .clone()
            .with(LotColumn::IsConstructor, false)?;

        self.write_transaction(ctx, "publish listing", |transaction| {
            update_lot(transaction, request.lot_id, &fields, &self.config.spatial)?;
            for room in request.rooms.iter().filter(|room| !room.fields.is_empty()) {
                update_room(transaction, request.lot_id, room)?;
            }
            Ok(())
        })
    }

    /// Delete a lot; rooms and living places go with it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the lot does not exist.
    pub fn delete_lot(&self, ctx: &CallContext, id: RecordId) -> Result<(), RepositoryError> {
        self.write_transaction(ctx, "delete listing", |transaction| {
            let deleted = transaction
                .execute("DELETE FROM flats WHERE id = ?1", [id])
                .map_err(query_failed("delete lot"))?;
            if deleted == 0 {
                return Err(RepositoryError::NotFound { entity: "lot", id });
            }
            Ok(())
        })?;
        log::debug!("deleted lot {id}");
        Ok(())
    }

    fn read_transaction<T>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        self.with_transaction(ctx, operation, TransactionBehavior::Deferred, body)
    }

    fn write_transaction<T>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        self.with_transaction(ctx, operation, TransactionBehavior::Immediate, body)
    }

    fn with_transaction<T>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        behavior: TransactionBehavior,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        ctx.check()?;
        let mut connection = self.pool.get()?;
        if ctx.is_bounded() {
            connection.progress_handler(PROGRESS_INTERVAL, Some(ctx.interrupt_probe()));
        }
        let outcome = run_in_transaction(&mut connection, ctx, operation, behavior, body);
        if ctx.is_bounded() {
            connection.progress_handler(0, None::<fn() -> bool>);
        }
        outcome.map_err(|err| classify(err, ctx, operation))
    }
}

fn run_in_transaction<T>(
    connection: &mut Connection,
    ctx: &CallContext,
    operation: &'static str,
    behavior: TransactionBehavior,
    body: impl FnOnce(&Transaction<'_>) -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    let transaction = connection
        .transaction_with_behavior(behavior)
        .map_err(query_failed("begin transaction"))?;
    let value = body(&transaction)?;
    ctx.check()?;
    transaction
        .commit()
        .map_err(query_failed("commit transaction"))?;
    log::debug!("{operation}: committed");
    Ok(value)
}

fn classify(err: RepositoryError, ctx: &CallContext, operation: &'static str) -> RepositoryError {
    let reason = match (&err, ctx.check()) {
        (RepositoryError::Context(reason), _) => Some(*reason),
        (_, Err(reason)) if err.is_interrupted() => Some(reason),
        _ => None,
    };
    match reason {
        Some(reason) => {
            log::warn!("{operation}: rolled back ({reason})");
            RepositoryError::Context(reason)
        }
        None => err,
    }
}

fn insert_graph(transaction: &Transaction<'_>, lot: &mut Lot) -> Result<(), RepositoryError> {
    lot.id = insert_lot(transaction, lot)?;
    let mut insert_room = transaction
        .prepare_cached(
            "INSERT INTO rooms (
                flat_id, max_residents, description, price, deposit,
                curr_number_of_residents, balcony, num_of_tables, num_of_chairs,
                tv, furniture, area, windows, is_visible
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .map_err(query_failed("prepare insert room"))?;
    let mut insert_place = transaction
        .prepare_cached(
            "INSERT INTO living_places (
                room_id, resident_id, price, description, num_of_berth, deposit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(query_failed("prepare insert living place"))?;

    for room in &mut lot.rooms {
        room.flat_id = lot.id;
        room.id = insert_room
            .insert(rusqlite::params![
                room.flat_id,
                room.max_residents,
                optional_text(&room.description),
                room.price,
                room.deposit,
                room.curr_number_of_residents,
                room.balcony,
                room.num_of_tables,
                room.num_of_chairs,
                room.tv,
                room.furniture,
                room.area,
                room.windows,
                room.is_visible,
            ])
            .map_err(query_failed("insert room"))?;

        for place in &mut room.living_places {
            place.room_id = room.id;
            place.id = insert_place
                .insert(rusqlite::params![
                    place.room_id,
                    place.resident_id,
                    place.price,
                    optional_text(&place.description),
                    place.num_of_berth,
                    place.deposit,
                ])
                .map_err(query_failed("insert living place"))?;
        }
    }
    Ok(())
}

fn insert_lot(transaction: &Transaction<'_>, lot: &Lot) -> Result<RecordId, RepositoryError> {
    let amenities = &lot.amenities;
    transaction
        .prepare_cached(
            "INSERT INTO flats (
                owner_id, address, long, lat, cell_id, price, deposit, description,
                time_to_metro_on_foot, time_to_metro_by_transport, metro_station, floor,
                floor_total, area, repair, sex, pass_elevator, service_elevator, kitchen,
                microwave_oven, bathroom, refrigerator, dishwasher, stove, vacuum_cleaner,
                dryer, internet, animals, smoking, heating, conditioner, wifi, is_visible,
                is_constructor, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32,
                ?33, ?34, ?35, ?36
            )",
        )
        .map_err(query_failed("prepare insert lot"))?
        .insert(rusqlite::params![
            lot.owner_id,
            lot.address,
            lot.coordinates.longitude(),
            lot.coordinates.latitude(),
            lot.coordinates.cell_id.storage_key(),
            lot.price,
            lot.deposit,
            optional_text(&lot.description),
            lot.time_to_metro_on_foot,
            lot.time_to_metro_by_transport,
            optional_text(&lot.metro_station),
            lot.floor,
            lot.floors_total,
            lot.area,
            lot.repairs,
            lot.sex,
            amenities.pass_elevator,
            amenities.service_elevator,
            amenities.kitchen,
            amenities.microwave_oven,
            amenities.bathroom,
            amenities.refrigerator,
            amenities.dishwasher,
            amenities.stove,
            amenities.vacuum_cleaner,
            amenities.dryer,
            amenities.internet,
            amenities.animals,
            amenities.smoking,
            amenities.heating,
            amenities.conditioner,
            amenities.wifi,
            lot.is_visible,
            lot.is_constructor,
            lot.created_at,
            lot.updated_at,
        ])
        .map_err(query_failed("insert lot"))
}

fn update_lot(
    transaction: &Transaction<'_>,
    id: RecordId,
    fields: &FieldMap<LotColumn>,
    spatial: &SpatialConfig,
) -> Result<(), RepositoryError> {
    let assignments = fields.assignments();
    let mut sql = format!("UPDATE flats SET {}", assignments.sql);
    let mut params = assignments.params;

    if fields.contains(LotColumn::Longitude) || fields.contains(LotColumn::Latitude) {
        let location = relocated(transaction, id, fields)?;
        let cell = cell_of(location, spatial.storage_level)?;
        sql.push_str(", cell_id = ?");
        params.push(FieldValue::Integer(cell.storage_key()));
    }
    sql.push_str(", updated_at = ? WHERE id = ?");
    params.push(FieldValue::Timestamp(Utc::now()));
    params.push(FieldValue::Integer(id));

    log::debug!("update lot {id}: {}", fields.rendered());
    let updated = transaction
        .execute(&sql, params_from_iter(params.iter().map(SqlParam)))
        .map_err(query_failed("update lot"))?;
    if updated == 0 {
        return Err(RepositoryError::NotFound { entity: "lot", id });
    }
    Ok(())
}

/// New location of lot `id` after applying `fields`; unassigned components
/// are read from storage.
fn relocated(
    transaction: &Transaction<'_>,
    id: RecordId,
    fields: &FieldMap<LotColumn>,
) -> Result<Coord<f64>, RepositoryError> {
    let stored: Option<(f64, f64)> = transaction
        .query_row("SELECT long, lat FROM flats WHERE id = ?1", [id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()
        .map_err(query_failed("read lot coordinates"))?;
    let (longitude, latitude) = stored.ok_or(RepositoryError::NotFound { entity: "lot", id })?;
    Ok(Coord {
        x: real(fields, LotColumn::Longitude)?.unwrap_or(longitude),
        y: real(fields, LotColumn::Latitude)?.unwrap_or(latitude),
    })
}

fn real(fields: &FieldMap<LotColumn>, column: LotColumn) -> Result<Option<f64>, ValidationError> {
    match fields.get(column) {
        None => Ok(None),
        Some(FieldValue::Real(value)) => Ok(Some(*value)),
        Some(other) => Err(ValidationError::InvalidValue {
            column: column.name(),
            expected: column.kind(),
            value: other.render(),
        }),
    }
}

fn update_room(
    transaction: &Transaction<'_>,
    lot_id: RecordId,
    room: &RoomUpdate,
) -> Result<(), RepositoryError> {
    let assignments = room.fields.assignments();
    let sql = format!(
        "UPDATE rooms SET {} WHERE id = ? AND flat_id = ?",
        assignments.sql
    );
    let mut params = assignments.params;
    params.push(FieldValue::Integer(room.id));
    params.push(FieldValue::Integer(lot_id));

    log::debug!("update room {}: {}", room.id, room.fields.rendered());
    let updated = transaction
        .execute(&sql, params_from_iter(params.iter().map(SqlParam)))
        .map_err(query_failed("update room"))?;
    if updated == 0 {
        return Err(RepositoryError::NotFound {
            entity: "room",
            id: room.id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_repository, sample_lot};
    use housing_core::{
        ContextError,
        query::{CompareOp, Filter, OrderBy, SortDirection},
        spatial::SearchArea,
    };
    use rstest::rstest;
    use std::{thread, time::Duration};

    fn row_count(repository: &LotRepository, table: &str) -> i64 {
        let connection = repository.pool.get().expect("borrow connection");
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count rows")
    }

    fn assert_graph_absent(repository: &LotRepository) {
        for table in ["flats", "rooms", "living_places"] {
            assert_eq!(row_count(repository, table), 0, "rows left in {table}");
        }
    }

    fn advert(longitude: f64, latitude: f64) -> Lot {
        let mut lot = sample_lot(longitude, latitude, &[]);
        lot.is_constructor = false;
        lot
    }

    #[rstest]
    fn create_assigns_ids_down_the_graph() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::background();
        let created = repository
            .create(&ctx, &sample_lot(37.6, 55.7, &[15, 10]))
            .expect("create lot");
        assert!(created.id > 0);
        assert!(created.rooms.iter().all(|room| room.flat_id == created.id));
        assert!(
            created
                .rooms
                .iter()
                .all(|room| room.living_places.iter().all(|place| place.room_id == room.id))
        );
        assert_ne!(created.coordinates.cell_id, housing_core::CellId::UNSET);
    }

    #[rstest]
    fn create_rejects_invalid_coordinates() {
        let repository = memory_repository().expect("open repository");
        let result = repository.create(&CallContext::background(), &sample_lot(0.0, 91.0, &[]));
        assert!(matches!(
            result,
            Err(RepositoryError::Validation(ValidationError::InvalidCoordinates { .. }))
        ));
    }

    #[rstest]
    fn update_recomputes_cell_when_moving() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::background();
        let created = repository
            .create(&ctx, &sample_lot(37.6, 55.7, &[]))
            .expect("create lot");
        let fields = FieldMap::new()
            .with(LotColumn::Longitude, 30.3)
            .and_then(|map| map.with(LotColumn::Latitude, 59.9))
            .expect("valid fields");
        repository
            .update_flat(&ctx, created.id, &fields)
            .expect("update lot");
        let moved = repository
            .get_flat_ad(&ctx, created.id, true, true)
            .expect("read lot");
        let expected = cell_of(Coord { x: 30.3, y: 59.9 }, 13).expect("valid location");
        assert_eq!(moved.coordinates.cell_id, expected);
        assert!(moved.updated_at >= created.updated_at);
    }

    #[rstest]
    fn update_of_missing_lot_is_not_found() {
        let repository = memory_repository().expect("open repository");
        let fields = FieldMap::new()
            .with(LotColumn::Price, 1)
            .expect("valid fields");
        let err = repository
            .update_flat(&CallContext::background(), 404, &fields)
            .expect_err("missing lot");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn publish_rejects_rooms_of_other_lots() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::background();
        let first = repository
            .create(&ctx, &sample_lot(37.6, 55.7, &[15]))
            .expect("create first");
        let second = repository
            .create(&ctx, &sample_lot(37.6, 55.7, &[20]))
            .expect("create second");
        let request = PublishRequest {
            lot_id: first.id,
            fields: FieldMap::new()
                .with(LotColumn::Price, 40_000)
                .expect("valid fields"),
            rooms: vec![RoomUpdate {
                id: second.rooms.first().expect("second lot has a room").id,
                fields: FieldMap::new()
                    .with(RoomColumn::Area, 99)
                    .expect("valid fields"),
            }],
        };
        let err = repository.create_ad(&ctx, &request).expect_err("foreign room");
        assert!(matches!(
            err,
            RepositoryError::NotFound { entity: "room", .. }
        ));
        // The lot update rolled back with the failed room update.
        let unchanged = repository
            .get_flat_ad(&ctx, first.id, true, true)
            .expect("still a template");
        assert_eq!(unchanged.price, first.price);
    }

    #[rstest]
    fn delete_of_missing_lot_is_not_found() {
        let repository = memory_repository().expect("open repository");
        let err = repository
            .delete_lot(&CallContext::background(), 9)
            .expect_err("missing lot");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn cancelled_context_stops_before_storage() {
        let repository = memory_repository().expect("open repository");
        let (ctx, handle) = CallContext::background().cancellable();
        handle.cancel();
        let result = repository.get_flats(&ctx, &FlatSearch::new(10, 1));
        assert!(matches!(
            result,
            Err(RepositoryError::Context(ContextError::Cancelled))
        ));
    }

    #[rstest]
    fn expired_deadline_is_reported() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::with_timeout(Duration::ZERO);
        let result = repository.delete_lot(&ctx, 1);
        assert!(matches!(
            result,
            Err(RepositoryError::Context(ContextError::DeadlineExceeded))
        ));
    }

    #[rstest]
    fn radius_search_excludes_distant_lots() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::background();
        let mut moscow = sample_lot(37.6, 55.7, &[]);
        moscow.is_constructor = false;
        let mut petersburg = sample_lot(30.3, 59.9, &[]);
        petersburg.is_constructor = false;
        let near = repository.create(&ctx, &moscow).expect("create near");
        repository.create(&ctx, &petersburg).expect("create far");

        let search = FlatSearch::new(10, 1)
            .within(SearchArea::new(37.6, 55.7, 1_000.0))
            .order_by(OrderBy::new(LotColumn::Area, SortDirection::Asc))
            .filter(Filter::new(LotColumn::Area, CompareOp::Ge, 0).expect("valid filter"));
        let page = repository.get_flats(&ctx, &search).expect("search");
        let ids: Vec<RecordId> = page.data.iter().map(|lot| lot.id).collect();
        assert_eq!(ids, vec![near.id]);
    }

    #[rstest]
    fn wide_radius_search_binds_a_bounded_predicate() {
        let repository = memory_repository().expect("open repository");
        let ctx = CallContext::background();
        let moscow = repository.create(&ctx, &advert(37.6, 55.7)).expect("create Moscow");
        let tver = repository.create(&ctx, &advert(35.9, 56.86)).expect("create Tver");
        let petersburg = repository
            .create(&ctx, &advert(30.3, 59.9))
            .expect("create Petersburg");

        let regional = FlatSearch::new(10, 1)
            .within(SearchArea::new(37.6, 55.7, 300_000.0))
            .order_by(OrderBy::new(LotColumn::Id, SortDirection::Asc));
        let page = repository.get_flats(&ctx, &regional).expect("regional search");
        let ids: Vec<RecordId> = page.data.iter().map(|lot| lot.id).collect();
        assert_eq!(ids, vec![moscow.id, tver.id]);

        let continental = regional.within(SearchArea::new(37.6, 55.7, 2_500_000.0));
        let page = repository.get_flats(&ctx, &continental).expect("continental search");
        let ids: Vec<RecordId> = page.data.iter().map(|lot| lot.id).collect();
        assert_eq!(ids, vec![moscow.id, tver.id, petersburg.id]);
    }

    #[rstest]
    fn deadline_during_create_rolls_back_the_graph() {
        let repository = memory_repository().expect("open repository");
        let large = sample_lot(37.6, 55.7, &[10; 2_000]);
        let ctx = CallContext::with_timeout(Duration::from_millis(1));
        let result = repository.create(&ctx, &large);
        assert!(
            matches!(
                result,
                Err(RepositoryError::Context(ContextError::DeadlineExceeded))
            ),
            "unexpected outcome: {result:?}"
        );
        assert_graph_absent(&repository);
    }

    #[rstest]
    fn cancellation_during_create_keeps_the_graph_whole() {
        let repository = memory_repository().expect("open repository");
        let large = sample_lot(37.6, 55.7, &[10; 2_000]);
        let (ctx, handle) = CallContext::background().cancellable();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            handle.cancel();
        });
        let result = repository.create(&ctx, &large);
        canceller.join().expect("canceller finished");
        match result {
            Err(RepositoryError::Context(ContextError::Cancelled)) => {
                assert_graph_absent(&repository);
            }
            Ok(created) => {
                assert_eq!(row_count(&repository, "rooms"), 2_000);
                assert_eq!(row_count(&repository, "living_places"), 4_000);
                assert_eq!(created.rooms.len(), 2_000);
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
