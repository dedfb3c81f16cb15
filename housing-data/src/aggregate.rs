//! Assembly of the lot → room → living place graph.
//!
//! Children are loaded with one batched `IN` query per level rather than one
//! query per parent row, then grouped by foreign key in an ordered map and
//! attached to their parents. Batches are split below SQLite's bound-parameter
//! ceiling, so a level costs one statement per 999 parents.

use std::collections::BTreeMap;

use housing_core::{
    LivingPlace, Lot, Pagination, RecordId, Room, page_count,
    query::{FieldValue, OrderBy, WhereClause},
};
use rusqlite::{Transaction, params_from_iter};

use crate::{
    RepositoryError,
    error::query_failed,
    rows::{
        LIVING_PLACE_COLUMNS, LOT_COLUMNS, ROOM_COLUMNS, SqlParam, living_place_from_row,
        lot_from_row, room_from_row,
    },
};

/// SQLite limits bound parameters per statement to 999 by default. Batched
/// child queries are chunked to remain below that ceiling.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

/// Which rooms a read may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomVisibility {
    /// Every room, including hidden ones.
    All,
    /// Only rooms with `is_visible` set.
    VisibleOnly,
}

impl RoomVisibility {
    /// Owners see hidden rooms; everyone else does not.
    #[must_use]
    pub const fn for_caller(is_owner: bool) -> Self {
        if is_owner {
            Self::All
        } else {
            Self::VisibleOnly
        }
    }

    const fn condition(self) -> &'static str {
        match self {
            Self::All => "",
            Self::VisibleOnly => " AND is_visible = 1",
        }
    }
}

/// A page window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow<'a> {
    /// Ordering applied before paging.
    pub order_by: &'a OrderBy,
    /// Page size.
    pub limit: u32,
    /// One-based page number.
    pub page: u32,
}

impl PageWindow<'_> {
    fn offset(&self) -> u64 {
        u64::from(self.limit).saturating_mul(u64::from(self.page.saturating_sub(1)))
    }
}

/// Count lots matching `clause`.
///
/// # Errors
///
/// Returns [`RepositoryError::Query`] when the statement fails.
pub fn count_matching(
    transaction: &Transaction<'_>,
    clause: &WhereClause,
) -> Result<u64, RepositoryError> {
    let sql = format!("SELECT COUNT(*) FROM flats {}", clause.to_sql());
    let count: i64 = transaction
        .query_row(
            &sql,
            params_from_iter(clause.params.iter().map(SqlParam)),
            |row| row.get(0),
        )
        .map_err(query_failed("count listings"))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Load one page of lots with their rooms attached.
///
/// Living places are not loaded. An empty page skips the room query.
///
/// # Errors
///
/// Returns [`RepositoryError::Query`] when any stage fails; the caller's
/// transaction is then rolled back and no partial page is returned.
pub fn fetch_page(
    transaction: &Transaction<'_>,
    clause: &WhereClause,
    window: PageWindow<'_>,
    visibility: RoomVisibility,
) -> Result<Pagination<Lot>, RepositoryError> {
    let total = count_matching(transaction, clause)?;
    let num_pages = page_count(total, window.limit);
    if window.offset() >= total {
        log::debug!(
            "page {} is past the {total} matching listings",
            window.page
        );
        return Ok(Pagination::empty(window.page, num_pages));
    }

    let mut lots = select_lots(transaction, clause, Some(window))?;
    let ids: Vec<RecordId> = lots.iter().map(|lot| lot.id).collect();
    let mut rooms = rooms_by_flat(transaction, &ids, visibility)?;
    for lot in &mut lots {
        lot.rooms = rooms.remove(&lot.id).unwrap_or_default();
    }

    log::debug!(
        "fetched page {} of {num_pages} with {} listings",
        window.page,
        lots.len()
    );
    Ok(Pagination {
        current_page: window.page,
        num_pages,
        data: lots,
    })
}

/// Load the lot matching `clause` with its full room and living-place graph.
///
/// `clause` is expected to select at most one lot, typically by id.
///
/// # Errors
///
/// Returns [`RepositoryError::Query`] when any stage fails.
pub fn fetch_one(
    transaction: &Transaction<'_>,
    clause: &WhereClause,
    visibility: RoomVisibility,
) -> Result<Option<Lot>, RepositoryError> {
    let Some(mut lot) = select_lots(transaction, clause, None)?.into_iter().next() else {
        return Ok(None);
    };

    let mut rooms = rooms_by_flat(transaction, &[lot.id], visibility)?
        .remove(&lot.id)
        .unwrap_or_default();
    let room_ids: Vec<RecordId> = rooms.iter().map(|room| room.id).collect();
    let mut places = living_places_by_room(transaction, &room_ids)?;
    for room in &mut rooms {
        room.living_places = places.remove(&room.id).unwrap_or_default();
    }
    lot.rooms = rooms;
    Ok(Some(lot))
}

fn select_lots(
    transaction: &Transaction<'_>,
    clause: &WhereClause,
    window: Option<PageWindow<'_>>,
) -> Result<Vec<Lot>, RepositoryError> {
    let mut sql = format!("SELECT {LOT_COLUMNS} FROM flats {}", clause.to_sql());
    let mut params = clause.params.clone();
    if let Some(page) = window {
        sql.push(' ');
        sql.push_str(&page.order_by.to_sql());
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(FieldValue::Integer(i64::from(page.limit)));
        params.push(FieldValue::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));
    }

    let mut statement = transaction
        .prepare(&sql)
        .map_err(query_failed("prepare listing query"))?;
    statement
        .query_map(params_from_iter(params.iter().map(SqlParam)), lot_from_row)
        .and_then(Iterator::collect)
        .map_err(query_failed("read listings"))
}

/// Rooms of the given lots, grouped by lot id in ascending room id order.
///
/// # Errors
///
/// Returns [`RepositoryError::Query`] when a batch fails.
pub fn rooms_by_flat(
    transaction: &Transaction<'_>,
    flat_ids: &[RecordId],
    visibility: RoomVisibility,
) -> Result<BTreeMap<RecordId, Vec<Room>>, RepositoryError> {
    let mut grouped: BTreeMap<RecordId, Vec<Room>> = BTreeMap::new();
    for chunk in flat_ids.chunks(SQLITE_MAX_VARIABLE_NUMBER) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE flat_id IN ({placeholders}){} ORDER BY id",
            visibility.condition()
        );
        let mut statement = transaction
            .prepare(&sql)
            .map_err(query_failed("prepare room batch"))?;
        let rooms: Vec<Room> = statement
            .query_map(params_from_iter(chunk.iter()), room_from_row)
            .and_then(Iterator::collect)
            .map_err(query_failed("read room batch"))?;
        for room in rooms {
            grouped.entry(room.flat_id).or_default().push(room);
        }
    }
    log::debug!(
        "loaded rooms for {} of {} listings",
        grouped.len(),
        flat_ids.len()
    );
    Ok(grouped)
}

/// Living places of the given rooms, grouped by room id in ascending id order.
///
/// # Errors
///
/// Returns [`RepositoryError::Query`] when a batch fails.
pub fn living_places_by_room(
    transaction: &Transaction<'_>,
    room_ids: &[RecordId],
) -> Result<BTreeMap<RecordId, Vec<LivingPlace>>, RepositoryError> {
    let mut grouped: BTreeMap<RecordId, Vec<LivingPlace>> = BTreeMap::new();
    for chunk in room_ids.chunks(SQLITE_MAX_VARIABLE_NUMBER) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT {LIVING_PLACE_COLUMNS} FROM living_places \
             WHERE room_id IN ({placeholders}) ORDER BY id"
        );
        let mut statement = transaction
            .prepare(&sql)
            .map_err(query_failed("prepare living place batch"))?;
        let places: Vec<LivingPlace> = statement
            .query_map(params_from_iter(chunk.iter()), living_place_from_row)
            .and_then(Iterator::collect)
            .map_err(query_failed("read living place batch"))?;
        for place in places {
            grouped.entry(place.room_id).or_default().push(place);
        }
    }
    Ok(grouped)
}
