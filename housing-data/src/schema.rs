//! Listing schema and its migrations.

use rusqlite::{Connection, OptionalExtension, Transaction};

use crate::RepositoryError;

/// Version written by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Create the listing tables, indexes and schema version record.
///
/// The call is idempotent. Rooms reference their lot and living places
/// reference their room with `ON DELETE CASCADE`, so deleting a lot removes its
/// whole graph. Existing installations must already match
/// [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`RepositoryError::Schema`] when a step fails and
/// [`RepositoryError::SchemaVersion`] for a database written by a different
/// version.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use housing_data::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create listing schema");
/// initialise_schema(&mut conn).expect("schema creation is idempotent");
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), RepositoryError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| RepositoryError::Schema {
            step: "enable foreign keys",
            source,
        })?;

    let transaction = connection
        .transaction()
        .map_err(|source| RepositoryError::Schema {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| RepositoryError::Schema {
            step: "commit schema transaction",
            source,
        })?;
    log::debug!("listing schema version {SCHEMA_VERSION} ready");
    Ok(())
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), RepositoryError> {
    run_migration_step(
        transaction,
        "create flats",
        "CREATE TABLE IF NOT EXISTS flats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            address TEXT NOT NULL,
            long REAL NOT NULL,
            lat REAL NOT NULL,
            cell_id INTEGER NOT NULL,
            price INTEGER NOT NULL DEFAULT 0,
            deposit INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            time_to_metro_on_foot INTEGER NOT NULL DEFAULT 0,
            time_to_metro_by_transport INTEGER NOT NULL DEFAULT 0,
            metro_station TEXT,
            floor INTEGER NOT NULL DEFAULT 0,
            floor_total INTEGER NOT NULL DEFAULT 0,
            area INTEGER NOT NULL DEFAULT 0,
            repair INTEGER NOT NULL DEFAULT 0,
            sex INTEGER NOT NULL DEFAULT 0,
            pass_elevator INTEGER NOT NULL DEFAULT 0,
            service_elevator INTEGER NOT NULL DEFAULT 0,
            kitchen INTEGER NOT NULL DEFAULT 0,
            microwave_oven INTEGER NOT NULL DEFAULT 0,
            bathroom INTEGER NOT NULL DEFAULT 0,
            refrigerator INTEGER NOT NULL DEFAULT 0,
            dishwasher INTEGER NOT NULL DEFAULT 0,
            stove INTEGER NOT NULL DEFAULT 0,
            vacuum_cleaner INTEGER NOT NULL DEFAULT 0,
            dryer INTEGER NOT NULL DEFAULT 0,
            internet INTEGER NOT NULL DEFAULT 0,
            animals INTEGER NOT NULL DEFAULT 0,
            smoking INTEGER NOT NULL DEFAULT 0,
            heating INTEGER NOT NULL DEFAULT 0,
            conditioner INTEGER NOT NULL DEFAULT 0,
            wifi INTEGER NOT NULL DEFAULT 0,
            is_visible INTEGER NOT NULL DEFAULT 1,
            is_constructor INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create rooms",
        "CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flat_id INTEGER NOT NULL,
            max_residents INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            price INTEGER NOT NULL DEFAULT 0,
            deposit INTEGER NOT NULL DEFAULT 0,
            curr_number_of_residents INTEGER NOT NULL DEFAULT 0,
            balcony INTEGER NOT NULL DEFAULT 0,
            num_of_tables INTEGER NOT NULL DEFAULT 0,
            num_of_chairs INTEGER NOT NULL DEFAULT 0,
            tv INTEGER NOT NULL DEFAULT 0,
            furniture INTEGER NOT NULL DEFAULT 0,
            area INTEGER NOT NULL DEFAULT 0,
            windows INTEGER NOT NULL DEFAULT 0,
            is_visible INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (flat_id) REFERENCES flats(id) ON DELETE CASCADE
        )",
    )?;
    run_migration_step(
        transaction,
        "create living_places",
        "CREATE TABLE IF NOT EXISTS living_places (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id INTEGER NOT NULL,
            resident_id INTEGER,
            price INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            num_of_berth INTEGER NOT NULL DEFAULT 0,
            deposit INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), RepositoryError> {
    run_migration_step(
        transaction,
        "index flats by cell",
        "CREATE INDEX IF NOT EXISTS idx_flats_cell ON flats(cell_id)",
    )?;
    run_migration_step(
        transaction,
        "index rooms by flat",
        "CREATE INDEX IF NOT EXISTS idx_rooms_flat ON rooms(flat_id, id)",
    )?;
    run_migration_step(
        transaction,
        "index living places by room",
        "CREATE INDEX IF NOT EXISTS idx_living_places_room ON living_places(room_id, id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), RepositoryError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS housing_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM housing_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| RepositoryError::Schema {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(RepositoryError::SchemaVersion {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO housing_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| RepositoryError::Schema {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), RepositoryError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| RepositoryError::Schema { step, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let mut connection = Connection::open_in_memory().expect("open in-memory database");
        initialise_schema(&mut connection).expect("create schema");
        connection
    }

    #[rstest]
    fn creates_listing_tables(connection: Connection) {
        let mut statement = connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("prepare table listing");
        let tables: Vec<String> = statement
            .query_map([], |row| row.get(0))
            .expect("list tables")
            .collect::<Result<_, _>>()
            .expect("read table names");
        for expected in ["flats", "housing_schema_version", "living_places", "rooms"] {
            assert!(tables.iter().any(|name| name == expected), "missing {expected}");
        }
    }

    #[rstest]
    fn rejects_unknown_schema_version(mut connection: Connection) {
        connection
            .execute("UPDATE housing_schema_version SET version = 99", [])
            .expect("tamper with version");
        assert!(matches!(
            initialise_schema(&mut connection),
            Err(RepositoryError::SchemaVersion {
                expected: SCHEMA_VERSION,
                found: 99
            })
        ));
    }

    #[rstest]
    fn rooms_require_an_existing_lot(connection: Connection) {
        let result = connection.execute("INSERT INTO rooms (flat_id) VALUES (42)", []);
        assert!(result.is_err());
    }
}
