//! Mapping between listing rows and domain values.

use geo::Coord;
use housing_core::{
    Amenities, CellId, Coordinates, LivingPlace, Lot, Room, query::FieldValue,
};
use rusqlite::{
    Row, ToSql,
    types::{ToSqlOutput, Value},
};

/// Columns selected for a lot, in the order [`lot_from_row`] expects.
pub(crate) const LOT_COLUMNS: &str = "id, owner_id, address, long, lat, cell_id, price, deposit, \
     description, time_to_metro_on_foot, time_to_metro_by_transport, metro_station, floor, \
     floor_total, area, repair, sex, pass_elevator, service_elevator, kitchen, microwave_oven, \
     bathroom, refrigerator, dishwasher, stove, vacuum_cleaner, dryer, internet, animals, \
     smoking, heating, conditioner, wifi, is_visible, is_constructor, created_at, updated_at";

/// Columns selected for a room.
pub(crate) const ROOM_COLUMNS: &str = "id, flat_id, max_residents, description, price, deposit, \
     curr_number_of_residents, balcony, num_of_tables, num_of_chairs, tv, furniture, area, \
     windows, is_visible";

/// Columns selected for a living place.
pub(crate) const LIVING_PLACE_COLUMNS: &str =
    "id, room_id, resident_id, price, description, num_of_berth, deposit";

/// Binds a [`FieldValue`] as a statement parameter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SqlParam<'a>(pub &'a FieldValue);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            FieldValue::Null => Ok(ToSqlOutput::Owned(Value::Null)),
            FieldValue::Bool(value) => value.to_sql(),
            FieldValue::Integer(value) => value.to_sql(),
            FieldValue::Real(value) => value.to_sql(),
            FieldValue::Text(value) => value.to_sql(),
            FieldValue::Timestamp(value) => value.to_sql(),
        }
    }
}

/// Empty descriptive text is stored as `NULL`.
pub(crate) fn optional_text(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

pub(crate) fn lot_from_row(row: &Row<'_>) -> rusqlite::Result<Lot> {
    let longitude: f64 = row.get("long")?;
    let latitude: f64 = row.get("lat")?;
    Ok(Lot {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        address: row.get("address")?,
        coordinates: Coordinates {
            location: Coord {
                x: longitude,
                y: latitude,
            },
            cell_id: CellId::from_storage_key(row.get("cell_id")?),
        },
        price: row.get("price")?,
        deposit: row.get("deposit")?,
        description: row
            .get::<_, Option<String>>("description")?
            .unwrap_or_default(),
        time_to_metro_on_foot: row.get("time_to_metro_on_foot")?,
        time_to_metro_by_transport: row.get("time_to_metro_by_transport")?,
        metro_station: row
            .get::<_, Option<String>>("metro_station")?
            .unwrap_or_default(),
        floor: row.get("floor")?,
        floors_total: row.get("floor_total")?,
        area: row.get("area")?,
        repairs: row.get("repair")?,
        sex: row.get("sex")?,
        amenities: amenities_from_row(row)?,
        is_visible: row.get("is_visible")?,
        is_constructor: row.get("is_constructor")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        rooms: Vec::new(),
    })
}

fn amenities_from_row(row: &Row<'_>) -> rusqlite::Result<Amenities> {
    Ok(Amenities {
        pass_elevator: row.get("pass_elevator")?,
        service_elevator: row.get("service_elevator")?,
        kitchen: row.get("kitchen")?,
        microwave_oven: row.get("microwave_oven")?,
        bathroom: row.get("bathroom")?,
        refrigerator: row.get("refrigerator")?,
        dishwasher: row.get("dishwasher")?,
        stove: row.get("stove")?,
        vacuum_cleaner: row.get("vacuum_cleaner")?,
        dryer: row.get("dryer")?,
        internet: row.get("internet")?,
        animals: row.get("animals")?,
        smoking: row.get("smoking")?,
        heating: row.get("heating")?,
        conditioner: row.get("conditioner")?,
        wifi: row.get("wifi")?,
    })
}

pub(crate) fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get("id")?,
        flat_id: row.get("flat_id")?,
        max_residents: row.get("max_residents")?,
        description: row
            .get::<_, Option<String>>("description")?
            .unwrap_or_default(),
        price: row.get("price")?,
        deposit: row.get("deposit")?,
        curr_number_of_residents: row.get("curr_number_of_residents")?,
        balcony: row.get("balcony")?,
        num_of_tables: row.get("num_of_tables")?,
        num_of_chairs: row.get("num_of_chairs")?,
        tv: row.get("tv")?,
        furniture: row.get("furniture")?,
        area: row.get("area")?,
        windows: row.get("windows")?,
        is_visible: row.get("is_visible")?,
        living_places: Vec::new(),
    })
}

pub(crate) fn living_place_from_row(row: &Row<'_>) -> rusqlite::Result<LivingPlace> {
    Ok(LivingPlace {
        id: row.get("id")?,
        room_id: row.get("room_id")?,
        resident_id: row.get("resident_id")?,
        price: row.get("price")?,
        description: row
            .get::<_, Option<String>>("description")?
            .unwrap_or_default(),
        num_of_berth: row.get("num_of_berth")?,
        deposit: row.get("deposit")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rusqlite::Connection;

    fn bind(value: &FieldValue) -> Value {
        let connection = Connection::open_in_memory().expect("open in-memory database");
        connection
            .query_row("SELECT ?1", [SqlParam(value)], |row| row.get(0))
            .expect("round-trip parameter")
    }

    #[rstest]
    #[case(FieldValue::Null, Value::Null)]
    #[case(FieldValue::Bool(true), Value::Integer(1))]
    #[case(FieldValue::Integer(-7), Value::Integer(-7))]
    #[case(FieldValue::Real(37.6), Value::Real(37.6))]
    #[case(FieldValue::Text("Arbat".into()), Value::Text("Arbat".into()))]
    fn binds_values_with_their_sqlite_type(#[case] value: FieldValue, #[case] expected: Value) {
        assert_eq!(bind(&value), expected);
    }

    #[rstest]
    fn binds_timestamps_as_text() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid time");
        assert!(matches!(bind(&FieldValue::Timestamp(at)), Value::Text(text) if text.starts_with("2024-03-01")));
    }

    #[rstest]
    #[case("", None)]
    #[case("Arbat", Some("Arbat"))]
    fn empty_text_becomes_null(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(optional_text(raw), expected);
    }
}
