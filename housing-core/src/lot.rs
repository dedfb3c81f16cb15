//! Listing aggregate: lots, their rooms and the berths inside each room.
//!
//! A [`Lot`] owns an ordered collection of [`Room`] values and each room owns
//! an ordered collection of [`LivingPlace`] values. Child collections are kept
//! in creation order, which is also ascending identifier order in storage.

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::spatial::CellId;

/// Identifier of a persisted lot, room or living place.
pub type RecordId = i64;

/// Geographic position of a lot together with its derived grid cell.
///
/// `location` uses WGS84 degrees with `x = longitude` and `y = latitude`.
/// `cell_id` is derived from `location` whenever the lot is written and is
/// never accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude (`x`) and latitude (`y`) in degrees.
    pub location: Coord<f64>,
    /// Grid cell containing `location` at the configured storage level.
    #[serde(default)]
    pub cell_id: CellId,
}

impl Coordinates {
    /// Build coordinates from a longitude and latitude in degrees.
    ///
    /// The cell is left unset; the repository derives it on write.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            location: Coord {
                x: longitude,
                y: latitude,
            },
            cell_id: CellId::UNSET,
        }
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }
}

/// Household equipment and house rules advertised for a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps to an independent boolean column"
)]
pub struct Amenities {
    /// Passenger elevator in the building.
    pub pass_elevator: bool,
    /// Service (freight) elevator in the building.
    pub service_elevator: bool,
    /// Shared kitchen.
    pub kitchen: bool,
    /// Microwave oven.
    pub microwave_oven: bool,
    /// Bathroom.
    pub bathroom: bool,
    /// Refrigerator.
    pub refrigerator: bool,
    /// Dishwasher.
    pub dishwasher: bool,
    /// Stove.
    pub stove: bool,
    /// Vacuum cleaner.
    pub vacuum_cleaner: bool,
    /// Clothes dryer.
    pub dryer: bool,
    /// Wired internet.
    pub internet: bool,
    /// Pets allowed.
    pub animals: bool,
    /// Smoking allowed.
    pub smoking: bool,
    /// Heating included.
    pub heating: bool,
    /// Air conditioner.
    pub conditioner: bool,
    /// Wireless internet.
    pub wifi: bool,
}

/// A property listing: either a reusable template or a published advertisement.
///
/// # Examples
///
/// ```
/// use housing_core::{Coordinates, Lot};
///
/// let lot = Lot {
///     owner_id: 7,
///     address: "Nakhimovsky prospekt 23".into(),
///     coordinates: Coordinates::new(37.6, 55.7),
///     area: 35,
///     ..Lot::default()
/// };
/// assert!(lot.rooms.is_empty());
/// assert_eq!(lot.coordinates.longitude(), 37.6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lot {
    /// Storage identifier; assigned on create.
    pub id: RecordId,
    /// Identifier of the owning user.
    pub owner_id: RecordId,
    /// Postal address.
    pub address: String,
    /// Position and derived grid cell.
    pub coordinates: Coordinates,
    /// Monthly rent.
    pub price: i64,
    /// Security deposit.
    pub deposit: i64,
    /// Free-form description.
    pub description: String,
    /// Minutes to the nearest metro station on foot.
    pub time_to_metro_on_foot: i32,
    /// Minutes to the nearest metro station by public transport.
    pub time_to_metro_by_transport: i32,
    /// Name of the nearest metro station.
    pub metro_station: String,
    /// Floor of the flat.
    pub floor: i32,
    /// Number of floors in the building.
    pub floors_total: i32,
    /// Total area in square metres.
    pub area: i32,
    /// Repair grade.
    pub repairs: i32,
    /// Preferred resident sex (`0` means no preference).
    pub sex: i32,
    /// Equipment and house rules.
    pub amenities: Amenities,
    /// Whether non-owners may see the lot.
    pub is_visible: bool,
    /// Whether the lot is a template rather than an advertisement.
    pub is_constructor: bool,
    /// Creation time; assigned on create.
    pub created_at: DateTime<Utc>,
    /// Time of the last write; assigned on every write.
    pub updated_at: DateTime<Utc>,
    /// Rooms in creation order.
    pub rooms: Vec<Room>,
}

impl Default for Lot {
    fn default() -> Self {
        Self {
            id: 0,
            owner_id: 0,
            address: String::new(),
            coordinates: Coordinates::default(),
            price: 0,
            deposit: 0,
            description: String::new(),
            time_to_metro_on_foot: 0,
            time_to_metro_by_transport: 0,
            metro_station: String::new(),
            floor: 0,
            floors_total: 0,
            area: 0,
            repairs: 0,
            sex: 0,
            amenities: Amenities::default(),
            is_visible: true,
            is_constructor: true,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
            rooms: Vec::new(),
        }
    }
}

impl Lot {
    /// Total number of living places across all rooms.
    #[must_use]
    pub fn living_place_count(&self) -> usize {
        self.rooms.iter().map(|room| room.living_places.len()).sum()
    }
}

/// A room inside a lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps to an independent boolean column"
)]
pub struct Room {
    /// Storage identifier; assigned on create.
    pub id: RecordId,
    /// Identifier of the owning lot.
    pub flat_id: RecordId,
    /// Maximum number of residents.
    pub max_residents: i32,
    /// Free-form description.
    pub description: String,
    /// Monthly rent for the whole room.
    pub price: i64,
    /// Security deposit for the whole room.
    pub deposit: i64,
    /// Residents currently living in the room.
    pub curr_number_of_residents: i32,
    /// Balcony access.
    pub balcony: bool,
    /// Number of tables.
    pub num_of_tables: i32,
    /// Number of chairs.
    pub num_of_chairs: i32,
    /// Television.
    pub tv: bool,
    /// Furnished.
    pub furniture: bool,
    /// Area in square metres.
    pub area: i32,
    /// Number of windows.
    pub windows: i32,
    /// Whether non-owners may see the room.
    pub is_visible: bool,
    /// Berths in creation order.
    pub living_places: Vec<LivingPlace>,
}

impl Default for Room {
    fn default() -> Self {
        Self {
            id: 0,
            flat_id: 0,
            max_residents: 0,
            description: String::new(),
            price: 0,
            deposit: 0,
            curr_number_of_residents: 0,
            balcony: false,
            num_of_tables: 0,
            num_of_chairs: 0,
            tv: false,
            furniture: false,
            area: 0,
            windows: 0,
            is_visible: true,
            living_places: Vec::new(),
        }
    }
}

/// An individually rentable berth inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LivingPlace {
    /// Storage identifier; assigned on create.
    pub id: RecordId,
    /// Identifier of the owning room.
    pub room_id: RecordId,
    /// Current resident, `None` while vacant.
    pub resident_id: Option<RecordId>,
    /// Monthly rent.
    pub price: i64,
    /// Free-form description.
    pub description: String,
    /// Number of berths.
    pub num_of_berth: i32,
    /// Security deposit.
    pub deposit: i64,
}

/// One page of results together with paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination<T> {
    /// One-based page number that was requested.
    pub current_page: u32,
    /// Number of pages available for the query.
    pub num_pages: u64,
    /// Records on this page in the requested order.
    pub data: Vec<T>,
}

impl<T> Pagination<T> {
    /// An empty page reporting `num_pages` pages in total.
    #[must_use]
    pub const fn empty(current_page: u32, num_pages: u64) -> Self {
        Self {
            current_page,
            num_pages,
            data: Vec::new(),
        }
    }
}

/// Number of pages needed to show `total` rows with `limit` rows per page.
///
/// Zero rows need zero pages; an exact multiple of `limit` does not gain an
/// extra empty page.
///
/// # Examples
///
/// ```
/// use housing_core::page_count;
///
/// assert_eq!(page_count(6, 3), 2);
/// assert_eq!(page_count(7, 3), 3);
/// assert_eq!(page_count(0, 3), 0);
/// ```
#[must_use]
pub const fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 3, 0)]
    #[case(1, 3, 1)]
    #[case(3, 3, 1)]
    #[case(4, 3, 2)]
    #[case(9, 3, 3)]
    #[case(10, 3, 4)]
    #[case(5, 0, 0)]
    fn page_count_uses_ceiling_division(
        #[case] total: u64,
        #[case] limit: u32,
        #[case] expected: u64,
    ) {
        assert_eq!(page_count(total, limit), expected);
    }

    #[rstest]
    fn defaults_describe_a_visible_template() {
        let lot = Lot::default();
        assert!(lot.is_visible);
        assert!(lot.is_constructor);
        assert_eq!(lot.coordinates.cell_id, CellId::UNSET);
    }

    #[rstest]
    fn counts_living_places_across_rooms() {
        let lot = Lot {
            rooms: vec![
                Room {
                    living_places: vec![LivingPlace::default(), LivingPlace::default()],
                    ..Room::default()
                },
                Room {
                    living_places: vec![LivingPlace::default()],
                    ..Room::default()
                },
            ],
            ..Lot::default()
        };
        assert_eq!(lot.living_place_count(), 3);
    }

    #[rstest]
    fn lot_deserialises_with_missing_fields() {
        let lot: Lot = serde_json::from_str(
            r#"{"address":"Kolomensky proezd 1","area":120,"coordinates":{"location":{"x":37.6,"y":55.7}}}"#,
        )
        .expect("parse lot");
        assert_eq!(lot.area, 120);
        assert_eq!(lot.coordinates.latitude(), 55.7);
        assert!(lot.rooms.is_empty());
    }
}
