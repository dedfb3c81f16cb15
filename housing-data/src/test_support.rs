//! Fixtures shared by unit and behaviour tests.

use std::path::Path;

use housing_core::{Amenities, Coordinates, LivingPlace, Lot, Room};

use crate::{ConnectionPool, LotRepository, PoolConfig, RepositoryConfig, RepositoryError};

/// Repository over a fresh in-memory database with the schema applied.
///
/// # Errors
///
/// Returns [`RepositoryError`] when the database cannot be created.
pub fn memory_repository() -> Result<LotRepository, RepositoryError> {
    let repository = LotRepository::new(ConnectionPool::in_memory()?, RepositoryConfig::default());
    repository.initialise()?;
    Ok(repository)
}

/// Repository over `housing.db` inside `dir` with the schema applied.
///
/// # Errors
///
/// Returns [`RepositoryError`] when the database cannot be created.
pub fn file_repository(dir: &Path) -> Result<LotRepository, RepositoryError> {
    let config = PoolConfig::new(dir.join("housing.db")).with_max_size(4);
    let repository = LotRepository::new(ConnectionPool::open(&config)?, RepositoryConfig::default());
    repository.initialise()?;
    Ok(repository)
}

/// A template lot with one room per entry in `room_areas`.
///
/// Each room holds two living places priced 30 000 and 20 000. The lot area
/// is the sum of the room areas.
#[must_use]
pub fn sample_lot(longitude: f64, latitude: f64, room_areas: &[i32]) -> Lot {
    let rooms = room_areas
        .iter()
        .map(|&area| Room {
            area,
            max_residents: 2,
            price: 50_000,
            description: format!("room of {area} m2"),
            living_places: vec![
                LivingPlace {
                    price: 30_000,
                    num_of_berth: 1,
                    ..LivingPlace::default()
                },
                LivingPlace {
                    price: 20_000,
                    num_of_berth: 1,
                    description: "upper berth".into(),
                    ..LivingPlace::default()
                },
            ],
            ..Room::default()
        })
        .collect();

    Lot {
        owner_id: 1,
        address: "Russia, Moscow, Nakhimovsky prospekt 23".into(),
        coordinates: Coordinates::new(longitude, latitude),
        price: 100_000,
        deposit: 50_000,
        description: "Bright flat near the metro".into(),
        time_to_metro_on_foot: 10,
        metro_station: "Nakhimovsky Prospekt".into(),
        floor: 3,
        floors_total: 9,
        area: room_areas.iter().sum(),
        repairs: 2,
        amenities: Amenities {
            kitchen: true,
            bathroom: true,
            wifi: true,
            ..Amenities::default()
        },
        rooms,
        ..Lot::default()
    }
}
