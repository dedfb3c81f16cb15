//! Facade crate for the housing listing engine.
//!
//! This crate re-exports the listing domain types and predicate builders and
//! exposes the SQLite-backed repository behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use housing_core::{
    Amenities, CallContext, CancelHandle, CellId, CellRange, ContextError, Coordinates,
    LivingPlace, Lot, Pagination, RecordId, Room, SearchArea, SpatialConfig, ValidationError,
    page_count, query,
};

#[cfg(feature = "store-sqlite")]
pub use housing_data::{
    ConnectionPool, LotRepository, PoolConfig, PublishRequest, RepositoryConfig,
    RepositoryError, RoomUpdate,
};
