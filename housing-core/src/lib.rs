//! Core types for the housing listing engine.
//!
//! The crate is storage-agnostic: it defines the listing aggregate, maps
//! coordinates onto the S2 grid used for radius search, and assembles
//! parameterised predicates and partial-update assignments from validated
//! caller input. `housing-data` executes those against SQLite.

pub mod context;
mod error;
pub mod lot;
pub mod query;
pub mod spatial;

pub use context::{CallContext, CancelHandle};
pub use error::{ContextError, ValidationError};
pub use lot::{
    Amenities, Coordinates, LivingPlace, Lot, Pagination, RecordId, Room, page_count,
};
pub use spatial::{CellId, CellRange, SearchArea, SpatialConfig};
