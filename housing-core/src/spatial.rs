//! Grid-cell indexing for radius search.
//!
//! Lots store the S2 cell that contains them at a fixed storage level. A
//! radius search is translated into a bounded covering of the search disc.
//! Each covering cell, at the storage level or coarser, maps to the
//! contiguous range of storage keys it contains, which the storage layer
//! matches with `BETWEEN`. The ranges admit false positives near the disc
//! edge; they never miss a lot inside the disc.

use geo::Coord;
use s2::{
    cap::Cap,
    cellid::CellID,
    latlng::LatLng,
    point::Point,
    region::RegionCoverer,
    s1::{Angle, Rad},
};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Mean Earth radius used to turn metres into angles on the unit sphere.
pub const EARTH_RADIUS_METERS: f64 = 6_371_010.0;

/// Deepest level of the S2 hierarchy.
pub const MAX_LEVEL: u8 = 30;

/// Smallest cell budget accepted by the coverer; a disc may touch all six
/// cube faces.
const MIN_CELLS: usize = 6;

/// Identifier of an S2 grid cell.
///
/// The raw value is an unsigned 64-bit Hilbert-curve position. SQL integers
/// are signed, so storage uses [`CellId::storage_key`], a bit-for-bit
/// reinterpretation that round-trips through [`CellId::from_storage_key`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CellId(pub u64);

impl CellId {
    /// Placeholder for coordinates whose cell has not been derived yet.
    pub const UNSET: Self = Self(0);

    /// Signed representation written to SQL integer columns.
    #[must_use]
    #[expect(
        clippy::cast_possible_wrap,
        reason = "cell ids are stored bit-for-bit in signed integer columns"
    )]
    pub const fn storage_key(self) -> i64 {
        self.0 as i64
    }

    /// Rebuild a cell id from its stored signed representation.
    #[must_use]
    #[expect(
        clippy::cast_sign_loss,
        reason = "cell ids are stored bit-for-bit in signed integer columns"
    )]
    pub const fn from_storage_key(key: i64) -> Self {
        Self(key as u64)
    }

    /// Level of the cell in the S2 hierarchy.
    #[must_use]
    pub fn level(self) -> u64 {
        CellID(self.0).level()
    }
}

/// Inclusive span of cell ids.
///
/// A stored cell lies inside the span of a covering cell exactly when the
/// covering cell is the stored cell or one of its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// Smallest id in the span.
    pub first: CellId,
    /// Largest id in the span.
    pub last: CellId,
}

impl CellRange {
    /// Span of the leaf descendants of `cell`.
    #[must_use]
    pub fn of(cell: CellId) -> Self {
        let id = CellID(cell.0);
        Self {
            first: CellId(id.range_min().0),
            last: CellId(id.range_max().0),
        }
    }

    /// Whether `cell` falls inside the span.
    #[must_use]
    pub const fn contains(self, cell: CellId) -> bool {
        self.first.0 <= cell.0 && cell.0 <= self.last.0
    }

    fn adjoins(self, next: Self) -> bool {
        let last = CellID(self.last.0);
        let first = CellID(next.first.0);
        last.face() == first.face() && last.next() == first
    }
}

/// Tunables for the storage grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Level at which lot cells are stored and searched.
    ///
    /// Finer levels narrow the candidate rows per cell but need more cells per
    /// search; coarser levels need fewer cells but admit more false positives.
    pub storage_level: u8,
    /// Cap on the number of cells in a search covering.
    ///
    /// Discs needing more storage-level cells are covered with coarser
    /// cells instead, which bounds the size of the search predicate at the
    /// cost of more false positives. Values below 6 are raised to 6.
    pub max_cells: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            storage_level: 13,
            max_cells: 64,
        }
    }
}

impl SpatialConfig {
    /// Configuration storing cells at `storage_level`.
    ///
    /// Levels beyond [`MAX_LEVEL`] are clamped.
    #[must_use]
    pub fn with_storage_level(storage_level: u8) -> Self {
        Self {
            storage_level: storage_level.min(MAX_LEVEL),
            ..Self::default()
        }
    }
}

/// Centre and radius of a proximity search.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchArea {
    /// Disc centre; `x = longitude`, `y = latitude`, in degrees.
    pub centre: Coord<f64>,
    /// Disc radius in metres.
    pub radius_meters: f64,
}

impl SearchArea {
    /// Build a search area from a longitude, latitude and radius.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64, radius_meters: f64) -> Self {
        Self {
            centre: Coord {
                x: longitude,
                y: latitude,
            },
            radius_meters,
        }
    }

    /// Whether the area means "search everywhere".
    ///
    /// An all-zero area is the sentinel used by callers that do not search by
    /// proximity. A non-positive or non-finite radius also disables the
    /// constraint.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        !(self.radius_meters.is_finite() && self.radius_meters > 0.0)
    }
}

/// Check that a location is a finite WGS84 position.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCoordinates`] when either component is
/// non-finite or outside the valid degree range.
pub fn validate_location(location: Coord<f64>) -> Result<(), ValidationError> {
    let Coord { x, y } = location;
    let valid = x.is_finite()
        && y.is_finite()
        && (-180.0..=180.0).contains(&x)
        && (-90.0..=90.0).contains(&y);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinates {
            longitude: x,
            latitude: y,
        })
    }
}

fn to_point(location: Coord<f64>) -> Point {
    Point::from(&LatLng::from_degrees(location.y, location.x))
}

/// Cell containing `location` at `level`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCoordinates`] for positions rejected by
/// [`validate_location`].
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use housing_core::spatial::cell_of;
///
/// # fn main() -> Result<(), housing_core::ValidationError> {
/// let cell = cell_of(Coord { x: 37.6, y: 55.7 }, 13)?;
/// assert_eq!(cell.level(), 13);
/// # Ok(())
/// # }
/// ```
pub fn cell_of(location: Coord<f64>, level: u8) -> Result<CellId, ValidationError> {
    validate_location(location)?;
    let leaf = CellID::from(&to_point(location));
    Ok(CellId(leaf.parent(u64::from(level.min(MAX_LEVEL))).0))
}

/// Cells covering the disc described by `area`.
///
/// Cells sit between level 0 and the storage level, and there are at most
/// `config.max_cells` of them. The result is sorted and free of overlaps. An unbounded area or an invalid
/// centre yields an empty set, which callers treat as "no spatial
/// constraint".
#[must_use]
pub fn cells_covering(area: &SearchArea, config: &SpatialConfig) -> Vec<CellId> {
    if area.is_unbounded() || validate_location(area.centre).is_err() {
        return Vec::new();
    }

    let level = config.storage_level.min(MAX_LEVEL);
    let cap = Cap::from_center_angle(&to_point(area.centre), &radius_angle(area.radius_meters));
    let coverer = RegionCoverer {
        min_level: 0,
        max_level: level,
        level_mod: 1,
        max_cells: config.max_cells.max(MIN_CELLS),
    };

    let cells: Vec<CellId> = coverer
        .covering(&cap)
        .0
        .into_iter()
        .map(|cell| CellId(cell.0))
        .collect();
    log::debug!(
        "covered {}m disc with {} cells at levels up to {level}",
        area.radius_meters,
        cells.len()
    );
    cells
}

/// Storage-key ranges matching every stored cell inside the disc.
///
/// Each covering cell becomes the span of its leaf descendants; neighbouring
/// spans on the same face are merged. Spans never cross a face boundary, so
/// their bounds keep their order as signed [`CellId::storage_key`] values.
///
/// # Examples
///
/// ```
/// use housing_core::spatial::{SearchArea, SpatialConfig, cell_of, ranges_covering};
///
/// # fn main() -> Result<(), housing_core::ValidationError> {
/// let config = SpatialConfig::default();
/// let ranges = ranges_covering(&SearchArea::new(37.6, 55.7, 300_000.0), &config);
/// let centre = cell_of(geo::Coord { x: 37.6, y: 55.7 }, config.storage_level)?;
/// assert!(ranges.len() <= config.max_cells);
/// assert!(ranges.iter().any(|range| range.contains(centre)));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn ranges_covering(area: &SearchArea, config: &SpatialConfig) -> Vec<CellRange> {
    let mut ranges: Vec<CellRange> = Vec::new();
    for cell in cells_covering(area, config) {
        let next = CellRange::of(cell);
        match ranges.last_mut() {
            Some(last) if last.adjoins(next) => last.last = next.last,
            _ => ranges.push(next),
        }
    }
    ranges
}

#[expect(clippy::float_arithmetic, reason = "arc length to central angle")]
fn radius_angle(radius_meters: f64) -> Angle {
    Angle::from(Rad(radius_meters / EARTH_RADIUS_METERS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MOSCOW: Coord<f64> = Coord { x: 37.6, y: 55.7 };

    #[rstest]
    #[case(0.0)]
    #[case(-10.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn non_positive_radius_yields_no_cells(#[case] radius: f64) {
        let area = SearchArea {
            centre: MOSCOW,
            radius_meters: radius,
        };
        assert!(cells_covering(&area, &SpatialConfig::default()).is_empty());
    }

    #[rstest]
    fn zero_sentinel_is_unbounded() {
        assert!(SearchArea::default().is_unbounded());
    }

    #[rstest]
    fn invalid_centre_yields_no_cells() {
        let area = SearchArea::new(200.0, 55.7, 1_000.0);
        assert!(cells_covering(&area, &SpatialConfig::default()).is_empty());
    }

    #[rstest]
    #[case(Coord { x: 181.0, y: 0.0 })]
    #[case(Coord { x: 0.0, y: -90.5 })]
    #[case(Coord { x: f64::NAN, y: 0.0 })]
    fn rejects_invalid_locations(#[case] location: Coord<f64>) {
        assert!(matches!(
            cell_of(location, 13),
            Err(ValidationError::InvalidCoordinates { .. })
        ));
    }

    #[rstest]
    #[case(10)]
    #[case(13)]
    #[case(16)]
    fn cell_of_reports_requested_level(#[case] level: u8) {
        let cell = cell_of(MOSCOW, level).expect("valid location");
        assert_eq!(cell.level(), u64::from(level));
    }

    #[rstest]
    fn covering_stops_at_storage_level_and_contains_centre() {
        let config = SpatialConfig::default();
        let area = SearchArea {
            centre: MOSCOW,
            radius_meters: 2_000.0,
        };
        let cells = cells_covering(&area, &config);
        assert!(!cells.is_empty());
        assert!(
            cells
                .iter()
                .all(|cell| cell.level() <= u64::from(config.storage_level))
        );
        let centre = cell_of(MOSCOW, config.storage_level).expect("valid location");
        assert!(
            ranges_covering(&area, &config)
                .iter()
                .any(|range| range.contains(centre))
        );
    }

    #[rstest]
    fn covering_is_sorted_and_unique() {
        let area = SearchArea {
            centre: MOSCOW,
            radius_meters: 5_000.0,
        };
        let cells = cells_covering(&area, &SpatialConfig::default());
        assert!(cells.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
    }

    #[rstest]
    #[case(300_000.0)]
    #[case(2_500_000.0)]
    #[case(20_000_000.0)]
    fn wide_discs_stay_within_the_cell_budget(#[case] radius: f64) {
        let config = SpatialConfig::default();
        let area = SearchArea {
            centre: MOSCOW,
            radius_meters: radius,
        };
        let cells = cells_covering(&area, &config);
        assert!(!cells.is_empty());
        assert!(cells.len() <= config.max_cells, "{} cells", cells.len());
        assert!(ranges_covering(&area, &config).len() <= cells.len());
    }

    #[rstest]
    fn tiny_budgets_are_raised_to_six_cells() {
        let config = SpatialConfig {
            max_cells: 0,
            ..SpatialConfig::default()
        };
        let area = SearchArea::new(0.0, 90.0, 20_000_000.0);
        let cells = cells_covering(&area, &config);
        assert!(!cells.is_empty());
        assert!(cells.len() <= 6);
    }

    #[rstest]
    fn cell_range_spans_descendants_only() {
        let parent = cell_of(MOSCOW, 10).expect("valid location");
        let child = cell_of(MOSCOW, 13).expect("valid location");
        let range = CellRange::of(parent);
        assert!(range.contains(parent));
        assert!(range.contains(child));
        let elsewhere = cell_of(Coord { x: 30.3, y: 59.9 }, 13).expect("valid location");
        assert!(!range.contains(elsewhere));
    }

    #[rstest]
    fn adjacent_ranges_merge_within_a_face() {
        let cell = CellID(cell_of(MOSCOW, 13).expect("valid location").0);
        let first = CellRange::of(CellId(cell.0));
        let second = CellRange::of(CellId(cell.next().0));
        assert!(first.adjoins(second));
        assert!(!second.adjoins(first));
    }

    #[rstest]
    fn ranges_never_cross_a_face() {
        let last_of_face_three = CellRange::of(CellId(CellID::from_face(3).range_max().0));
        let first_of_face_four = CellRange::of(CellId(CellID::from_face(4).range_min().0));
        assert!(!last_of_face_three.adjoins(first_of_face_four));
        assert!(
            first_of_face_four.first.storage_key() < 0
                && last_of_face_three.last.storage_key() > 0
        );
    }

    #[rstest]
    fn signed_keys_keep_their_order_within_a_face() {
        let face = CellRange::of(CellId(CellID::from_face(5).0));
        let inner = cell_of(Coord { x: 0.0, y: -89.0 }, 13).expect("valid location");
        assert!(face.contains(inner));
        assert!(face.first.storage_key() <= inner.storage_key());
        assert!(inner.storage_key() <= face.last.storage_key());
    }

    #[rstest]
    #[case(i64::MIN)]
    #[case(-1)]
    #[case(0)]
    #[case(i64::MAX)]
    fn storage_key_round_trips(#[case] key: i64) {
        assert_eq!(CellId::from_storage_key(key).storage_key(), key);
    }

    #[rstest]
    fn storage_level_is_clamped() {
        assert_eq!(SpatialConfig::with_storage_level(42).storage_level, MAX_LEVEL);
    }
}
