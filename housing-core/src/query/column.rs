//! Allow-listed columns for filters, orderings and partial updates.
//!
//! Column names never reach SQL from caller input: callers name a column, the
//! name is resolved against one of these enums, and only the enum's static
//! SQL name is embedded in a statement.

use std::{fmt, hash::Hash, str::FromStr};

use crate::ValidationError;

/// Storage type of a column, used to type-check caller values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Signed 64-bit integer.
    Integer,
    /// Finite floating point number.
    Real,
    /// Boolean flag.
    Bool,
    /// UTF-8 text.
    Text,
    /// UTC timestamp.
    Timestamp,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "boolean",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A column of one table in the allow-list.
pub trait Column: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Table the column belongs to.
    const TABLE: &'static str;

    /// SQL name embedded in statements.
    fn name(self) -> &'static str;

    /// Storage type of the column.
    fn kind(self) -> ColumnKind;

    /// Whether the column may hold SQL `NULL`.
    fn is_nullable(self) -> bool;

    /// Whether callers may assign the column in a partial update.
    fn is_updatable(self) -> bool;

    /// Resolve a caller-supplied name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownColumn`] when `name` is not in the
    /// allow-list.
    fn parse(name: &str) -> Result<Self, ValidationError>;
}

fn has_flag(flags: &[&str], flag: &str) -> bool {
    flags.contains(&flag)
}

macro_rules! columns {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $table:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $sql:literal as $kind:ident $([$($flag:ident),+])?,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every column in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl Column for $name {
            const TABLE: &'static str = $table;

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $sql,)+
                }
            }

            fn kind(self) -> ColumnKind {
                match self {
                    $(Self::$variant => ColumnKind::$kind,)+
                }
            }

            fn is_nullable(self) -> bool {
                match self {
                    $(Self::$variant => has_flag(&[$($(stringify!($flag)),+)?], "nullable"),)+
                }
            }

            fn is_updatable(self) -> bool {
                match self {
                    $(Self::$variant => !has_flag(&[$($(stringify!($flag)),+)?], "derived"),)+
                }
            }

            fn parse(name: &str) -> Result<Self, ValidationError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|column| column.name() == name)
                    .ok_or_else(|| ValidationError::UnknownColumn {
                        table: $table,
                        name: name.to_owned(),
                    })
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as Column>::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

columns! {
    /// Columns of the `flats` table.
    pub enum LotColumn in "flats" {
        /// Primary key.
        Id => "id" as Integer [derived],
        /// Owning user.
        OwnerId => "owner_id" as Integer [derived],
        /// Postal address.
        Address => "address" as Text,
        /// Longitude in degrees.
        Longitude => "long" as Real,
        /// Latitude in degrees.
        Latitude => "lat" as Real,
        /// Grid cell derived from the coordinates.
        CellId => "cell_id" as Integer [derived],
        /// Monthly rent.
        Price => "price" as Integer,
        /// Security deposit.
        Deposit => "deposit" as Integer,
        /// Free-form description.
        Description => "description" as Text [nullable],
        /// Minutes to the metro on foot.
        TimeToMetroOnFoot => "time_to_metro_on_foot" as Integer,
        /// Minutes to the metro by transport.
        TimeToMetroByTransport => "time_to_metro_by_transport" as Integer,
        /// Nearest metro station.
        MetroStation => "metro_station" as Text [nullable],
        /// Floor of the flat.
        Floor => "floor" as Integer,
        /// Floors in the building.
        FloorTotal => "floor_total" as Integer,
        /// Total area in square metres.
        Area => "area" as Integer,
        /// Repair grade.
        Repair => "repair" as Integer,
        /// Preferred resident sex.
        Sex => "sex" as Integer,
        /// Passenger elevator.
        PassElevator => "pass_elevator" as Bool,
        /// Service elevator.
        ServiceElevator => "service_elevator" as Bool,
        /// Kitchen.
        Kitchen => "kitchen" as Bool,
        /// Microwave oven.
        MicrowaveOven => "microwave_oven" as Bool,
        /// Bathroom.
        Bathroom => "bathroom" as Bool,
        /// Refrigerator.
        Refrigerator => "refrigerator" as Bool,
        /// Dishwasher.
        Dishwasher => "dishwasher" as Bool,
        /// Stove.
        Stove => "stove" as Bool,
        /// Vacuum cleaner.
        VacuumCleaner => "vacuum_cleaner" as Bool,
        /// Clothes dryer.
        Dryer => "dryer" as Bool,
        /// Wired internet.
        Internet => "internet" as Bool,
        /// Pets allowed.
        Animals => "animals" as Bool,
        /// Smoking allowed.
        Smoking => "smoking" as Bool,
        /// Heating.
        Heating => "heating" as Bool,
        /// Air conditioner.
        Conditioner => "conditioner" as Bool,
        /// Wireless internet.
        Wifi => "wifi" as Bool,
        /// Visible to non-owners.
        IsVisible => "is_visible" as Bool,
        /// Template rather than advertisement.
        IsConstructor => "is_constructor" as Bool,
        /// Creation time.
        CreatedAt => "created_at" as Timestamp [derived],
        /// Time of the last write.
        UpdatedAt => "updated_at" as Timestamp [derived],
    }
}

columns! {
    /// Columns of the `rooms` table.
    pub enum RoomColumn in "rooms" {
        /// Primary key.
        Id => "id" as Integer [derived],
        /// Owning lot.
        FlatId => "flat_id" as Integer [derived],
        /// Maximum number of residents.
        MaxResidents => "max_residents" as Integer,
        /// Free-form description.
        Description => "description" as Text [nullable],
        /// Monthly rent.
        Price => "price" as Integer,
        /// Security deposit.
        Deposit => "deposit" as Integer,
        /// Current number of residents.
        CurrNumberOfResidents => "curr_number_of_residents" as Integer,
        /// Balcony access.
        Balcony => "balcony" as Bool,
        /// Number of tables.
        NumOfTables => "num_of_tables" as Integer,
        /// Number of chairs.
        NumOfChairs => "num_of_chairs" as Integer,
        /// Television.
        Tv => "tv" as Bool,
        /// Furnished.
        Furniture => "furniture" as Bool,
        /// Area in square metres.
        Area => "area" as Integer,
        /// Number of windows.
        Windows => "windows" as Integer,
        /// Visible to non-owners.
        IsVisible => "is_visible" as Bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("area", LotColumn::Area)]
    #[case("long", LotColumn::Longitude)]
    #[case("is_constructor", LotColumn::IsConstructor)]
    fn parses_allow_listed_names(#[case] name: &str, #[case] expected: LotColumn) {
        assert_eq!(name.parse::<LotColumn>(), Ok(expected));
    }

    #[rstest]
    #[case("area; DROP TABLE flats")]
    #[case("AREA")]
    #[case("")]
    fn rejects_names_outside_allow_list(#[case] name: &str) {
        assert!(matches!(
            LotColumn::parse(name),
            Err(ValidationError::UnknownColumn { table: "flats", .. })
        ));
    }

    #[rstest]
    fn derived_columns_are_not_updatable() {
        let derived: Vec<_> = LotColumn::ALL
            .iter()
            .filter(|column| !column.is_updatable())
            .map(|column| column.name())
            .collect();
        assert_eq!(
            derived,
            vec!["id", "owner_id", "cell_id", "created_at", "updated_at"]
        );
        assert!(!RoomColumn::FlatId.is_updatable());
        assert!(RoomColumn::Area.is_updatable());
    }

    #[rstest]
    fn only_descriptive_text_is_nullable() {
        assert!(LotColumn::Description.is_nullable());
        assert!(LotColumn::MetroStation.is_nullable());
        assert!(!LotColumn::Address.is_nullable());
        assert!(RoomColumn::Description.is_nullable());
    }

    #[rstest]
    fn names_are_unique() {
        let mut names: Vec<_> = LotColumn::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LotColumn::ALL.len());
    }
}
