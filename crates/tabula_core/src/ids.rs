//! Strongly typed identifiers.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }
    };
}

id_type!(
    /// Identifier of a table.
    TableId
);
id_type!(
    /// Identifier of a field (column).
    FieldId
);
id_type!(
    /// Identifier of a row.
    RowId
);
id_type!(
    /// Identifier of a view.
    ViewId
);
id_type!(
    /// Identifier of a view filter.
    FilterId
);
id_type!(
    /// Identifier of a view sort.
    SortId
);
id_type!(
    /// Identifier of an authenticated user.
    UserId
);
