pub mod dates;
pub mod errors;
pub mod model;
mod tables;

pub use dates::{date_columns, parse_column_date, DateColumn};
pub use errors::TableError;
pub use model::{BandTable, ChangeReference, ChangeReferenceRecord, ReferenceSchema};
pub use tables::{read_band_table, read_change_reference, read_table};
