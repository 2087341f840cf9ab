pub mod archive;
pub mod error;
pub mod excel_date;
pub mod resolve;
pub mod sheet;
pub mod utm;

pub use archive::{load_archive, load_zip_archive};
pub use error::ArchiveError;
pub use excel_date::{decode_serial, SerialDateTime};
pub use resolve::{insert_params, OccurrenceResolver};
pub use sheet::{Cell, DwcSheets, Row, Sheet};
pub use utm::parse_utm;
