pub mod artifact;
pub mod table;
pub mod xlsx;

pub use artifact::{ArtifactWriter, REPORT_SUFFIX};
pub use table::Table;
pub use xlsx::export;

/// MIME type of the exported workbook.
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name of the only worksheet in the exported workbook.
pub const SHEET_NAME: &str = "Sheet1";
