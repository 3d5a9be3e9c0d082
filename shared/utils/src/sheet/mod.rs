//! Lead sheet processing.
//!
//! Bulk lead import from CSV and Excel files with header-alias mapping, and
//! CSV export of role-scoped leads and payments.

pub mod export;
pub mod import;

pub use export::{leads_to_csv, payments_to_csv};
pub use import::{LeadRow, LeadSheetParser, ParsedLeadSheet, SheetFormat, SkippedRow};
