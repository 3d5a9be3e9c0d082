//! Lead sheet parser for CSV and Excel uploads.
//!
//! Agencies bring lead lists in whatever shape their spreadsheets happen to
//! have, so parsing is two-phase: read every row into a header-keyed map,
//! then resolve the portal fields through alias tables. Rows that cannot
//! become a lead are reported back with the reason instead of failing the
//! whole upload.

use std::collections::HashMap;
use std::io::Cursor;

use abportal_models::{normalize_email, Lead};
use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, DataType, Reader, Xlsx};
use serde::{Deserialize, Serialize};

use crate::validation::validate_email_address;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    /// Guess the format from a file name, falling back to the content type.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".csv") {
            return Some(SheetFormat::Csv);
        }
        if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            return Some(SheetFormat::Xlsx);
        }
        match content_type {
            Some(ct) if ct.contains("csv") || ct.contains("text/plain") => Some(SheetFormat::Csv),
            Some(ct) if ct.contains("spreadsheet") || ct.contains("excel") => {
                Some(SheetFormat::Xlsx)
            }
            _ => None,
        }
    }
}

/// One row that resolved to at least a student name and a usable email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRow {
    pub row_number: usize,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub destination_country: Option<String>,
    pub study_level: Option<String>,
    pub course_interest: Option<String>,
    pub intake: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// A row the parser refused, with the first reason it found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

/// Everything a single upload produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedLeadSheet {
    pub headers: Vec<String>,
    pub rows: Vec<LeadRow>,
    pub skipped: Vec<SkippedRow>,
    pub total_rows: usize,
}

impl ParsedLeadSheet {
    /// Convert the accepted rows into leads owned by the importing agency.
    pub fn into_leads(self, agency: &str, sub_agent: Option<&str>) -> Vec<Lead> {
        self.rows
            .into_iter()
            .map(|row| {
                let mut lead = Lead::new(row.student_name, row.student_email, agency.to_string());
                lead.student_phone = row.student_phone;
                lead.destination_country = row.destination_country;
                lead.study_level = row.study_level;
                lead.course_interest = row.course_interest;
                lead.intake = row.intake;
                lead.source = row.source.or(Some("sheet_import".to_string()));
                lead.notes = row.notes;
                lead.assign_sub_agent(sub_agent);
                lead
            })
            .collect()
    }
}

const NAME_ALIASES: &[&str] = &["student_name", "name", "student", "full_name", "applicant"];
const EMAIL_ALIASES: &[&str] = &["student_email", "email", "e-mail", "email_address", "mail"];
const PHONE_ALIASES: &[&str] = &["student_phone", "phone", "mobile", "phone_number", "contact"];
const DESTINATION_ALIASES: &[&str] = &[
    "destination_country",
    "destination",
    "country",
    "study_destination",
];
const LEVEL_ALIASES: &[&str] = &["study_level", "level", "degree", "program_level"];
const COURSE_ALIASES: &[&str] = &["course_interest", "course", "program", "course_name"];
const INTAKE_ALIASES: &[&str] = &["intake", "intake_month", "start_date", "session"];
const SOURCE_ALIASES: &[&str] = &["source", "lead_source", "channel", "campaign"];
const NOTES_ALIASES: &[&str] = &["notes", "remarks", "comments", "note"];

/// Parser for agency lead sheets.
pub struct LeadSheetParser;

impl LeadSheetParser {
    /// Parse raw upload bytes in the given format.
    pub fn parse_bytes(data: &[u8], format: SheetFormat) -> Result<ParsedLeadSheet> {
        let (headers, raw_rows) = match format {
            SheetFormat::Csv => Self::read_csv(data)?,
            SheetFormat::Xlsx => Self::read_xlsx(data)?,
        };
        Ok(Self::resolve_rows(headers, raw_rows))
    }

    fn read_csv(data: &[u8]) -> Result<(Vec<String>, Vec<HashMap<String, String>>)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .context("failed to read CSV headers")?
            .iter()
            .map(normalize_header)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("failed to read CSV record")?;
            let mut row = HashMap::new();
            for (idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(idx) {
                    row.insert(header.clone(), value.trim().to_string());
                }
            }
            rows.push(row);
        }

        Ok((headers, rows))
    }

    fn read_xlsx(data: &[u8]) -> Result<(Vec<String>, Vec<HashMap<String, String>>)> {
        let cursor = Cursor::new(data.to_vec());
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(cursor).context("failed to open Excel workbook")?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .context("workbook has no sheets")?;
        let range = workbook
            .worksheet_range(&sheet_name)
            .context("failed to locate worksheet")?
            .context("failed to read worksheet")?;

        let mut iter = range.rows();
        let headers: Vec<String> = iter
            .next()
            .context("worksheet has no header row")?
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();

        let mut rows = Vec::new();
        for cells in iter {
            let mut row = HashMap::new();
            for (idx, cell) in cells.iter().enumerate() {
                if let Some(header) = headers.get(idx) {
                    let value = match cell {
                        DataType::Empty => String::new(),
                        other => other.to_string().trim().to_string(),
                    };
                    row.insert(header.clone(), value);
                }
            }
            rows.push(row);
        }

        Ok((headers, rows))
    }

    fn resolve_rows(
        headers: Vec<String>,
        raw_rows: Vec<HashMap<String, String>>,
    ) -> ParsedLeadSheet {
        let total_rows = raw_rows.len();
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut seen_emails: Vec<String> = Vec::new();

        // Data rows start at 2: row 1 is the header.
        for (idx, raw) in raw_rows.into_iter().enumerate() {
            let row_number = idx + 2;

            if raw.values().all(|v| v.is_empty()) {
                skipped.push(SkippedRow {
                    row_number,
                    reason: "empty row".to_string(),
                });
                continue;
            }

            let Some(student_name) = find_value(&raw, NAME_ALIASES) else {
                skipped.push(SkippedRow {
                    row_number,
                    reason: "missing student name".to_string(),
                });
                continue;
            };

            let Some(raw_email) = find_value(&raw, EMAIL_ALIASES) else {
                skipped.push(SkippedRow {
                    row_number,
                    reason: "missing student email".to_string(),
                });
                continue;
            };

            let student_email = normalize_email(&raw_email);
            if validate_email_address(&student_email).is_err() {
                skipped.push(SkippedRow {
                    row_number,
                    reason: format!("invalid student email '{}'", raw_email),
                });
                continue;
            }

            if seen_emails.contains(&student_email) {
                skipped.push(SkippedRow {
                    row_number,
                    reason: format!("duplicate student email '{}'", student_email),
                });
                continue;
            }
            seen_emails.push(student_email.clone());

            rows.push(LeadRow {
                row_number,
                student_name,
                student_email,
                student_phone: find_value(&raw, PHONE_ALIASES),
                destination_country: find_value(&raw, DESTINATION_ALIASES),
                study_level: find_value(&raw, LEVEL_ALIASES),
                course_interest: find_value(&raw, COURSE_ALIASES),
                intake: find_value(&raw, INTAKE_ALIASES),
                source: find_value(&raw, SOURCE_ALIASES),
                notes: find_value(&raw, NOTES_ALIASES),
            });
        }

        ParsedLeadSheet {
            headers,
            rows,
            skipped,
            total_rows,
        }
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

fn find_value(row: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        if let Some(value) = row.get(*alias) {
            if !value.is_empty() {
                return Some(value.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE_CSV: &[u8] = b"Student Name,Email,Phone,Destination,Course\n\
        Asha Rao,ASHA@example.com,+61 400 111 222,Australia,MBA\n\
        ,missing.name@example.com,,,\n\
        Liu Wei,not-an-email,,Canada,Nursing\n\
        Priya Nair,priya@example.com,,UK,Law\n";

    #[test]
    fn parses_csv_with_aliased_headers() {
        let parsed = LeadSheetParser::parse_bytes(SAMPLE_CSV, SheetFormat::Csv).unwrap();

        assert_eq!(parsed.total_rows, 4);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped.len(), 2);

        let first = &parsed.rows[0];
        assert_eq!(first.row_number, 2);
        assert_eq!(first.student_name, "Asha Rao");
        assert_eq!(first.student_email, "asha@example.com");
        assert_eq!(first.destination_country.as_deref(), Some("Australia"));
        assert_eq!(first.course_interest.as_deref(), Some("MBA"));
    }

    #[test]
    fn reports_skip_reasons() {
        let parsed = LeadSheetParser::parse_bytes(SAMPLE_CSV, SheetFormat::Csv).unwrap();

        assert_eq!(parsed.skipped[0].row_number, 3);
        assert!(parsed.skipped[0].reason.contains("missing student name"));
        assert_eq!(parsed.skipped[1].row_number, 4);
        assert!(parsed.skipped[1].reason.contains("invalid student email"));
    }

    #[test]
    fn skips_duplicate_emails_within_sheet() {
        let csv = b"name,email\nA One,dup@example.com\nA Two,DUP@example.com\n";
        let parsed = LeadSheetParser::parse_bytes(csv, SheetFormat::Csv).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].reason.contains("duplicate"));
    }

    #[test]
    fn into_leads_attaches_agency_and_default_source() {
        let parsed = LeadSheetParser::parse_bytes(SAMPLE_CSV, SheetFormat::Csv).unwrap();
        let leads = parsed.into_leads("head@agency.example", Some("junior@agency.example"));

        assert_eq!(leads.len(), 2);
        assert!(leads.iter().all(|l| l.agency == "head@agency.example"));
        assert_eq!(leads[1].source.as_deref(), Some("sheet_import"));
        assert_eq!(leads[0].sub_agent.as_deref(), Some("junior@agency.example"));
    }

    #[test]
    fn detects_format_from_filename_and_content_type() {
        assert_eq!(
            SheetFormat::detect("leads.CSV", None),
            Some(SheetFormat::Csv)
        );
        assert_eq!(
            SheetFormat::detect("leads.xlsx", None),
            Some(SheetFormat::Xlsx)
        );
        assert_eq!(
            SheetFormat::detect("upload", Some("text/csv")),
            Some(SheetFormat::Csv)
        );
        assert_eq!(SheetFormat::detect("upload.pdf", None), None);
    }

    proptest! {
        /// Every data row ends up either accepted or skipped, never lost.
        #[test]
        fn accepted_plus_skipped_covers_all_rows(
            rows in prop::collection::vec(
                ("[A-Za-z ]{0,12}", "[a-z0-9.]{0,10}", "[0-9 +]{0,8}"),
                0..30,
            )
        ) {
            let mut csv = String::from("name,email,phone\n");
            for (name, local, phone) in &rows {
                let email = if local.is_empty() {
                    String::new()
                } else {
                    format!("{}@example.com", local)
                };
                csv.push_str(&format!("{},{},{}\n", name.trim(), email, phone));
            }

            let parsed = LeadSheetParser::parse_bytes(csv.as_bytes(), SheetFormat::Csv).unwrap();
            prop_assert_eq!(parsed.total_rows, rows.len());
            prop_assert_eq!(parsed.rows.len() + parsed.skipped.len(), rows.len());
        }
    }
}
