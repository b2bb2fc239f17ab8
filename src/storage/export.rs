//! Spreadsheet (CSV) export of the master report.

use std::path::Path;

use crate::error::Result;
use crate::models::{REPORT_COLUMNS, ReportRow};
use crate::storage::local::write_atomic;

const SEPARATOR: char = ',';

/// Render the report as CSV with a header row.
pub fn encode_csv(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    push_row(&mut out, REPORT_COLUMNS.iter().copied());
    for row in rows {
        let record = row.to_record();
        push_row(&mut out, record.iter().map(String::as_str));
    }
    out
}

/// Write the report as CSV, replacing `path` atomically.
pub async fn export_csv(rows: &[ReportRow], path: &Path) -> Result<()> {
    write_atomic(path, encode_csv(rows).as_bytes()).await?;
    log::info!("Exported {} report rows to {}", rows.len(), path.display());
    Ok(())
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DepartureCandidate, TripLeg, TripRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn row(port: &str) -> ReportRow {
        let extracted_at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let trip = TripRecord {
            current: TripLeg::new(Some(port.into()), Some("2026-10-19 06:40".into()), None, None),
            previous: TripLeg::default(),
        };
        ReportRow::from_trip(
            &DepartureCandidate::new("247123400".into(), "Livorno"),
            &trip,
            extracted_at,
        )
    }

    #[test]
    fn test_header_only_for_empty_report() {
        let csv = encode_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("MMSI,Reference Port,"));
    }

    #[test]
    fn test_quotes_fields_with_separators_and_quotes() {
        let csv = encode_csv(&[row("Porto \"Vecchio\", Nord")]);
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("247123400,Livorno,\"Porto \"\"Vecchio\"\", Nord\",19/10/2026,06:40,"));
        assert!(line.ends_with(",2026-10-19 12:00:00"));
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/report.csv");

        export_csv(&[row("Livorno")], &path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
