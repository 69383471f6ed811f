//! XLSX workbook encoding, one sheet per key.

use rust_xlsxwriter::Workbook;
use serde_json::Value;

use tbgw_models::AggregatedSeries;

use crate::ExportError;

/// The format caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

/// Encode as an XLSX workbook with one sheet per key and columns
/// `timestamp,value`.
pub fn to_xlsx(series: &AggregatedSeries) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();

    for (key, points) in series.iter() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(key))?;
        worksheet.write_string(0, 0, "timestamp")?;
        worksheet.write_string(0, 1, "value")?;

        for (i, point) in points.iter().enumerate() {
            let row = (i + 1) as u32;
            worksheet.write_number(row, 0, point.ts as f64)?;
            match &point.value {
                Value::Number(n) => {
                    worksheet.write_number(row, 1, n.as_f64().unwrap_or(0.0))?;
                }
                _ => {
                    worksheet.write_string(row, 1, point.value_as_cell())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_name(key: &str) -> String {
    key.chars().take(MAX_SHEET_NAME).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbgw_models::DataPoint;

    #[test]
    fn test_sheet_name_truncation() {
        let long = "a".repeat(40);
        assert_eq!(sheet_name(&long).len(), MAX_SHEET_NAME);
        assert_eq!(sheet_name("temperature"), "temperature");
    }

    #[test]
    fn test_workbook_is_nonempty_zip() {
        let mut series = AggregatedSeries::new();
        series.extend_key(
            "temperature",
            vec![DataPoint::new(1000, 23.5), DataPoint::new(2000, "OFF")],
        );
        let bytes = to_xlsx(&series).unwrap();
        // XLSX files are ZIP archives.
        assert_eq!(&bytes[..2], b"PK");
    }
}
