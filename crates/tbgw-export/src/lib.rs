//! Output encodings for aggregated telemetry series.
//!
//! All encoders are pure transformations over an already-fetched
//! [`AggregatedSeries`]; they never touch the network. The flattened
//! formats (CSV, JSON Lines) carry the same `(key, ts, value)` triples as
//! the JSON object form, just reshaped.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;

use tbgw_models::AggregatedSeries;

mod workbook;

pub use workbook::to_xlsx;

/// Encoding error.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encoded output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFormat {
    /// Single JSON object, key -> array of points.
    Json,
    /// Newline-delimited records, one `{"ts":..,"key":..,"value":..}` per line.
    JsonLines,
    /// Flattened rows `ts,key,value` with a header line.
    Csv,
    /// Workbook with one sheet per key.
    Xlsx,
}

impl SeriesFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            SeriesFormat::Json => "application/json",
            SeriesFormat::JsonLines => "application/json-lines",
            SeriesFormat::Csv => "text/csv",
            SeriesFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            SeriesFormat::Json => "json",
            SeriesFormat::JsonLines => "jsonl",
            SeriesFormat::Csv => "csv",
            SeriesFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for SeriesFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_extension())
    }
}

/// Unknown format name.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unsupported format '{0}', expected json, jsonl, csv or xlsx")]
pub struct UnknownFormat(String);

impl FromStr for SeriesFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SeriesFormat::Json),
            "jsonl" => Ok(SeriesFormat::JsonLines),
            "csv" => Ok(SeriesFormat::Csv),
            "xlsx" => Ok(SeriesFormat::Xlsx),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Encode as a single JSON object, identical in structure to the upstream
/// response but unbounded in length.
pub fn to_json(series: &AggregatedSeries) -> Result<Value, ExportError> {
    Ok(serde_json::to_value(series)?)
}

/// Encode as newline-delimited JSON records.
pub fn to_json_lines(series: &AggregatedSeries) -> Result<String, ExportError> {
    let mut out = String::new();
    for (key, points) in series.iter() {
        for point in points {
            let record = json!({ "ts": point.ts, "key": key, "value": point.value });
            out.push_str(&serde_json::to_string(&record)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Encode as flattened CSV rows with a `ts,key,value` header.
pub fn to_csv(series: &AggregatedSeries) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["ts", "key", "value"])?;
    for (key, points) in series.iter() {
        for point in points {
            let ts = point.ts.to_string();
            let value = point.value_as_cell();
            writer.write_record([ts.as_str(), key, value.as_str()])?;
        }
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tbgw_models::DataPoint;

    fn sample_series() -> AggregatedSeries {
        let mut series = AggregatedSeries::new();
        series.extend_key(
            "temperature",
            vec![DataPoint::new(1000, 23.5), DataPoint::new(2000, 24.0)],
        );
        series.extend_key("state", vec![DataPoint::new(1500, "ON")]);
        series.insert_key("empty");
        series
    }

    fn triples_from_json(value: &Value) -> BTreeSet<(String, i64, String)> {
        let mut set = BTreeSet::new();
        for (key, points) in value.as_object().unwrap() {
            for point in points.as_array().unwrap() {
                set.insert((
                    key.clone(),
                    point["ts"].as_i64().unwrap(),
                    cell(&point["value"]),
                ));
            }
        }
        set
    }

    fn cell(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<SeriesFormat>().unwrap(), SeriesFormat::Json);
        assert_eq!("jsonl".parse::<SeriesFormat>().unwrap(), SeriesFormat::JsonLines);
        assert!("parquet".parse::<SeriesFormat>().is_err());
    }

    #[test]
    fn test_csv_header_and_rows() {
        let out = to_csv(&sample_series()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("ts,key,value"));
        // 3 data rows, empty key contributes none.
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_json_lines_one_record_per_point() {
        let out = to_json_lines(&sample_series()).unwrap();
        assert_eq!(out.lines().count(), 3);
        let first: Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert!(first.get("ts").is_some());
        assert!(first.get("key").is_some());
    }

    // The flattened encodings carry exactly the same (key, ts, value)
    // triples as the JSON object form.
    #[test]
    fn test_format_equivalence() {
        let series = sample_series();

        let json_triples = triples_from_json(&to_json(&series).unwrap());

        let mut jsonl_triples = BTreeSet::new();
        for line in to_json_lines(&series).unwrap().lines() {
            let record: Value = serde_json::from_str(line).unwrap();
            jsonl_triples.insert((
                record["key"].as_str().unwrap().to_string(),
                record["ts"].as_i64().unwrap(),
                cell(&record["value"]),
            ));
        }

        let mut csv_triples = BTreeSet::new();
        let csv_out = to_csv(&series).unwrap();
        let mut reader = csv::Reader::from_reader(csv_out.as_bytes());
        for row in reader.records() {
            let row = row.unwrap();
            csv_triples.insert((
                row[1].to_string(),
                row[0].parse::<i64>().unwrap(),
                row[2].to_string(),
            ));
        }

        assert_eq!(json_triples.len(), 3);
        assert_eq!(json_triples, jsonl_triples);
        assert_eq!(json_triples, csv_triples);
    }
}
