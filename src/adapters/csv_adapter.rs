//! CSV file data adapter and history export.
//!
//! Two layouts are accepted: wide (`date,ID1,ID2,..`, one row per date) and
//! long (`date,identifier,value`, one row per observation). Empty cells are
//! missing values.

use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use crate::domain::history::History;
use crate::ports::data_port::{DataSource, LoadOptions};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const LONG_HEADER: [&str; 3] = ["date", "identifier", "value"];

pub struct CsvSource {
    name: String,
    path: PathBuf,
    frame: Frame,
}

impl CsvSource {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
            frame: Frame::default(),
        }
    }

    fn data_err(&self, reason: impl std::fmt::Display) -> QuantkitError {
        QuantkitError::DataLoad {
            source_name: self.name.clone(),
            reason: format!("{}: {reason}", self.path.display()),
        }
    }

    fn schema_err(&self, reason: impl Into<String>) -> QuantkitError {
        QuantkitError::Schema {
            source_name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn parse_date(&self, raw: &str, line: usize) -> Result<NaiveDate, QuantkitError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| self.schema_err(format!("line {line}: invalid date '{raw}': {e}")))
    }

    fn parse_value(&self, raw: &str, line: usize) -> Result<f64, QuantkitError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(f64::NAN);
        }
        raw.parse()
            .map_err(|e| self.schema_err(format!("line {line}: invalid value '{raw}': {e}")))
    }

    fn read_frame(&self) -> Result<Frame, QuantkitError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| self.data_err(e))?;
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| self.data_err(e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.first().map(|h| h.to_lowercase()) != Some("date".to_string()) {
            return Err(self.schema_err("first column must be 'date'"));
        }

        let is_long = headers.len() == 3
            && headers
                .iter()
                .zip(LONG_HEADER)
                .all(|(h, expected)| h.eq_ignore_ascii_case(expected));

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        let mut records = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| self.schema_err(format!("line {line}: {e}")))?;
            let date = self.parse_date(record.get(0).unwrap_or_default(), line)?;

            if is_long {
                let id = record.get(1).unwrap_or_default().trim();
                if id.is_empty() {
                    return Err(self.schema_err(format!("line {line}: empty identifier")));
                }
                let value = self.parse_value(record.get(2).unwrap_or_default(), line)?;
                records.push((date, id.to_string(), value));
            } else {
                if record.len() != headers.len() {
                    return Err(self.schema_err(format!(
                        "line {line}: expected {} fields, found {}",
                        headers.len(),
                        record.len()
                    )));
                }
                let row = record
                    .iter()
                    .skip(1)
                    .map(|raw| self.parse_value(raw, line))
                    .collect::<Result<Vec<f64>, _>>()?;
                dates.push(date);
                rows.push(row);
            }
        }

        let frame = if is_long {
            Frame::from_records(&records)
        } else {
            Frame::new(dates, headers[1..].to_vec(), rows)
        };
        frame.map_err(|e| self.schema_err(e.to_string()))
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, options: &LoadOptions) -> Result<(), QuantkitError> {
        let frame = self.read_frame()?;
        self.frame = frame.slice(options.start, options.end);
        debug!(
            source = %self.name,
            rows = self.frame.len(),
            columns = self.frame.columns().len(),
            "loaded csv"
        );
        Ok(())
    }

    fn df(&self) -> &Frame {
        &self.frame
    }
}

/// Write one row per tick: the scalar columns, then one weight column per
/// identifier ever held.
pub fn write_history_csv(history: &History, path: &Path) -> Result<(), QuantkitError> {
    let ids: BTreeSet<&String> = history
        .rows()
        .iter()
        .flat_map(|r| r.weights.keys())
        .collect();

    let to_io = |e: csv::Error| QuantkitError::Io(std::io::Error::other(e));
    let mut wtr = csv::Writer::from_path(path).map_err(to_io)?;

    let mut header = vec![
        "date".to_string(),
        "value".to_string(),
        "cash".to_string(),
        "turnover".to_string(),
        "commissions".to_string(),
        "aborted_by".to_string(),
    ];
    header.extend(ids.iter().map(|id| format!("w_{id}")));
    wtr.write_record(&header).map_err(to_io)?;

    for row in history.rows() {
        let mut record = vec![
            row.date.format("%Y-%m-%d").to_string(),
            row.value.to_string(),
            row.cash.to_string(),
            row.turnover.to_string(),
            row.commissions.to_string(),
            row.aborted_by.clone().unwrap_or_default(),
        ];
        record.extend(
            ids.iter()
                .map(|id| row.weights.get(*id).copied().unwrap_or(0.0).to_string()),
        );
        wtr.write_record(&record).map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}
