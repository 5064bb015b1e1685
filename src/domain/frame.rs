//! Date-indexed tabular data keyed by (date, identifier).
//!
//! Cells are `f64` with NaN standing in for a missing observation. Dates are
//! kept ascending and unique; lookups go through a date index built once at
//! construction.

use crate::domain::error::QuantkitError;
use crate::domain::numeric;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct Frame {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
    date_index: HashMap<NaiveDate, usize>,
    column_index: HashMap<String, usize>,
}

impl Frame {
    /// Build a frame from wide rows. Rows are re-sorted by date.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, QuantkitError> {
        if dates.len() != values.len() {
            return Err(QuantkitError::invalid_input(format!(
                "frame has {} dates but {} rows",
                dates.len(),
                values.len()
            )));
        }
        if let Some(row) = values.iter().find(|row| row.len() != columns.len()) {
            return Err(QuantkitError::invalid_input(format!(
                "frame row has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        let unique_columns: BTreeSet<&String> = columns.iter().collect();
        if unique_columns.len() != columns.len() {
            return Err(QuantkitError::invalid_input("duplicate frame column"));
        }

        let mut rows: Vec<(NaiveDate, Vec<f64>)> = dates.into_iter().zip(values).collect();
        rows.sort_by_key(|(date, _)| *date);
        if rows.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(QuantkitError::invalid_input("duplicate frame date"));
        }

        let (dates, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Ok(Self {
            dates,
            columns,
            values,
            date_index,
            column_index,
        })
    }

    /// An empty frame that still carries the expected columns.
    pub fn empty(columns: Vec<String>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            columns,
            column_index,
            ..Default::default()
        }
    }

    /// Pivot long `(date, identifier, value)` records into a wide frame.
    ///
    /// Columns are sorted by identifier; cells with no record are missing. A
    /// repeated (date, identifier) pair keeps the last value.
    pub fn from_records(records: &[(NaiveDate, String, f64)]) -> Result<Self, QuantkitError> {
        let columns: Vec<String> = records
            .iter()
            .map(|(_, id, _)| id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let col_pos: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut rows: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (date, id, value) in records {
            let row = rows
                .entry(*date)
                .or_insert_with(|| vec![f64::NAN; columns.len()]);
            row[col_pos[id.as_str()]] = *value;
        }

        let (dates, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Self::new(dates, columns, values)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn has_column(&self, id: &str) -> bool {
        self.column_index.contains_key(id)
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// The value at (date, id), or `None` when missing.
    pub fn get(&self, date: NaiveDate, id: &str) -> Option<f64> {
        let row = self.position(date)?;
        let col = *self.column_index.get(id)?;
        let v = self.values[row][col];
        if v.is_nan() { None } else { Some(v) }
    }

    /// All non-missing values on `date`, keyed by identifier.
    pub fn row(&self, date: NaiveDate) -> BTreeMap<String, f64> {
        let Some(row) = self.position(date) else {
            return BTreeMap::new();
        };
        self.columns
            .iter()
            .zip(&self.values[row])
            .filter(|(_, v)| !v.is_nan())
            .map(|(c, v)| (c.clone(), *v))
            .collect()
    }

    /// Whether `id` has any observation dated `date` or later.
    pub fn has_value_from(&self, id: &str, date: NaiveDate) -> bool {
        let Some(&col) = self.column_index.get(id) else {
            return false;
        };
        let start = self.dates.partition_point(|d| *d < date);
        self.values[start..].iter().any(|row| !row[col].is_nan())
    }

    /// Full column, NaN where missing.
    pub fn column(&self, id: &str) -> Option<Vec<f64>> {
        let col = *self.column_index.get(id)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }

    /// The last `len` rows ending at `date` (inclusive) for the given ids.
    ///
    /// Each returned row has one cell per id in `ids` order; unknown ids are
    /// NaN. Returns an empty window when `date` is not in the frame.
    pub fn window(&self, ids: &[String], date: NaiveDate, len: usize) -> Vec<Vec<f64>> {
        let Some(end) = self.position(date) else {
            return Vec::new();
        };
        let start = (end + 1).saturating_sub(len);
        let cols: Vec<Option<usize>> = ids
            .iter()
            .map(|id| self.column_index.get(id).copied())
            .collect();

        self.values[start..=end]
            .iter()
            .map(|row| {
                cols.iter()
                    .map(|c| c.map_or(f64::NAN, |c| row[c]))
                    .collect()
            })
            .collect()
    }

    /// Restrict to dates in `[start, end]`.
    pub fn slice(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let keep = |d: &NaiveDate| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e);
        let (dates, values): (Vec<_>, Vec<_>) = self
            .dates
            .iter()
            .zip(&self.values)
            .filter(|(d, _)| keep(d))
            .map(|(d, row)| (*d, row.clone()))
            .unzip();
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Self {
            dates,
            values,
            date_index,
            columns: self.columns.clone(),
            column_index: self.column_index.clone(),
        }
    }

    /// Per-column quantiles at `breakpoints`, ignoring missing cells.
    pub fn quantiles(
        &self,
        breakpoints: &[f64],
    ) -> Result<BTreeMap<String, Vec<f64>>, QuantkitError> {
        let columns: Vec<Vec<f64>> = (0..self.columns.len())
            .map(|c| self.values.iter().map(|row| row[c]).collect())
            .collect();
        let q = numeric::quantile_columns(&columns, breakpoints)?;
        Ok(self.columns.iter().cloned().zip(q).collect())
    }
}

/// Simple period-over-period returns of a price window, skipping any step
/// where either end is missing or the starting price is not positive.
pub fn window_returns(window: &[Vec<f64>]) -> Vec<Vec<f64>> {
    window
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let valid = prev
                .iter()
                .zip(curr)
                .all(|(p, c)| !p.is_nan() && !c.is_nan() && *p > 0.0);
            valid.then(|| prev.iter().zip(curr).map(|(p, c)| c / p - 1.0).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> Frame {
        Frame::new(
            vec![d(3), d(1), d(2)],
            vec!["A".into(), "B".into()],
            vec![
                vec![12.0, 22.0],
                vec![10.0, f64::NAN],
                vec![11.0, 21.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_sorts_rows_by_date() {
        let f = sample();
        assert_eq!(f.dates(), &[d(1), d(2), d(3)]);
        assert_eq!(f.get(d(1), "A"), Some(10.0));
        assert_eq!(f.get(d(3), "B"), Some(22.0));
    }

    #[test]
    fn missing_cells_are_none() {
        let f = sample();
        assert_eq!(f.get(d(1), "B"), None);
        assert_eq!(f.get(d(9), "A"), None);
        assert_eq!(f.get(d(1), "Z"), None);
    }

    #[test]
    fn row_skips_missing() {
        let f = sample();
        let row = f.row(d(1));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("A"), Some(&10.0));
        assert!(f.row(d(20)).is_empty());
    }

    #[test]
    fn has_value_from_looks_forward_only() {
        let f = Frame::new(
            vec![d(1), d(2), d(3)],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 1.0], vec![f64::NAN, f64::NAN], vec![2.0, f64::NAN]],
        )
        .unwrap();
        assert!(f.has_value_from("A", d(2)));
        assert!(!f.has_value_from("B", d(2)));
        assert!(f.has_value_from("B", d(1)));
        assert!(!f.has_value_from("A", d(4)));
        assert!(!f.has_value_from("Z", d(1)));
    }

    #[test]
    fn rejects_shape_errors() {
        assert!(Frame::new(vec![d(1)], vec!["A".into()], vec![]).is_err());
        assert!(Frame::new(vec![d(1)], vec!["A".into()], vec![vec![1.0, 2.0]]).is_err());
        assert!(
            Frame::new(
                vec![d(1), d(1)],
                vec!["A".into()],
                vec![vec![1.0], vec![2.0]]
            )
            .is_err()
        );
        assert!(Frame::new(vec![], vec!["A".into(), "A".into()], vec![]).is_err());
    }

    #[test]
    fn from_records_pivots() {
        let f = Frame::from_records(&[
            (d(2), "B".into(), 5.0),
            (d(1), "A".into(), 1.0),
            (d(2), "A".into(), 2.0),
        ])
        .unwrap();
        assert_eq!(f.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(f.dates(), &[d(1), d(2)]);
        assert_eq!(f.get(d(1), "B"), None);
        assert_eq!(f.get(d(2), "B"), Some(5.0));
    }

    #[test]
    fn empty_frame_keeps_columns() {
        let f = Frame::empty(vec!["date".into(), "value".into()]);
        assert!(f.is_empty());
        assert_eq!(f.columns().len(), 2);
        assert!(f.row(d(1)).is_empty());
    }

    #[test]
    fn window_is_inclusive_and_clamped() {
        let f = sample();
        let w = f.window(&["A".into()], d(2), 5);
        assert_eq!(w, vec![vec![10.0], vec![11.0]]);
        let w = f.window(&["A".into(), "Q".into()], d(3), 1);
        assert_eq!(w.len(), 1);
        assert_eq!(w[0][0], 12.0);
        assert!(w[0][1].is_nan());
    }

    #[test]
    fn slice_filters_dates() {
        let f = sample().slice(Some(d(2)), None);
        assert_eq!(f.dates(), &[d(2), d(3)]);
        assert_eq!(f.get(d(2), "A"), Some(11.0));
        assert_eq!(f.position(d(2)), Some(0));
    }

    #[test]
    fn returns_skip_missing_steps() {
        let window = vec![vec![10.0, f64::NAN], vec![11.0, 21.0], vec![12.1, 23.1]];
        let r = window_returns(&window);
        assert_eq!(r.len(), 1);
        assert!((r[0][0] - 0.1).abs() < 1e-12);
        assert!((r[0][1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn quantiles_per_column() {
        let q = sample().quantiles(&[0.5]).unwrap();
        assert_eq!(q["A"], vec![11.0]);
        assert_eq!(q["B"], vec![21.5]);
    }
}
