//! Per-tick history of a strategy run.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub value: f64,
    pub cash: f64,
    pub turnover: f64,
    pub commissions: f64,
    pub weights: BTreeMap<String, f64>,
    /// Name of the Algo that stopped the pipeline, if any did.
    pub aborted_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    rows: Vec<HistoryRow>,
}

impl History {
    pub fn push(&mut self, row: HistoryRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    /// Tick-over-tick simple returns; a non-positive prior value yields 0.
    pub fn returns(&self) -> Vec<f64> {
        self.rows
            .windows(2)
            .map(|w| {
                if w[0].value > 0.0 {
                    w[1].value / w[0].value - 1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    pub fn total_commissions(&self) -> f64 {
        self.rows.iter().map(|r| r.commissions).sum()
    }

    pub fn aborted_ticks(&self) -> usize {
        self.rows.iter().filter(|r| r.aborted_by.is_some()).count()
    }
}
