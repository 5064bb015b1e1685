#![allow(dead_code)]

use chrono::NaiveDate;
use quantkit::domain::algo::{Algo, FnAlgo};
use quantkit::domain::frame::Frame;
use quantkit::domain::strategy::Strategy;
use quantkit::domain::target::{AccountingSettings, DataSet, Target};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

pub fn calendar(days: &[u32]) -> Vec<NaiveDate> {
    days.iter().map(|&day| d(day)).collect()
}

/// Wide frame with one row per entry of `rows`, dated d1, d2, ...
pub fn wide_frame(columns: &[&str], rows: &[&[f64]]) -> Frame {
    let dates = (1..=rows.len() as u32).map(d).collect();
    Frame::new(
        dates,
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter().map(|r| r.to_vec()).collect(),
    )
    .unwrap()
}

pub fn settings(starting_cash: f64) -> AccountingSettings {
    AccountingSettings {
        starting_cash,
        ..Default::default()
    }
}

pub fn make_target(data: DataSet, starting_cash: f64) -> Target {
    Target::new(data, settings(starting_cash))
}

pub fn make_strategy(algos: Vec<Box<dyn Algo>>, target: Target) -> Strategy {
    Strategy::new("test", algos, target)
}

pub fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(id, w)| (id.to_string(), *w)).collect()
}

/// Sets `temp.weights` only on `date`.
pub fn weigh_on(date: NaiveDate, w: BTreeMap<String, f64>) -> Box<dyn Algo> {
    Box::new(FnAlgo::new("WeighOn", move |t: &mut Target| {
        if t.now() == date {
            t.temp_mut().weights = Some(w.clone());
        }
        Ok(true)
    }))
}

/// Records a snapshot of the target each time it runs.
pub fn recorder<T, F>(name: &str, log: Rc<RefCell<Vec<T>>>, snapshot: F) -> Box<dyn Algo>
where
    T: 'static,
    F: Fn(&Target) -> T + 'static,
{
    Box::new(FnAlgo::new(name, move |t: &mut Target| {
        log.borrow_mut().push(snapshot(t));
        Ok(true)
    }))
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    path
}

pub const PRICES_CSV: &str = "date,A,B\n\
2024-01-01,100,50\n\
2024-01-02,110,50\n\
2024-01-03,90,55\n";
