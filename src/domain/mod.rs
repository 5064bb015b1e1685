//! Core domain types and logic.

pub mod numeric;
pub mod stream;
pub mod frame;
pub mod position;
pub mod commission;
pub mod scratch;
pub mod history;
pub mod target;
pub mod accounting;
pub mod algo;
pub mod algos;
pub mod universe;
pub mod strategy;
pub mod metrics;
pub mod config;
pub mod config_validation;
pub mod error;
