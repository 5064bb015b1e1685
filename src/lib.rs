//! quantkit: algo-pipeline portfolio backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. [`runner`] wires them together.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod runner;
pub mod logging;
pub mod cli;
