//! Time-varying universe membership.
//!
//! Membership is resolved once per tick by the engine. An identifier that
//! leaves the universe while held stays in `positions` (marked as long as it
//! is priced) unless `accounting.liquidate_delisted` is set. Even then, an
//! unpriced id whose series resumes later is kept until a priced tick; only
//! an id with no further prices is closed at its last mark.

use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub enum UniverseSource {
    /// Every price column with a price at the tick.
    Priced,
    /// A fixed set.
    Static(BTreeSet<String>),
    /// Each entry takes effect on its date and lasts until the next one;
    /// before the first entry the universe is empty.
    Schedule(BTreeMap<NaiveDate, BTreeSet<String>>),
}

impl UniverseSource {
    pub fn from_config(
        members: Option<&[String]>,
        schedule: Option<&BTreeMap<NaiveDate, Vec<String>>>,
    ) -> Result<Self, QuantkitError> {
        match (members, schedule) {
            (Some(_), Some(_)) => Err(QuantkitError::ConfigInvalid {
                section: "universe".into(),
                key: "members".into(),
                reason: "members and schedule are mutually exclusive".into(),
            }),
            (Some(members), None) => Ok(UniverseSource::Static(parse_members(members)?)),
            (None, Some(schedule)) => {
                let entries = schedule
                    .iter()
                    .map(|(date, ids)| Ok((*date, parse_members(ids)?)))
                    .collect::<Result<_, QuantkitError>>()?;
                Ok(UniverseSource::Schedule(entries))
            }
            (None, None) => Ok(UniverseSource::Priced),
        }
    }

    pub fn members_at(&self, date: NaiveDate, prices: &Frame) -> BTreeSet<String> {
        match self {
            UniverseSource::Priced => prices.row(date).into_keys().collect(),
            UniverseSource::Static(ids) => ids.clone(),
            UniverseSource::Schedule(schedule) => schedule
                .range(..=date)
                .next_back()
                .map(|(_, ids)| ids.clone())
                .unwrap_or_default(),
        }
    }
}

/// Trim and de-duplicate a member list; empty identifiers are rejected.
fn parse_members(ids: &[String]) -> Result<BTreeSet<String>, QuantkitError> {
    let mut members = BTreeSet::new();
    for id in ids {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(QuantkitError::ConfigInvalid {
                section: "universe".into(),
                key: "members".into(),
                reason: "empty identifier in member list".into(),
            });
        }
        members.insert(trimmed.to_string());
    }
    Ok(members)
}
