//! Typed scratch space Algos use to talk to each other.
//!
//! The three reserved slots carry the selection → stat → weights hand-off of
//! a standard pipeline. Anything else goes into user slots keyed by
//! `(algo name, field)`.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub enum ScratchValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Ids(BTreeSet<String>),
    Series(BTreeMap<String, f64>),
    Vector(Vec<f64>),
}

impl ScratchValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScratchValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            ScratchValue::Series(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch {
    pub selected: Option<BTreeSet<String>>,
    pub stat: Option<BTreeMap<String, f64>>,
    pub weights: Option<BTreeMap<String, f64>>,
    user: BTreeMap<(String, String), ScratchValue>,
}

impl Scratch {
    pub fn clear(&mut self) {
        self.selected = None;
        self.stat = None;
        self.weights = None;
        self.user.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none() && self.stat.is_none() && self.weights.is_none() && self.user.is_empty()
    }

    pub fn get(&self, algo: &str, field: &str) -> Option<&ScratchValue> {
        self.user.get(&(algo.to_string(), field.to_string()))
    }

    pub fn get_mut(&mut self, algo: &str, field: &str) -> Option<&mut ScratchValue> {
        self.user.get_mut(&(algo.to_string(), field.to_string()))
    }

    pub fn insert(&mut self, algo: &str, field: &str, value: ScratchValue) -> Option<ScratchValue> {
        self.user.insert((algo.to_string(), field.to_string()), value)
    }

    pub fn remove(&mut self, algo: &str, field: &str) -> Option<ScratchValue> {
        self.user.remove(&(algo.to_string(), field.to_string()))
    }

    pub fn user_slots(&self) -> impl Iterator<Item = (&(String, String), &ScratchValue)> {
        self.user.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scratch_is_empty() {
        assert!(Scratch::default().is_empty());
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut s = Scratch::default();
        s.selected = Some(BTreeSet::from(["A".to_string()]));
        s.stat = Some(BTreeMap::from([("A".to_string(), 1.0)]));
        s.insert("SetStat", "source", ScratchValue::Text("yield".into()));
        assert!(!s.is_empty());

        s.clear();
        assert!(s.is_empty());
        assert!(s.get("SetStat", "source").is_none());
    }

    #[test]
    fn user_slots_are_keyed_by_algo_and_field() {
        let mut s = Scratch::default();
        s.insert("A", "x", ScratchValue::Number(1.0));
        s.insert("B", "x", ScratchValue::Number(2.0));
        assert_eq!(s.get("A", "x").and_then(ScratchValue::as_number), Some(1.0));
        assert_eq!(s.get("B", "x").and_then(ScratchValue::as_number), Some(2.0));
        assert_eq!(s.user_slots().count(), 2);

        let old = s.insert("A", "x", ScratchValue::Flag(true));
        assert_eq!(old, Some(ScratchValue::Number(1.0)));
        assert!(s.remove("A", "x").is_some());
        assert!(s.get("A", "x").is_none());
    }
}
