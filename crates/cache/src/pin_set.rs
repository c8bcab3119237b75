//! The session's accumulated module→version pin set.

use std::collections::HashMap;

/// Tracks every module version pinned for a session so far. Entries are
/// never removed on an import removal — once a version is pinned, it stays
/// pinned for the life of the session (see the dependency engine's design
/// notes on why imports aren't pruned).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinSet(HashMap<String, String>);

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.0.get(module).map(String::as_str)
    }

    pub fn contains_pin_for(&self, module: &str, version: &str) -> bool {
        self.0.get(module).is_some_and(|pinned| pinned == version)
    }

    /// Merges `incoming` into the pin set. On collision the incoming pin
    /// wins, matching the dependency engine's "peer results ⊕ direct
    /// results, latter wins" commit rule.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = (String, String)>) {
        self.0.extend(incoming);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for PinSet {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<PinSet> for HashMap<String, String> {
    fn from(pins: PinSet) -> Self {
        pins.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_existing_pins() {
        let mut pins = PinSet::new();
        pins.merge([("lodash".to_string(), "4.17.0".to_string())]);
        pins.merge([("lodash".to_string(), "4.17.21".to_string())]);
        assert_eq!(pins.get("lodash"), Some("4.17.21"));
    }

    #[test]
    fn unrelated_modules_are_unaffected_by_merge() {
        let mut pins = PinSet::new();
        pins.merge([("a".to_string(), "1.0.0".to_string())]);
        pins.merge([("b".to_string(), "2.0.0".to_string())]);
        assert_eq!(pins.len(), 2);
    }

    #[test]
    fn round_trips_through_a_hash_map() {
        let map = HashMap::from([("a".to_string(), "1.0.0".to_string())]);
        let pins = PinSet::from(map.clone());
        assert_eq!(HashMap::from(pins), map);
    }
}
