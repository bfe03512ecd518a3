//! Insertion-ordered name to value mapping.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Datum;

/// An insertion-ordered mapping from names to [`Datum`] values.
///
/// Used as the argument of fan-in pipes, the result of fan-out pipes and the
/// memoization cache of a pipeline. Iteration follows insertion order and
/// lookups go through a name index. Equality ignores order, so two maps
/// holding the same entries compare equal.
#[derive(Clone, Default)]
pub struct DataMap {
    entries: Vec<(String, Datum)>,
    index: HashMap<String, usize>,
}

impl DataMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn push(&mut self, name: String, value: Datum) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }

    /// Inserts a value, returning the previous value under the same name.
    ///
    /// Replacing an existing entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Datum>) -> Option<Datum> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self
                .entries
                .get_mut(index)
                .map(|(_, slot)| std::mem::replace(slot, value)),
            None => {
                self.push(name, value);
                None
            }
        }
    }

    /// Inserts a value only if the name is not present yet.
    ///
    /// Returns whether the value was inserted.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<Datum>) -> bool {
        let name = name.into();
        if self.contains_key(&name) {
            return false;
        }
        self.push(name, value.into());
        true
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Datum> {
        let index = self.position(name)?;
        self.entries.get(index).map(|(_, value)| value)
    }

    /// Returns a mutable reference to the value stored under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Datum> {
        let index = self.position(name)?;
        self.entries.get_mut(index).map(|(_, value)| value)
    }

    /// Returns whether a value is stored under `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Removes and returns the value stored under `name`.
    ///
    /// Later entries shift down, so this is linear in the map size.
    pub fn remove(&mut self, name: &str) -> Option<Datum> {
        let index = self.index.remove(name)?;
        let (_, value) = self.entries.remove(index);
        for slot in self.index.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Returns an iterator over the names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Returns an iterator over the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Datum> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Returns an iterator over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl fmt::Debug for DataMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for DataMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>, V: Into<Datum>> FromIterator<(K, V)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Datum>> Extend<(K, V)> for DataMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for DataMap {
    type IntoIter = std::vec::IntoIter<(String, Datum)>;
    type Item = (String, Datum);

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for DataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct DataMapVisitor;

impl<'de> Visitor<'de> for DataMapVisitor {
    type Value = DataMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of named values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<DataMap, A::Error> {
        let mut map = DataMap::with_capacity(access.size_hint().unwrap_or_default());
        while let Some((key, value)) = access.next_entry::<String, Datum>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for DataMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Visiting entries one by one keeps document order.
        deserializer.deserialize_map(DataMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut map = DataMap::new();
        map.insert("b", 1);
        map.insert("a", 2);
        map.insert("c", 3);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = DataMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        let previous = map.insert("a", 10);

        assert_eq!(previous, Some(Datum::Int(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&Datum::Int(10)));
    }

    #[test]
    fn test_insert_if_absent() {
        let mut map = DataMap::new();
        assert!(map.insert_if_absent("a", 1));
        assert!(!map.insert_if_absent("a", 2));
        assert_eq!(map.get("a"), Some(&Datum::Int(1)));
    }

    #[test]
    fn test_equality_ignores_order() {
        let left: DataMap = [("a", 1), ("b", 2)].into_iter().collect();
        let right: DataMap = [("b", 2), ("a", 1)].into_iter().collect();
        let other: DataMap = [("a", 1)].into_iter().collect();

        assert_eq!(left, right);
        assert_ne!(left, other);
    }

    #[test]
    fn test_deserialize_keeps_document_order() {
        let map: DataMap = serde_json::from_str(r#"{"z": 1, "a": "x", "m": null}"#).unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(map.get("a"), Some(&Datum::from("x")));
        assert_eq!(map.get("m"), Some(&Datum::Null));
    }

    #[test]
    fn test_remove() {
        let mut map: DataMap = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(map.remove("a"), Some(Datum::Int(1)));
        assert!(!map.contains_key("a"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_index_follows_removals() {
        let mut map: DataMap = [("a", 1), ("b", 2), ("c", 3), ("d", 4)]
            .into_iter()
            .collect();

        map.remove("b");
        map.insert("e", 5);
        map.insert("c", 30);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "c", "d", "e"]);
        assert_eq!(map.get("a"), Some(&Datum::Int(1)));
        assert_eq!(map.get("c"), Some(&Datum::Int(30)));
        assert_eq!(map.get("d"), Some(&Datum::Int(4)));
        assert_eq!(map.get("e"), Some(&Datum::Int(5)));
        assert_eq!(map.get("b"), None);

        map.clear();
        assert!(!map.contains_key("a"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_many_entries_stay_addressable() {
        let map: DataMap = (0..2_000).map(|n| (format!("c{n}"), n)).collect();

        assert_eq!(map.len(), 2_000);
        assert_eq!(map.get("c1999"), Some(&Datum::Int(1999)));
        assert_eq!(map.keys().nth(1234), Some("c1234"));
    }
}
