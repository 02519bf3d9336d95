//! Sealable attribute maps.
//!
//! Every node keeps its fields in an [`AttrMap`]. Once sealed the map still
//! accepts assignments to existing keys but refuses new ones; sealing again
//! changes nothing.

use crate::value::Value;

/// Why an attribute map refused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrRejection {
    /// The key already exists and the write required a fresh key.
    Duplicate,
    /// The key is new and the map is sealed.
    Sealed,
}

/// Ordered field storage with a one-way seal.
#[derive(Debug, Clone, Default)]
pub struct AttrMap {
    entries: Vec<(String, Value)>,
    sealed: bool,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add a key that must not exist yet.
    pub fn insert_new(&mut self, key: &str, value: Value) -> Result<(), AttrRejection> {
        if self.contains(key) {
            return Err(AttrRejection::Duplicate);
        }
        if self.sealed {
            return Err(AttrRejection::Sealed);
        }
        self.entries.push((key.to_string(), value));
        Ok(())
    }

    /// Overwrite an existing key, or add it while the map is still open.
    pub fn assign(&mut self, key: &str, value: Value) -> Result<(), AttrRejection> {
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            *slot = value;
            return Ok(());
        }
        if self.sealed {
            return Err(AttrRejection::Sealed);
        }
        self.entries.push((key.to_string(), value));
        Ok(())
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_map_allows_updates_but_not_additions() {
        let mut m = AttrMap::new();
        m.assign("length", Value::Num(1)).unwrap();
        m.seal();
        m.assign("length", Value::Num(2)).unwrap();
        assert_eq!(m.get("length"), Some(&Value::Num(2)));
        assert_eq!(m.assign("other", Value::Num(3)), Err(AttrRejection::Sealed));
        assert_eq!(m.insert_new("other", Value::Num(3)), Err(AttrRejection::Sealed));
    }

    #[test]
    fn sealing_twice_is_a_noop() {
        let mut m = AttrMap::new();
        m.seal();
        m.seal();
        assert!(m.is_sealed());
        assert!(m.assign("x", Value::Undef).is_err());
    }

    #[test]
    fn insert_new_rejects_existing_key_before_seal_check() {
        let mut m = AttrMap::new();
        m.insert_new("Module", Value::Undef).unwrap();
        m.seal();
        assert_eq!(m.insert_new("Module", Value::Undef), Err(AttrRejection::Duplicate));
    }
}
