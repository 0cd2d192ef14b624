// ABOUTME: Open-addressed hash map keyed by hashable runtime values

use crate::error::RuntimeError;
use crate::value::Value;

const INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Tombstone,
    Used { hash: u64, key: Value, value: Value },
}

/// Dictionary storage: linear probing over a power-of-two table, grown at a
/// 0.75 load factor. Keys must be hashable (int, float, string, bool).
#[derive(Debug, Default)]
pub struct Dict {
    slots: Vec<Slot>,
    live: usize,
    occupied: usize,
}

impl Dict {
    pub fn new() -> Self {
        Dict {
            slots: Vec::new(),
            live: 0,
            occupied: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn hash_for(op: &'static str, key: &Value) -> Result<u64, RuntimeError> {
        key.hash_key().ok_or_else(|| RuntimeError::UnhashableKey {
            op,
            actual: key.type_name().to_string(),
        })
    }

    /// Index of the slot holding `key`, if present.
    fn find(&self, hash: u64, key: &Value) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut ix = hash as usize & mask;
        loop {
            match &self.slots[ix] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Used {
                    hash: h, key: k, ..
                } => {
                    if *h == hash && k.key_eq(key) {
                        return Some(ix);
                    }
                }
            }
            ix = (ix + 1) & mask;
        }
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), RuntimeError> {
        let hash = Self::hash_for("put", &key)?;

        // Grow when the next occupied slot would cross the 0.75 load factor.
        if self.slots.is_empty() || (self.occupied + 1) * 4 > self.slots.len() * 3 {
            self.grow();
        }

        let mask = self.slots.len() - 1;
        let mut ix = hash as usize & mask;
        let mut first_tombstone = None;
        loop {
            match &mut self.slots[ix] {
                Slot::Empty => {
                    let target = first_tombstone.unwrap_or(ix);
                    self.slots[target] = Slot::Used { hash, key, value };
                    self.live += 1;
                    if first_tombstone.is_none() {
                        self.occupied += 1;
                    }
                    return Ok(());
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(ix);
                    }
                }
                Slot::Used {
                    hash: h,
                    key: k,
                    value: v,
                } => {
                    if *h == hash && k.key_eq(&key) {
                        *v = value;
                        return Ok(());
                    }
                }
            }
            ix = (ix + 1) & mask;
        }
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, RuntimeError> {
        let hash = Self::hash_for("get", key)?;
        Ok(self.find(hash, key).map(|ix| match &self.slots[ix] {
            Slot::Used { value, .. } => value.clone(),
            _ => unreachable!("find returns used slots"),
        }))
    }

    pub fn contains(&self, key: &Value) -> Result<bool, RuntimeError> {
        let hash = Self::hash_for("has?", key)?;
        Ok(self.find(hash, key).is_some())
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&mut self, key: &Value) -> Result<bool, RuntimeError> {
        let hash = Self::hash_for("del", key)?;
        match self.find(hash, key) {
            Some(ix) => {
                self.slots[ix] = Slot::Tombstone;
                self.live -= 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Used { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries().map(|(_, v)| v.clone()).collect()
    }

    /// Double the table and re-seat every live entry; tombstones drop out.
    fn grow(&mut self) {
        let new_cap = if self.slots.is_empty() {
            INITIAL_CAPACITY
        } else {
            self.slots.len() * 2
        };
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_cap]);
        self.live = 0;
        self.occupied = 0;
        for slot in old {
            if let Slot::Used { key, value, .. } = slot {
                // Re-inserting previously hashed keys cannot fail.
                let _ = self.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut d = Dict::new();
        d.insert(Value::string("a"), Value::Int(1)).unwrap();
        d.insert(Value::string("b"), Value::Int(2)).unwrap();
        assert_eq!(d.get(&Value::string("a")).unwrap(), Some(Value::Int(1)));
        assert_eq!(d.get(&Value::string("b")).unwrap(), Some(Value::Int(2)));
        assert_eq!(d.get(&Value::string("c")).unwrap(), None);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_len() {
        let mut d = Dict::new();
        d.insert(Value::Int(1), Value::string("x")).unwrap();
        d.insert(Value::Int(1), Value::string("y")).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(&Value::Int(1)).unwrap(), Some(Value::string("y")));
    }

    #[test]
    fn test_mixed_key_types() {
        let mut d = Dict::new();
        d.insert(Value::Int(1), Value::string("int")).unwrap();
        d.insert(Value::Float(1.5), Value::string("float")).unwrap();
        d.insert(Value::Bool(true), Value::string("bool")).unwrap();
        d.insert(Value::string("1"), Value::string("str")).unwrap();
        assert_eq!(d.len(), 4);
        assert_eq!(
            d.get(&Value::string("1")).unwrap(),
            Some(Value::string("str"))
        );
        assert_eq!(
            d.get(&Value::Bool(true)).unwrap(),
            Some(Value::string("bool"))
        );
    }

    #[test]
    fn test_remove_and_tombstone_probing() {
        let mut d = Dict::new();
        for i in 0..32 {
            d.insert(Value::Int(i), Value::Int(i * 10)).unwrap();
        }
        assert!(d.remove(&Value::Int(7)).unwrap());
        assert!(!d.remove(&Value::Int(7)).unwrap());
        assert_eq!(d.len(), 31);
        assert_eq!(d.get(&Value::Int(7)).unwrap(), None);
        // Entries probing past the tombstone are still reachable.
        for i in 0..32 {
            if i != 7 {
                assert_eq!(d.get(&Value::Int(i)).unwrap(), Some(Value::Int(i * 10)));
            }
        }
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut d = Dict::new();
        for i in 0..1000 {
            d.insert(Value::Int(i), Value::Int(-i)).unwrap();
        }
        assert_eq!(d.len(), 1000);
        for i in 0..1000 {
            assert_eq!(d.get(&Value::Int(i)).unwrap(), Some(Value::Int(-i)));
        }
    }

    #[test]
    fn test_reinsert_after_remove() {
        let mut d = Dict::new();
        d.insert(Value::string("k"), Value::Int(1)).unwrap();
        d.remove(&Value::string("k")).unwrap();
        d.insert(Value::string("k"), Value::Int(2)).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(&Value::string("k")).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_unhashable_key_fails() {
        let mut d = Dict::new();
        let err = d.insert(Value::list(vec![]), Value::Int(1)).unwrap_err();
        assert!(matches!(err, RuntimeError::UnhashableKey { op: "put", .. }));
        assert!(d.get(&Value::Null).is_err());
    }

    #[test]
    fn test_keys_and_values_pair_up() {
        let mut d = Dict::new();
        d.insert(Value::string("a"), Value::Int(1)).unwrap();
        d.insert(Value::string("b"), Value::Int(2)).unwrap();
        let keys = d.keys();
        let values = d.values();
        assert_eq!(keys.len(), 2);
        assert_eq!(values.len(), 2);
        for (k, v) in keys.iter().zip(values.iter()) {
            assert_eq!(d.get(k).unwrap().as_ref(), Some(v));
        }
    }
}
