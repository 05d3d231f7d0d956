use std::collections::HashMap;

use super::Value;

/// A target item for in-memory filtering.
///
/// Fields are nested maps addressed either by a dot-separated path
/// (`"user.profile.age"`) or by explicit segments, which is how compiled
/// executors index into a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Slot>,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Leaf(Value),
    Nested(HashMap<String, Slot>),
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path, creating intermediate maps as needed.
    /// A leaf on the way is replaced by a nested map.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        insert_at(&mut self.fields, &segments, value);
    }

    /// Look up a value by dot-separated path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.get_segments(&segments)
    }

    /// Look up a value by explicit path segments.
    /// Returns `None` if the path is absent or stops at a nested map.
    #[must_use]
    pub fn get_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        let (last, init) = segments.split_last()?;
        let mut map = &self.fields;
        for segment in init {
            match map.get(segment.as_ref())? {
                Slot::Nested(nested) => map = nested,
                Slot::Leaf(_) => return None,
            }
        }
        match map.get(last.as_ref())? {
            Slot::Leaf(value) => Some(value),
            Slot::Nested(_) => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn insert_at(map: &mut HashMap<String, Slot>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_owned(), Slot::Leaf(value));
        }
        [first, rest @ ..] => {
            let slot = map
                .entry((*first).to_owned())
                .or_insert_with(|| Slot::Nested(HashMap::new()));
            if let Slot::Leaf(_) = slot {
                *slot = Slot::Nested(HashMap::new());
            }
            if let Slot::Nested(nested) = slot {
                insert_at(nested, rest, value);
            }
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (path, value) in iter {
            record.insert(path.as_ref(), value.into());
        }
        record
    }
}
