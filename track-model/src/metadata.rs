use serde::{Deserialize, Serialize};

/// Canonical form of a string identifier: trimmed and ASCII-lowercased.
///
/// All registries key their lookup tables by this form; the original
/// spelling stays on the stored entity for display.
pub fn canonical_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// A small insertion-ordered string→string map with case-insensitive keys.
///
/// Layout source files attach free-form metadata to sectors, areas, and
/// cues; the branch manager and the cue managers interpret a handful of
/// recognised keys and ignore the rest. Maps are tiny (single digits of
/// entries), so lookups are linear scans and iteration order is insertion
/// order, which keeps downstream derivations deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataMap {
    entries: Vec<(String, String)>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key/value pair, replacing any entry whose key matches
    /// case-insensitively. The original key spelling is kept.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let canonical = canonical_id(&key);
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(k, _)| canonical_id(k) == canonical)
        {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        let canonical = canonical_id(key);
        self.entries
            .iter()
            .find(|(k, _)| canonical_id(k) == canonical)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up `key` and parses the value as an `f64`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Whether any key starts with `prefix` (case-insensitive).
    pub fn has_key_with_prefix(&self, prefix: &str) -> bool {
        let prefix = canonical_id(prefix);
        self.entries
            .iter()
            .any(|(k, _)| canonical_id(k).starts_with(&prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates entries in insertion order, original key spelling.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = MetadataMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
