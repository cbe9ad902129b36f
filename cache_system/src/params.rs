//! Cache parameter bags
//!
//! This module defines the CacheParams struct, the named string
//! parameters that identify one cached operation result.

use std::collections::BTreeMap;

/// Named request parameters that make up a cache fingerprint.
///
/// Entries are kept sorted by name, so two bags holding the same pairs
/// compare equal and derive the same key whatever order they were built in.
///
/// Optional request fields must go through [`CacheParams::with_optional`]:
/// a missing value is stored as the empty string, which makes "absent" and
/// "empty" the same fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheParams {
    entries: BTreeMap<String, String>,
}

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add an optional parameter; `None` is normalized to `""`
    pub fn with_optional<V: Into<String>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self.with(name, String::new()),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs in ascending name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for CacheParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = CacheParams::new().with("prompt", "p").with("language", "py");
        let b = CacheParams::new().with("language", "py").with("prompt", "p");
        assert_eq!(a, b);

        let names: Vec<&str> = a.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["language", "prompt"]);
    }

    #[test]
    fn test_missing_optional_is_empty_string() {
        let absent = CacheParams::new().with_optional::<String>("context", None);
        let empty = CacheParams::new().with("context", "");
        assert_eq!(absent, empty);
        assert_eq!(absent.get("context"), Some(""));
    }

    #[test]
    fn test_reinsert_replaces_value() {
        let params = CacheParams::new().with("style", "google").with("style", "numpy");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("style"), Some("numpy"));
    }

    #[test]
    fn test_from_iterator() {
        let params: CacheParams = [("code", "x = 1"), ("language", "python")]
            .into_iter()
            .collect();
        assert_eq!(params.len(), 2);
        assert!(!params.is_empty());
    }
}
