use std::fmt;

use indexmap::IndexMap;

/// Column 9 of a GFF3 line: `key=value` pairs joined by `;`.
///
/// Insertion order is kept, so re-emitting a record after rewriting one key
/// leaves every other pair where it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    /// Parse the attribute column.
    ///
    /// - keys are trimmed; parts without `=` are dropped
    /// - values are kept as written; only the first `=` splits, so values
    ///   may contain `=`
    /// - a repeated key keeps its first position and takes the last value
    ///
    /// Never fails: anything unparsable degrades to fewer (or no) pairs.
    pub fn parse(s: &str) -> Self {
        let mut map = IndexMap::new();
        for part in s.split(';') {
            let Some((k, v)) = part.split_once('=') else {
                continue;
            };
            let k = k.trim();
            if k.is_empty() {
                continue;
            }
            map.insert(k.to_string(), v.to_string());
        }
        Self(map)
    }

    /// Value of `key` without surrounding whitespace.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.trim())
    }

    /// Overwrite `key` in place, or append it when absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        match self.0.get_mut(key) {
            Some(v) => *v = value.into(),
            None => {
                self.0.insert(key.to_string(), value.into());
            }
        }
    }

    /// Comma separated values of `key` (e.g. a multi-parent `Parent`), trimmed.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(split_value_list)
            .unwrap_or_default()
    }

    /// First listed value of `key`.
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.values(key).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Split a `Parent=` style list by commas; also trim whitespace.
fn split_value_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}
