use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalize a raw team slug: trim surrounding whitespace and lowercase.
///
/// Returns `None` for blank input.
#[must_use]
pub fn normalize_slug(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Set of team slugs a user may view analytics for.
///
/// Slugs are normalized on insertion and kept sorted, so iteration order and
/// [`TeamSet::first`] are stable across calls. An empty set is a real answer
/// ("this user has no teams"), not a failure marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TeamSet(BTreeSet<String>);

impl TeamSet {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Insert a slug. Blank slugs are ignored.
    ///
    /// Returns `true` if the normalized slug was not already present.
    pub fn insert(&mut self, slug: &str) -> bool {
        normalize_slug(slug).is_some_and(|s| self.0.insert(s))
    }

    /// Whether `slug` (after normalization) belongs to this set.
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        normalize_slug(slug).is_some_and(|s| self.0.contains(&s))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Lexicographically smallest slug.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TeamSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for slug in iter {
            set.insert(slug.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for TeamSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for slug in iter {
            self.insert(slug.as_ref());
        }
    }
}

impl From<Vec<String>> for TeamSet {
    fn from(slugs: Vec<String>) -> Self {
        slugs.into_iter().collect()
    }
}

impl From<TeamSet> for Vec<String> {
    fn from(set: TeamSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a TeamSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TeamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, slug) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(slug)?;
        }
        f.write_str("}")
    }
}

/// Which source produced the authorized team set for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSource {
    /// Directory lookup keyed by the principal's email.
    Directory,
    /// Directory lookup for "the current caller".
    CurrentCaller,
    /// Static legacy group-to-team mapping.
    Legacy,
}

impl TeamSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::CurrentCaller => "current_caller",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for TeamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
