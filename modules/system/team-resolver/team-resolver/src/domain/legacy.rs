//! Static group-to-team mapping, the fallback of last resort.

use std::collections::{BTreeSet, HashMap};

use access_security::{TeamSet, normalize_slug};

/// Maps external-directory group identifiers to team slugs.
///
/// Pure and deterministic; no I/O. Unknown groups are ignored.
#[derive(Debug, Clone, Default)]
pub struct LegacyMembershipTable {
    groups: HashMap<String, String>,
}

impl LegacyMembershipTable {
    /// Build from `group id -> team slug` pairs. Entries with a blank group id
    /// or slug are dropped.
    #[must_use]
    pub fn new<I, G, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (G, T)>,
        G: AsRef<str>,
        T: AsRef<str>,
    {
        let groups = entries
            .into_iter()
            .filter_map(|(group, team)| {
                let group = group.as_ref().trim();
                let team = normalize_slug(team.as_ref())?;
                (!group.is_empty()).then(|| (group.to_owned(), team))
            })
            .collect();
        Self { groups }
    }

    #[must_use]
    pub fn resolve(&self, group_ids: &BTreeSet<String>) -> TeamSet {
        group_ids
            .iter()
            .filter_map(|group| self.groups.get(group.trim()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }
}
