//! Override-ordered dispatch chains
//!
//! Serializers and code generators are registered as entries of an
//! [`OverrideChain`]. An entry may name a parent it specializes; dispatch
//! walks the chain in override order, so every entry is tried before its
//! declared parent and ancestors. Apart from that constraint registration
//! order is kept.

use crate::error::RegistryError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Named entry that may specialize a parent entry
pub trait Overridable {
    /// Unique name
    fn name(&self) -> &str;

    /// Name of the entry this one specializes
    fn parent(&self) -> Option<&str> {
        None
    }
}

impl<T: Overridable + ?Sized> Overridable for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parent(&self) -> Option<&str> {
        (**self).parent()
    }
}

impl<T: Overridable + ?Sized> Overridable for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parent(&self) -> Option<&str> {
        (**self).parent()
    }
}

/// Entries in override order
#[derive(Debug, Clone)]
pub struct OverrideChain<A> {
    entries: Vec<A>,
}

impl<A> Default for OverrideChain<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Overridable> OverrideChain<A> {
    /// Create an empty chain
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Order `entries` so that children precede their parents
    ///
    /// # Errors
    /// - [`RegistryError::DuplicateName`] if two entries share a name
    /// - [`RegistryError::UnknownParent`] if a parent is not registered
    /// - [`RegistryError::ParentCycle`] if parent links loop
    pub fn build(entries: Vec<A>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.name().to_string(), i).is_some() {
                tracing::error!(adaptor = entry.name(), "duplicate adaptor registration");
                return Err(RegistryError::DuplicateName(entry.name().to_string()));
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
        for (i, entry) in entries.iter().enumerate() {
            let Some(parent) = entry.parent() else {
                continue;
            };
            let Some(&p) = index.get(parent) else {
                tracing::error!(
                    adaptor = entry.name(),
                    parent,
                    "adaptor declares an unknown parent"
                );
                return Err(RegistryError::UnknownParent {
                    name: entry.name().to_string(),
                    parent: parent.to_string(),
                });
            };
            children[p].push(i);
        }

        for entry in &entries {
            let mut seen = HashSet::new();
            let mut current = Some(entry.name());
            while let Some(name) = current {
                if !seen.insert(name) {
                    tracing::error!(adaptor = entry.name(), "adaptor parent chain loops");
                    return Err(RegistryError::ParentCycle(entry.name().to_string()));
                }
                current = index.get(name).and_then(|&i| entries[i].parent());
            }
        }

        let mut order = Vec::with_capacity(entries.len());
        let mut placed = vec![false; entries.len()];
        for i in 0..entries.len() {
            place(i, &children, &mut placed, &mut order);
        }

        let mut slots: Vec<Option<A>> = entries.into_iter().map(Some).collect();
        let entries = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(Self { entries })
    }

    /// Entries in override order
    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.entries.iter()
    }

    /// First entry in override order accepted by `accepts`
    pub fn select(&self, mut accepts: impl FnMut(&A) -> bool) -> Option<&A> {
        self.entries.iter().find(|entry| accepts(entry))
    }

    /// Entry by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&A> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Check if an entry is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entry names in override order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Overridable::name).collect()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for an empty chain
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn place(i: usize, children: &[Vec<usize>], placed: &mut [bool], order: &mut Vec<usize>) {
    if placed[i] {
        return;
    }
    placed[i] = true;
    for &child in &children[i] {
        place(child, children, placed, order);
    }
    order.push(i);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Entry {
        name: &'static str,
        parent: Option<&'static str>,
    }

    impl Overridable for Entry {
        fn name(&self) -> &str {
            self.name
        }

        fn parent(&self) -> Option<&str> {
            self.parent
        }
    }

    fn entry(name: &'static str, parent: Option<&'static str>) -> Entry {
        Entry { name, parent }
    }

    #[test]
    fn chain_new_empty() {
        let chain: OverrideChain<Entry> = OverrideChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn children_precede_parents() {
        let chain = OverrideChain::build(vec![
            entry("literal", None),
            entry("list", None),
            entry("set", None),
            entry("wrapped_list", Some("list")),
            entry("checked_list", Some("wrapped_list")),
        ])
        .unwrap();
        assert_eq!(
            chain.names(),
            vec!["literal", "checked_list", "wrapped_list", "list", "set"]
        );
    }

    #[test]
    fn unrelated_entries_keep_registration_order() {
        let chain = OverrideChain::build(vec![entry("b", None), entry("a", None)]).unwrap();
        assert_eq!(chain.names(), vec!["b", "a"]);
        assert!(chain.contains("a"));
        assert!(chain.select(|e| e.name.starts_with('a')).is_some());
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let err = OverrideChain::build(vec![entry("wrapped", Some("missing"))]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownParent {
                name: "wrapped".into(),
                parent: "missing".into()
            }
        );
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let err =
            OverrideChain::build(vec![entry("a", Some("b")), entry("b", Some("a"))]).unwrap_err();
        assert!(matches!(err, RegistryError::ParentCycle(_)));
    }

    #[test]
    fn duplicate_is_rejected() {
        let err = OverrideChain::build(vec![entry("a", None), entry("a", None)]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("a".into()));
    }
}
