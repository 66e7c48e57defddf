//! Generic keyed registry with primary-key + alias lookup.
//!
//! Every runtime-dispatched family in the harness (loaders, evaluators,
//! metrics, benchmark packs, provider factories) shares this one data
//! structure; the concrete registries only add registration ergonomics.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry '{registry}' has no entry named '{key}'; available: {}", .available.join(", "))]
    NotFound {
        registry: String,
        key: String,
        available: Vec<String>,
    },

    #[error("registry '{registry}' already has an entry or alias named '{key}'")]
    Conflict {
        registry: String,
        key: String,
        available: Vec<String>,
    },
}

/// Keyed storage with alias resolution.
///
/// Invariants: each alias points to exactly one primary key, and every
/// alias target exists in the primary map. `len()` counts primaries only.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    name: String,
    entries: BTreeMap<String, T>,
    aliases: HashMap<String, String>,
    throw_on_conflict: bool,
}

impl<T> Registry<T> {
    /// Strict registry: duplicate keys or aliases are registration errors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            aliases: HashMap::new(),
            throw_on_conflict: true,
        }
    }

    /// Lenient registry: the first registration wins, duplicates are
    /// silently ignored.
    pub fn lenient(name: impl Into<String>) -> Self {
        Self {
            throw_on_conflict: false,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, key: impl Into<String>, value: T) -> Result<(), RegistryError> {
        self.register_with_aliases(key, value, &[])
    }

    pub fn register_with_aliases(
        &mut self,
        key: impl Into<String>,
        value: T,
        aliases: &[&str],
    ) -> Result<(), RegistryError> {
        let key = key.into();

        if self.is_known(&key) {
            return self.conflict(&key);
        }
        for alias in aliases {
            if *alias != key && self.is_known(alias) {
                return self.conflict(alias);
            }
        }

        for alias in aliases {
            if *alias != key {
                self.aliases.insert((*alias).to_string(), key.clone());
            }
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Resolves aliases to their primary entry; `None` for unknown names.
    pub fn get(&self, name_or_alias: &str) -> Option<&T> {
        let key = self.resolve_alias(name_or_alias);
        self.entries.get(key)
    }

    /// Like [`get`](Self::get), but unknown names fail with the full list
    /// of known primary keys.
    pub fn get_required(&self, name_or_alias: &str) -> Result<&T, RegistryError> {
        self.get(name_or_alias).ok_or_else(|| RegistryError::NotFound {
            registry: self.name.clone(),
            key: name_or_alias.to_string(),
            available: self.keys(),
        })
    }

    /// True for both primary keys and aliases.
    pub fn contains(&self, name_or_alias: &str) -> bool {
        self.is_known(name_or_alias) && self.get(name_or_alias).is_some()
    }

    /// Removes a primary entry and every alias pointing to it. Aliases
    /// alone are not removable.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let removed = self.entries.remove(key)?;
        self.aliases.retain(|_, target| target != key);
        Some(removed)
    }

    /// Sorted primary keys, excluding aliases.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Maps an alias to its primary key; identity for anything else.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn is_known(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.aliases.contains_key(name)
    }

    fn conflict(&self, key: &str) -> Result<(), RegistryError> {
        if self.throw_on_conflict {
            Err(RegistryError::Conflict {
                registry: self.name.clone(),
                key: key.to_string(),
                available: self.keys(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<u32> {
        Registry::new("test")
    }

    #[test]
    fn register_and_get() {
        let mut r = registry();
        r.register("one", 1).unwrap();
        assert_eq!(r.get("one"), Some(&1));
        assert_eq!(r.get("two"), None);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn alias_resolves_to_primary() {
        let mut r = registry();
        r.register_with_aliases("primary", 7, &["alt", "other"]).unwrap();
        assert_eq!(r.get("alt"), Some(&7));
        assert_eq!(r.get("other"), Some(&7));
        assert!(r.contains("alt"));
        assert_eq!(r.resolve_alias("alt"), "primary");
        assert_eq!(r.resolve_alias("unknown"), "unknown");
        // keys() excludes aliases and len counts primaries only
        assert_eq!(r.keys(), vec!["primary".to_string()]);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn duplicate_key_conflicts() {
        let mut r = registry();
        r.register("k", 1).unwrap();
        let err = r.register("k", 2).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { ref key, .. } if key == "k"));
        assert_eq!(r.get("k"), Some(&1));
    }

    #[test]
    fn alias_collision_conflicts() {
        let mut r = registry();
        r.register_with_aliases("a", 1, &["shared"]).unwrap();
        let err = r.register_with_aliases("b", 2, &["shared"]).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { ref key, .. } if key == "shared"));
        // the conflicting registration left nothing behind
        assert_eq!(r.get("b"), None);
    }

    #[test]
    fn key_colliding_with_existing_alias_conflicts() {
        let mut r = registry();
        r.register_with_aliases("a", 1, &["b"]).unwrap();
        assert!(r.register("b", 2).is_err());
    }

    #[test]
    fn lenient_first_wins() {
        let mut r = Registry::lenient("lenient");
        r.register("k", 1).unwrap();
        r.register("k", 2).unwrap();
        assert_eq!(r.get("k"), Some(&1));
    }

    #[test]
    fn remove_drops_aliases() {
        let mut r = registry();
        r.register_with_aliases("k", 1, &["a1", "a2"]).unwrap();
        assert_eq!(r.remove("k"), Some(1));
        assert_eq!(r.get("a1"), None);
        assert_eq!(r.resolve_alias("a1"), "a1");
        // aliases alone are not removable
        r.register_with_aliases("k", 2, &["a1"]).unwrap();
        assert_eq!(r.remove("a1"), None);
        assert_eq!(r.get("a1"), Some(&2));
    }

    #[test]
    fn keys_are_sorted() {
        let mut r = registry();
        r.register("zeta", 1).unwrap();
        r.register("alpha", 2).unwrap();
        r.register("mid", 3).unwrap();
        assert_eq!(r.keys(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn get_required_lists_available_keys() {
        let mut r = registry();
        r.register("alpha", 1).unwrap();
        r.register("beta", 2).unwrap();
        let err = r.get_required("gamma").unwrap_err();
        match err {
            RegistryError::NotFound { registry, key, available } => {
                assert_eq!(registry, "test");
                assert_eq!(key, "gamma");
                assert_eq!(available, vec!["alpha", "beta"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
