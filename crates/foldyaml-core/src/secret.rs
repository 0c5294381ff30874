//! Secret Store: a path-keyed cache of resolved `secrets.yaml` files.
//!
//! Loading a secrets file is the Include Engine's job (it's just another
//! document, run through the same pipeline) — this module only owns the
//! cache, so a `secrets.yaml` shared by several sibling includes is loaded
//! once no matter how many `!secret` markers reference it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct SecretCache {
    loaded: HashMap<PathBuf, HashMap<String, String>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, secrets_path: &Path) -> bool {
        self.loaded.contains_key(secrets_path)
    }

    pub fn populate(&mut self, secrets_path: PathBuf, entries: HashMap<String, String>) {
        self.loaded.insert(secrets_path, entries);
    }

    pub fn lookup(&self, secrets_path: &Path, name: &str) -> Option<&str> {
        self.loaded.get(secrets_path).and_then(|m| m.get(name)).map(String::as_str)
    }
}

/// The `secrets.yaml` that sits next to `referencing_file`.
pub fn sibling_secrets_path(referencing_file: &Path) -> PathBuf {
    referencing_file
        .parent()
        .map(|p| p.join("secrets.yaml"))
        .unwrap_or_else(|| PathBuf::from("secrets.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_is_next_to_referencing_file() {
        let p = sibling_secrets_path(Path::new("/etc/app/config.yaml"));
        assert_eq!(p, PathBuf::from("/etc/app/secrets.yaml"));
    }

    #[test]
    fn cache_starts_empty() {
        let cache = SecretCache::new();
        assert!(!cache.is_loaded(Path::new("/etc/app/secrets.yaml")));
        assert_eq!(cache.lookup(Path::new("/etc/app/secrets.yaml"), "db"), None);
    }

    #[test]
    fn populate_then_lookup() {
        let mut cache = SecretCache::new();
        let path = PathBuf::from("/etc/app/secrets.yaml");
        let mut entries = HashMap::new();
        entries.insert("db_password".to_string(), "hunter2".to_string());
        cache.populate(path.clone(), entries);

        assert!(cache.is_loaded(&path));
        assert_eq!(cache.lookup(&path, "db_password"), Some("hunter2"));
        assert_eq!(cache.lookup(&path, "missing"), None);
    }
}
