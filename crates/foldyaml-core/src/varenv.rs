//! The variable environment threaded through the include graph.
//!
//! A [`VarEnv`] is case-sensitive and, by convention, never mutated in
//! place once handed to a child include — callers clone it, layer
//! overrides on the clone, and pass that down. The one exception is
//! predefined-variable injection (§6), which always overwrites.

use std::path::Path;

use indexmap::IndexMap;

/// Reserved variable names: their value always reflects the file currently
/// being loaded and user `variables:` entries cannot shadow them.
pub const FILE: &str = "__FILE__";
pub const FILE_NAME: &str = "__FILE_NAME__";
pub const FILE_EXT: &str = "__FILE_EXT__";
pub const PATH: &str = "__PATH__";

pub fn is_predefined(name: &str) -> bool {
    matches!(name, FILE | FILE_NAME | FILE_EXT | PATH)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarEnv {
    vars: IndexMap<String, String>,
}

impl VarEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Insert `name=value` only if `name` is not already present. Used both
    /// for put-if-absent merging of a file's own `variables:` block and for
    /// include-vars overlays that must not clobber a caller-provided value
    /// when the caller intentionally sets it before merging.
    pub fn put_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.entry(name.into()).or_insert_with(|| value.into());
    }

    /// Insert `name=value`, overwriting any existing entry. Used for
    /// include-vars overlays (include's vars win) and for predefined
    /// variables (always reflect the current file).
    pub fn put_overwrite(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Overlay `overrides` on top of `self`, with `overrides` winning on
    /// conflicting keys. Returns a new, independent environment.
    pub fn overlaid(&self, overrides: &IndexMap<String, String>) -> VarEnv {
        let mut result = self.clone();
        for (k, v) in overrides {
            result.put_overwrite(k.clone(), v.clone());
        }
        result
    }

    /// Inject the four predefined, non-shadowable variables for `path`.
    /// Always overwrites, per §6 — a file's own `variables:` block cannot
    /// win here even via put-if-absent ordering.
    pub fn inject_predefined(&mut self, path: &Path) {
        let file = path.to_string_lossy().to_string();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        self.put_overwrite(FILE, file);
        self.put_overwrite(FILE_NAME, stem);
        self.put_overwrite(FILE_EXT, ext);
        self.put_overwrite(PATH, parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_if_absent_keeps_first_definition() {
        let mut env = VarEnv::new();
        env.put_if_absent("v", "caller");
        env.put_if_absent("v", "file-local");
        assert_eq!(env.get("v"), Some("caller"));
    }

    #[test]
    fn put_overwrite_replaces() {
        let mut env = VarEnv::new();
        env.put_if_absent("v", "old");
        env.put_overwrite("v", "new");
        assert_eq!(env.get("v"), Some("new"));
    }

    #[test]
    fn overlaid_does_not_mutate_original() {
        let mut env = VarEnv::new();
        env.put_if_absent("a", "1");
        let mut overrides = IndexMap::new();
        overrides.insert("a".to_string(), "2".to_string());
        overrides.insert("b".to_string(), "3".to_string());

        let child = env.overlaid(&overrides);
        assert_eq!(env.get("a"), Some("1"));
        assert_eq!(env.get("b"), None);
        assert_eq!(child.get("a"), Some("2"));
        assert_eq!(child.get("b"), Some("3"));
    }

    #[test]
    fn predefined_vars_reflect_current_file() {
        let mut env = VarEnv::new();
        env.put_if_absent(FILE_NAME, "fake");
        env.inject_predefined(Path::new("/etc/app/config.yaml"));
        assert_eq!(env.get(FILE_NAME), Some("config"));
        assert_eq!(env.get(FILE_EXT), Some("yaml"));
        assert_eq!(env.get(PATH), Some("/etc/app"));
        assert_eq!(env.get(FILE), Some("/etc/app/config.yaml"));
    }

    #[test]
    fn is_predefined_matches_reserved_names_only() {
        assert!(is_predefined(FILE));
        assert!(is_predefined(FILE_NAME));
        assert!(is_predefined(FILE_EXT));
        assert!(is_predefined(PATH));
        assert!(!is_predefined("custom_var"));
    }

    #[test]
    fn file_without_extension_has_empty_ext() {
        let mut env = VarEnv::new();
        env.inject_predefined(Path::new("/etc/app/secrets"));
        assert_eq!(env.get(FILE_EXT), Some(""));
    }
}
