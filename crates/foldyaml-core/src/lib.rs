//! foldyaml-core: a YAML preprocessor with variable interpolation, file
//! inclusion, secret resolution, and package merging.
//!
//! The public entry point is [`load`]: point it at a YAML file and get back
//! a fully resolved [`Value`] tree with every `!include`/`!secret` marker
//! gone and every `variables`/`packages` key stripped.
//!
//! # Example
//!
//! ```no_run
//! let doc = foldyaml_core::load("config.yaml").unwrap();
//! let host = foldyaml_core::get_nested(&doc, &["database", "host"]);
//! ```

pub mod error;
pub mod include;
mod interpolation;
mod node;
mod package;
mod scalar;
mod secret;
pub mod value;
pub mod varenv;

use std::path::Path;

pub use error::{Error, Result};
pub use value::Value;
pub use varenv::VarEnv;

/// Load and fully preprocess the YAML document at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    include::load_root(path.as_ref())
}

/// A YAML loader bound to a starting variable environment.
///
/// Built via [`new_yaml`]. A low-level seam for parsing a string directly
/// through the Node Constructor pipeline — the same scalar-style-aware
/// interpolation and reclassification a file gets via `load` — without
/// going through the Include Engine's file-based machinery (no
/// `!include`/`!secret` resolution, no `variables`/`packages` handling).
pub struct Yaml {
    vars: VarEnv,
}

impl Yaml {
    /// Parse `content` using this loader's bound variable environment.
    pub fn parse(&self, content: &str) -> Result<Value> {
        node::parse_str(content, Path::new("<fragment>"), &self.vars)
    }
}

/// Factory for a [`Yaml`] loader preconfigured with `vars`.
pub fn new_yaml(vars: VarEnv) -> Yaml {
    Yaml { vars }
}

/// Descend through `root` by a sequence of mapping keys, returning `None`
/// as soon as a key is missing or an intermediate node isn't a mapping.
pub fn get_nested<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in keys {
        current = current.as_mapping()?.get(*key)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn get_nested_descends_through_mappings() {
        let mut inner = IndexMap::new();
        inner.insert("b".to_string(), Value::Integer(1));
        let mut outer = IndexMap::new();
        outer.insert("a".to_string(), Value::Mapping(inner));
        let root = Value::Mapping(outer);

        assert_eq!(get_nested(&root, &["a", "b"]), Some(&Value::Integer(1)));
        assert_eq!(get_nested(&root, &["a", "missing"]), None);
        assert_eq!(get_nested(&root, &["missing"]), None);
    }

    #[test]
    fn get_nested_stops_at_non_mapping() {
        let mut outer = IndexMap::new();
        outer.insert("a".to_string(), Value::Integer(1));
        let root = Value::Mapping(outer);
        assert_eq!(get_nested(&root, &["a", "b"]), None);
    }

    #[test]
    fn new_yaml_interpolates_and_classifies() {
        let mut vars = VarEnv::new();
        vars.put_if_absent("port", "5432");
        let yaml = new_yaml(vars);
        let doc = yaml.parse("port: ${port}").unwrap();
        assert_eq!(get_nested(&doc, &["port"]), Some(&Value::Integer(5432)));
    }

    #[test]
    fn new_yaml_reuses_bound_vars_across_parses() {
        let mut vars = VarEnv::new();
        vars.put_if_absent("name", "foldyaml");
        let yaml = new_yaml(vars);
        let first = yaml.parse("a: ${name}").unwrap();
        let second = yaml.parse("b: ${name}").unwrap();
        assert_eq!(get_nested(&first, &["a"]), Some(&Value::String("foldyaml".into())));
        assert_eq!(get_nested(&second, &["b"]), Some(&Value::String("foldyaml".into())));
    }
}
