//! Package Merger: deep-merges `packages:` entries into the document that
//! references them.
//!
//! This is deliberately not a general-purpose value merge — it has its own
//! narrower semantics: the referencing document always wins on a scalar or
//! type conflict, mappings recurse key by key, and sequences concatenate
//! (document items first, then package items) rather than replace.

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::Value;

/// Merge each sub-mapping in `packages` (a `name -> sub-mapping` mapping;
/// iteration order doesn't affect the result, per the merge rules below)
/// into `main`, which has already had its own `packages` key removed by
/// the caller.
pub fn apply_packages(
    mut main: IndexMap<String, Value>,
    packages: Value,
    path: &std::path::Path,
) -> Result<IndexMap<String, Value>> {
    let entries = match packages {
        Value::Mapping(entries) => entries,
        other => {
            log::warn!(
                "'packages' in {} is not a mapping ({}); ignoring",
                path.display(),
                other.type_name()
            );
            return Ok(main);
        }
    };

    for (name, entry) in entries {
        match entry {
            Value::Mapping(pkg) => main = merge_mapping(main, pkg),
            other => {
                log::warn!(
                    "packages.{name} in {} is not a mapping ({}); skipping",
                    path.display(),
                    other.type_name()
                );
            }
        }
    }

    Ok(main)
}

fn merge_mapping(
    mut main: IndexMap<String, Value>,
    package: IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    for (key, pkg_value) in package {
        if let Some(existing) = main.get_mut(&key) {
            let taken = std::mem::replace(existing, Value::Null);
            *existing = merge_value(taken, pkg_value);
        } else {
            main.insert(key, pkg_value);
        }
    }
    main
}

fn merge_value(main_value: Value, pkg_value: Value) -> Value {
    match (main_value, pkg_value) {
        (Value::Mapping(m), Value::Mapping(p)) => Value::Mapping(merge_mapping(m, p)),
        (Value::Sequence(mut m), Value::Sequence(p)) => {
            m.extend(p);
            Value::Sequence(m)
        }
        // Scalar/type mismatch (including mapping-vs-sequence etc): main wins.
        (main_value, _pkg_value) => main_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn map(pairs: Vec<(&str, Value)>) -> IndexMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn main_wins_on_scalar_conflict() {
        let main = map(vec![("a", Value::Integer(1))]);
        let pkg = Value::Mapping(map(vec![("p", Value::Mapping(map(vec![("a", Value::Integer(2))])))]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn new_keys_from_package_are_added() {
        let main = map(vec![("a", Value::Integer(1))]);
        let pkg = Value::Mapping(map(vec![("p", Value::Mapping(map(vec![("b", Value::Integer(2))])))]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Integer(1)));
        assert_eq!(result.get("b"), Some(&Value::Integer(2)));
    }

    #[test]
    fn mappings_recurse() {
        let main = map(vec![("nested", Value::Mapping(map(vec![("x", Value::Integer(1))])))]);
        let pkg = Value::Mapping(map(vec![(
            "p",
            Value::Mapping(map(vec![(
                "nested",
                Value::Mapping(map(vec![("y", Value::Integer(2))])),
            )])),
        )]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        let nested = result.get("nested").unwrap().as_mapping().unwrap();
        assert_eq!(nested.get("x"), Some(&Value::Integer(1)));
        assert_eq!(nested.get("y"), Some(&Value::Integer(2)));
    }

    #[test]
    fn sequences_concatenate_main_then_package() {
        let main = map(vec![("list", Value::Sequence(vec![Value::Integer(1)]))]);
        let pkg = Value::Mapping(map(vec![(
            "p",
            Value::Mapping(map(vec![("list", Value::Sequence(vec![Value::Integer(2)]))])),
        )]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(
            result.get("list"),
            Some(&Value::Sequence(vec![Value::Integer(1), Value::Integer(2)]))
        );
    }

    #[test]
    fn type_mismatch_main_wins() {
        let main = map(vec![("a", Value::Sequence(vec![Value::Integer(1)]))]);
        let pkg = Value::Mapping(map(vec![("p", Value::Mapping(map(vec![("a", Value::Integer(9))])))]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Sequence(vec![Value::Integer(1)])));
    }

    #[test]
    fn multiple_packages_merge_in_order() {
        let main = map(vec![("a", Value::Integer(1))]);
        let pkg = Value::Mapping(map(vec![
            ("p1", Value::Mapping(map(vec![("b", Value::Integer(2))]))),
            ("p2", Value::Mapping(map(vec![("c", Value::Integer(3))]))),
        ]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Integer(1)));
        assert_eq!(result.get("b"), Some(&Value::Integer(2)));
        assert_eq!(result.get("c"), Some(&Value::Integer(3)));
    }

    #[test]
    fn non_mapping_package_entry_is_skipped() {
        let main = map(vec![("a", Value::Integer(1))]);
        let pkg = Value::Mapping(map(vec![("p", Value::Integer(42))]));
        let result = apply_packages(main, pkg, Path::new("/x.yaml")).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Integer(1)));
        assert_eq!(result.len(), 1);
    }
}
