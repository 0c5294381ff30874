//! Include Engine: the per-file load pipeline.
//!
//! For each file this walks, in order: cycle/depth check, a first pass that
//! discovers the file's own `variables:` block (without yet being able to
//! use it), predefined-variable injection, a second full pass that can
//! finally interpolate against the complete environment, recursive
//! `!include`/`!secret` resolution (depth-first, order-preserving), and
//! finally `packages:` merging. Only the final assembled mapping is
//! returned — `variables` and `packages` never appear in it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node;
use crate::package;
use crate::secret::{self, SecretCache};
use crate::value::{IncludeRef, Value};
use crate::varenv::{self, VarEnv};

const MAX_DEPTH: usize = 100;

/// Branch-local cycle/depth guard. A single top-level load owns one of
/// these; it tracks only the active-ancestor chain of the branch currently
/// being walked, not every file visited so far, so two sibling includes may
/// each include a third common file without tripping the cycle check.
pub struct IncludeStack {
    active: HashSet<PathBuf>,
    depth: usize,
}

impl IncludeStack {
    pub fn new() -> Self {
        Self { active: HashSet::new(), depth: 0 }
    }

    fn enter(&mut self, path: &Path) -> Result<PathBuf> {
        let canonical = canonicalize_best_effort(path);
        if self.active.contains(&canonical) {
            let mut stack: Vec<PathBuf> = self.active.iter().cloned().collect();
            stack.sort();
            return Err(Error::circular_inclusion(path, &stack));
        }
        if self.depth >= MAX_DEPTH {
            return Err(Error::max_depth_exceeded(path, MAX_DEPTH));
        }
        self.active.insert(canonical.clone());
        self.depth += 1;
        Ok(canonical)
    }

    fn exit(&mut self, canonical: &Path) {
        self.active.remove(canonical);
        self.depth -= 1;
    }
}

impl Default for IncludeStack {
    fn default() -> Self {
        Self::new()
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Load the top-level document at `path` with a fresh environment, cycle
/// guard, and secret cache.
pub fn load_root(path: &Path) -> Result<Value> {
    let mut stack = IncludeStack::new();
    let mut secrets = SecretCache::new();
    load_file(path, &VarEnv::new(), &IndexMap::new(), &mut stack, &mut secrets)
}

fn load_file(
    path: &Path,
    inherited: &VarEnv,
    include_vars: &IndexMap<String, String>,
    stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> Result<Value> {
    let canonical = stack.enter(path)?;
    let result = load_file_inner(path, inherited, include_vars, stack, secrets);
    stack.exit(&canonical);
    result
}

fn load_file_inner(
    path: &Path,
    inherited: &VarEnv,
    include_vars: &IndexMap<String, String>,
    stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    // The include's own vars win over the inherited environment even before
    // this file's `variables:` block is discovered, so a file can't shadow
    // what its caller explicitly overrode.
    let mut env = inherited.clone();
    for (k, v) in include_vars {
        env.put_overwrite(k.clone(), v.clone());
    }
    env.inject_predefined(path);

    let first_pass = node::parse_str(&content, path, &env)?;
    if let Value::Mapping(top) = &first_pass {
        if let Some(vars_node) = top.get("variables") {
            merge_file_variables(vars_node, path, &mut env);
        }
    }
    // Predefined variables are re-asserted after merging the file's own
    // `variables:` block; put-if-absent merging can never shadow them, but
    // this keeps the two passes' precedence rules explicit rather than
    // relying on ordering alone.
    env.inject_predefined(path);

    let second_pass = node::parse_str(&content, path, &env)?;

    let mut mapping = match second_pass {
        Value::Mapping(m) => m,
        other => return Ok(other),
    };
    mapping.shift_remove("variables");

    let resolved = resolve_node(Value::Mapping(mapping), path, &env, stack, secrets)?;

    let mut resolved_map = match resolved {
        Value::Mapping(m) => m,
        other => return Ok(other),
    };

    if let Some(packages_node) = resolved_map.shift_remove("packages") {
        resolved_map = package::apply_packages(resolved_map, packages_node, path)?;
    }

    Ok(Value::Mapping(resolved_map))
}

fn merge_file_variables(vars_node: &Value, path: &Path, env: &mut VarEnv) {
    let Value::Mapping(vars_map) = vars_node else {
        log::warn!("'variables' in {} is not a mapping; ignoring", path.display());
        return;
    };
    for (k, v) in vars_map {
        if varenv::is_predefined(k) {
            log::warn!(
                "ignoring reserved variable name {k:?} in variables: block of {}",
                path.display()
            );
            continue;
        }
        match v {
            Value::Mapping(_) | Value::Sequence(_) => {
                log::warn!(
                    "variables.{k} in {} is a {} (mapping/sequence values are rejected); ignoring",
                    path.display(),
                    v.type_name()
                );
                continue;
            }
            Value::String(s) => env.put_if_absent(k.clone(), s.clone()),
            other => env.put_if_absent(k.clone(), other.to_string()),
        }
    }
}

fn resolve_node(
    value: Value,
    current_file: &Path,
    env: &VarEnv,
    stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> Result<Value> {
    match value {
        Value::IncludeRef(r) => resolve_include(r, current_file, env, stack, secrets),
        Value::SecretRef(r) => resolve_secret(&r.name, current_file, stack, secrets),
        Value::Mapping(m) => {
            let mut out = IndexMap::with_capacity(m.len());
            for (k, v) in m {
                out.insert(k, resolve_node(v, current_file, env, stack, secrets)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(s) => {
            let mut out = Vec::with_capacity(s.len());
            for v in s {
                out.push(resolve_node(v, current_file, env, stack, secrets)?);
            }
            Ok(Value::Sequence(out))
        }
        other => Ok(other),
    }
}

fn resolve_include(
    include_ref: IncludeRef,
    current_file: &Path,
    env: &VarEnv,
    stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> Result<Value> {
    let target = resolve_relative(current_file, &include_ref.file_name);
    // Inherited vars precedence for a child include: parent's combined env,
    // with the include's own `vars` overlaid on top for the duration of the
    // child load (applied inside load_file_inner via `include_vars`).
    match load_file(&target, env, &include_ref.vars, stack, secrets) {
        Ok(v) => Ok(v),
        Err(err @ Error::Io { .. }) => {
            log::warn!("failed to include {}: {err}", target.display());
            Ok(Value::Mapping(IndexMap::new()))
        }
        Err(err) => Err(err),
    }
}

fn resolve_secret(
    name: &str,
    current_file: &Path,
    stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> Result<Value> {
    let secrets_path = canonicalize_best_effort(&secret::sibling_secrets_path(current_file));
    if !secrets.is_loaded(&secrets_path) {
        let entries = load_secrets_entries(&secrets_path, stack, secrets);
        secrets.populate(secrets_path.clone(), entries);
    }
    match secrets.lookup(&secrets_path, name) {
        Some(v) => Ok(Value::String(v.to_string())),
        None => {
            log::warn!("secret {name:?} not found in {}", secrets_path.display());
            Ok(Value::String(String::new()))
        }
    }
}

fn load_secrets_entries(
    secrets_path: &Path,
    _stack: &mut IncludeStack,
    secrets: &mut SecretCache,
) -> std::collections::HashMap<String, String> {
    if !secrets_path.is_file() {
        log::warn!("no secrets file at {}", secrets_path.display());
        return std::collections::HashMap::new();
    }

    let mut fresh_stack = IncludeStack::new();
    let doc = match load_file(secrets_path, &VarEnv::new(), &IndexMap::new(), &mut fresh_stack, secrets) {
        Ok(v) => v,
        Err(err) => {
            log::warn!("failed to load secrets file {}: {err}", secrets_path.display());
            return std::collections::HashMap::new();
        }
    };

    match doc {
        Value::Mapping(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                other => {
                    log::warn!(
                        "secret {k:?} in {} is not a string ({}); ignoring",
                        secrets_path.display(),
                        other.type_name()
                    );
                    None
                }
            })
            .collect(),
        other => {
            log::warn!(
                "secrets file {} is not a mapping ({}); ignoring",
                secrets_path.display(),
                other.type_name()
            );
            std::collections::HashMap::new()
        }
    }
}

fn resolve_relative(current_file: &Path, file_name: &str) -> PathBuf {
    let candidate = Path::new(file_name);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        current_file
            .parent()
            .map(|p| p.join(candidate))
            .unwrap_or_else(|| candidate.to_path_buf())
    }
}
