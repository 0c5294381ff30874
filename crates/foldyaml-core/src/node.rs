//! Node Constructor: turns a YAML event stream into a [`Value`] tree,
//! dispatching on tag and scalar style the way a `map<Tag, ConstructFn>`
//! would (see the design notes on custom tag dispatch). This is the one
//! module that has to reach below `serde`-style generic YAML values,
//! because those discard exactly the two things this component needs per
//! scalar: which quote style produced it, and any explicit tag.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::Tag;

use crate::error::{Error, Result};
use crate::interpolation;
use crate::scalar;
use crate::value::{IncludeRef, SecretRef, Value};
use crate::varenv::VarEnv;

enum Frame {
    Sequence {
        tag: Option<String>,
        items: Vec<Value>,
    },
    Mapping {
        tag: Option<String>,
        pending_key: Option<Value>,
        entries: IndexMap<String, Value>,
    },
}

struct Builder<'a> {
    env: &'a VarEnv,
    path: &'a Path,
    stack: Vec<Frame>,
    anchors: std::collections::HashMap<usize, Value>,
    root: Option<Value>,
    error: Option<Error>,
}

impl<'a> Builder<'a> {
    fn new(env: &'a VarEnv, path: &'a Path) -> Self {
        Self {
            env,
            path,
            stack: Vec::new(),
            anchors: std::collections::HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn remember_anchor(&mut self, anchor_id: usize, value: &Value) {
        if anchor_id != 0 {
            self.anchors.insert(anchor_id, value.clone());
        }
    }

    fn push_complete(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping { pending_key, entries, .. }) => {
                if let Some(key_value) = pending_key.take() {
                    match key_value {
                        Value::String(k) => {
                            entries.insert(k, value);
                        }
                        other => {
                            log::warn!("non-string mapping key {other:?} ignored");
                        }
                    }
                } else {
                    *pending_key = Some(value);
                }
            }
        }
    }

    fn construct_scalar(&mut self, raw: &str, style: TScalarStyle, tag: Option<&Tag>) -> Value {
        if let Some(t) = tag {
            match t.suffix.as_str() {
                "secret" => return Value::SecretRef(SecretRef { name: raw.trim().to_string() }),
                "include" => {
                    return Value::IncludeRef(IncludeRef {
                        file_name: raw.trim().to_string(),
                        vars: IndexMap::new(),
                    })
                }
                _ => {}
            }
        }

        if style == TScalarStyle::SingleQuoted {
            return Value::String(raw.to_string());
        }

        match interpolation::interpolate(raw, self.env) {
            Ok(interpolated) => scalar::classify(&interpolated),
            Err(err) => {
                self.fail(err);
                Value::String(raw.to_string())
            }
        }
    }

    fn finish_mapping(&mut self, tag: Option<String>, entries: IndexMap<String, Value>) -> Value {
        match tag.as_deref() {
            Some("secret") => {
                self.fail(Error::structural(format!(
                    "!secret applied to a mapping in {}: expected a scalar",
                    self.path.display()
                )));
                Value::Mapping(IndexMap::new())
            }
            Some("include") => self.finish_include_mapping(entries),
            _ => Value::Mapping(entries),
        }
    }

    fn finish_include_mapping(&mut self, mut entries: IndexMap<String, Value>) -> Value {
        let file_name = match entries.shift_remove("file") {
            Some(Value::String(s)) => s,
            Some(other) => {
                log::warn!(
                    "!include 'file' key must be a string, got {} in {}",
                    other.type_name(),
                    self.path.display()
                );
                return Value::Mapping(IndexMap::new());
            }
            None => {
                log::warn!("!include missing required 'file' key in {}", self.path.display());
                return Value::Mapping(IndexMap::new());
            }
        };

        let vars = match entries.shift_remove("vars") {
            None => IndexMap::new(),
            Some(Value::Mapping(m)) => m
                .into_iter()
                .map(|(k, v)| {
                    let coerced = match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, coerced)
                })
                .collect(),
            Some(other) => {
                log::warn!(
                    "!include 'vars' must be a mapping, got {} in {}; ignoring",
                    other.type_name(),
                    self.path.display()
                );
                IndexMap::new()
            }
        };

        Value::IncludeRef(IncludeRef { file_name, vars })
    }

    fn finish_sequence(&mut self, tag: Option<String>, items: Vec<Value>) -> Value {
        match tag.as_deref() {
            Some("secret") => {
                self.fail(Error::structural(format!(
                    "!secret applied to a sequence in {}: expected a scalar",
                    self.path.display()
                )));
                Value::Sequence(items)
            }
            Some("include") => {
                log::warn!(
                    "!include applied to a sequence in {}; only scalar and mapping forms are supported, using default construction",
                    self.path.display()
                );
                Value::Sequence(items)
            }
            _ => Value::Sequence(items),
        }
    }
}

impl<'a> MarkedEventReceiver for Builder<'a> {
    fn on_event(&mut self, ev: Event, _marker: Marker) {
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Alias(id) => {
                let value = self.anchors.get(&id).cloned().unwrap_or(Value::Null);
                self.push_complete(value);
            }

            Event::Scalar(raw, style, anchor_id, tag) => {
                let value = self.construct_scalar(&raw, style, tag.as_ref());
                self.remember_anchor(anchor_id, &value);
                self.push_complete(value);
            }

            Event::SequenceStart(anchor_id, tag) => {
                self.stack.push(Frame::Sequence {
                    tag: tag.map(|t| t.suffix),
                    items: Vec::new(),
                });
                // Anchors on collections are registered when the collection
                // completes (SequenceEnd), not here; anchor_id is carried in
                // the frame implicitly via remember-on-complete below.
                let _ = anchor_id;
            }

            Event::SequenceEnd => {
                let Some(Frame::Sequence { tag, items }) = self.stack.pop() else {
                    self.fail(Error::structural("SequenceEnd without matching SequenceStart"));
                    return;
                };
                let value = self.finish_sequence(tag, items);
                self.push_complete(value);
            }

            Event::MappingStart(anchor_id, tag) => {
                self.stack.push(Frame::Mapping {
                    tag: tag.map(|t| t.suffix),
                    pending_key: None,
                    entries: IndexMap::new(),
                });
                let _ = anchor_id;
            }

            Event::MappingEnd => {
                let Some(Frame::Mapping { tag, entries, .. }) = self.stack.pop() else {
                    self.fail(Error::structural("MappingEnd without matching MappingStart"));
                    return;
                };
                let value = self.finish_mapping(tag, entries);
                self.push_complete(value);
            }
        }
    }
}

/// Parse `content` (the text of `path`) into a [`Value`] tree, performing
/// tag dispatch, scalar-style-aware interpolation suppression, and
/// interpolation/reclassification inline, against `env`.
pub fn parse_str(content: &str, path: &Path, env: &VarEnv) -> Result<Value> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = Builder::new(env, path);

    parser
        .load(&mut builder, false)
        .map_err(|e| Error::parse(path, e))?;

    if let Some(err) = builder.error {
        return Err(err);
    }

    Ok(builder.root.unwrap_or(Value::Mapping(IndexMap::new())))
}

pub fn parse_file(path: &PathBuf, env: &VarEnv) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path.clone(), e))?;
    parse_str(&content, path, env)
}
