//! Variable interpolation: the `${NAME}`, `${NAME-DEFAULT}`,
//! `${NAME:-DEFAULT}`, `${NAME?MESSAGE}`, `${NAME:?MESSAGE}` grammar.
//!
//! Unlike a single-pass recursive-descent parser, this module resolves
//! nested defaults (`${undef-${inner}}`) by *iterative textual rescanning*:
//! each pass finds the outer-most `${...}` spans (tracked by a simple brace
//! depth counter, not full recursive parsing), substitutes them, and hands
//! the result back in for another pass. A default/message body that itself
//! contains `${...}` is left untouched during the pass that produces it and
//! picked up on the next one. Depth is counted in *passes*, capped at
//! [`MAX_RESCANS`], not in textual nesting.

use crate::error::{Error, Result};
use crate::varenv::VarEnv;

const MAX_RESCANS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
enum Form {
    Plain,
    Dash(String),
    ColonDash(String),
    Question(String),
    ColonQuestion(String),
}

struct MatchSpan {
    start: usize,
    end: usize,
    name: String,
    form: Form,
}

/// Scan `text` left to right for top-level `${...}` spans. A span's extent
/// is found by counting nested `${` / `}` pairs so that a default body
/// containing its own `${...}` doesn't prematurely close the outer one.
fn find_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' {
            let open = i;
            let mut depth = 1i32;
            let mut j = i + 2;
            while j < bytes.len() && depth > 0 {
                if j + 1 < bytes.len() && bytes[j] == b'$' && bytes[j + 1] == b'{' {
                    depth += 1;
                    j += 2;
                } else if bytes[j] == b'}' {
                    depth -= 1;
                    j += 1;
                } else {
                    j += 1;
                }
            }
            if depth == 0 {
                spans.push((open, j));
                i = j;
                continue;
            } else {
                // Unterminated: no more matches possible from here.
                break;
            }
        }
        i += 1;
    }
    spans
}

fn parse_name(inner: &str) -> (&str, &str) {
    let trimmed = inner.trim_start();
    let name_len = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    let (name, rest) = trimmed.split_at(name_len);
    (name, rest.trim_start())
}

fn parse_form(rest: &str) -> Option<Form> {
    if rest.is_empty() {
        Some(Form::Plain)
    } else if let Some(msg) = rest.strip_prefix(":-") {
        Some(Form::ColonDash(msg.to_string()))
    } else if let Some(msg) = rest.strip_prefix(":?") {
        Some(Form::ColonQuestion(msg.to_string()))
    } else if let Some(msg) = rest.strip_prefix('-') {
        Some(Form::Dash(msg.to_string()))
    } else if let Some(msg) = rest.strip_prefix('?') {
        Some(Form::Question(msg.to_string()))
    } else {
        None
    }
}

fn parse_span(text: &str, start: usize, end: usize) -> Option<MatchSpan> {
    let inner = &text[start + 2..end - 1];
    let (name, rest) = parse_name(inner);
    if name.is_empty() {
        return None;
    }
    let form = parse_form(rest)?;
    Some(MatchSpan { start, end, name: name.to_string(), form })
}

fn resolve(name: &str, form: &Form, env: &VarEnv) -> String {
    match form {
        Form::Plain => env.get(name).unwrap_or("").to_string(),
        Form::Dash(default) => match env.get(name) {
            None => default.clone(),
            Some("") => String::new(),
            Some(v) => v.to_string(),
        },
        Form::ColonDash(default) => match env.get(name) {
            None => default.clone(),
            Some("") => default.clone(),
            Some(v) => v.to_string(),
        },
        Form::Question(message) => match env.get(name) {
            None => {
                log::warn!("Missing mandatory variable {name}: {message}");
                String::new()
            }
            Some("") => String::new(),
            Some(v) => v.to_string(),
        },
        Form::ColonQuestion(message) => match env.get(name) {
            None => {
                log::warn!("Missing mandatory variable {name}: {message}");
                String::new()
            }
            Some("") => {
                log::warn!("Empty mandatory variable {name}: {message}");
                String::new()
            }
            Some(v) => v.to_string(),
        },
    }
}

fn substitute_pass(text: &str, env: &VarEnv) -> (String, bool) {
    let spans: Vec<MatchSpan> = find_spans(text)
        .into_iter()
        .filter_map(|(s, e)| parse_span(text, s, e))
        .collect();

    if spans.is_empty() {
        return (text.to_string(), false);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in &spans {
        out.push_str(&text[cursor..span.start]);
        out.push_str(&resolve(&span.name, &span.form, env));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    (out, true)
}

/// Fully interpolate `raw` against `env`, rescanning until stable or
/// [`MAX_RESCANS`] is exceeded.
pub fn interpolate(raw: &str, env: &VarEnv) -> Result<String> {
    let mut current = raw.to_string();
    for _ in 0..MAX_RESCANS {
        let (next, changed) = substitute_pass(&current, env);
        if !changed {
            return Ok(next);
        }
        current = next;
    }
    // One more probe: if the text is now stable, the last substitution pass
    // was exactly the allowed limit and we're done; otherwise it's genuinely
    // too deep.
    let (_, changed) = substitute_pass(&current, env);
    if changed {
        Err(Error::variable_nesting_too_deep(raw, MAX_RESCANS))
    } else {
        Ok(current)
    }
}

/// Whether `input` contains any `${...}` span at all (used to short-circuit
/// interpolation of scalars that plainly don't need it).
pub fn contains_interpolation(input: &str) -> bool {
    !find_spans(input).is_empty()
}
