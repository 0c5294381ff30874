//! Scalar Resolver: classifies a raw, already-interpolated scalar string
//! into a typed [`Value`] using YAML 1.1 core-schema rules, with one
//! deliberate narrowing — only literal `true`/`false` (any case) resolve to
//! boolean. `yes`/`no`/`on`/`off` and their case variants remain strings,
//! matching a downstream convention that treats those words as ordinary
//! text rather than booleans.

use std::sync::OnceLock;

use regex::Regex;

use crate::value::Value;

fn bool_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(true|false)$").unwrap())
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?(0|[1-9][0-9]*)$").unwrap())
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[-+]?(\.inf|\.nan|[0-9][0-9_]*\.[0-9_]*([eE][-+]?[0-9]+)?|\.[0-9]+([eE][-+]?[0-9]+)?|[0-9][0-9_]*[eE][-+]?[0-9]+)$").unwrap()
    })
}

fn null_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(~|null)$").unwrap())
}

/// Classify `raw` into a [`Value`]. Never fails: anything that matches no
/// pattern is returned as [`Value::String`].
pub fn classify(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    if null_re().is_match(raw) {
        return Value::Null;
    }
    if bool_re().is_match(raw) {
        return Value::Bool(raw.eq_ignore_ascii_case("true"));
    }
    if int_re().is_match(raw) {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    if float_re().is_match(raw) {
        let cleaned = raw.replace('_', "");
        if cleaned.eq_ignore_ascii_case(".inf") || cleaned.eq_ignore_ascii_case("+.inf") {
            return Value::Float(f64::INFINITY);
        }
        if cleaned.eq_ignore_ascii_case("-.inf") {
            return Value::Float(f64::NEG_INFINITY);
        }
        if cleaned.eq_ignore_ascii_case(".nan") {
            return Value::Float(f64::NAN);
        }
        if let Ok(f) = cleaned.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::String(raw.to_string())
}
