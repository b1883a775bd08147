//! Placeholder substitution for tool templates
//!
//! A template is a script containing `{{paramName}}` placeholders. Rendering
//! replaces every placeholder with a script literal chosen by the JSON type
//! of the value that fills it:
//!
//! - booleans become `true` / `false`
//! - numbers are emitted verbatim
//! - strings are double-quoted, unless the placeholder already sits inside a
//!   string literal of the template, in which case only the escaped text is
//!   inserted
//! - `null` becomes the unit value `()`
//!
//! Explicit arguments win; a placeholder without an argument takes the
//! schema's declared default, and `()` when there is none. Whether a
//! placeholder is inside a literal is decided by scanning the template's
//! structure (string kinds, escapes, comments and `${}` interpolation), not by
//! matching quotes around the placeholder text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::types::ToolDefinition;

/// Matches `{{name}}`
pub static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

/// Script token substituted for a missing value
pub const NULL_LITERAL: &str = "()";

/// Placeholder names in order of appearance (duplicates kept)
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Produce an executable snippet from a tool and caller arguments
pub fn render(tool: &ToolDefinition, arguments: &Map<String, Value>) -> String {
    render_template(&tool.template, arguments, |name| tool.default_for(name))
}

/// Substitute placeholders in `template`, resolving missing ones with `default_for`
pub fn render_template<'a, F>(template: &str, arguments: &Map<String, Value>, default_for: F) -> String
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let contexts = literal_contexts(template);
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);

        let quote = contexts[whole.start()];
        let literal = match arguments.get(name.as_str()).or_else(|| default_for(name.as_str())) {
            Some(value) => format_value(value, quote),
            None => NULL_LITERAL.to_string(),
        };
        out.push_str(&literal);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    out
}

/// Kind of literal a byte of the template belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `"..."`
    Double,
    /// `` `...` `` literal string (no escapes)
    Backtick,
    /// `'c'`
    Char,
}

/// What a byte of script source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    Comment,
    Literal(Quote),
}

/// Literal context of every byte of `src`; `None` means script code (or comment)
pub fn literal_contexts(src: &str) -> Vec<Option<Quote>> {
    regions(src)
        .into_iter()
        .map(|r| match r {
            Region::Literal(q) => Some(q),
            Region::Code | Region::Comment => None,
        })
        .collect()
}

/// `src` with every literal and comment byte blanked to a space
pub fn code_only(src: &str) -> String {
    src.bytes()
        .zip(regions(src))
        .map(|(b, region)| if region == Region::Code { b as char } else { ' ' })
        .collect()
}

/// Classify every byte of `src`
pub fn regions(src: &str) -> Vec<Region> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Code,
        Double,
        Backtick,
        Char,
        LineComment,
        BlockComment,
    }

    let bytes = src.as_bytes();
    let mut contexts = vec![Region::Code; bytes.len()];
    let mut mode = Mode::Code;
    // brace depth of each open `${ ... }` inside a backtick string
    let mut interpolations: Vec<u32> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match mode {
            Mode::Code => match b {
                b'"' => mode = Mode::Double,
                b'`' => mode = Mode::Backtick,
                b'\'' => mode = Mode::Char,
                b'/' if next == Some(b'/') || next == Some(b'*') => {
                    mode = if next == Some(b'/') {
                        Mode::LineComment
                    } else {
                        Mode::BlockComment
                    };
                    contexts[i] = Region::Comment;
                    contexts[i + 1] = Region::Comment;
                    i += 1;
                }
                b'{' => {
                    if let Some(depth) = interpolations.last_mut() {
                        *depth += 1;
                    }
                }
                b'}' => {
                    if let Some(depth) = interpolations.last_mut() {
                        if *depth == 0 {
                            interpolations.pop();
                            mode = Mode::Backtick;
                        } else {
                            *depth -= 1;
                        }
                    }
                }
                _ => {}
            },
            Mode::Double | Mode::Char => {
                let (quote, closing) = if mode == Mode::Double {
                    (Quote::Double, b'"')
                } else {
                    (Quote::Char, b'\'')
                };
                if b == b'\\' {
                    contexts[i] = Region::Literal(quote);
                    if i + 1 < bytes.len() {
                        contexts[i + 1] = Region::Literal(quote);
                    }
                    i += 1;
                } else if b == closing {
                    mode = Mode::Code;
                } else {
                    contexts[i] = Region::Literal(quote);
                }
            }
            Mode::Backtick => {
                if b == b'`' {
                    mode = Mode::Code;
                } else if b == b'$' && next == Some(b'{') {
                    interpolations.push(0);
                    mode = Mode::Code;
                    i += 1;
                } else {
                    contexts[i] = Region::Literal(Quote::Backtick);
                }
            }
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                } else {
                    contexts[i] = Region::Comment;
                }
            }
            Mode::BlockComment => {
                contexts[i] = Region::Comment;
                if b == b'*' && next == Some(b'/') {
                    contexts[i + 1] = Region::Comment;
                    mode = Mode::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    contexts
}

/// Format a JSON value as a script literal for the given context
pub fn format_value(value: &Value, quote: Option<Quote>) -> String {
    match (value, quote) {
        (Value::String(s), Some(q)) => escape_for(s, q),
        (Value::String(s), None) => format!("\"{}\"", escape_for(s, Quote::Double)),
        (Value::Bool(b), _) => b.to_string(),
        (Value::Number(n), _) => n.to_string(),
        (Value::Null, _) => NULL_LITERAL.to_string(),
        // structured values inside a literal are inserted as JSON text
        (other, Some(q)) => escape_for(&other.to_string(), q),
        (other, None) => script_literal(other),
    }
}

/// Script source for arrays and object maps
fn script_literal(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(|v| format_value(v, None)).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    format!(
                        "\"{}\": {}",
                        escape_for(k, Quote::Double),
                        format_value(v, None)
                    )
                })
                .collect();
            format!("#{{{}}}", inner.join(", "))
        }
        other => format_value(other, None),
    }
}

fn escape_for(text: &str, quote: Quote) -> String {
    match quote {
        // backtick strings have no escapes; special sequences are spliced in
        // through an interpolated double-quoted literal
        Quote::Backtick => {
            let mut out = String::with_capacity(text.len());
            let mut chars = text.chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    '`' => out.push_str("${\"`\"}"),
                    '$' if chars.peek() == Some(&'{') => out.push_str("${\"$\"}"),
                    c => out.push(c),
                }
            }
            out
        }
        Quote::Double | Quote::Char => {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' if quote == Quote::Double => out.push_str("\\\""),
                    '\'' if quote == Quote::Char => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out
        }
    }
}
