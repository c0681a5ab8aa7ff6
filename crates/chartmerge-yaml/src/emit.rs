//! Rendering values as YAML text.
//!
//! Only freshly written values go through here; untouched source text is
//! never re-rendered.

use crate::value::{ScalarStyle, Value, resolve_plain};

/// Render a value at an existing scalar position, honouring the style the
/// position was written in.
///
/// Strings take the given style when they can be expressed in it. Other
/// scalars are always written plain so they read back with the same type.
/// Collections are written in flow style, which is valid at any position.
pub(crate) fn inline(value: &Value, style: ScalarStyle, indent: usize) -> String {
    match value {
        Value::String(s) => string(s, style, indent),
        Value::Sequence(_) | Value::Mapping(_) => flow(value),
        other => plain_scalar(other),
    }
}

/// Single-line flow rendering (`{a: 1, b: [x, y]}`).
pub(crate) fn flow(value: &Value) -> String {
    match value {
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(flow).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", key(k), flow(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        other => plain_scalar(other),
    }
}

/// Block rendering for a node whose first line is already positioned (after
/// `- ` or `key: `). Continuation lines are indented by `indent` spaces.
pub(crate) fn block(value: &Value, indent: usize) -> String {
    let mut out = String::new();
    write_block(&mut out, value, indent);
    out
}

fn write_block(out: &mut String, value: &Value, indent: usize) {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    newline(out, indent);
                }
                out.push_str(&key(k));
                out.push(':');
                match v {
                    Value::Mapping(m) if !m.is_empty() => {
                        newline(out, indent + 2);
                        write_block(out, v, indent + 2);
                    }
                    Value::Sequence(s) if !s.is_empty() => {
                        newline(out, indent + 2);
                        write_block(out, v, indent + 2);
                    }
                    _ => {
                        out.push(' ');
                        out.push_str(&flow(v));
                    }
                }
            }
        }
        Value::Sequence(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    newline(out, indent);
                }
                out.push_str("- ");
                write_block(out, item, indent + 2);
            }
        }
        other => out.push_str(&flow(other)),
    }
}

fn newline(out: &mut String, indent: usize) {
    out.push('\n');
    out.push_str(&" ".repeat(indent));
}

fn key(k: &str) -> String {
    if is_plain_safe(k) {
        k.to_string()
    } else {
        double_quoted(k)
    }
}

pub(crate) fn plain_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => float(*f),
        Value::String(s) => string(s, ScalarStyle::Plain, 0),
        collection => flow(collection),
    }
}

fn float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { ".inf" } else { "-.inf" };
        text.to_string()
    } else {
        let text = f.to_string();
        if text.contains(['.', 'e', 'E']) {
            text
        } else {
            format!("{text}.0")
        }
    }
}

fn string(s: &str, style: ScalarStyle, indent: usize) -> String {
    match style {
        ScalarStyle::Plain if is_plain_safe(s) => s.to_string(),
        ScalarStyle::SingleQuoted if !s.chars().any(char::is_control) => single_quoted(s),
        ScalarStyle::Literal | ScalarStyle::Folded => {
            block_scalar(s, style, indent).unwrap_or_else(|| double_quoted(s))
        }
        _ => double_quoted(s),
    }
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub(crate) fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a `|`/`>` block scalar whose content lines sit at `indent`.
///
/// Returns `None` when the string cannot be written as a block scalar
/// without an explicit indentation indicator or keep-chomping.
fn block_scalar(s: &str, style: ScalarStyle, indent: usize) -> Option<String> {
    let content = s.strip_suffix('\n').unwrap_or(s);
    if content.is_empty()
        || content.ends_with('\n')
        || content.starts_with([' ', '\t'])
        || content.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
    {
        return None;
    }

    let chomp = if s.ends_with('\n') { "" } else { "-" };
    // Folding would turn single newlines into spaces, so only one-line text keeps `>`.
    let indicator = if style == ScalarStyle::Folded && !content.contains('\n') {
        '>'
    } else {
        '|'
    };

    let pad = " ".repeat(indent);
    let lines: Vec<String> = content
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect();
    Some(format!("{indicator}{chomp}\n{}", lines.join("\n")))
}

/// Whether a string can be written as a plain scalar and still read back as
/// the same string, in both block and flow context.
pub(crate) fn is_plain_safe(s: &str) -> bool {
    if s.is_empty() || s.trim() != s || s.starts_with("---") || s.starts_with("...") {
        return false;
    }
    if s.chars().any(|c| c.is_control())
        || s.contains([',', '[', ']', '{', '}'])
        || s.contains(": ")
        || s.contains(" #")
        || s.ends_with(':')
    {
        return false;
    }

    let mut chars = s.chars();
    match chars.next() {
        Some('-' | '?' | ':') => {
            if chars.next().is_none_or(char::is_whitespace) {
                return false;
            }
        }
        Some('#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`') => return false,
        _ => {}
    }

    matches!(resolve_plain(s), Value::String(_))
}
