//! `{name}` format-string templates.
//!
//! Replacement fields are `{name}`, `{name.attr}`, `{name[0]}` or
//! `{name[key]}`, optionally followed by `:spec`. `{{` and `}}` are literal
//! braces. Besides the usual `[[fill]align][width][.precision][type]`,
//! a spec may take the extended form
//!
//! ```text
//! prefix^[joiner:item_spec]:spec
//! ```
//!
//! which joins the items of a collection with `joiner` (each item formatted
//! with `item_spec`), applies `spec` to the result and indents every
//! non-blank line with `prefix`. Both the prefix and the joiner group are
//! optional; `^^`, `::` and `]]` escape `^`, `:` and `]` inside them.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{read_source, Template};
use crate::codegen::context::{Scope, Slot};
use crate::error::{IrError, Result};
use crate::node::Value;

const MAX_NESTING: usize = 2;

static EXTENDED_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:((?:[^\^]|\^\^)*)\^)?(?:\[((?:[^:]|::)*)(?::((?:[^\]]|\]\])*))?\])?:(.*)$")
        .expect("extended spec regex is valid")
});

static STANDARD_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:(.)?([<>^]))?(\d+)?(?:\.(\d+))?([sdf])?$")
        .expect("standard spec regex is valid")
});

// ─── Parsed form ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Clone, Debug)]
struct Field {
    name: String,
    accessors: Vec<Accessor>,
    /// The spec may itself contain replacement fields.
    spec: Vec<Segment>,
}

#[derive(Clone, Debug)]
enum Accessor {
    Attr(String),
    Item(String),
}

#[derive(Clone, Debug)]
pub struct FormatTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    /// Parse `source`; malformed fields are reported here.
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            segments: parse(source, MAX_NESTING)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(&read_source(path)?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Template for FormatTemplate {
    fn render(&self, scope: &dyn Scope) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        render_segments(&self.segments, scope, &mut out)?;
        Ok(out)
    }
}

fn template_err(message: impl Into<String>) -> IrError {
    IrError::Template(message.into())
}

// ─── Parsing ──────────────────────────────────────────────────────

fn parse(source: &str, depth: usize) -> Result<Vec<Segment>> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(template_err("single '}' encountered in format string")),
            '{' => {
                if depth == 0 {
                    return Err(template_err("max format nesting exceeded"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let (field, next) = parse_field(&chars, i + 1, depth)?;
                segments.push(Segment::Field(field));
                i = next;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Parse one replacement field starting after its `{`; returns the field
/// and the position after its closing `}`.
fn parse_field(chars: &[char], start: usize, depth: usize) -> Result<(Field, usize)> {
    let unclosed = || template_err("expected '}' before end of string");

    let mut i = start;
    while i < chars.len() && !matches!(chars[i], ':' | '}' | '!') {
        if chars[i] == '[' {
            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }
        }
        i += 1;
    }
    if i >= chars.len() {
        return Err(unclosed());
    }
    let path: String = chars[start..i].iter().collect();
    if chars[i] == '!' {
        return Err(template_err(format!(
            "conversion flags are not supported in '{{{}}}'",
            path
        )));
    }

    let mut spec_src = String::new();
    if chars[i] == ':' {
        i += 1;
        let mut nested = 0usize;
        loop {
            let c = *chars.get(i).ok_or_else(unclosed)?;
            match c {
                '{' => nested += 1,
                '}' if nested == 0 => break,
                '}' => nested -= 1,
                _ => {}
            }
            spec_src.push(c);
            i += 1;
        }
    }

    let (name, accessors) = parse_path(&path)?;
    let spec = parse(&spec_src, depth - 1)?;
    Ok((
        Field {
            name,
            accessors,
            spec,
        },
        i + 1,
    ))
}

fn parse_path(path: &str) -> Result<(String, Vec<Accessor>)> {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    let name = &path[..end];
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        return Err(template_err(format!(
            "replacement fields must be named ('{{{}}}')",
            path
        )));
    }

    let mut accessors = Vec::new();
    let mut rest = &path[end..];
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            if end == 0 {
                return Err(template_err(format!("empty attribute in '{{{}}}'", path)));
            }
            accessors.push(Accessor::Attr(after[..end].to_string()));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| template_err(format!("missing ']' in '{{{}}}'", path)))?;
            accessors.push(Accessor::Item(after[..end].to_string()));
            rest = &after[end + 1..];
        } else {
            return Err(template_err(format!(
                "only '.' or '[' may follow ']' in '{{{}}}'",
                path
            )));
        }
    }
    Ok((name.to_string(), accessors))
}

// ─── Rendering ────────────────────────────────────────────────────

fn render_segments(segments: &[Segment], scope: &dyn Scope, out: &mut String) -> Result<()> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(field) => {
                let slot = resolve(field, scope)?;
                let mut spec = String::new();
                render_segments(&field.spec, scope, &mut spec)?;
                out.push_str(&format_field(slot, &spec)?);
            }
        }
    }
    Ok(())
}

fn resolve<'s>(field: &Field, scope: &'s dyn Scope) -> Result<Slot<'s>> {
    let mut slot = scope
        .lookup(&field.name)
        .ok_or_else(|| template_err(format!("no value for field '{}'", field.name)))?;
    for accessor in &field.accessors {
        slot = match accessor {
            Accessor::Attr(name) => slot.attr(name),
            Accessor::Item(key) => slot.item(key),
        }
        .ok_or_else(|| {
            let access = match accessor {
                Accessor::Attr(name) => format!(".{}", name),
                Accessor::Item(key) => format!("[{}]", key),
            };
            template_err(format!("cannot resolve '{}{}'", field.name, access))
        })?;
    }
    Ok(slot)
}

/// A formatting argument: numbers keep their type for numeric specs.
enum Arg {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Arg {
    fn of(slot: &Slot<'_>) -> Arg {
        match slot {
            Slot::Value(Value::Int(i)) => Arg::Int(*i),
            Slot::Value(Value::Float(x)) => Arg::Float(*x),
            other => Arg::Text(other.text()),
        }
    }
}

fn format_field(slot: Slot<'_>, spec: &str) -> Result<String> {
    let Some(caps) = EXTENDED_SPEC.captures(spec) else {
        return format_standard(Arg::of(&slot), spec);
    };
    let prefix = caps.get(1).map(|m| m.as_str().replace("^^", "^"));
    let fmt = caps.get(4).map_or("", |m| m.as_str());

    let formatted = match caps.get(2) {
        Some(joiner) => {
            let joiner = joiner.as_str().replace("::", ":");
            let item_spec = caps.get(3).map_or(String::new(), |m| m.as_str().replace("]]", "]"));
            let items = slot.items().ok_or_else(|| {
                template_err(format!(
                    "collection formatting used with a scalar value '{}'",
                    slot.text()
                ))
            })?;
            let parts = items
                .iter()
                .map(|item| format_standard(Arg::of(item), &item_spec))
                .collect::<Result<Vec<_>>>()?;
            format_standard(Arg::Text(parts.join(&joiner)), fmt)?
        }
        None => format_standard(Arg::of(&slot), fmt)?,
    };

    Ok(match prefix {
        Some(prefix) if !prefix.is_empty() => indent(&formatted, &prefix),
        _ => formatted,
    })
}

/// Largest accepted width or precision.
const MAX_SPEC_NUMBER: usize = u16::MAX as usize;

/// `[[fill]align][width][.precision][type]` with types `s`, `d` and `f`.
fn format_standard(arg: Arg, spec: &str) -> Result<String> {
    if spec.is_empty() {
        return Ok(match arg {
            Arg::Int(i) => i.to_string(),
            Arg::Float(x) => Value::Float(x).to_string(),
            Arg::Text(s) => s,
        });
    }
    let caps = STANDARD_SPEC
        .captures(spec)
        .ok_or_else(|| template_err(format!("invalid format spec '{}'", spec)))?;
    let mut fill = caps
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .unwrap_or(' ');
    let mut align = caps.get(2).map(|m| m.as_str());
    // A leading zero on the width means zero padding.
    if align.is_none() && caps.get(3).is_some_and(|m| m.as_str().starts_with('0')) {
        fill = '0';
        align = Some(">");
    }
    let width: usize = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| {
        template_err(format!("invalid width in '{}'", spec))
    })?;
    let precision: Option<usize> = caps
        .get(4)
        .map(|m| m.as_str().parse())
        .transpose()
        .map_err(|_| template_err(format!("invalid precision in '{}'", spec)))?;
    if width > MAX_SPEC_NUMBER || precision.is_some_and(|p| p > MAX_SPEC_NUMBER) {
        return Err(template_err(format!(
            "width or precision too large in '{}' (limit {})",
            spec, MAX_SPEC_NUMBER
        )));
    }
    let kind = caps.get(5).map(|m| m.as_str());

    let numeric = !matches!(arg, Arg::Text(_));
    let body = match (kind, arg) {
        (Some("d"), Arg::Int(i)) => i.to_string(),
        (Some("d"), _) => {
            return Err(template_err(format!("'d' format requires an integer ('{}')", spec)))
        }
        (Some("f"), Arg::Int(i)) => format!("{:.*}", precision.unwrap_or(6), i as f64),
        (Some("f"), Arg::Float(x)) => format!("{:.*}", precision.unwrap_or(6), x),
        (Some("f"), Arg::Text(_)) => {
            return Err(template_err(format!("'f' format requires a number ('{}')", spec)))
        }
        (_, Arg::Float(x)) => match precision {
            Some(p) => format!("{:.*}", p, x),
            None => Value::Float(x).to_string(),
        },
        (_, Arg::Int(i)) => match precision {
            Some(p) => format!("{:.*}", p, i as f64),
            None => i.to_string(),
        },
        (_, Arg::Text(s)) => match precision {
            Some(p) => s.chars().take(p).collect(),
            None => s,
        },
    };

    let align = align.unwrap_or(if numeric { ">" } else { "<" });
    Ok(pad(&body, fill, align, width))
}

fn pad(body: &str, fill: char, align: &str, width: usize) -> String {
    let len = body.chars().count();
    if len >= width {
        return body.to_string();
    }
    let total = width - len;
    let (left, right) = match align {
        ">" => (total, 0),
        "^" => (total / 2, total - total / 2),
        _ => (0, total),
    };
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat(fill).take(left));
    out.push_str(body);
    out.extend(std::iter::repeat(fill).take(right));
    out
}

/// Prefix every line that is not whitespace-only.
fn indent(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            out.push_str(prefix);
        }
        out.push_str(line);
    }
    out
}
