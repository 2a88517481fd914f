//! Helpers for programmatic code generation: an indented line buffer and
//! identifier case conversion.

use std::fmt;
use std::str::FromStr;

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, Result};

// ─── TextBlock ────────────────────────────────────────────────────

/// A block of source code as a sequence of lines, each prefixed with the
/// indentation current when it was appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    indent_level: usize,
    indent_size: usize,
    indent_char: char,
    end_line: String,
    lines: Vec<String>,
}

impl Default for TextBlock {
    fn default() -> Self {
        Self {
            indent_level: 0,
            indent_size: 4,
            indent_char: ' ',
            end_line: "\n".to_string(),
            lines: Vec::new(),
        }
    }
}

impl TextBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent_level: usize, indent_size: usize, indent_char: char) -> Self {
        Self {
            indent_level,
            indent_size,
            indent_char,
            ..Self::default()
        }
    }

    /// Line separator used by [`TextBlock::text`].
    pub fn end_line(mut self, end_line: &str) -> Self {
        self.end_line = end_line.to_string();
        self
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn append(&mut self, line: &str) -> &mut Self {
        let line = format!("{}{}", self.indent_str(), line);
        self.lines.push(line);
        self
    }

    /// Change the indentation by `steps` (negative dedents), then append.
    pub fn append_with_indent(&mut self, line: &str, steps: isize) -> &mut Self {
        if steps > 0 {
            self.indent(steps.unsigned_abs());
        } else if steps < 0 {
            self.dedent(steps.unsigned_abs());
        }
        self.append(line)
    }

    pub fn extend<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.append(line.as_ref());
        }
        self
    }

    /// Append the lines of `text` after removing their common leading
    /// whitespace.
    pub fn extend_dedented(&mut self, text: &str) -> &mut Self {
        let lines = dedent(text);
        self.extend(lines)
    }

    /// Append another block's lines, re-indented at this block's level.
    pub fn extend_block(&mut self, other: &TextBlock) -> &mut Self {
        self.extend(&other.lines)
    }

    /// Append `count` lines with no indentation.
    pub fn empty_line(&mut self, count: usize) -> &mut Self {
        self.lines.extend(std::iter::repeat(String::new()).take(count));
        self
    }

    pub fn indent(&mut self, steps: usize) -> &mut Self {
        self.indent_level += steps;
        self
    }

    /// Never goes below level zero.
    pub fn dedent(&mut self, steps: usize) -> &mut Self {
        self.indent_level = self.indent_level.saturating_sub(steps);
        self
    }

    /// Run `body` one level deeper.
    pub fn indented(&mut self, steps: usize, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.indent(steps);
        body(self);
        self.dedent(steps)
    }

    pub fn indent_str(&self) -> String {
        std::iter::repeat(self.indent_char)
            .take(self.indent_level * self.indent_size)
            .collect()
    }

    pub fn text(&self) -> String {
        self.lines.join(&self.end_line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Lines of `text` without their common leading whitespace. Blank lines do
/// not count towards the common prefix and come out empty.
fn dedent(text: &str) -> Vec<String> {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(|common, prefix| {
            let len = common
                .char_indices()
                .zip(prefix.chars())
                .take_while(|((_, a), b)| a == b)
                .map(|((i, a), _)| i + a.len_utf8())
                .last()
                .unwrap_or(0);
            &common[..len]
        })
        .unwrap_or("");
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line[margin.len()..].to_string()
            }
        })
        .collect()
}

// ─── Case styles ──────────────────────────────────────────────────

/// Identifier spelling conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// `firstsecond`; cannot be split back into words.
    Concatenated,
    /// `first second`
    Canonical,
    /// `firstSecond`
    Camel,
    /// `FirstSecond`
    Pascal,
    /// `first_second`
    Snake,
    /// `first-second`
    Kebab,
}

impl CaseStyle {
    fn case(self) -> Case {
        match self {
            CaseStyle::Concatenated => Case::Flat,
            CaseStyle::Canonical => Case::Lower,
            CaseStyle::Camel => Case::Camel,
            CaseStyle::Pascal => Case::Pascal,
            CaseStyle::Snake => Case::Snake,
            CaseStyle::Kebab => Case::Kebab,
        }
    }

    /// Words of `name`, lowercased. Camel and pascal names also break
    /// at acronyms and digits (`parseHTTPResponse` -> `parse http response`).
    pub fn split(self, name: &str) -> Result<Vec<String>> {
        if self == CaseStyle::Concatenated {
            return Err(IrError::Config(format!(
                "cannot split concatenated name '{}' into words",
                name
            )));
        }
        let canonical = name.from_case(self.case()).to_case(Case::Lower);
        Ok(canonical.split_whitespace().map(str::to_string).collect())
    }

    pub fn join<S: AsRef<str>>(self, words: &[S]) -> String {
        let words: Vec<&str> = words.iter().map(|w| w.as_ref()).collect();
        words.join(" ").from_case(Case::Lower).to_case(self.case())
    }

    pub fn convert(name: &str, from: CaseStyle, to: CaseStyle) -> Result<String> {
        Ok(to.join(&from.split(name)?))
    }
}

impl FromStr for CaseStyle {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "concatenated" => Ok(CaseStyle::Concatenated),
            "canonical" => Ok(CaseStyle::Canonical),
            "camel" => Ok(CaseStyle::Camel),
            "pascal" => Ok(CaseStyle::Pascal),
            "snake" => Ok(CaseStyle::Snake),
            "kebab" => Ok(CaseStyle::Kebab),
            other => Err(IrError::Config(format!("unknown case style '{}'", other))),
        }
    }
}

// ─── Name ─────────────────────────────────────────────────────────

/// A symbol name as a sequence of words, printable in any case style.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Name {
    words: Vec<String>,
}

impl Name {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_string(name: &str, style: CaseStyle) -> Result<Self> {
        Ok(Self {
            words: style.split(name)?,
        })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn as_case(&self, style: CaseStyle) -> String {
        style.join(&self.words)
    }
}
