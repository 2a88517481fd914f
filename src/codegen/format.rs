//! Source formatting of generated code, per target language.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::error::{IrError, Result};

/// Reformats generated source text.
pub trait SourceFormatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String>;
}

impl<F> SourceFormatter for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn format(&self, source: &str) -> Result<String> {
        self(source)
    }
}

// ─── External commands ────────────────────────────────────────────

/// Pipes the source through an external program (stdin to stdout).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandFormatter {
    language: String,
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(language: &str, program: &str, args: &[&str]) -> Self {
        Self {
            language: language.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `clang-format` for C++, with an optional `--style`.
    pub fn clang_format(style: Option<&str>) -> Self {
        let mut formatter = Self::new("cpp", "clang-format", &[]);
        if let Some(style) = style {
            formatter.args.push(format!("--style={}", style));
        }
        formatter
    }

    pub fn fallback_style(mut self, style: &str) -> Self {
        self.args.push(format!("--fallback-style={}", style));
        self
    }

    pub fn sort_includes(mut self) -> Self {
        self.args.push("--sort-includes".to_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn unavailable(&self, reason: impl Into<String>) -> IrError {
        IrError::FormatterUnavailable {
            language: self.language.clone(),
            reason: reason.into(),
        }
    }
}

impl SourceFormatter for CommandFormatter {
    fn format(&self, source: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.unavailable(format!("cannot run '{}': {}", self.program, e)))?;

        // stdin is fed while stdout drains.
        let stdin = child.stdin.take();
        let input = source.to_string();
        let writer = std::thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Ok(()),
        });

        let output = child
            .wait_with_output()
            .map_err(|e| self.unavailable(e.to_string()))?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.unavailable(format!("writing input: {}", e))),
            Err(_) => return Err(self.unavailable("input writer panicked")),
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| self.unavailable(format!("'{}' produced non-UTF-8 output", self.program)))
    }
}

// ─── Registry ─────────────────────────────────────────────────────

/// Formatters by language name.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: BTreeMap<String, Arc<dyn SourceFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the formatter for `language`; each language takes one.
    pub fn register(
        &mut self,
        language: &str,
        formatter: impl SourceFormatter + 'static,
    ) -> Result<()> {
        if self.formatters.contains_key(language) {
            return Err(IrError::Config(format!(
                "another formatter for language '{}' already exists",
                language
            )));
        }
        self.formatters
            .insert(language.to_string(), Arc::new(formatter));
        Ok(())
    }

    pub fn get(&self, language: &str) -> Option<&Arc<dyn SourceFormatter>> {
        self.formatters.get(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.formatters.keys().map(String::as_str)
    }

    /// Format `source` as `language`. Unless `strict`, a missing or failing
    /// formatter leaves the source unchanged.
    pub fn format(&self, language: &str, source: &str, strict: bool) -> Result<String> {
        let result = match self.formatters.get(language) {
            Some(formatter) => formatter.format(source),
            None => Err(IrError::FormatterUnavailable {
                language: language.to_string(),
                reason: "no formatter registered".to_string(),
            }),
        };
        match result {
            Ok(formatted) => Ok(formatted),
            Err(err) if !strict => {
                tracing::warn!(language, error = %err, "formatting skipped");
                Ok(source.to_string())
            }
            Err(err @ IrError::FormatterUnavailable { .. }) => Err(err),
            Err(err) => Err(IrError::FormatterUnavailable {
                language: language.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("languages", &self.formatters.keys().collect::<Vec<_>>())
            .finish()
    }
}
