//! Shared diagnostics for the compilation pipeline.
//!
//! Every stage reports into a [`Reporter`] passed down from the caller, so a
//! single run collects all of its diagnostics before the driver decides what
//! to do with them. Nothing here is global state; embedders that compile
//! concurrently simply hand each compilation its own reporter.

use snafu::Snafu;
use std::fmt;

pub type CompileResult<T> = Result<T, CompileError>;

/// Terminal pipeline failure. The individual diagnostics stay on the
/// reporter; this only carries enough for a one-line summary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{count} error(s) found"))]
  SourceErrors { count: usize },
}

/// Which stage produced a diagnostic. Rendered verbatim in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
  Lexer,
  Parser,
  Semantic,
  Runtime,
}

impl DiagnosticKind {
  pub fn as_str(self) -> &'static str {
    match self {
      DiagnosticKind::Lexer => "Lexer Error",
      DiagnosticKind::Parser => "Syntax Error",
      DiagnosticKind::Semantic => "Semantic Error",
      DiagnosticKind::Runtime => "Runtime Error",
    }
  }
}

impl fmt::Display for DiagnosticKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  pub line: u32,
  pub column: u32,
  pub filename: String,
}

impl SourceLocation {
  pub fn new(line: u32, filename: impl Into<String>) -> Self {
    Self {
      line,
      column: 1,
      filename: filename.into(),
    }
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.filename, self.line, self.column)
  }
}

/// A single reported problem: stage kind, message, where, optional hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,
  pub message: String,
  pub location: SourceLocation,
  pub hint: Option<String>,
}

impl Diagnostic {
  /// Render with ANSI colors for terminal output.
  pub fn format(&self) -> String {
    let mut out = format!(
      "\x1b[1;31m{}\x1b[0m [Line {}]: {}",
      self.kind, self.location.line, self.message
    );
    if let Some(hint) = &self.hint {
      out.push_str(&format!("\n  \x1b[1;36mHint:\x1b[0m {hint}"));
    }
    out
  }

  /// Render without escape codes, for files and pipes.
  pub fn format_plain(&self) -> String {
    let mut out = format!(
      "[{}] [Line {}]: {}",
      self.kind, self.location.line, self.message
    );
    if let Some(hint) = &self.hint {
      out.push_str(&format!(" (Hint: {hint})"));
    }
    out
  }
}

/// Collects diagnostics across lexing, parsing and IR generation.
///
/// Compile-time and runtime failures keep separate flags so the driver can
/// distinguish "the program is bad" from "the program misbehaved".
#[derive(Debug)]
pub struct Reporter {
  errors: Vec<Diagnostic>,
  had_error: bool,
  had_runtime_error: bool,
  current_file: String,
}

impl Default for Reporter {
  fn default() -> Self {
    Self::new()
  }
}

impl Reporter {
  pub fn new() -> Self {
    Self {
      errors: Vec::new(),
      had_error: false,
      had_runtime_error: false,
      current_file: "<stdin>".to_string(),
    }
  }

  /// Clear collected diagnostics and both error flags.
  pub fn reset(&mut self) {
    self.errors.clear();
    self.had_error = false;
    self.had_runtime_error = false;
  }

  /// Associate subsequent diagnostics with this file name.
  pub fn set_current_file(&mut self, filename: impl Into<String>) {
    self.current_file = filename.into();
  }

  pub fn lexer_error(&mut self, line: u32, message: impl Into<String>) {
    self.push(DiagnosticKind::Lexer, line, message.into(), None);
  }

  /// Parser diagnostics name the offending token when one is available.
  pub fn parser_error(&mut self, line: u32, token: &str, message: impl Into<String>) {
    let message = message.into();
    let full = if token.is_empty() {
      message
    } else {
      format!("at '{token}': {message}")
    };
    self.push(DiagnosticKind::Parser, line, full, None);
  }

  pub fn semantic_error(&mut self, line: u32, message: impl Into<String>) {
    self.push(DiagnosticKind::Semantic, line, message.into(), None);
  }

  pub fn semantic_error_with_hint(
    &mut self,
    line: u32,
    message: impl Into<String>,
    hint: impl Into<String>,
  ) {
    self.push(
      DiagnosticKind::Semantic,
      line,
      message.into(),
      Some(hint.into()),
    );
  }

  pub fn runtime_error(&mut self, message: impl Into<String>) {
    let location = SourceLocation {
      line: 0,
      column: 0,
      filename: "<runtime>".to_string(),
    };
    self.errors.push(Diagnostic {
      kind: DiagnosticKind::Runtime,
      message: message.into(),
      location,
      hint: None,
    });
    self.had_runtime_error = true;
  }

  fn push(&mut self, kind: DiagnosticKind, line: u32, message: String, hint: Option<String>) {
    self.errors.push(Diagnostic {
      kind,
      message,
      location: SourceLocation::new(line, self.current_file.clone()),
      hint,
    });
    self.had_error = true;
  }

  /// Write every diagnostic to stderr, colored when requested.
  pub fn print_errors(&self, color: bool) {
    for error in &self.errors {
      if color {
        eprintln!("{}", error.format());
      } else {
        eprintln!("{}", error.format_plain());
      }
    }
  }

  pub fn errors(&self) -> &[Diagnostic] {
    &self.errors
  }

  pub fn error_count(&self) -> usize {
    self.errors.len()
  }

  pub fn had_error(&self) -> bool {
    self.had_error
  }

  pub fn had_runtime_error(&self) -> bool {
    self.had_runtime_error
  }
}
