//! Shared diagnostics model for the module-rewriting passes.
//!
//! The data structures here are deliberately small and deterministic: a
//! diagnostic is a stable code, a severity, an already-formatted message and a
//! primary span. The [`Diagnostics`] sink collects reports during a pass run
//! and answers the one question a phased pass needs between phases: did
//! anything halting happen yet?

pub mod render;

use std::fmt::Display;
use std::fmt::Formatter;

/// A stable identifier for a file in a compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A half-open byte range in a file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TextRange {
  pub start: u32,
  pub end: u32,
}

impl TextRange {
  pub const fn new(start: u32, end: u32) -> Self {
    Self { start, end }
  }

  pub const fn empty(at: u32) -> Self {
    Self { start: at, end: at }
  }

  pub fn len(&self) -> u32 {
    self.end.saturating_sub(self.start)
  }

  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }
}

/// A byte range tied to a specific file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Span {
  pub file: FileId,
  pub range: TextRange,
}

impl Span {
  pub const fn new(file: FileId, range: TextRange) -> Self {
    Self { file, range }
  }
}

/// Diagnostic severity.
///
/// `Disabled` is for checks that are defined but off by default; such reports
/// are collected (hosts may opt in to surfacing them) but never halt a
/// compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Severity {
  Error,
  Warning,
  Disabled,
}

impl Severity {
  pub const fn as_str(&self) -> &'static str {
    match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
      Severity::Disabled => "disabled",
    }
  }

  pub const fn is_halting(&self) -> bool {
    matches!(self, Severity::Error)
  }
}

impl Display for Severity {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A single reported problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
  pub code: &'static str,
  pub severity: Severity,
  pub message: String,
  pub primary: Span,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    code: &'static str,
    message: impl Into<String>,
    primary: Span,
  ) -> Self {
    Self {
      code,
      severity,
      message: message.into(),
      primary,
      notes: Vec::new(),
    }
  }

  pub fn error(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
    Self::new(Severity::Error, code, message, primary)
  }

  pub fn warning(code: &'static str, message: impl Into<String>, primary: Span) -> Self {
    Self::new(Severity::Warning, code, message, primary)
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.notes.push(note.into());
    self
  }
}

/// Collecting sink for a whole compilation.
///
/// Reports are appended in traversal order so test expectations and rendered
/// output are deterministic.
#[derive(Default, Debug)]
pub struct Diagnostics {
  items: Vec<Diagnostic>,
  halting: usize,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn report(&mut self, diagnostic: Diagnostic) {
    if diagnostic.severity.is_halting() {
      self.halting += 1;
    }
    self.items.push(diagnostic);
  }

  /// Whether any halting (error-severity) diagnostic has been reported.
  /// Phased passes consult this between phases and skip later phases when
  /// true.
  pub fn has_halting_errors(&self) -> bool {
    self.halting > 0
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.items.iter()
  }

  /// Codes of all collected diagnostics, in report order.
  pub fn codes(&self) -> Vec<&'static str> {
    self.items.iter().map(|d| d.code).collect()
  }
}
