use crate::Diagnostic;
use crate::FileId;
use std::cmp::max;
use std::fmt::Write;

/// Provides access to source text for rendering diagnostics.
///
/// Returning `None` allows consumers to gracefully handle missing files (for
/// example, a synthetic span produced after heavy tree surgery).
pub trait SourceProvider {
  /// Returns the display name for a file, or `None` if the file is unknown.
  fn file_name(&self, file: FileId) -> Option<&str>;
  /// Returns the file contents, or `None` if the file is unavailable.
  fn file_text(&self, file: FileId) -> Option<&str>;
}

/// Render a diagnostic into a human-readable string with caret highlighting.
pub fn render_diagnostic(provider: &dyn SourceProvider, diagnostic: &Diagnostic) -> String {
  let mut output = String::new();

  writeln!(
    output,
    "{}[{}]: {}",
    diagnostic.severity, diagnostic.code, diagnostic.message
  )
  .unwrap();

  let file = diagnostic.primary.file;
  let name = provider.file_name(file).unwrap_or("<unknown>");
  let text = provider.file_text(file);
  let start = diagnostic.primary.range.start as usize;
  let end = diagnostic.primary.range.end as usize;
  let (line, col) = match text {
    Some(text) => line_and_column(text, start),
    None => (1, start + 1),
  };
  writeln!(output, " --> {}:{}:{}", name, line, col).unwrap();

  if let Some(text) = text {
    let starts = line_starts(text);
    let text_len = text.len();
    let start = start.min(text_len);
    let end = end.min(text_len);
    let line_idx = line_index_at_offset(&starts, start);
    let line_start = starts[line_idx];
    let line_end = if line_idx + 1 < starts.len() {
      starts[line_idx + 1] - 1
    } else {
      text_len
    };
    let gutter_width = (line_idx + 1).to_string().len();

    writeln!(output, "{:>width$} |", "", width = gutter_width).unwrap();
    writeln!(
      output,
      "{:>width$} | {}",
      line_idx + 1,
      &text[line_start..line_end],
      width = gutter_width
    )
    .unwrap();

    let underline_start = start - line_start;
    let underline_len = max(1, end.min(line_end).saturating_sub(start));
    writeln!(
      output,
      "{:>width$} | {}{}",
      "",
      " ".repeat(underline_start),
      "^".repeat(underline_len),
      width = gutter_width
    )
    .unwrap();
  }

  for note in &diagnostic.notes {
    writeln!(output, "= note: {}", note).unwrap();
  }

  output
}

fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
  let starts = line_starts(text);
  let offset = offset.min(text.len());
  let line_idx = line_index_at_offset(&starts, offset);
  (line_idx + 1, offset - starts[line_idx] + 1)
}

fn line_index_at_offset(starts: &[usize], offset: usize) -> usize {
  match starts.binary_search(&offset) {
    Ok(idx) => idx,
    Err(0) => 0,
    Err(idx) => idx - 1,
  }
}

fn line_starts(text: &str) -> Vec<usize> {
  let mut starts = vec![0];
  for (idx, ch) in text.char_indices() {
    if ch == '\n' {
      starts.push(idx + 1);
    }
  }
  starts
}
