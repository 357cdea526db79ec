// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::iter::Enumerate;
use std::str::Lines;

use crate::error::*;

/// A single instruction's worth of Dockerfile text, with escaped line breaks
/// folded away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
  /// The 1-based physical line on which the instruction starts
  pub line: usize,

  /// The merged, trimmed instruction text
  pub content: String
}

/// Lazily splits Dockerfile text into logical lines.
///
/// Blank lines and comments are skipped, including those found in the middle
/// of a continued instruction. Parser directives such as `# escape=` are
/// treated as plain comments, so the escape character is always `\`.
///
/// # Example
/// ```
/// use dockerfile_plan::LogicalLines;
///
/// let lines: Vec<_> = LogicalLines::new("# hello\nRUN foo \\\n  bar\n")
///   .collect::<Result<_, _>>()
///   .unwrap();
///
/// assert_eq!(lines.len(), 1);
/// assert_eq!(lines[0].line, 2);
/// assert_eq!(lines[0].content, "RUN foo   bar");
/// ```
pub struct LogicalLines<'a> {
  lines: Enumerate<Lines<'a>>
}

impl<'a> LogicalLines<'a> {
  pub fn new(input: &'a str) -> LogicalLines<'a> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    LogicalLines {
      lines: input.lines().enumerate()
    }
  }
}

/// If `line` ends in an unescaped `\` (ignoring trailing whitespace), returns
/// the text preceding it.
fn strip_continuation(line: &str) -> Option<&str> {
  let trimmed = line.trim_end();
  let backslashes = trimmed.chars().rev().take_while(|c| *c == '\\').count();

  if backslashes % 2 == 1 {
    Some(&trimmed[..trimmed.len() - 1])
  } else {
    None
  }
}

fn is_skippable(line: &str) -> bool {
  let trimmed = line.trim_start();
  trimmed.is_empty() || trimmed.starts_with('#')
}

impl<'a> Iterator for LogicalLines<'a> {
  type Item = Result<LogicalLine>;

  fn next(&mut self) -> Option<Self::Item> {
    let mut start = None;
    let mut content = String::new();

    for (index, raw) in &mut self.lines {
      if is_skippable(raw) {
        continue;
      }

      let line = *start.get_or_insert(index + 1);
      match strip_continuation(raw) {
        Some(head) => content.push_str(head),
        None => {
          content.push_str(raw);

          return Some(Ok(LogicalLine {
            line,
            content: content.trim().to_string()
          }));
        }
      }
    }

    start.map(|line| Err(Error::MalformedContinuation { line }))
  }
}
