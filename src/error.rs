// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

use snafu::Snafu;

use crate::instructions::OpCode;
use crate::parser::{Pair, Rule};

/// A fatal Dockerfile parsing or planning error.
///
/// Every variant raised while reading the document carries the line on which
/// the offending instruction starts.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display(
    "line {}: line continuation at end of file", line
  ))]
  MalformedContinuation {
    line: usize
  },

  #[snafu(display(
    "line {}: unknown instruction '{}'", line, instruction
  ))]
  UnknownInstruction {
    line: usize,
    instruction: String
  },

  #[snafu(display(
    "line {}: expected FROM before {}", line, instruction
  ))]
  MissingBaseImage {
    line: usize,
    instruction: String
  },

  #[snafu(display(
    "line {}: invalid stage reference '{}': {}", line, reference, message
  ))]
  InvalidStageReference {
    line: usize,
    reference: String,
    message: String
  },

  #[snafu(display(
    "line {}: duplicate stage name '{}' (first declared on line {})",
    line, name, first_line
  ))]
  DuplicateStageName {
    line: usize,
    name: String,
    first_line: usize
  },

  #[snafu(display(
    "line {}: invalid {} arguments: {}", line, instruction, message
  ))]
  InvalidArgumentShape {
    line: usize,
    instruction: OpCode,
    message: String
  },

  #[snafu(display(
    "no build stage matches target '{}'", target
  ))]
  UnknownTarget {
    target: String
  },

  #[snafu(display(
    "invalid build argument '{}', expected NAME=VALUE", arg
  ))]
  InvalidBuildArg {
    arg: String
  },

  #[snafu(display(
    "could not read Dockerfile: {}", source
  ))]
  ReadError {
    source: std::io::Error
  },

  #[snafu(display(
    "could not convert instruction '{:?}' to desired type '{}'", from, to
  ))]
  ConversionError {
    from: String,
    to: String
  }
}

impl Error {
  /// The line on which the error originated, if it is tied to one.
  pub fn line(&self) -> Option<usize> {
    match self {
      Error::MalformedContinuation { line }
      | Error::UnknownInstruction { line, .. }
      | Error::MissingBaseImage { line, .. }
      | Error::InvalidStageReference { line, .. }
      | Error::DuplicateStageName { line, .. }
      | Error::InvalidArgumentShape { line, .. } => Some(*line),
      _ => None
    }
  }
}

/// A Dockerfile parsing Result.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Helper to create an argument shape error.
pub(crate) fn shape_error<S: Into<String>>(
  line: usize,
  instruction: OpCode,
  message: S
) -> Error {
  Error::InvalidArgumentShape {
    line,
    instruction,
    message: message.into()
  }
}

/// Converts a grammar failure into an argument shape error, keeping only the
/// column since the line is already known.
pub(crate) fn syntax_error(
  line: usize,
  instruction: OpCode,
  err: pest::error::Error<Rule>
) -> Error {
  let column = match err.line_col {
    pest::error::LineColLocation::Pos((_, col)) => col,
    pest::error::LineColLocation::Span((_, col), _) => col
  };

  shape_error(line, instruction, format!("malformed input near column {}", column))
}

/// A non-fatal finding reported alongside a successful plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Diagnostic {
  /// A variable reference with no value in scope; it was substituted as an
  /// empty string.
  UnresolvedVariable {
    line: usize,
    name: String
  },

  /// A build-time override that no `ARG` instruction declares.
  UnconsumedBuildArg {
    name: String
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Diagnostic::UnresolvedVariable { line, name } => write!(
        f, "line {}: variable '{}' is not set, substituting an empty string",
        line, name
      ),
      Diagnostic::UnconsumedBuildArg { name } => write!(
        f, "build argument '{}' was not consumed by any ARG instruction", name
      )
    }
  }
}

/// Helper to create an unexpected token error.
pub(crate) fn unexpected_token(line: usize, instruction: OpCode, record: Pair) -> Error {
  shape_error(line, instruction, format!("unexpected token {:?}", record.as_rule()))
}
