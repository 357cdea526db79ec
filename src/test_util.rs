// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

pub use crate::dockerfile_parser::InstructionKind;
use crate::dockerfile_parser::parse_line;
use crate::error::*;
use crate::lexer::LogicalLines;

/// Parses the first logical line of `input` into a single instruction,
/// without the document-level checks of `Dockerfile::parse`.
pub fn parse_single(input: &str) -> Result<InstructionKind> {
  let logical = LogicalLines::new(input)
    .next()
    .expect("input contains no instruction")?;

  Ok(parse_line(&logical)?.kind)
}

pub fn strings(strs: &[&str]) -> Vec<String> {
  strs.iter().map(|s| s.to_string()).collect()
}
