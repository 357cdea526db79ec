// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

use crate::error::*;
use crate::instructions::OpCode;
use crate::parser::*;

/// A `--name[=value]` option passed to an instruction.
///
/// Examples include: `COPY --from=foo /to /from`, `FROM --platform=$BUILDPLATFORM`
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Flag {
  pub name: String,
  pub value: Option<String>
}

impl Flag {
  pub fn new<S1, S2>(name: S1, value: Option<S2>) -> Flag
  where
    S1: Into<String>,
    S2: Into<String>
  {
    Flag {
      name: name.into(),
      value: value.map(Into::into)
    }
  }

  fn from_record(record: Pair, line: usize, instruction: OpCode) -> Result<Flag> {
    let mut name = None;
    let mut value = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::flag_name => name = Some(field.as_str().to_string()),
        Rule::flag_value => value = Some(field.as_str().to_string()),
        _ => return Err(unexpected_token(line, instruction, field))
      }
    }

    let name = name.ok_or_else(|| shape_error(
      line, instruction, "flags require a name"
    ))?;

    Ok(Flag { name, value })
  }
}

impl fmt::Display for Flag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.value {
      Some(value) => write!(f, "--{}={}", self.name, value),
      None => write!(f, "--{}", self.name)
    }
  }
}

/// Splits leading flags from the remaining arguments of an instruction.
pub(crate) fn split_flags(
  input: &str,
  line: usize,
  instruction: OpCode
) -> Result<(Vec<Flag>, &str)> {
  let record = parse_rule(Rule::flagged, input)
    .map_err(|e| syntax_error(line, instruction, e))?
    .ok_or_else(|| shape_error(line, instruction, "missing arguments"))?;

  let mut flags = Vec::new();
  let mut rest = "";

  for field in record.into_inner() {
    match field.as_rule() {
      Rule::flag => flags.push(Flag::from_record(field, line, instruction)?),
      Rule::arguments => rest = field.as_str().trim(),
      Rule::EOI => continue,
      _ => return Err(unexpected_token(line, instruction, field))
    }
  }

  Ok((flags, rest))
}

/// Finds the value of the last flag with the given name.
pub fn flag_value<'a>(flags: &'a [Flag], name: &str) -> Option<&'a str> {
  flags
    .iter()
    .rev()
    .find(|f| f.name == name)
    .and_then(|f| f.value.as_deref())
}

/// Writes flags (each preceded by a space) for re-serialization.
pub(crate) fn write_flags(f: &mut fmt::Formatter<'_>, flags: &[Flag]) -> fmt::Result {
  for flag in flags {
    write!(f, " {}", flag)?;
  }

  Ok(())
}
