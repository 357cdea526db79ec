// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::{Flag, OpCode, flag_value, split_flags};
use crate::util::parse_exec_form;

/// Parses the shared `[flags] <src>... <dest>` shape of `COPY` and `ADD`.
fn parse_transfer(
  args: &str,
  line: usize,
  instruction: OpCode
) -> Result<(Vec<Flag>, Vec<String>, String)> {
  let (flags, rest) = split_flags(args, line, instruction)?;

  let paths: Vec<String> = if rest.starts_with('[') {
    parse_exec_form(rest, line, instruction)?
  } else {
    rest.split_whitespace().map(String::from).collect()
  };

  match paths.split_last() {
    Some((destination, sources)) if !sources.is_empty() => {
      Ok((flags, sources.to_vec(), destination.clone()))
    },
    _ => Err(shape_error(
      line, instruction, "at least one source and a destination are required"
    ))
  }
}

/// A Dockerfile [`COPY` instruction][copy].
///
/// [copy]: https://docs.docker.com/engine/reference/builder/#copy
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CopyInstruction {
  pub flags: Vec<Flag>,
  pub sources: Vec<String>,
  pub destination: String
}

impl CopyInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<CopyInstruction> {
    let (flags, sources, destination) = parse_transfer(args, line, OpCode::Copy)?;

    Ok(CopyInstruction { flags, sources, destination })
  }

  /// The `--from` reference (a stage name, stage index, or image), if any.
  pub fn from_ref(&self) -> Option<&str> {
    flag_value(&self.flags, "from")
  }
}

/// A Dockerfile [`ADD` instruction][add].
///
/// [add]: https://docs.docker.com/engine/reference/builder/#add
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AddInstruction {
  pub flags: Vec<Flag>,
  pub sources: Vec<String>,
  pub destination: String
}

impl AddInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<AddInstruction> {
    let (flags, sources, destination) = parse_transfer(args, line, OpCode::Add)?;

    Ok(AddInstruction { flags, sources, destination })
  }
}
