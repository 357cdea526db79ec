// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::parse_exec_form;

/// A Dockerfile [`SHELL` instruction][shell], replacing the shell used for
/// shell-form commands. Only the exec form is accepted.
///
/// [shell]: https://docs.docker.com/engine/reference/builder/#shell
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ShellInstruction(pub Vec<String>);

impl ShellInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<ShellInstruction> {
    if !args.starts_with('[') {
      return Err(shape_error(line, OpCode::Shell, "SHELL requires the exec form"));
    }

    let shell = parse_exec_form(args, line, OpCode::Shell)?;
    if shell.is_empty() {
      return Err(shape_error(line, OpCode::Shell, "a shell executable is required"));
    }

    Ok(ShellInstruction(shell))
  }
}
