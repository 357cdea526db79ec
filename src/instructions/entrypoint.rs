// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::{Command, OpCode};

/// A Dockerfile [`ENTRYPOINT` instruction][entrypoint].
///
/// [entrypoint]: https://docs.docker.com/engine/reference/builder/#entrypoint
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EntrypointInstruction(pub Command);

impl EntrypointInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<EntrypointInstruction> {
    Ok(EntrypointInstruction(Command::parse(args, line, OpCode::Entrypoint)?))
  }

  pub fn shell<S: Into<String>>(s: S) -> EntrypointInstruction {
    EntrypointInstruction(Command::shell(s))
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> EntrypointInstruction {
    EntrypointInstruction(Command::exec(args))
  }
}
