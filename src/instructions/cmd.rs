// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::{Command, OpCode};

/// A Dockerfile [`CMD` instruction][cmd].
///
/// [cmd]: https://docs.docker.com/engine/reference/builder/#cmd
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CmdInstruction(pub Command);

impl CmdInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<CmdInstruction> {
    Ok(CmdInstruction(Command::parse(args, line, OpCode::Cmd)?))
  }

  pub fn shell<S: Into<String>>(s: S) -> CmdInstruction {
    CmdInstruction(Command::shell(s))
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> CmdInstruction {
    CmdInstruction(Command::exec(args))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::*;

  #[test]
  fn cmd_basic() -> Result<()> {
    assert_eq!(
      parse_single(r#"cmd echo "hello world""#)?,
      CmdInstruction::shell("echo \"hello world\"").into()
    );

    assert_eq!(
      parse_single(r#"cmd ["echo", "hello world"]"#)?,
      CmdInstruction::exec(vec!["echo", "hello world"]).into()
    );

    assert_eq!(
      parse_single(r#"CMD []"#)?,
      CmdInstruction::exec(Vec::<String>::new()).into()
    );

    Ok(())
  }

  #[test]
  fn cmd_multiline() -> Result<()> {
    assert_eq!(
      parse_single(r#"cmd echo \
        "hello world""#)?,
      CmdInstruction::shell("echo         \"hello world\"").into()
    );

    Ok(())
  }
}
