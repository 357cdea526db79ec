// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

use crate::error::*;
use crate::instructions::{Flag, OpCode, split_flags};
use crate::util::*;

/// A command given either as a single string (to be run in the default
/// shell), or a list of strings (to be run directly).
///
/// Used by `RUN`, `CMD`, `ENTRYPOINT` and `HEALTHCHECK`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
  Shell(String),
  Exec(Vec<String>)
}

impl Command {
  /// Parses a command, choosing exec form when the first character is `[`.
  pub(crate) fn parse(args: &str, line: usize, instruction: OpCode) -> Result<Command> {
    let args = args.trim();
    if args.is_empty() {
      return Err(shape_error(line, instruction, "a command is required"));
    }

    if args.starts_with('[') {
      Ok(Command::Exec(parse_exec_form(args, line, instruction)?))
    } else {
      Ok(Command::Shell(args.to_string()))
    }
  }

  pub fn shell<S: Into<String>>(s: S) -> Command {
    Command::Shell(s.into())
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> Command {
    Command::Exec(args.into_iter().map(|s| s.into()).collect())
  }

  /// Unpacks this command into its inner value if it is in shell form,
  /// otherwise returns None.
  pub fn as_shell(&self) -> Option<&str> {
    if let Command::Shell(s) = self {
      Some(s)
    } else {
      None
    }
  }

  /// Unpacks this command into its inner value if it is in exec form,
  /// otherwise returns None.
  pub fn as_exec(&self) -> Option<&[String]> {
    if let Command::Exec(args) = self {
      Some(args)
    } else {
      None
    }
  }

  /// The argument vector this command executes, wrapping shell-form commands
  /// with the given shell (e.g. `["/bin/sh", "-c"]`).
  pub fn to_argv(&self, shell: &[String]) -> Vec<String> {
    match self {
      Command::Exec(args) => args.clone(),
      Command::Shell(s) => {
        let mut argv = shell.to_vec();
        argv.push(s.clone());
        argv
      }
    }
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Command::Shell(s) => f.write_str(show_bare_word(s)),
      Command::Exec(args) => f.write_str(&exec_form_string(args))
    }
  }
}

/// A Dockerfile [`RUN` instruction][run].
///
/// [run]: https://docs.docker.com/engine/reference/builder/#run
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunInstruction {
  /// Options such as `--mount` or `--network`
  pub flags: Vec<Flag>,
  pub command: Command
}

impl RunInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<RunInstruction> {
    let (flags, rest) = split_flags(args, line, OpCode::Run)?;

    Ok(RunInstruction {
      flags,
      command: Command::parse(rest, line, OpCode::Run)?
    })
  }

  pub fn shell<S: Into<String>>(s: S) -> RunInstruction {
    RunInstruction {
      flags: Vec::new(),
      command: Command::shell(s)
    }
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> RunInstruction {
    RunInstruction {
      flags: Vec::new(),
      command: Command::exec(args)
    }
  }
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_util::*;

  #[test]
  fn run_basic() -> Result<()> {
    assert_eq!(
      parse_single(r#"run echo "hello world""#)?,
      RunInstruction::shell("echo \"hello world\"").into()
    );

    assert_eq!(
      parse_single(r#"run ["echo", "hello world"]"#)?,
      RunInstruction::exec(vec!["echo", "hello world"]).into()
    );

    Ok(())
  }

  #[test]
  fn run_multiline_shell() -> Result<()> {
    assert_eq!(
      parse_single(indoc!(r#"
        run echo \
          "hello world"
      "#))?,
      RunInstruction::shell("echo   \"hello world\"").into()
    );

    Ok(())
  }

  #[test]
  fn run_multiline_shell_comment() -> Result<()> {
    assert_eq!(
      parse_single(indoc!(r#"
        run foo && \
            # implicitly escaped
            bar && \
            # explicitly escaped \
            baz
      "#))?,
      RunInstruction::shell("foo &&     bar &&     baz").into()
    );

    Ok(())
  }

  #[test]
  fn run_multiline_exec() -> Result<()> {
    assert_eq!(
      parse_single(r#"run\
        [\
        "echo", \
        "hello world"\
        ]"#)?,
      RunInstruction::exec(vec!["echo", "hello world"]).into()
    );

    Ok(())
  }

  #[test]
  fn run_with_mount() -> Result<()> {
    assert_eq!(
      parse_single("RUN --mount=type=cache,target=/root/.npm npm ci")?,
      RunInstruction {
        flags: vec![Flag::new("mount", Some("type=cache,target=/root/.npm"))],
        command: Command::shell("npm ci")
      }.into()
    );

    Ok(())
  }

  #[test]
  fn run_malformed_exec() {
    match parse_single(r#"RUN ["echo", "unterminated]"#) {
      Err(Error::InvalidArgumentShape { line, instruction, .. }) => {
        assert_eq!(line, 1);
        assert_eq!(instruction, OpCode::Run);
      },
      other => panic!("expected an argument shape error, got {:?}", other)
    }
  }

  #[test]
  fn shell_form_argv() {
    let shell = vec!["/bin/sh".to_string(), "-c".to_string()];

    assert_eq!(
      Command::shell("npm start").to_argv(&shell),
      vec!["/bin/sh", "-c", "npm start"]
    );
    assert_eq!(
      Command::exec(vec!["node", "index.js"]).to_argv(&shell),
      vec!["node", "index.js"]
    );
  }
}
