// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::bare_word;

/// A Dockerfile [`WORKDIR` instruction][workdir]. Relative paths are resolved
/// against the previous working directory when a build is planned.
///
/// [workdir]: https://docs.docker.com/engine/reference/builder/#workdir
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WorkdirInstruction(pub String);

/// A Dockerfile [`USER` instruction][user], `<user>[:<group>]`.
///
/// [user]: https://docs.docker.com/engine/reference/builder/#user
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserInstruction(pub String);

/// A Dockerfile [`STOPSIGNAL` instruction][stopsignal].
///
/// [stopsignal]: https://docs.docker.com/engine/reference/builder/#stopsignal
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StopsignalInstruction(pub String);

/// The deprecated `MAINTAINER` instruction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MaintainerInstruction(pub String);

/// Checks that `args` is a single word, as required by `USER` and
/// `STOPSIGNAL`.
fn single_word(args: &str, line: usize, instruction: OpCode) -> Result<String> {
  let mut words = args.split_whitespace();
  match (words.next(), words.next()) {
    (Some(word), None) => Ok(bare_word(word)),
    _ => Err(shape_error(line, instruction, "exactly one argument is required"))
  }
}

impl WorkdirInstruction {
  pub(crate) fn parse(args: &str, _line: usize) -> Result<WorkdirInstruction> {
    Ok(WorkdirInstruction(bare_word(args)))
  }
}

impl UserInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<UserInstruction> {
    single_word(args, line, OpCode::User).map(UserInstruction)
  }

  /// The user part of `<user>[:<group>]`.
  pub fn user(&self) -> &str {
    self.0.split(':').next().unwrap_or(&self.0)
  }

  /// The group part of `<user>[:<group>]`, if any.
  pub fn group(&self) -> Option<&str> {
    self.0.splitn(2, ':').nth(1)
  }
}

impl StopsignalInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<StopsignalInstruction> {
    single_word(args, line, OpCode::Stopsignal).map(StopsignalInstruction)
  }
}

impl MaintainerInstruction {
  pub(crate) fn parse(args: &str, _line: usize) -> Result<MaintainerInstruction> {
    Ok(MaintainerInstruction(bare_word(args)))
  }
}
