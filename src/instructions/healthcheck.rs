// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::{Command, Flag, OpCode, split_flags};
use crate::util::split_first_word;

const HEALTHCHECK_FLAGS: &[&str] = &[
  "interval", "timeout", "start-period", "start-interval", "retries"
];

/// A Dockerfile [`HEALTHCHECK` instruction][healthcheck].
///
/// [healthcheck]: https://docs.docker.com/engine/reference/builder/#healthcheck
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum HealthcheckInstruction {
  /// `HEALTHCHECK NONE`, disabling any inherited check
  None,

  /// `HEALTHCHECK [flags] CMD <command>`
  Check {
    flags: Vec<Flag>,
    command: Command
  }
}

impl HealthcheckInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<HealthcheckInstruction> {
    if args.eq_ignore_ascii_case("none") {
      return Ok(HealthcheckInstruction::None);
    }

    let (flags, rest) = split_flags(args, line, OpCode::Healthcheck)?;
    if let Some(flag) = flags.iter().find(|f| !HEALTHCHECK_FLAGS.contains(&f.name.as_str())) {
      return Err(shape_error(
        line, OpCode::Healthcheck, format!("unknown flag '--{}'", flag.name)
      ));
    }

    let (keyword, command) = split_first_word(rest);
    if !keyword.eq_ignore_ascii_case("cmd") {
      return Err(shape_error(line, OpCode::Healthcheck, "expected CMD or NONE"));
    }

    Ok(HealthcheckInstruction::Check {
      flags,
      command: Command::parse(command, line, OpCode::Healthcheck)?
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn healthcheck_forms() -> Result<()> {
    assert_eq!(parse_single("HEALTHCHECK none")?, HealthcheckInstruction::None.into());

    assert_eq!(
      parse_single("HEALTHCHECK --interval=5m --retries=3 CMD curl -f http://localhost/")?,
      HealthcheckInstruction::Check {
        flags: vec![
          Flag::new("interval", Some("5m")),
          Flag::new("retries", Some("3")),
        ],
        command: Command::shell("curl -f http://localhost/")
      }.into()
    );

    assert!(parse_single("HEALTHCHECK curl localhost").is_err());
    assert!(parse_single("HEALTHCHECK --bogus=1 CMD true").is_err());

    Ok(())
  }
}
