// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::*;
use crate::instructions::{Flag, OpCode, flag_value, split_flags};

/// A Dockerfile [`FROM` instruction][from].
///
/// The image is kept exactly as written; variable references in it are only
/// resolved when a build is planned.
///
/// [from]: https://docs.docker.com/engine/reference/builder/#from
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FromInstruction {
  pub flags: Vec<Flag>,
  pub image: String,

  /// The stage index opened by this instruction
  pub index: usize,

  /// The stage name given by `AS`, lower cased
  pub alias: Option<String>
}

lazy_static! {
  static ref STAGE_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_.-]*$").unwrap();
}

impl FromInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<FromInstruction> {
    let (flags, rest) = split_flags(args, line, OpCode::From)?;
    let words: Vec<&str> = rest.split_whitespace().collect();

    let (image, alias) = match words.as_slice() {
      [image] => (*image, None),
      [image, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
        (*image, Some(alias.to_ascii_lowercase()))
      },
      [] => return Err(shape_error(line, OpCode::From, "an image is required")),
      _ => return Err(shape_error(
        line, OpCode::From, "expected `<image> [AS <name>]`"
      ))
    };

    if let Some(alias) = &alias {
      if !STAGE_NAME.is_match(alias) {
        return Err(shape_error(
          line, OpCode::From, format!("invalid stage name '{}'", alias)
        ));
      }
    }

    Ok(FromInstruction {
      flags,
      image: image.to_string(),
      index: 0,
      alias
    })
  }

  /// The value of the `--platform` flag, if any.
  pub fn platform(&self) -> Option<&str> {
    flag_value(&self.flags, "platform")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn from_no_alias() -> Result<()> {
    assert_eq!(
      parse_single("from alpine:3.10")?,
      FromInstruction {
        flags: vec![],
        image: "alpine:3.10".into(),
        index: 0,
        alias: None
      }.into()
    );

    Ok(())
  }

  #[test]
  fn from_alias_and_platform() -> Result<()> {
    let from = parse_single("FROM --platform=linux/amd64 node:18 As Build")?;

    assert_eq!(
      from,
      FromInstruction {
        flags: vec![Flag::new("platform", Some("linux/amd64"))],
        image: "node:18".into(),
        index: 0,
        alias: Some("build".into())
      }.into()
    );

    Ok(())
  }

  #[test]
  fn from_missing_alias() {
    assert!(parse_single("from alpine:3.10 as").is_err());
    assert!(parse_single("from alpine:3.10 from example").is_err());
    assert!(parse_single("from").is_err());
  }

  #[test]
  fn from_invalid_alias() {
    match parse_single("FROM alpine AS 1st") {
      Err(Error::InvalidArgumentShape { instruction, .. }) => {
        assert_eq!(instruction, OpCode::From)
      },
      other => panic!("expected an argument shape error, got {:?}", other)
    }
  }
}
