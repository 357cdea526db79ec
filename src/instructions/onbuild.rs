// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::dockerfile_parser::InstructionKind;
use crate::error::*;
use crate::instructions::OpCode;
use crate::util::split_first_word;

/// A Dockerfile [`ONBUILD` instruction][onbuild]: a trigger instruction that
/// runs when the image is used as the base of another build.
///
/// The trigger is kept unresolved; variables in it belong to the downstream
/// build.
///
/// [onbuild]: https://docs.docker.com/engine/reference/builder/#onbuild
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OnbuildInstruction(pub Box<InstructionKind>);

impl OnbuildInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<OnbuildInstruction> {
    let (keyword, rest) = split_first_word(args);
    let op = OpCode::from_keyword(keyword).ok_or_else(|| Error::UnknownInstruction {
      line,
      instruction: keyword.to_string()
    })?;

    match op {
      OpCode::Onbuild | OpCode::From | OpCode::Maintainer => Err(shape_error(
        line, OpCode::Onbuild, format!("{} isn't allowed as an ONBUILD trigger", op)
      )),
      _ => Ok(OnbuildInstruction(Box::new(InstructionKind::parse(op, rest, line)?)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::instructions::*;
  use crate::test_util::*;

  #[test]
  fn onbuild_trigger() -> Result<()> {
    assert_eq!(
      parse_single("ONBUILD COPY . /app/src")?,
      OnbuildInstruction(Box::new(CopyInstruction {
        flags: vec![],
        sources: strings(&["."]),
        destination: "/app/src".into()
      }.into())).into()
    );

    Ok(())
  }

  #[test]
  fn onbuild_forbidden_triggers() {
    assert!(parse_single("ONBUILD ONBUILD RUN true").is_err());
    assert!(parse_single("ONBUILD FROM alpine").is_err());

    match parse_single("ONBUILD FETCH http://example.com") {
      Err(Error::UnknownInstruction { instruction, .. }) => assert_eq!(instruction, "FETCH"),
      other => panic!("expected an unknown instruction, got {:?}", other)
    }
  }
}
