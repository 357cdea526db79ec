// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::parse_key_values;

/// A single label key/value pair
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Label {
  pub name: String,
  pub value: String
}

impl Label {
  pub fn new<S1, S2>(name: S1, value: S2) -> Label
  where
    S1: Into<String>,
    S2: Into<String>
  {
    Label {
      name: name.into(),
      value: value.into()
    }
  }
}

/// A Dockerfile [`LABEL` instruction][label].
///
/// A single `LABEL` instruction may set many labels.
///
/// [label]: https://docs.docker.com/engine/reference/builder/#label
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LabelInstruction(pub Vec<Label>);

impl LabelInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<LabelInstruction> {
    let labels = parse_key_values(args, line, OpCode::Label)?
      .into_iter()
      .map(|(name, value)| Label { name, value })
      .collect();

    Ok(LabelInstruction(labels))
  }
}
