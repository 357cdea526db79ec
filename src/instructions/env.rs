// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::parse_key_values;

/// An environment variable key/value pair
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvVar {
  pub key: String,
  pub value: String
}

impl EnvVar {
  pub fn new<S1, S2>(key: S1, value: S2) -> EnvVar
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    EnvVar {
      key: key.into(),
      value: value.into(),
    }
  }
}

/// A Dockerfile [`ENV` instruction][env].
///
/// Both the `ENV key=value ...` and the legacy `ENV key value` forms are
/// accepted.
///
/// [env]: https://docs.docker.com/engine/reference/builder/#env
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvInstruction(pub Vec<EnvVar>);

impl EnvInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<EnvInstruction> {
    let vars = parse_key_values(args, line, OpCode::Env)?
      .into_iter()
      .map(|(key, value)| EnvVar { key, value })
      .collect();

    Ok(EnvInstruction(vars))
  }
}
