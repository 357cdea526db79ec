// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::parse_pairs;

/// A single build argument declaration, e.g. `NAME` or `NAME=default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVar {
  /// The argument key
  pub name: String,

  /// An optional default value.
  ///
  /// This may be unset when passing arguments through to later stages in a
  /// [multi-stage build][build].
  ///
  /// [build]: https://docs.docker.com/develop/develop-images/multistage-build/
  pub default: Option<String>
}

impl ArgVar {
  pub fn new<S: Into<String>>(name: S, default: Option<&str>) -> ArgVar {
    ArgVar {
      name: name.into(),
      default: default.map(String::from)
    }
  }
}

/// A Dockerfile [`ARG` instruction][arg], declaring one or more build
/// arguments.
///
/// [arg]: https://docs.docker.com/engine/reference/builder/#arg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInstruction(pub Vec<ArgVar>);

impl ArgInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<ArgInstruction> {
    let vars = parse_pairs(args, line, OpCode::Arg)?
      .into_iter()
      .map(|(name, default)| ArgVar { name, default })
      .collect();

    Ok(ArgInstruction(vars))
  }

  /// Iterates over the declared argument names.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|v| v.name.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn arg_name_only() -> Result<()> {
    assert_eq!(
      parse_single("arg VERSION")?,
      ArgInstruction(vec![ArgVar::new("VERSION", None)]).into()
    );

    Ok(())
  }

  #[test]
  fn arg_defaults() -> Result<()> {
    assert_eq!(
      parse_single(r#"ARG PORT=3000 NAME="hello world" EMPTY="#)?,
      ArgInstruction(vec![
        ArgVar::new("PORT", Some("3000")),
        ArgVar::new("NAME", Some("hello world")),
        ArgVar::new("EMPTY", Some("")),
      ]).into()
    );

    Ok(())
  }

  #[test]
  fn arg_unterminated_quote() {
    assert!(parse_single(r#"ARG NAME="hello"#).is_err());
  }
}
