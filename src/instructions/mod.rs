// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fmt;

mod flag;
pub use flag::*;

mod from;
pub use from::*;

mod copy;
pub use copy::*;

mod arg;
pub use arg::*;

mod label;
pub use label::*;

mod env;
pub use env::*;

mod run;
pub use run::*;

mod entrypoint;
pub use entrypoint::*;

mod cmd;
pub use cmd::*;

mod expose;
pub use expose::*;

mod volume;
pub use volume::*;

mod healthcheck;
pub use healthcheck::*;

mod shell;
pub use shell::*;

mod onbuild;
pub use onbuild::*;

mod misc;
pub use misc::*;

/// The keyword of a Dockerfile instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
  From,
  Run,
  Cmd,
  Label,
  Expose,
  Env,
  Add,
  Copy,
  Entrypoint,
  Volume,
  User,
  Workdir,
  Arg,
  Onbuild,
  Healthcheck,
  Shell,
  Stopsignal,
  Maintainer
}

const KEYWORDS: &[(&str, OpCode)] = &[
  ("FROM", OpCode::From),
  ("RUN", OpCode::Run),
  ("CMD", OpCode::Cmd),
  ("LABEL", OpCode::Label),
  ("EXPOSE", OpCode::Expose),
  ("ENV", OpCode::Env),
  ("ADD", OpCode::Add),
  ("COPY", OpCode::Copy),
  ("ENTRYPOINT", OpCode::Entrypoint),
  ("VOLUME", OpCode::Volume),
  ("USER", OpCode::User),
  ("WORKDIR", OpCode::Workdir),
  ("ARG", OpCode::Arg),
  ("ONBUILD", OpCode::Onbuild),
  ("HEALTHCHECK", OpCode::Healthcheck),
  ("SHELL", OpCode::Shell),
  ("STOPSIGNAL", OpCode::Stopsignal),
  ("MAINTAINER", OpCode::Maintainer),
];

impl OpCode {
  /// Matches an instruction keyword, ignoring case.
  pub fn from_keyword(keyword: &str) -> Option<OpCode> {
    KEYWORDS
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
      .map(|(_, op)| *op)
  }

  /// The canonical (upper case) keyword.
  pub fn keyword(self) -> &'static str {
    KEYWORDS
      .iter()
      .find(|(_, op)| *op == self)
      .map(|(k, _)| *k)
      .unwrap_or("")
  }
}

impl fmt::Display for OpCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.keyword())
  }
}
