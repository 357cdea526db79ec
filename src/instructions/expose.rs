// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::fmt;
use std::str::FromStr;

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::bare_word;

/// A transport protocol for an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
  Tcp,
  Udp,
  Sctp
}

impl FromStr for Protocol {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "tcp" => Ok(Protocol::Tcp),
      "udp" => Ok(Protocol::Udp),
      "sctp" => Ok(Protocol::Sctp),
      other => Err(format!("unknown protocol '{}'", other))
    }
  }
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Protocol::Tcp => f.write_str("tcp"),
      Protocol::Udp => f.write_str("udp"),
      Protocol::Sctp => f.write_str("sctp")
    }
  }
}

/// A single exposed container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
  pub number: u16,
  pub protocol: Protocol
}

impl Port {
  pub fn tcp(number: u16) -> Port {
    Port { number, protocol: Protocol::Tcp }
  }

  /// Parses a port spec such as `80`, `53/udp` or `8000-8002/tcp`, expanding
  /// ranges into individual ports.
  pub fn parse_spec(spec: &str) -> std::result::Result<Vec<Port>, String> {
    let (range, protocol) = match spec.find('/') {
      Some(pos) => (&spec[..pos], spec[pos + 1..].parse()?),
      None => (spec, Protocol::Tcp)
    };

    let parse_number = |s: &str| s.parse::<u16>()
      .map_err(|_| format!("invalid port '{}'", s));

    let (start, end) = match range.find('-') {
      Some(pos) => (parse_number(&range[..pos])?, parse_number(&range[pos + 1..])?),
      None => {
        let n = parse_number(range)?;
        (n, n)
      }
    };

    if end < start {
      return Err(format!("invalid port range '{}'", range));
    }

    Ok((start..=end).map(|number| Port { number, protocol }).collect())
  }
}

impl fmt::Display for Port {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.number, self.protocol)
  }
}

/// A Dockerfile [`EXPOSE` instruction][expose].
///
/// Port specs are kept as written since they may contain variable
/// references; see `ExposeInstruction::ports()`.
///
/// [expose]: https://docs.docker.com/engine/reference/builder/#expose
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExposeInstruction(pub Vec<String>);

impl ExposeInstruction {
  pub(crate) fn parse(args: &str, _line: usize) -> Result<ExposeInstruction> {
    Ok(ExposeInstruction(args.split_whitespace().map(bare_word).collect()))
  }

  /// Parses every port spec. Empty specs, as left behind by substituting
  /// unset variables, are skipped.
  pub fn ports(&self, line: usize) -> Result<Vec<Port>> {
    let mut ports = Vec::new();
    for spec in self.0.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
      let parsed = Port::parse_spec(spec)
        .map_err(|message| shape_error(line, OpCode::Expose, message))?;

      ports.extend(parsed);
    }

    Ok(ports)
  }
}
