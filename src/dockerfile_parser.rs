// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;
use std::fmt;
use std::io::{Read, BufReader};
use std::str::FromStr;

use snafu::ResultExt;

use crate::error::*;
use crate::instructions::*;
use crate::lexer::{LogicalLine, LogicalLines};
use crate::plan::{LayerPlan, PlanOptions};
use crate::stage::Stages;
use crate::util::*;

/// The typed arguments of a single Dockerfile instruction.
///
/// Individual instructions structures may be unpacked with pattern matching or
/// via the `TryFrom` impls on each instruction type.
///
/// # Example
///
/// ```
/// use std::convert::TryInto;
/// use dockerfile_plan::*;
///
/// let dockerfile = Dockerfile::parse("FROM alpine:3.11 AS base").unwrap();
/// let from: &FromInstruction = dockerfile.instructions
///   .get(0).unwrap()
///   .try_into().unwrap();
///
/// assert_eq!(from.alias, Some("base".to_string()));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InstructionKind {
  From(FromInstruction),
  Arg(ArgInstruction),
  Label(LabelInstruction),
  Run(RunInstruction),
  Entrypoint(EntrypointInstruction),
  Cmd(CmdInstruction),
  Copy(CopyInstruction),
  Add(AddInstruction),
  Env(EnvInstruction),
  Expose(ExposeInstruction),
  Volume(VolumeInstruction),
  User(UserInstruction),
  Workdir(WorkdirInstruction),
  Onbuild(OnbuildInstruction),
  Healthcheck(HealthcheckInstruction),
  Shell(ShellInstruction),
  Stopsignal(StopsignalInstruction),
  Maintainer(MaintainerInstruction)
}

/// A single Dockerfile instruction and the line on which it starts.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
  pub line: usize,
  pub kind: InstructionKind
}

impl Instruction {
  pub fn new<K: Into<InstructionKind>>(line: usize, kind: K) -> Instruction {
    Instruction { line, kind: kind.into() }
  }

  pub fn op_code(&self) -> OpCode {
    self.kind.op_code()
  }
}

/// Maps an instruction struct to its enum variant, implementing From<T> on
/// InstructionKind for it.
macro_rules! impl_from_instruction {
  ($struct:ident, $enum:expr) => {
    impl From<$struct> for InstructionKind {
      fn from(ins: $struct) -> Self {
        $enum(ins)
      }
    }
  };
}

impl_from_instruction!(FromInstruction, InstructionKind::From);
impl_from_instruction!(ArgInstruction, InstructionKind::Arg);
impl_from_instruction!(LabelInstruction, InstructionKind::Label);
impl_from_instruction!(RunInstruction, InstructionKind::Run);
impl_from_instruction!(EntrypointInstruction, InstructionKind::Entrypoint);
impl_from_instruction!(CmdInstruction, InstructionKind::Cmd);
impl_from_instruction!(CopyInstruction, InstructionKind::Copy);
impl_from_instruction!(AddInstruction, InstructionKind::Add);
impl_from_instruction!(EnvInstruction, InstructionKind::Env);
impl_from_instruction!(ExposeInstruction, InstructionKind::Expose);
impl_from_instruction!(VolumeInstruction, InstructionKind::Volume);
impl_from_instruction!(UserInstruction, InstructionKind::User);
impl_from_instruction!(WorkdirInstruction, InstructionKind::Workdir);
impl_from_instruction!(OnbuildInstruction, InstructionKind::Onbuild);
impl_from_instruction!(HealthcheckInstruction, InstructionKind::Healthcheck);
impl_from_instruction!(ShellInstruction, InstructionKind::Shell);
impl_from_instruction!(StopsignalInstruction, InstructionKind::Stopsignal);
impl_from_instruction!(MaintainerInstruction, InstructionKind::Maintainer);

/// Implements `TryFrom<&Instruction>` for a borrowed instruction struct, plus
/// an `into_*` / `as_*` pair of accessors on `Instruction`.
macro_rules! impl_try_from_instruction {
  ($struct:ident, $enum:path, $into:ident, $as:ident) => {
    impl<'a> TryFrom<&'a Instruction> for &'a $struct {
      type Error = Error;

      fn try_from(instruction: &'a Instruction) -> Result<Self> {
        if let $enum(ins) = &instruction.kind {
          Ok(ins)
        } else {
          Err(Error::ConversionError {
            from: format!("{:?}", instruction),
            to: stringify!($struct).into()
          })
        }
      }
    }

    impl Instruction {
      pub fn $into(self) -> Option<$struct> {
        if let $enum(ins) = self.kind {
          Some(ins)
        } else {
          None
        }
      }

      pub fn $as(&self) -> Option<&$struct> {
        if let $enum(ins) = &self.kind {
          Some(ins)
        } else {
          None
        }
      }
    }
  };
}

impl_try_from_instruction!(FromInstruction, InstructionKind::From, into_from, as_from);
impl_try_from_instruction!(ArgInstruction, InstructionKind::Arg, into_arg, as_arg);
impl_try_from_instruction!(LabelInstruction, InstructionKind::Label, into_label, as_label);
impl_try_from_instruction!(RunInstruction, InstructionKind::Run, into_run, as_run);
impl_try_from_instruction!(
  EntrypointInstruction, InstructionKind::Entrypoint, into_entrypoint, as_entrypoint
);
impl_try_from_instruction!(CmdInstruction, InstructionKind::Cmd, into_cmd, as_cmd);
impl_try_from_instruction!(CopyInstruction, InstructionKind::Copy, into_copy, as_copy);
impl_try_from_instruction!(AddInstruction, InstructionKind::Add, into_add, as_add);
impl_try_from_instruction!(EnvInstruction, InstructionKind::Env, into_env, as_env);
impl_try_from_instruction!(ExposeInstruction, InstructionKind::Expose, into_expose, as_expose);
impl_try_from_instruction!(VolumeInstruction, InstructionKind::Volume, into_volume, as_volume);
impl_try_from_instruction!(UserInstruction, InstructionKind::User, into_user, as_user);
impl_try_from_instruction!(
  WorkdirInstruction, InstructionKind::Workdir, into_workdir, as_workdir
);
impl_try_from_instruction!(
  OnbuildInstruction, InstructionKind::Onbuild, into_onbuild, as_onbuild
);
impl_try_from_instruction!(
  HealthcheckInstruction, InstructionKind::Healthcheck, into_healthcheck, as_healthcheck
);
impl_try_from_instruction!(ShellInstruction, InstructionKind::Shell, into_shell, as_shell);
impl_try_from_instruction!(
  StopsignalInstruction, InstructionKind::Stopsignal, into_stopsignal, as_stopsignal
);
impl_try_from_instruction!(
  MaintainerInstruction, InstructionKind::Maintainer, into_maintainer, as_maintainer
);

impl InstructionKind {
  /// Parses the arguments of an instruction whose keyword has already been
  /// matched.
  pub(crate) fn parse(op: OpCode, args: &str, line: usize) -> Result<InstructionKind> {
    let args = args.trim();
    if args.is_empty() {
      return Err(shape_error(line, op, "arguments are required"));
    }

    let kind = match op {
      OpCode::From => FromInstruction::parse(args, line)?.into(),
      OpCode::Run => RunInstruction::parse(args, line)?.into(),
      OpCode::Cmd => CmdInstruction::parse(args, line)?.into(),
      OpCode::Label => LabelInstruction::parse(args, line)?.into(),
      OpCode::Expose => ExposeInstruction::parse(args, line)?.into(),
      OpCode::Env => EnvInstruction::parse(args, line)?.into(),
      OpCode::Add => AddInstruction::parse(args, line)?.into(),
      OpCode::Copy => CopyInstruction::parse(args, line)?.into(),
      OpCode::Entrypoint => EntrypointInstruction::parse(args, line)?.into(),
      OpCode::Volume => VolumeInstruction::parse(args, line)?.into(),
      OpCode::User => UserInstruction::parse(args, line)?.into(),
      OpCode::Workdir => WorkdirInstruction::parse(args, line)?.into(),
      OpCode::Arg => ArgInstruction::parse(args, line)?.into(),
      OpCode::Onbuild => OnbuildInstruction::parse(args, line)?.into(),
      OpCode::Healthcheck => HealthcheckInstruction::parse(args, line)?.into(),
      OpCode::Shell => ShellInstruction::parse(args, line)?.into(),
      OpCode::Stopsignal => StopsignalInstruction::parse(args, line)?.into(),
      OpCode::Maintainer => MaintainerInstruction::parse(args, line)?.into(),
    };

    Ok(kind)
  }

  pub fn op_code(&self) -> OpCode {
    match self {
      InstructionKind::From(_) => OpCode::From,
      InstructionKind::Arg(_) => OpCode::Arg,
      InstructionKind::Label(_) => OpCode::Label,
      InstructionKind::Run(_) => OpCode::Run,
      InstructionKind::Entrypoint(_) => OpCode::Entrypoint,
      InstructionKind::Cmd(_) => OpCode::Cmd,
      InstructionKind::Copy(_) => OpCode::Copy,
      InstructionKind::Add(_) => OpCode::Add,
      InstructionKind::Env(_) => OpCode::Env,
      InstructionKind::Expose(_) => OpCode::Expose,
      InstructionKind::Volume(_) => OpCode::Volume,
      InstructionKind::User(_) => OpCode::User,
      InstructionKind::Workdir(_) => OpCode::Workdir,
      InstructionKind::Onbuild(_) => OpCode::Onbuild,
      InstructionKind::Healthcheck(_) => OpCode::Healthcheck,
      InstructionKind::Shell(_) => OpCode::Shell,
      InstructionKind::Stopsignal(_) => OpCode::Stopsignal,
      InstructionKind::Maintainer(_) => OpCode::Maintainer,
    }
  }
}

/// Parses a single logical line into an instruction.
pub fn parse_line(logical: &LogicalLine) -> Result<Instruction> {
  let (keyword, args) = split_first_word(&logical.content);
  let op = OpCode::from_keyword(keyword).ok_or_else(|| Error::UnknownInstruction {
    line: logical.line,
    instruction: keyword.to_string()
  })?;

  Ok(Instruction {
    line: logical.line,
    kind: InstructionKind::parse(op, args, logical.line)?
  })
}

/// Writes `paths` either space-separated or, if any contains whitespace, as a
/// string array.
fn write_paths(f: &mut fmt::Formatter<'_>, paths: &[String]) -> fmt::Result {
  if paths.iter().any(|p| p.is_empty() || p.contains(char::is_whitespace)) {
    write!(f, " {}", exec_form_string(paths))
  } else {
    write!(f, " {}", paths.join(" "))
  }
}

/// Renders the instruction as Dockerfile syntax. Parsing the output yields an
/// equal instruction, apart from the stage index of `FROM`.
impl fmt::Display for InstructionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.op_code())?;

    match self {
      InstructionKind::From(from) => {
        write_flags(f, &from.flags)?;
        write!(f, " {}", from.image)?;
        if let Some(alias) = &from.alias {
          write!(f, " AS {}", alias)?;
        }

        Ok(())
      },
      InstructionKind::Arg(arg) => {
        for var in &arg.0 {
          match &var.default {
            Some(default) => write!(f, " {}={}", quote_word(&var.name), quote_word(default))?,
            None => write!(f, " {}", quote_word(&var.name))?
          }
        }

        Ok(())
      },
      InstructionKind::Label(label) => {
        for l in &label.0 {
          write!(f, " {}={}", quote_word(&l.name), quote_word(&l.value))?;
        }

        Ok(())
      },
      InstructionKind::Env(env) => {
        for var in &env.0 {
          write!(f, " {}={}", quote_word(&var.key), quote_word(&var.value))?;
        }

        Ok(())
      },
      InstructionKind::Run(run) => {
        write_flags(f, &run.flags)?;
        write!(f, " {}", run.command)
      },
      InstructionKind::Entrypoint(EntrypointInstruction(command))
      | InstructionKind::Cmd(CmdInstruction(command)) => write!(f, " {}", command),
      InstructionKind::Copy(copy) => {
        write_flags(f, &copy.flags)?;
        let mut paths = copy.sources.clone();
        paths.push(copy.destination.clone());
        write_paths(f, &paths)
      },
      InstructionKind::Add(add) => {
        write_flags(f, &add.flags)?;
        let mut paths = add.sources.clone();
        paths.push(add.destination.clone());
        write_paths(f, &paths)
      },
      InstructionKind::Expose(expose) => {
        for spec in &expose.0 {
          write!(f, " {}", show_bare_word(spec))?;
        }

        Ok(())
      },
      InstructionKind::Volume(volume) => write!(f, " {}", exec_form_string(&volume.0)),
      InstructionKind::Shell(shell) => write!(f, " {}", exec_form_string(&shell.0)),
      InstructionKind::User(UserInstruction(value))
      | InstructionKind::Workdir(WorkdirInstruction(value))
      | InstructionKind::Stopsignal(StopsignalInstruction(value))
      | InstructionKind::Maintainer(MaintainerInstruction(value)) => {
        write!(f, " {}", show_bare_word(value))
      },
      InstructionKind::Onbuild(onbuild) => write!(f, " {}", onbuild.0),
      InstructionKind::Healthcheck(HealthcheckInstruction::None) => write!(f, " NONE"),
      InstructionKind::Healthcheck(HealthcheckInstruction::Check { flags, command }) => {
        write_flags(f, flags)?;
        write!(f, " CMD {}", command)
      }
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.kind.fmt(f)
  }
}

/// A parsed Dockerfile.
///
/// An ordered list of all instructions is available via `instructions`, and
/// individual stages in a multi-stage build may be inspected using
/// `Dockerfile::stages()`.
///
/// # Example
/// ```
/// use dockerfile_plan::Dockerfile;
///
/// let s = r#"
///   FROM alpine:3.11
///   RUN echo "hello world"
/// "#;
///
/// assert_eq!(
///   Dockerfile::parse(&s).unwrap(),
///   s.parse::<Dockerfile>().unwrap()
/// );
/// assert_eq!(
///   Dockerfile::parse(&s).unwrap(),
///   Dockerfile::from_reader(s.as_bytes()).unwrap()
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dockerfile {
  /// The raw content of the Dockerfile
  pub content: String,

  /// An ordered list of parsed ARG instructions preceding the first FROM
  pub global_args: Vec<ArgInstruction>,

  /// An ordered list of all parsed instructions, including global_args
  pub instructions: Vec<Instruction>
}

fn parse_dockerfile(input: &str) -> Result<Dockerfile> {
  let mut instructions = Vec::new();
  let mut global_args = Vec::new();
  let mut from_index = 0;

  for logical in LogicalLines::new(input) {
    let mut instruction = parse_line(&logical?)?;
    let (line, op) = (instruction.line, instruction.op_code());

    match &mut instruction.kind {
      InstructionKind::From(from) => {
        // the stage index isn't known to the per-line parser
        from.index = from_index;
        from_index += 1;
      },
      InstructionKind::Arg(arg) if from_index == 0 => {
        // args preceding the first FROM instruction may be substituted into
        // all subsequent FROM image refs
        global_args.push(arg.clone());
      },
      _ if from_index == 0 => {
        return Err(Error::MissingBaseImage {
          line,
          instruction: op.to_string()
        });
      },
      _ => ()
    };

    instructions.push(instruction);
  }

  if from_index == 0 {
    return Err(Error::MissingBaseImage {
      line: input.lines().count().max(1),
      instruction: "end of file".into()
    });
  }

  tracing::debug!(
    instructions = instructions.len(),
    stages = from_index,
    global_args = global_args.len(),
    "parsed dockerfile"
  );

  Ok(Dockerfile {
    content: input.into(),
    global_args, instructions
  })
}

impl Dockerfile {
  /// Parses a Dockerfile from a string.
  pub fn parse(input: &str) -> Result<Dockerfile> {
    parse_dockerfile(input)
  }

  /// Parses a Dockerfile from a reader.
  pub fn from_reader<R>(reader: R) -> Result<Dockerfile>
  where
    R: Read
  {
    let mut buf = String::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_string(&mut buf).context(ReadError)?;

    Dockerfile::parse(&buf)
  }

  /// Splits this Dockerfile into its build stages.
  pub fn stages(&self) -> Result<Stages<'_>> {
    Stages::new(self)
  }

  /// Resolves variables and stage references, producing the layer plan for
  /// the requested target.
  pub fn plan(&self, options: &PlanOptions) -> Result<LayerPlan> {
    LayerPlan::new(self, options)
  }
}

impl FromStr for Dockerfile {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Dockerfile::parse(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  #[test]
  fn parse_basic() -> Result<()> {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      # syntax=docker/dockerfile:1
      ARG VERSION=3.18
      FROM alpine:$VERSION AS base
      run apk add \
        curl

      FROM base
      CMD ["curl", "--help"]
    "#))?;

    let ops: Vec<OpCode> = dockerfile.instructions.iter().map(|i| i.op_code()).collect();
    assert_eq!(ops, vec![
      OpCode::Arg, OpCode::From, OpCode::Run, OpCode::From, OpCode::Cmd
    ]);

    let lines: Vec<usize> = dockerfile.instructions.iter().map(|i| i.line).collect();
    assert_eq!(lines, vec![2, 3, 4, 7, 8]);

    assert_eq!(dockerfile.global_args, vec![
      ArgInstruction(vec![ArgVar::new("VERSION", Some("3.18"))])
    ]);

    let second: &FromInstruction = TryFrom::try_from(&dockerfile.instructions[3])?;
    assert_eq!(second.index, 1);
    assert_eq!(second.image, "base");

    Ok(())
  }

  #[test]
  fn missing_base_image() {
    match Dockerfile::parse("\n# comment\nRUN echo hi\n") {
      Err(Error::MissingBaseImage { line, instruction }) => {
        assert_eq!(line, 3);
        assert_eq!(instruction, "RUN");
      },
      other => panic!("expected a missing base image error, got {:?}", other)
    }

    assert!(matches!(
      Dockerfile::parse("ARG FOO=bar\n"),
      Err(Error::MissingBaseImage { .. })
    ));
    assert!(matches!(Dockerfile::parse(""), Err(Error::MissingBaseImage { .. })));
  }

  #[test]
  fn unknown_instruction() {
    match Dockerfile::parse("FROM alpine\nFETCH http://example.com\n") {
      Err(Error::UnknownInstruction { line, instruction }) => {
        assert_eq!(line, 2);
        assert_eq!(instruction, "FETCH");
      },
      other => panic!("expected an unknown instruction error, got {:?}", other)
    }
  }

  #[test]
  fn missing_arguments() {
    let err = Dockerfile::parse("FROM alpine\nWORKDIR\n").unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert!(matches!(
      err,
      Error::InvalidArgumentShape { instruction: OpCode::Workdir, .. }
    ));
  }

  #[test]
  fn conversion() -> Result<()> {
    let dockerfile = Dockerfile::parse("FROM alpine\nUSER node\n")?;
    let user = &dockerfile.instructions[1];

    assert!(<&FromInstruction>::try_from(user).is_err());
    assert_eq!(user.as_user(), Some(&UserInstruction("node".into())));
    assert_eq!(user.clone().into_from(), None);

    Ok(())
  }

  #[test]
  fn display_reparses() -> Result<()> {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      FROM --platform=linux/amd64 node:18 AS build
      ARG TOKEN MODE="dev build"
      LABEL "com.example.name"="my app" version=1
      ENV PATH=/app/bin:$PATH GREETING='hello $USER'
      RUN --mount=type=cache,target=/root/.npm npm ci
      COPY --from=0 ["my file", "/dst dir/"]
      ADD https://example.com/a.tgz /tmp/
      EXPOSE 80/tcp 53/udp
      VOLUME /data /logs
      WORKDIR /app
      USER node:staff
      SHELL ["/bin/bash", "-c"]
      HEALTHCHECK --interval=30s CMD ["curl", "-f", "http://localhost/"]
      ONBUILD RUN make
      STOPSIGNAL SIGTERM
      ENTRYPOINT ["node"]
      CMD server.js
    "#))?;

    let rendered: Vec<String> = dockerfile.instructions
      .iter()
      .map(|i| i.to_string())
      .collect();

    assert_eq!(rendered[1], r#"ARG TOKEN MODE="dev build""#);
    assert_eq!(rendered[5], r#"COPY --from=0 ["my file", "/dst dir/"]"#);

    let reparsed = Dockerfile::parse(&rendered.join("\n"))?;
    assert_eq!(reparsed.instructions, dockerfile.instructions);

    Ok(())
  }
}
