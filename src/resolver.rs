// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::dockerfile_parser::{Dockerfile, Instruction, InstructionKind};
use crate::error::*;
use crate::instructions::*;

lazy_static! {
  static ref VARIABLE: Regex = Regex::new(concat!(
    r"\\(.)",
    r"|\$(?:([A-Za-z_][A-Za-z0-9_]*)",
    r"|\{([A-Za-z_][A-Za-z0-9_]*)(?:(:[-+])([^}]*))?\})"
  )).unwrap();
}

/// Substitutes `$NAME`, `${NAME}`, `${NAME:-word}` and `${NAME:+word}`
/// references in a template using `lookup`.
///
/// `\$` produces a literal `$`; any other backslash pair is kept as is. The
/// output is never re-scanned, so substituted values and modifier words are
/// inserted literally. Names with no value substitute as an empty string and
/// are appended to `missing`.
///
/// ```
/// use dockerfile_plan::substitute;
///
/// let mut missing = Vec::new();
/// let lookup = |name: &str| if name == "TAG" { Some("3.18") } else { None };
///
/// assert_eq!(substitute("alpine:${TAG}", lookup, &mut missing), "alpine:3.18");
/// assert_eq!(substitute(r"\$TAG ${OS:-linux}", lookup, &mut missing), "$TAG linux");
/// assert_eq!(substitute("$UNSET", lookup, &mut missing), "");
/// assert_eq!(missing, vec!["UNSET".to_string()]);
/// ```
pub fn substitute<'a, F>(template: &str, lookup: F, missing: &mut Vec<String>) -> String
where
  F: Fn(&str) -> Option<&'a str>
{
  VARIABLE.replace_all(template, |caps: &Captures| {
    if let Some(escaped) = caps.get(1) {
      return if escaped.as_str() == "$" {
        "$".to_string()
      } else {
        caps[0].to_string()
      };
    }

    let name = caps.get(2)
      .or_else(|| caps.get(3))
      .map(|m| m.as_str())
      .unwrap_or_default();
    let value = lookup(name);

    match caps.get(4).map(|m| m.as_str()) {
      Some(":-") => match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => caps[5].to_string()
      },
      Some(_) => match value {
        Some(v) if !v.is_empty() => caps[5].to_string(),
        _ => String::new()
      },
      None => match value {
        Some(v) => v.to_string(),
        None => {
          missing.push(name.to_string());
          String::new()
        }
      }
    }
  }).into_owned()
}

/// The names a template refers to, in any of the forms `substitute` expands.
fn references(template: &str) -> impl Iterator<Item = &str> {
  VARIABLE
    .captures_iter(template)
    .filter_map(|caps| caps.get(2).or_else(|| caps.get(3)))
    .map(|m| m.as_str())
}

fn map_flags<F: FnMut(&str) -> String>(flags: &[Flag], f: &mut F) -> Vec<Flag> {
  flags
    .iter()
    .map(|flag| Flag {
      name: flag.name.clone(),
      value: flag.value.as_deref().map(|v| f(v))
    })
    .collect()
}

fn map_command<F: FnMut(&str) -> String>(command: &Command, f: &mut F) -> Command {
  match command {
    Command::Shell(s) => Command::Shell(f(s)),
    Command::Exec(args) => Command::Exec(map_all(args, f))
  }
}

fn map_all<F: FnMut(&str) -> String>(strings: &[String], f: &mut F) -> Vec<String> {
  strings.iter().map(|s| f(s)).collect()
}

impl InstructionKind {
  /// Returns a copy of this instruction with `f` applied to every argument
  /// string. Flag names, ENV keys, ARG names and stage aliases are kept, as
  /// is the trigger of an `ONBUILD`, which belongs to a downstream build.
  pub fn map_strings<F: FnMut(&str) -> String>(&self, mut f: F) -> InstructionKind {
    let f = &mut f;

    match self {
      InstructionKind::From(from) => FromInstruction {
        flags: map_flags(&from.flags, f),
        image: f(&from.image),
        index: from.index,
        alias: from.alias.clone()
      }.into(),
      InstructionKind::Arg(arg) => ArgInstruction(arg.0.iter().map(|var| ArgVar {
        name: var.name.clone(),
        default: var.default.as_deref().map(|d| f(d))
      }).collect()).into(),
      InstructionKind::Label(label) => LabelInstruction(label.0.iter().map(|l| Label {
        name: f(&l.name),
        value: f(&l.value)
      }).collect()).into(),
      InstructionKind::Env(env) => EnvInstruction(env.0.iter().map(|var| EnvVar {
        key: var.key.clone(),
        value: f(&var.value)
      }).collect()).into(),
      InstructionKind::Run(run) => RunInstruction {
        flags: map_flags(&run.flags, f),
        command: map_command(&run.command, f)
      }.into(),
      InstructionKind::Entrypoint(e) => EntrypointInstruction(map_command(&e.0, f)).into(),
      InstructionKind::Cmd(c) => CmdInstruction(map_command(&c.0, f)).into(),
      InstructionKind::Copy(copy) => CopyInstruction {
        flags: map_flags(&copy.flags, f),
        sources: map_all(&copy.sources, f),
        destination: f(&copy.destination)
      }.into(),
      InstructionKind::Add(add) => AddInstruction {
        flags: map_flags(&add.flags, f),
        sources: map_all(&add.sources, f),
        destination: f(&add.destination)
      }.into(),
      InstructionKind::Expose(expose) => ExposeInstruction(map_all(&expose.0, f)).into(),
      InstructionKind::Volume(volume) => VolumeInstruction(map_all(&volume.0, f)).into(),
      InstructionKind::Shell(shell) => ShellInstruction(map_all(&shell.0, f)).into(),
      InstructionKind::User(user) => UserInstruction(f(&user.0)).into(),
      InstructionKind::Workdir(workdir) => WorkdirInstruction(f(&workdir.0)).into(),
      InstructionKind::Stopsignal(signal) => StopsignalInstruction(f(&signal.0)).into(),
      InstructionKind::Maintainer(m) => MaintainerInstruction(f(&m.0)).into(),
      InstructionKind::Healthcheck(HealthcheckInstruction::None) => {
        HealthcheckInstruction::None.into()
      },
      InstructionKind::Healthcheck(HealthcheckInstruction::Check { flags, command }) => {
        HealthcheckInstruction::Check {
          flags: map_flags(flags, f),
          command: map_command(command, f)
        }.into()
      },
      InstructionKind::Onbuild(onbuild) => onbuild.clone().into()
    }
  }
}

/// The build arguments and environment visible at one point of a build.
///
/// One global scope holds the `ARG`s declared before the first `FROM`; each
/// stage then gets a fresh scope that can fall back on the global one when
/// re-declaring a global `ARG`.
#[derive(Debug, Clone)]
pub struct VariableScope<'a> {
  overrides: &'a BTreeMap<String, String>,
  global: Option<&'a VariableScope<'a>>,

  /// Declared ARG names and their resolved values
  args: BTreeMap<String, Option<String>>,
  env: BTreeMap<String, String>
}

impl<'a> VariableScope<'a> {
  /// Creates an empty pre-stage scope. `overrides` are the build-time values
  /// given to the builder, e.g. `--build-arg NAME=VALUE`.
  pub fn new(overrides: &'a BTreeMap<String, String>) -> VariableScope<'a> {
    VariableScope {
      overrides,
      global: None,
      args: BTreeMap::new(),
      env: BTreeMap::new()
    }
  }

  /// Builds the global scope from the `ARG`s preceding the first `FROM`.
  pub fn global(
    dockerfile: &Dockerfile,
    overrides: &'a BTreeMap<String, String>,
    diagnostics: &mut Vec<Diagnostic>
  ) -> VariableScope<'a> {
    let mut scope = VariableScope::new(overrides);

    let preamble = dockerfile.instructions
      .iter()
      .take_while(|ins| ins.op_code() != OpCode::From);

    for ins in preamble {
      scope.resolve(ins, diagnostics);
    }

    scope
  }

  /// Creates an empty stage scope backed by this global scope.
  pub fn stage(&'a self) -> VariableScope<'a> {
    VariableScope {
      overrides: self.overrides,
      global: Some(self),
      args: BTreeMap::new(),
      env: BTreeMap::new()
    }
  }

  /// Declares an `ARG` and returns its value: the override if given, else
  /// `default`, else the value of a global `ARG` with the same name.
  pub fn declare_arg(&mut self, name: &str, default: Option<String>) -> Option<String> {
    let value = self.overrides
      .get(name)
      .cloned()
      .or(default)
      .or_else(|| {
        self.global
          .and_then(|g| g.args.get(name))
          .and_then(|v| v.clone())
      });

    self.args.insert(name.to_string(), value.clone());
    value
  }

  pub fn set_env<K, V>(&mut self, key: K, value: V)
  where
    K: Into<String>,
    V: Into<String>
  {
    self.env.insert(key.into(), value.into());
  }

  /// Looks up a variable. `ENV` values shadow `ARG`s of the same name.
  pub fn get(&self, name: &str) -> Option<&str> {
    self.env
      .get(name)
      .map(String::as_str)
      .or_else(|| self.args.get(name).and_then(|v| v.as_deref()))
  }

  /// True if an `ARG` with this name was declared in this scope, with or
  /// without a value.
  pub fn is_declared(&self, name: &str) -> bool {
    self.args.contains_key(name)
  }

  /// Substitutes variable references in `template`, recording a diagnostic
  /// for each one that has no value.
  pub fn substitute(
    &self,
    template: &str,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>
  ) -> String {
    let mut missing = Vec::new();
    let out = substitute(template, |name| self.get(name), &mut missing);

    diagnostics.extend(missing.into_iter().map(|name| {
      tracing::trace!(line, name = %name, "unresolved variable");
      Diagnostic::UnresolvedVariable { line, name }
    }));

    out
  }

  /// Resolves the variables of one instruction and applies its effect on
  /// this scope: `ARG` declares, `ENV` sets. All pairs of an `ENV` see the
  /// scope as it was before the instruction, while each `ARG` on a line sees
  /// the ones before it.
  pub fn resolve(
    &mut self,
    instruction: &Instruction,
    diagnostics: &mut Vec<Diagnostic>
  ) -> InstructionKind {
    let line = instruction.line;

    match &instruction.kind {
      InstructionKind::Arg(arg) => {
        let mut vars = Vec::with_capacity(arg.0.len());
        for var in &arg.0 {
          let default = var.default
            .as_ref()
            .map(|d| self.substitute(d, line, diagnostics));

          vars.push(ArgVar {
            name: var.name.clone(),
            default: self.declare_arg(&var.name, default)
          });
        }

        ArgInstruction(vars).into()
      },
      kind => {
        let resolved = {
          let scope = &*self;
          kind.map_strings(|s| scope.substitute(s, line, diagnostics))
        };

        if let InstructionKind::Env(env) = &resolved {
          for var in &env.0 {
            self.set_env(var.key.as_str(), var.value.as_str());
          }
        }

        resolved
      }
    }
  }

  /// Resolves a `FROM` line against this (global) scope.
  ///
  /// `stage_args` are the names declared by `ARG`s after the first `FROM`;
  /// referring to one of them here is an error, since stage arguments are
  /// never visible to `FROM`.
  pub fn resolve_from(
    &self,
    from: &FromInstruction,
    line: usize,
    stage_args: &HashSet<&str>,
    diagnostics: &mut Vec<Diagnostic>
  ) -> Result<FromInstruction> {
    let templates = std::iter::once(from.image.as_str())
      .chain(from.flags.iter().filter_map(|f| f.value.as_deref()));

    for name in templates.flat_map(|t| references(t)) {
      if !self.is_declared(name) && stage_args.contains(name) {
        return Err(Error::InvalidStageReference {
          line,
          reference: name.to_string(),
          message: "FROM can only use ARGs declared before the first FROM".into()
        });
      }
    }

    let resolved = InstructionKind::From(from.clone())
      .map_strings(|s| self.substitute(s, line, diagnostics));

    match resolved {
      InstructionKind::From(from) if from.image.trim().is_empty() => {
        Err(shape_error(line, OpCode::From, "the image name resolves to an empty string"))
      },
      InstructionKind::From(from) => Ok(from),
      other => Err(Error::ConversionError {
        from: format!("{:?}", other),
        to: "FromInstruction".into()
      })
    }
  }

  /// The current environment, as set by `ENV` earlier in this stage.
  pub fn env(&self) -> &BTreeMap<String, String> {
    &self.env
  }
}
