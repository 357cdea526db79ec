// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeMap, HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::dockerfile_parser::{Dockerfile, Instruction, InstructionKind};
use crate::error::*;
use crate::image::ImageRef;
use crate::instructions::FromInstruction;
use crate::resolver::VariableScope;

/// The parent image of a Docker build stage
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum StageParent {
  /// An externally-built image, potentially from a remote registry
  Image(ImageRef),

  /// An index of a previous stage within the current Dockerfile
  Stage(usize),

  /// The empty (scratch) parent image
  Scratch
}

impl fmt::Display for StageParent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageParent::Image(image) => image.fmt(f),
      StageParent::Stage(index) => write!(f, "stage #{}", index),
      StageParent::Scratch => write!(f, "scratch")
    }
  }
}

/// Where a `COPY --from` takes its files from.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum CopySource {
  /// An earlier stage of the same Dockerfile
  Stage(usize),

  /// An external image
  Image(ImageRef)
}

/// A build stage selector, either by index or by name.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Target {
  Index(usize),
  Name(String)
}

impl FromStr for Target {
  type Err = Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    Ok(match s.parse::<usize>() {
      Ok(index) => Target::Index(index),
      Err(_) => Target::Name(s.to_ascii_lowercase())
    })
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Target::Index(index) => index.fmt(f),
      Target::Name(name) => f.write_str(name)
    }
  }
}

/// A single stage in a [multi-stage build].
///
/// A stage begins with (and includes) a `FROM` instruction and continues until
/// (but does *not* include) the next `FROM` instruction, if any.
///
/// Stages have an index and an optional alias. Later `COPY --from=$index [...]`
/// instructions may copy files between unnamed build stages. The alias, if
/// defined in this stage's `FROM` instruction, may be used as well.
///
/// Note that instructions in a Dockerfile before the first `FROM` are not
/// included in the first stage's list of instructions.
///
/// [multi-stage build]: https://docs.docker.com/develop/develop-images/multistage-build/
#[derive(Debug, Eq)]
pub struct Stage<'a> {
  /// The stage index.
  pub index: usize,

  /// The stage's FROM alias, if any.
  pub name: Option<String>,

  /// The line of the stage's `FROM` instruction.
  pub line: usize,

  /// The `FROM` instruction with global `ARG`s substituted.
  pub from: FromInstruction,

  /// An ordered list of instructions in this stage, as written.
  pub instructions: Vec<&'a Instruction>,

  /// The direct parent of this stage.
  ///
  /// If this is the first stage, it will be equal to the root stage.
  pub parent: StageParent,

  /// The root image of this stage, either an external reference (possibly from
  /// a remote registry) or `scratch`.
  pub root: StageParent
}

impl<'a> PartialEq for Stage<'a> {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

/// A collection of stages in a [multi-stage build].
///
/// # Example
/// ```
/// use dockerfile_plan::Dockerfile;
///
/// let dockerfile = Dockerfile::parse(r#"
///   FROM alpine:3.12 as build
///   RUN echo "hello world" > /foo
///
///   FROM ubuntu:18.04
///   COPY --from=0 /foo /foo
/// "#).unwrap();
///
/// for stage in dockerfile.stages().unwrap().iter() {
///   println!("stage #{}, name: {:?}", stage.index, stage.name)
/// }
/// ```
///
/// [multi-stage build]: https://docs.docker.com/develop/develop-images/multistage-build/
#[derive(Debug)]
pub struct Stages<'a> {
  pub stages: Vec<Stage<'a>>,
  names: HashMap<String, usize>
}

impl<'a> Stages<'a> {
  /// Splits a Dockerfile into stages, resolving `FROM` lines with the
  /// defaults of the global `ARG`s.
  pub fn new(dockerfile: &'a Dockerfile) -> Result<Stages<'a>> {
    let overrides = BTreeMap::new();
    let mut diagnostics = Vec::new();
    let global = VariableScope::global(dockerfile, &overrides, &mut diagnostics);

    Stages::resolve(dockerfile, &global, &mut diagnostics)
  }

  /// Splits a Dockerfile into stages, resolving `FROM` lines against the
  /// given global scope.
  pub fn resolve(
    dockerfile: &'a Dockerfile,
    global: &VariableScope<'_>,
    diagnostics: &mut Vec<Diagnostic>
  ) -> Result<Stages<'a>> {
    // note: instructions before the first FROM are not part of any stage and
    // are not included in the first stage's instruction list
    let stage_args: HashSet<&str> = dockerfile.instructions
      .iter()
      .skip_while(|ins| ins.as_from().is_none())
      .filter_map(|ins| ins.as_arg())
      .flat_map(|arg| arg.names())
      .collect();

    let mut stages = Stages { stages: vec![], names: HashMap::new() };

    for ins in &dockerfile.instructions {
      if let InstructionKind::From(from) = &ins.kind {
        let from = global.resolve_from(from, ins.line, &stage_args, diagnostics)?;
        stages.push(ins, from)?;
      } else if let Some(stage) = stages.stages.last_mut() {
        stage.instructions.push(ins);
      }
    }

    tracing::debug!(stages = stages.len(), "split dockerfile into stages");

    Ok(stages)
  }

  fn push(&mut self, ins: &'a Instruction, from: FromInstruction) -> Result<()> {
    let index = self.stages.len();

    if let Some(name) = &from.alias {
      if let Some(first) = self.get_by_name(name) {
        return Err(Error::DuplicateStageName {
          line: ins.line,
          name: name.clone(),
          first_line: first.line
        });
      }
    }

    // only earlier stages are registered, so a stage never parents itself
    let image_name = from.image.to_ascii_lowercase();
    let parent = if let Some(stage) = self.get_by_name(&image_name) {
      StageParent::Stage(stage.index)
    } else {
      let image = ImageRef::parse(&from.image);
      if image.is_scratch() {
        StageParent::Scratch
      } else {
        StageParent::Image(image)
      }
    };

    let root = match parent {
      StageParent::Stage(parent_stage) => self.stages[parent_stage].root.clone(),
      _ => parent.clone()
    };

    if let Some(name) = &from.alias {
      self.names.insert(name.clone(), index);
    }

    self.stages.push(Stage {
      index,
      name: from.alias.clone(),
      line: ins.line,
      from,
      instructions: vec![ins],
      parent,
      root
    });

    Ok(())
  }

  /// Attempts to fetch a stage by its name (`FROM` alias).
  pub fn get_by_name(&self, name: &str) -> Option<&Stage<'a>> {
    self.names
      .get(&name.to_ascii_lowercase())
      .and_then(|index| self.stages.get(*index))
  }

  /// Attempts to fetch a stage by its string representation.
  ///
  /// Stages with a valid integer value are retrieved by index, otherwise by
  /// name.
  pub fn get(&self, s: &str) -> Option<&Stage<'a>> {
    match s.parse::<usize>() {
      Ok(index) => self.stages.get(index),
      Err(_) => self.get_by_name(s)
    }
  }

  /// Selects the build target; the last stage if none is given.
  pub fn target(&self, target: Option<&Target>) -> Result<&Stage<'a>> {
    let stage = match target {
      None => self.stages.last(),
      Some(Target::Index(index)) => self.stages.get(*index),
      Some(Target::Name(name)) => self.get_by_name(name)
    };

    stage.ok_or_else(|| Error::UnknownTarget {
      target: target.map(|t| t.to_string()).unwrap_or_default()
    })
  }

  /// Resolves the (already substituted) reference of a `COPY --from` in the
  /// stage `current`.
  ///
  /// Stage references must point strictly backwards. A reference that names
  /// no stage but looks like an image (it contains `/`, `:` or `@`) is taken
  /// as an external image.
  pub fn resolve_copy_source(
    &self,
    reference: &str,
    current: usize,
    line: usize
  ) -> Result<CopySource> {
    let invalid = |message: &str| Error::InvalidStageReference {
      line,
      reference: reference.to_string(),
      message: message.to_string()
    };

    let index = match reference.parse::<usize>() {
      Ok(index) => index,
      Err(_) => match self.get_by_name(reference) {
        Some(stage) => stage.index,
        None if reference.contains(|c: char| c == '/' || c == ':' || c == '@') => {
          return Ok(CopySource::Image(ImageRef::parse(reference)));
        },
        None => return Err(invalid("no stage has this name"))
      }
    };

    if index == current {
      Err(invalid("a stage can't copy from itself"))
    } else if index > current {
      Err(invalid("stages can only copy from earlier stages"))
    } else {
      Ok(CopySource::Stage(index))
    }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Returns an iterator over `stages`, wrapping the underlying `Vec::iter()`.
  pub fn iter(&self) -> std::slice::Iter<'_, Stage<'a>> {
    self.stages.iter()
  }
}

impl<'a> Index<usize> for Stages<'a> {
  type Output = Stage<'a>;

  fn index(&self, index: usize) -> &Self::Output {
    &self.stages[index]
  }
}

impl<'a> IntoIterator for Stages<'a> {
  type Item = Stage<'a>;
  type IntoIter = std::vec::IntoIter<Stage<'a>>;

  fn into_iter(self) -> Self::IntoIter {
    self.stages.into_iter()
  }
}
