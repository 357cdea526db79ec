// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::dockerfile_parser::{Dockerfile, Instruction, InstructionKind};
use crate::error::*;
use crate::instructions::*;
use crate::resolver::VariableScope;
use crate::stage::{CopySource, Stage, StageParent, Stages, Target};
use crate::util::join_workdir;

/// Build arguments every builder accepts without a matching `ARG`.
const PREDEFINED_ARGS: &[&str] = &[
  "HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "FTP_PROXY",
  "ftp_proxy", "NO_PROXY", "no_proxy", "ALL_PROXY", "all_proxy",
];

/// Inputs of a build invocation besides the Dockerfile itself.
///
/// # Example
/// ```
/// use dockerfile_plan::{PlanOptions, Target};
///
/// let options = PlanOptions::new()
///   .parse_build_arg("VERSION=1.2").unwrap()
///   .target("build".parse().unwrap());
///
/// assert_eq!(options.build_args["VERSION"], "1.2");
/// assert_eq!(options.target, Some(Target::Name("build".into())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
  /// Build argument overrides, as given by `--build-arg NAME=VALUE`
  pub build_args: BTreeMap<String, String>,

  /// The stage to build; the last one if unset
  pub target: Option<Target>
}

impl PlanOptions {
  pub fn new() -> PlanOptions {
    PlanOptions::default()
  }

  pub fn build_arg<K, V>(mut self, name: K, value: V) -> PlanOptions
  where
    K: Into<String>,
    V: Into<String>
  {
    self.build_args.insert(name.into(), value.into());
    self
  }

  pub fn build_args<I, K, V>(mut self, args: I) -> PlanOptions
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>
  {
    self.build_args.extend(args.into_iter().map(|(k, v)| (k.into(), v.into())));
    self
  }

  /// Adds an override given as `NAME=VALUE`. The value may be empty.
  pub fn parse_build_arg(self, arg: &str) -> Result<PlanOptions> {
    match arg.find('=') {
      Some(pos) if pos > 0 => Ok(self.build_arg(&arg[..pos], &arg[pos + 1..])),
      _ => Err(Error::InvalidBuildArg { arg: arg.to_string() })
    }
  }

  pub fn target(mut self, target: Target) -> PlanOptions {
    self.target = Some(target);
    self
  }
}

/// One resolved instruction of the plan, i.e. one layer (or metadata change)
/// for the image builder to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStep {
  /// The index of the stage this step belongs to
  pub stage: usize,

  /// The line on which the instruction starts
  pub line: usize,

  /// The instruction with all variables substituted. A `COPY --from` names
  /// its source stage by index.
  pub instruction: InstructionKind,

  /// The resolved source of a `COPY --from`
  pub copy_source: Option<CopySource>
}

impl LayerStep {
  pub fn op_code(&self) -> OpCode {
    self.instruction.op_code()
  }
}

/// The image configuration in effect at the end of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
  pub entrypoint: Option<Vec<String>>,
  pub cmd: Option<Vec<String>>,
  pub env: BTreeMap<String, String>,
  pub labels: BTreeMap<String, String>,
  pub exposed_ports: BTreeSet<Port>,
  pub volumes: BTreeSet<String>,
  pub workdir: Option<String>,
  pub user: Option<String>,

  /// The shell wrapping shell-form commands
  pub shell: Vec<String>,

  /// `Some(HealthcheckInstruction::None)` if checks were explicitly disabled
  pub healthcheck: Option<HealthcheckInstruction>,
  pub stop_signal: Option<String>,

  /// Triggers recorded for builds using this image as their base
  pub onbuild: Vec<InstructionKind>
}

impl Default for ImageConfig {
  fn default() -> Self {
    ImageConfig {
      entrypoint: None,
      cmd: None,
      env: BTreeMap::new(),
      labels: BTreeMap::new(),
      exposed_ports: BTreeSet::new(),
      volumes: BTreeSet::new(),
      workdir: None,
      user: None,
      shell: vec!["/bin/sh".into(), "-c".into()],
      healthcheck: None,
      stop_signal: None,
      onbuild: Vec::new()
    }
  }
}

/// The command a container runs by default: the entrypoint followed by the
/// cmd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveCommand {
  pub entrypoint: Vec<String>,
  pub cmd: Vec<String>
}

impl EffectiveCommand {
  pub fn argv(&self) -> Vec<String> {
    self.entrypoint.iter().chain(self.cmd.iter()).cloned().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.entrypoint.is_empty() && self.cmd.is_empty()
  }
}

/// The resolved plan of one build stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
  pub index: usize,
  pub name: Option<String>,

  /// The resolved base of the stage
  pub base: StageParent,

  /// One step per instruction, starting with the stage's `FROM`
  pub steps: Vec<LayerStep>,

  /// Earlier stages this one builds on or copies from
  pub dependencies: BTreeSet<usize>,

  pub config: ImageConfig
}

/// The ordered build steps of a Dockerfile, ready to hand to an image
/// builder.
///
/// Every stage is planned in declaration order; `target` selects the one to
/// build and `required_stages()` the ones it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPlan {
  pub stages: Vec<StagePlan>,

  /// The index of the stage to build
  pub target: usize,

  /// Non-fatal findings, sorted and deduplicated
  pub diagnostics: Vec<Diagnostic>
}

/// Applies a resolved instruction to the image configuration. `cmd_set`
/// tracks whether the current stage has set its own `CMD`.
fn apply_config(
  config: &mut ImageConfig,
  instruction: &InstructionKind,
  line: usize,
  cmd_set: &mut bool
) -> Result<()> {
  match instruction {
    InstructionKind::Cmd(cmd) => {
      config.cmd = Some(cmd.0.to_argv(&config.shell));
      *cmd_set = true;
    },
    InstructionKind::Entrypoint(entrypoint) => {
      config.entrypoint = Some(entrypoint.0.to_argv(&config.shell));

      // an inherited CMD doesn't survive a new ENTRYPOINT
      if !*cmd_set {
        config.cmd = None;
      }
    },
    InstructionKind::Env(env) => {
      for var in &env.0 {
        config.env.insert(var.key.clone(), var.value.clone());
      }
    },
    InstructionKind::Label(label) => {
      for l in &label.0 {
        config.labels.insert(l.name.clone(), l.value.clone());
      }
    },
    InstructionKind::Expose(expose) => config.exposed_ports.extend(expose.ports(line)?),
    InstructionKind::Volume(volume) => {
      config.volumes.extend(volume.0.iter().filter(|v| !v.is_empty()).cloned());
    },
    // a WORKDIR emptied by substitution leaves the directory as it was
    InstructionKind::Workdir(workdir) if workdir.0.is_empty() => (),
    InstructionKind::Workdir(workdir) => {
      config.workdir = Some(join_workdir(config.workdir.as_deref(), &workdir.0));
    },
    InstructionKind::User(user) => config.user = Some(user.0.clone()),
    InstructionKind::Shell(shell) => config.shell = shell.0.clone(),
    InstructionKind::Healthcheck(check) => config.healthcheck = Some(check.clone()),
    InstructionKind::Stopsignal(signal) => config.stop_signal = Some(signal.0.clone()),
    InstructionKind::Onbuild(onbuild) => config.onbuild.push((*onbuild.0).clone()),
    _ => ()
  }

  Ok(())
}

/// Points every `--from` flag at the resolved stage index.
fn normalize_copy_from(copy: &mut CopyInstruction, index: usize) {
  for flag in copy.flags.iter_mut().filter(|f| f.name == "from") {
    flag.value = Some(index.to_string());
  }
}

fn plan_stage(
  stage: &Stage<'_>,
  stages: &Stages<'_>,
  planned: &[StagePlan],
  global: &VariableScope<'_>,
  diagnostics: &mut Vec<Diagnostic>
) -> Result<StagePlan> {
  let mut scope = global.stage();
  let mut dependencies = BTreeSet::new();

  let mut config = match stage.parent {
    StageParent::Stage(parent) => {
      dependencies.insert(parent);

      // triggers only fire in builds based on an image, never in children
      // of a local stage
      let mut config = planned[parent].config.clone();
      config.onbuild.clear();
      config
    },
    _ => ImageConfig::default()
  };

  let mut steps = vec![LayerStep {
    stage: stage.index,
    line: stage.line,
    instruction: stage.from.clone().into(),
    copy_source: None
  }];

  let mut cmd_set = false;
  for ins in stage.instructions.iter().skip(1) {
    let mut instruction = scope.resolve(ins, diagnostics);
    let mut copy_source = None;

    if let InstructionKind::Copy(copy) = &mut instruction {
      if let Some(reference) = copy.from_ref().map(String::from) {
        let source = stages.resolve_copy_source(&reference, stage.index, ins.line)?;
        if let CopySource::Stage(index) = source {
          dependencies.insert(index);
          normalize_copy_from(copy, index);
        }

        copy_source = Some(source);
      }
    }

    apply_config(&mut config, &instruction, ins.line, &mut cmd_set)?;

    tracing::trace!(
      stage = stage.index,
      line = ins.line,
      instruction = %instruction,
      "planned step"
    );

    steps.push(LayerStep {
      stage: stage.index,
      line: ins.line,
      instruction,
      copy_source
    });
  }

  tracing::debug!(
    stage = stage.index,
    name = ?stage.name,
    base = %stage.parent,
    steps = steps.len(),
    "planned stage"
  );

  Ok(StagePlan {
    index: stage.index,
    name: stage.name.clone(),
    base: stage.parent.clone(),
    steps,
    dependencies,
    config
  })
}

/// Reports overrides that no `ARG` in the document declares.
fn unconsumed_build_args(
  dockerfile: &Dockerfile,
  options: &PlanOptions,
  diagnostics: &mut Vec<Diagnostic>
) {
  let declared: HashSet<&str> = dockerfile.instructions
    .iter()
    .filter_map(Instruction::as_arg)
    .flat_map(|arg| arg.names())
    .collect();

  for name in options.build_args.keys() {
    if !declared.contains(name.as_str()) && !PREDEFINED_ARGS.contains(&name.as_str()) {
      diagnostics.push(Diagnostic::UnconsumedBuildArg { name: name.clone() });
    }
  }
}

impl LayerPlan {
  /// Resolves a Dockerfile into its layer plan.
  pub fn new(dockerfile: &Dockerfile, options: &PlanOptions) -> Result<LayerPlan> {
    let mut diagnostics = Vec::new();

    let global = VariableScope::global(dockerfile, &options.build_args, &mut diagnostics);
    let stages = Stages::resolve(dockerfile, &global, &mut diagnostics)?;
    let target = stages.target(options.target.as_ref())?.index;

    // stages after the target are still resolved so that their references
    // are checked
    let mut planned: Vec<StagePlan> = Vec::with_capacity(stages.len());
    for stage in stages.iter() {
      let plan = plan_stage(stage, &stages, &planned, &global, &mut diagnostics)?;
      planned.push(plan);
    }

    unconsumed_build_args(dockerfile, options, &mut diagnostics);

    let diagnostics: Vec<Diagnostic> = diagnostics
      .into_iter()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    for diagnostic in &diagnostics {
      tracing::debug!(%diagnostic, "diagnostic");
    }

    tracing::debug!(
      stages = planned.len(),
      target,
      diagnostics = diagnostics.len(),
      "planned build"
    );

    Ok(LayerPlan {
      stages: planned,
      target,
      diagnostics
    })
  }

  pub fn target_stage(&self) -> &StagePlan {
    &self.stages[self.target]
  }

  /// The default command of the built image.
  pub fn default_command(&self) -> EffectiveCommand {
    let config = &self.target_stage().config;

    EffectiveCommand {
      entrypoint: config.entrypoint.clone().unwrap_or_default(),
      cmd: config.cmd.clone().unwrap_or_default()
    }
  }

  pub fn exposed_ports(&self) -> &BTreeSet<Port> {
    &self.target_stage().config.exposed_ports
  }

  pub fn volumes(&self) -> &BTreeSet<String> {
    &self.target_stage().config.volumes
  }

  pub fn workdir(&self) -> Option<&str> {
    self.target_stage().config.workdir.as_deref()
  }

  pub fn user(&self) -> Option<&str> {
    self.target_stage().config.user.as_deref()
  }

  /// The stages the target needs, itself included, in ascending order.
  pub fn required_stages(&self) -> Vec<usize> {
    let mut required = BTreeSet::new();
    let mut pending = vec![self.target];

    while let Some(index) = pending.pop() {
      if required.insert(index) {
        pending.extend(self.stages[index].dependencies.iter().copied());
      }
    }

    required.into_iter().collect()
  }

  /// Iterates over every step of every planned stage, in order.
  pub fn steps(&self) -> impl Iterator<Item = &LayerStep> {
    self.stages.iter().flat_map(|s| s.steps.iter())
  }

  /// Renders the resolved steps back into Dockerfile syntax.
  pub fn to_dockerfile(&self) -> String {
    let mut out = String::new();
    for step in self.steps() {
      out.push_str(&step.instruction.to_string());
      out.push('\n');
    }

    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  fn plan(s: &str, options: &PlanOptions) -> Result<LayerPlan> {
    Dockerfile::parse(s)?.plan(options)
  }

  fn strings(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn entrypoint_and_cmd() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM node:18
      CMD ["npm", "start"]
      ENTRYPOINT ["docker-entrypoint.sh"]
      CMD node server.js
    "#), &PlanOptions::new())?;

    assert_eq!(p.default_command(), EffectiveCommand {
      entrypoint: strings(&["docker-entrypoint.sh"]),
      cmd: strings(&["/bin/sh", "-c", "node server.js"])
    });

    Ok(())
  }

  #[test]
  fn entrypoint_clears_inherited_cmd() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM alpine AS base
      CMD ["sh"]

      FROM base
      ENTRYPOINT ["/init"]
    "#), &PlanOptions::new())?;

    assert_eq!(p.stages[0].config.cmd, Some(strings(&["sh"])));
    assert_eq!(p.default_command().argv(), strings(&["/init"]));

    // within one stage, a CMD set before the ENTRYPOINT is kept
    let p = plan(indoc!(r#"
      FROM alpine
      CMD ["--help"]
      ENTRYPOINT ["tool"]
    "#), &PlanOptions::new())?;

    assert_eq!(p.default_command().argv(), strings(&["tool", "--help"]));

    Ok(())
  }

  #[test]
  fn shell_form_uses_current_shell() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM mcr.microsoft.com/powershell
      SHELL ["pwsh", "-Command"]
      CMD Write-Host hello
    "#), &PlanOptions::new())?;

    assert_eq!(
      p.default_command().argv(),
      strings(&["pwsh", "-Command", "Write-Host hello"])
    );

    Ok(())
  }

  #[test]
  fn merged_config() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM alpine
      EXPOSE 80 443/tcp
      EXPOSE 53/udp 8000-8001
      VOLUME /data
      VOLUME ["/logs", "/data"]
      WORKDIR /app
      WORKDIR src
      USER root
      USER node
      STOPSIGNAL SIGINT
      HEALTHCHECK NONE
    "#), &PlanOptions::new())?;

    let ports: Vec<String> = p.exposed_ports().iter().map(|p| p.to_string()).collect();
    assert_eq!(ports, strings(&["53/udp", "80/tcp", "443/tcp", "8000/tcp", "8001/tcp"]));

    let volumes: Vec<&str> = p.volumes().iter().map(String::as_str).collect();
    assert_eq!(volumes, vec!["/data", "/logs"]);

    assert_eq!(p.workdir(), Some("/app/src"));
    assert_eq!(p.user(), Some("node"));

    let config = &p.target_stage().config;
    assert_eq!(config.stop_signal, Some("SIGINT".into()));
    assert_eq!(config.healthcheck, Some(HealthcheckInstruction::None));

    Ok(())
  }

  #[test]
  fn invalid_port() {
    let err = plan("FROM alpine\nARG PORT=http\nEXPOSE $PORT\n", &PlanOptions::new())
      .unwrap_err();

    assert!(matches!(
      err,
      Error::InvalidArgumentShape { line: 3, instruction: OpCode::Expose, .. }
    ));
  }

  #[test]
  fn env_is_stage_scoped() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM alpine AS base
      ENV SECRET=leak APP_HOME=/srv/app

      FROM base
      RUN echo $SECRET
      WORKDIR $APP_HOME
    "#), &PlanOptions::new())?;

    // the child image still carries the parent's environment
    assert_eq!(p.stages[1].config.env["SECRET"], "leak");

    assert_eq!(
      p.stages[1].steps[1].instruction,
      RunInstruction::shell("echo ").into()
    );
    assert_eq!(p.stages[1].config.workdir, None);
    assert_eq!(p.diagnostics, vec![
      Diagnostic::UnresolvedVariable { line: 5, name: "SECRET".into() },
      Diagnostic::UnresolvedVariable { line: 6, name: "APP_HOME".into() },
    ]);

    Ok(())
  }

  #[test]
  fn empty_workdir_is_ignored() -> Result<()> {
    let p = plan("FROM alpine
WORKDIR $UNSET
", &PlanOptions::new())?;
    assert_eq!(p.workdir(), None);

    let p = plan("FROM alpine
WORKDIR /app
WORKDIR $UNSET
", &PlanOptions::new())?;
    assert_eq!(p.workdir(), Some("/app"));

    Ok(())
  }

  #[test]
  fn stage_args_are_scoped() -> Result<()> {
    let p = plan(indoc!(r#"
      ARG VERSION=1.0
      FROM alpine AS one
      ARG VERSION
      ARG LOCAL=yes
      LABEL version=$VERSION local=$LOCAL

      FROM alpine
      LABEL version=$VERSION local=$LOCAL
    "#), &PlanOptions::new())?;

    let labels = |index: usize| p.stages[index].config.labels.clone();
    assert_eq!(labels(0)["version"], "1.0");
    assert_eq!(labels(0)["local"], "yes");
    assert_eq!(labels(1)["version"], "");
    assert_eq!(labels(1)["local"], "");
    assert_eq!(p.diagnostics.len(), 2);

    Ok(())
  }

  #[test]
  fn copy_from_dependencies() -> Result<()> {
    let p = plan(indoc!(r#"
      FROM golang AS build
      RUN go build -o /app

      FROM alpine AS unused
      RUN true

      FROM build AS test
      RUN go test

      FROM scratch
      COPY --from=build /app /app
      COPY --from=nginx:latest /etc/nginx /etc/nginx
    "#), &PlanOptions::new())?;

    assert_eq!(p.target, 3);
    assert_eq!(p.required_stages(), vec![0, 3]);
    assert_eq!(p.stages[2].dependencies, vec![0].into_iter().collect::<BTreeSet<_>>());

    let copies: Vec<&LayerStep> = p.stages[3].steps
      .iter()
      .filter(|s| s.op_code() == OpCode::Copy)
      .collect();
    assert_eq!(copies[0].copy_source, Some(CopySource::Stage(0)));
    assert_eq!(copies[0].instruction.to_string(), "COPY --from=0 /app /app");
    assert!(matches!(copies[1].copy_source, Some(CopySource::Image(_))));

    Ok(())
  }

  #[test]
  fn explicit_target() -> Result<()> {
    let s = indoc!(r#"
      FROM alpine AS build
      USER builder

      FROM alpine
      USER runner
    "#);

    let p = plan(s, &PlanOptions::new().target(Target::Name("build".into())))?;
    assert_eq!(p.stages.len(), 2);
    assert_eq!(p.target, 0);
    assert_eq!(p.user(), Some("builder"));
    assert_eq!(p.required_stages(), vec![0]);

    assert_eq!(plan(s, &PlanOptions::new())?.user(), Some("runner"));
    assert!(matches!(
      plan(s, &PlanOptions::new().target(Target::Index(4))),
      Err(Error::UnknownTarget { .. })
    ));

    Ok(())
  }

  #[test]
  fn stages_after_target_are_checked() {
    let s = indoc!(r#"
      FROM alpine AS build
      USER builder

      FROM alpine
      COPY --from=nope / /
    "#);

    let options = PlanOptions::new().target(Target::Name("build".into()));
    assert!(matches!(
      plan(s, &options),
      Err(Error::InvalidStageReference { line: 5, .. })
    ));
  }

  #[test]
  fn unconsumed_build_args_are_reported() -> Result<()> {
    let options = PlanOptions::new()
      .build_args(vec![("USED", "1"), ("UNUSED", "2"), ("HTTP_PROXY", "http://proxy")]);

    let p = plan("FROM alpine\nARG USED\nRUN echo $USED\n", &options)?;
    assert_eq!(p.diagnostics, vec![
      Diagnostic::UnconsumedBuildArg { name: "UNUSED".into() }
    ]);

    let run: &RunInstruction = match &p.stages[0].steps[2].instruction {
      InstructionKind::Run(run) => run,
      other => panic!("expected RUN, got {:?}", other)
    };
    assert_eq!(run.command, Command::shell("echo 1"));

    Ok(())
  }

  #[test]
  fn build_arg_parsing() {
    let options = PlanOptions::new()
      .parse_build_arg("A=b=c").unwrap()
      .parse_build_arg("EMPTY=").unwrap();

    assert_eq!(options.build_args["A"], "b=c");
    assert_eq!(options.build_args["EMPTY"], "");

    assert!(PlanOptions::new().parse_build_arg("NOVALUE").is_err());
    assert!(PlanOptions::new().parse_build_arg("=x").is_err());
  }
}
