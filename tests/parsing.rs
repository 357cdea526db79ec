// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

extern crate dockerfile_plan;

use dockerfile_plan::*;
use indoc::indoc;
use pretty_assertions::assert_eq;

mod common;
use common::*;

#[test]
fn parse_basic() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse(r#"
    FROM alpine:3.10

    RUN apk add --no-cache curl
  "#)?;

  assert_eq!(dockerfile.instructions.len(), 2);

  assert_eq!(
    dockerfile.instructions[0],
    Instruction::new(2, FromInstruction {
      flags: vec![],
      image: "alpine:3.10".into(),
      index: 0,
      alias: None
    })
  );

  assert_eq!(
    dockerfile.instructions[1],
    Instruction::new(4, RunInstruction::shell("apk add --no-cache curl"))
  );

  Ok(())
}

#[test]
fn parse_multiline_shell() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse(indoc!(r#"
    FROM alpine
    RUN apk add --no-cache \
        curl && \
      # comments inside a continuation are dropped
      rm -rf /var/cache/apk

    RUN echo "done"
  "#))?;

  assert_eq!(dockerfile.instructions.len(), 3);
  assert_eq!(
    dockerfile.instructions[1],
    Instruction::new(2, RunInstruction::shell(
      "apk add --no-cache     curl &&   rm -rf /var/cache/apk"
    ))
  );
  assert_eq!(dockerfile.instructions[2].line, 7);

  Ok(())
}

#[test]
fn parse_exec_forms() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse(indoc!(r#"
    FROM alpine
    RUN ["apk", "add", "--no-cache", "curl"]
    ENTRYPOINT ["/sbin/tini", "--"]
    CMD [ "echo", "a \"quoted\" word" ]
  "#))?;

  assert_eq!(
    dockerfile.instructions[1].kind,
    RunInstruction::exec(strings(&["apk", "add", "--no-cache", "curl"])).into()
  );
  assert_eq!(
    dockerfile.instructions[2].kind,
    EntrypointInstruction::exec(strings(&["/sbin/tini", "--"])).into()
  );
  assert_eq!(
    dockerfile.instructions[3].kind,
    CmdInstruction::exec(strings(&["echo", "a \"quoted\" word"])).into()
  );

  Ok(())
}

#[test]
fn malformed_exec_form() {
  let err = Dockerfile::parse("FROM alpine\nCMD [\"echo\", hello]\n").unwrap_err();

  assert_eq!(err.line(), Some(2));
  assert!(matches!(err, Error::InvalidArgumentShape { instruction: OpCode::Cmd, .. }));
}

#[test]
fn dangling_continuation() {
  match Dockerfile::parse("FROM alpine\nRUN echo \\\n\n# trailing\n") {
    Err(Error::MalformedContinuation { line }) => assert_eq!(line, 2),
    other => panic!("expected a malformed continuation, got {:?}", other)
  }
}

#[test]
fn keywords_ignore_case() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse("from alpine as Base\nWorkDir /app\n")?;

  assert_eq!(dockerfile.instructions[0].op_code(), OpCode::From);
  assert_eq!(
    dockerfile.instructions[0].as_from().and_then(|f| f.alias.clone()),
    Some("base".into())
  );
  assert_eq!(
    dockerfile.instructions[1].kind,
    WorkdirInstruction("/app".into()).into()
  );

  Ok(())
}

#[test]
fn env_forms() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse(indoc!(r#"
    FROM alpine
    ENV GREETING hello world
    ENV A=1 B="two words" C=
  "#))?;

  assert_eq!(
    dockerfile.instructions[1].kind,
    EnvInstruction(vec![EnvVar::new("GREETING", "hello world")]).into()
  );
  assert_eq!(
    dockerfile.instructions[2].kind,
    EnvInstruction(vec![
      EnvVar::new("A", "1"),
      EnvVar::new("B", "two words"),
      EnvVar::new("C", ""),
    ]).into()
  );

  Ok(())
}

#[test]
fn from_reader() -> Result<(), dockerfile_plan::Error> {
  let content = "FROM alpine\nUSER nobody\n";
  let dockerfile = Dockerfile::from_reader(content.as_bytes())?;

  assert_eq!(dockerfile.content, content);
  assert_eq!(dockerfile, content.parse::<Dockerfile>()?);

  Ok(())
}

#[test]
fn global_args() -> Result<(), dockerfile_plan::Error> {
  let dockerfile = Dockerfile::parse(indoc!(r#"
    ARG REGISTRY=docker.io
    ARG TAG
    FROM $REGISTRY/library/alpine:${TAG:-latest}
    ARG LATE=1
  "#))?;

  assert_eq!(dockerfile.global_args, vec![
    ArgInstruction(vec![ArgVar::new("REGISTRY", Some("docker.io"))]),
    ArgInstruction(vec![ArgVar::new("TAG", None)]),
  ]);

  let stages = dockerfile.stages()?;
  assert_eq!(stages[0].from.image, "docker.io/library/alpine:latest");

  Ok(())
}
