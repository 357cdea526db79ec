// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fs::File;

use clap::Parser;
use snafu::ErrorCompat;

use dockerfile_plan::{Dockerfile, PlanOptions, Result, Target};

/// Prints the layer plan of a Dockerfile.
#[derive(Parser, Debug)]
#[command(name = "plan")]
struct Args {
  /// Path to the Dockerfile
  path: String,

  /// Build argument override, NAME=VALUE
  #[arg(long = "build-arg", value_name = "NAME=VALUE")]
  build_args: Vec<String>,

  /// Stage to build, by name or index
  #[arg(long)]
  target: Option<Target>
}

fn wrap(args: Args) -> Result<()> {
  let mut options = PlanOptions::new();
  for arg in &args.build_args {
    options = options.parse_build_arg(arg)?;
  }
  if let Some(target) = args.target {
    options = options.target(target);
  }

  let f = File::open(&args.path).map_err(|source| dockerfile_plan::Error::ReadError { source })?;
  let plan = Dockerfile::from_reader(f)?.plan(&options)?;

  for stage in &plan.stages {
    let name = stage.name.as_deref().unwrap_or("-");
    println!("stage #{} ({}) from {}", stage.index, name, stage.base);

    for step in &stage.steps {
      println!("  {:>4}  {}", step.line, step.instruction);
    }
  }

  println!();
  println!("target:     #{}", plan.target);
  println!("requires:   {:?}", plan.required_stages());
  println!("command:    {:?}", plan.default_command().argv());
  println!("workdir:    {}", plan.workdir().unwrap_or("/"));
  println!("user:       {}", plan.user().unwrap_or("root"));

  let ports: Vec<String> = plan.exposed_ports().iter().map(|p| p.to_string()).collect();
  println!("ports:      {}", ports.join(" "));

  let volumes: Vec<&str> = plan.volumes().iter().map(String::as_str).collect();
  println!("volumes:    {}", volumes.join(" "));

  for diagnostic in &plan.diagnostics {
    eprintln!("warning: {}", diagnostic);
  }

  Ok(())
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  match wrap(Args::parse()) {
    Ok(()) => std::process::exit(0),
    Err(e) => {
      eprintln!("An error occurred: {}", e);
      if let Some(backtrace) = ErrorCompat::backtrace(&e) {
        eprintln!("{}", backtrace);
      }

      std::process::exit(1);
    }
  }
}
