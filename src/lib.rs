// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

#![forbid(unsafe_code)]

//! # Dockerfile layer planning
//!
//! A pure Rust library that reads a Dockerfile, resolves its build-time
//! `ARG` and `ENV` substitutions stage by stage, checks multi-stage
//! references, and emits an ordered layer plan for an external image builder.
//! Nothing is pulled, built or run.
//!
//! ## Quick start
//!
//! ```rust
//! use dockerfile_plan::{Dockerfile, PlanOptions};
//!
//! let dockerfile = Dockerfile::parse(r#"
//!   ARG NODE=18
//!   FROM node:$NODE AS build
//!   RUN npm ci && npm run build
//!
//!   FROM node:$NODE-alpine
//!   ARG PORT=3000
//!   COPY --from=build /app/dist /app
//!   EXPOSE $PORT
//!   ENTRYPOINT ["node", "/app/main.js"]
//! "#).unwrap();
//!
//! let plan = dockerfile
//!   .plan(&PlanOptions::new().build_arg("PORT", "8080"))
//!   .unwrap();
//!
//! assert_eq!(plan.stages.len(), 2);
//! assert_eq!(plan.stages[1].base.to_string(), "node:18-alpine");
//! assert_eq!(
//!   plan.default_command().argv(),
//!   vec!["node".to_string(), "/app/main.js".to_string()]
//! );
//!
//! for step in plan.steps() {
//!   println!("stage #{} line {}: {}", step.stage, step.line, step.instruction);
//! }
//! ```

#[macro_use] extern crate pest_derive;

mod error;
mod parser;
mod util;
mod lexer;
mod image;
mod instructions;
mod resolver;
mod stage;
mod plan;
mod dockerfile_parser;

pub use error::*;
pub use lexer::*;
pub use image::*;
pub use instructions::*;
pub use resolver::*;
pub use stage::*;
pub use plan::*;
pub use crate::dockerfile_parser::*;

#[cfg(test)] mod test_util;
