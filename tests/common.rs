// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

#![allow(dead_code)]

use dockerfile_plan::*;

pub fn strings(strs: &[&str]) -> Vec<String> {
  strs.iter().map(|s| String::from(*s)).collect()
}

/// The op-code sequence of each stage of a plan.
pub fn stage_ops(plan: &LayerPlan) -> Vec<Vec<OpCode>> {
  plan.stages
    .iter()
    .map(|stage| stage.steps.iter().map(|step| step.op_code()).collect())
    .collect()
}
