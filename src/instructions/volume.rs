// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::util::parse_exec_form;

/// A Dockerfile [`VOLUME` instruction][volume], in either the
/// whitespace-separated or the string array form.
///
/// [volume]: https://docs.docker.com/engine/reference/builder/#volume
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VolumeInstruction(pub Vec<String>);

impl VolumeInstruction {
  pub(crate) fn parse(args: &str, line: usize) -> Result<VolumeInstruction> {
    let paths = if args.starts_with('[') {
      parse_exec_form(args, line, OpCode::Volume)?
    } else {
      args.split_whitespace().map(String::from).collect()
    };

    if paths.is_empty() {
      return Err(shape_error(line, OpCode::Volume, "at least one path is required"));
    }

    Ok(VolumeInstruction(paths))
  }
}
