// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use pest::Parser;

/// The internal Pest parser for instruction arguments.
#[derive(Parser)]
#[grammar = "dockerfile.pest"]
pub(crate) struct DockerfileParser;

/// A Pest Pair for Dockerfile rules.
pub(crate) type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parses `input` with the given rule, returning the single top-level pair.
///
/// Syntax errors are returned as-is so callers can attach the line and
/// instruction they were parsing.
pub(crate) fn parse_rule(
  rule: Rule,
  input: &str
) -> std::result::Result<Option<Pair<'_>>, pest::error::Error<Rule>> {
  Ok(DockerfileParser::parse(rule, input)?.next())
}
