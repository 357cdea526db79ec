// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::instructions::OpCode;
use crate::parser::*;

use enquote::unquote;

/// Splits a string into its first whitespace-delimited word and the
/// (left-trimmed) remainder.
pub(crate) fn split_first_word(s: &str) -> (&str, &str) {
  let s = s.trim();
  match s.find(char::is_whitespace) {
    Some(pos) => (&s[..pos], s[pos..].trim_start()),
    None => (s, "")
  }
}

/// Parses an exec-form string array, e.g. `["echo", "hello world"]`, into
/// its unescaped elements.
pub(crate) fn parse_exec_form(
  input: &str,
  line: usize,
  instruction: OpCode
) -> Result<Vec<String>> {
  let array = parse_rule(Rule::exec_form, input)
    .map_err(|e| syntax_error(line, instruction, e))?
    .ok_or_else(|| shape_error(line, instruction, "expected a string array"))?;

  let mut ret = Vec::new();
  for field in array.into_inner() {
    match field.as_rule() {
      Rule::string => {
        let s = unquote(field.as_str()).map_err(|e| shape_error(
          line, instruction, format!("error unescaping string: {:?}", e)
        ))?;

        ret.push(s);
      },
      Rule::EOI => continue,
      _ => return Err(unexpected_token(line, instruction, field))
    }
  }

  Ok(ret)
}

/// Parses whitespace-separated `name[=value]` words, as used by `ARG`, `ENV`
/// and `LABEL`. The value is `None` when the word has no `=`.
pub(crate) fn parse_pairs(
  input: &str,
  line: usize,
  instruction: OpCode
) -> Result<Vec<(String, Option<String>)>> {
  let record = parse_rule(Rule::pairs, input)
    .map_err(|e| syntax_error(line, instruction, e))?
    .ok_or_else(|| shape_error(line, instruction, "expected name=value pairs"))?;

  let mut pairs = Vec::new();
  for field in record.into_inner() {
    match field.as_rule() {
      Rule::pair => {
        let pair_len = field.as_str().len();
        let mut name_len = 0;
        let mut name = None;
        let mut value = None;

        for part in field.into_inner() {
          match part.as_rule() {
            Rule::pair_name => {
              name_len = part.as_str().len();
              name = Some(unquote_word(part.as_str()));
            },
            Rule::pair_value => value = Some(unquote_word(part.as_str())),
            _ => return Err(unexpected_token(line, instruction, part))
          }
        }

        let name = name.ok_or_else(|| shape_error(
          line, instruction, "a name is required"
        ))?;

        // `name=` is an explicitly empty value, not a missing one
        let value = match value {
          Some(v) => Some(v),
          None if pair_len > name_len => Some(String::new()),
          None => None
        };

        pairs.push((name, value));
      },
      Rule::EOI => continue,
      _ => return Err(unexpected_token(line, instruction, field))
    }
  }

  Ok(pairs)
}

/// Parses the arguments of `ENV` and `LABEL`: either `KEY=VALUE` pairs or the
/// legacy single `KEY VALUE` form.
pub(crate) fn parse_key_values(
  input: &str,
  line: usize,
  instruction: OpCode
) -> Result<Vec<(String, String)>> {
  let (first, rest) = split_first_word(input);
  if first.is_empty() {
    return Err(shape_error(line, instruction, "at least one key is required"));
  }

  if !first.contains('=') {
    if rest.is_empty() {
      return Err(shape_error(
        line, instruction, format!("missing value for '{}'", first)
      ));
    }

    return Ok(vec![(unquote_word(first), unquote_word(rest))]);
  }

  parse_pairs(input, line, instruction)?
    .into_iter()
    .map(|(name, value)| match value {
      Some(value) => Ok((name, value)),
      None => Err(shape_error(
        line, instruction, format!("missing '=' after '{}'", name)
      ))
    })
    .collect()
}

/// Strips shell-style quoting from a word.
///
/// Double quotes allow `\"` and `\\` escapes, single quotes are literal, and
/// a backslash outside of quotes escapes the next character. Dollar signs
/// that must not be expanded later (escaped ones, or any inside single
/// quotes) are kept as `\$`.
pub(crate) fn unquote_word(word: &str) -> String {
  let mut out = String::with_capacity(word.len());
  let mut quote = None;
  let mut chars = word.chars();

  while let Some(c) = chars.next() {
    match (quote, c) {
      (Some('\''), '\'') => quote = None,
      (Some('\''), '$') => out.push_str("\\$"),
      (Some('\''), c) => out.push(c),
      (Some('"'), '"') => quote = None,
      (None, '"') | (None, '\'') => quote = Some(c),
      (_, '\\') => match chars.next() {
        Some('$') => out.push_str("\\$"),
        Some(next) if quote.is_none() || next == '"' || next == '\\' => out.push(next),
        Some(next) => {
          out.push('\\');
          out.push(next);
        },
        None => out.push('\\')
      },
      (_, c) => out.push(c)
    }
  }

  out
}

/// Quotes a word for re-serialization so `unquote_word` yields `word` back
/// unchanged. Variable references are kept as they are.
pub(crate) fn quote_word(word: &str) -> String {
  let plain = !word.is_empty() && word.chars().all(|c| {
    !c.is_whitespace() && !matches!(c, '"' | '\'' | '\\' | '=')
  });

  if plain {
    return word.to_string();
  }

  let mut out = String::with_capacity(word.len() + 2);
  out.push('"');
  for c in word.chars() {
    if matches!(c, '"' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('"');

  out
}

/// How an argument emptied by substitution is written back, so it still
/// parses as an argument.
pub(crate) const EMPTY_WORD: &str = r#""""#;

/// Reads back a bare (unquoted) argument, mapping `""` to the empty string
/// as the builder's word processing would.
pub(crate) fn bare_word(word: &str) -> String {
  if word == EMPTY_WORD {
    String::new()
  } else {
    word.to_string()
  }
}

/// Renders a bare argument, using `""` for an empty one.
pub(crate) fn show_bare_word(word: &str) -> &str {
  if word.is_empty() {
    EMPTY_WORD
  } else {
    word
  }
}

/// Renders a list of strings in exec form.
pub(crate) fn exec_form_string(args: &[String]) -> String {
  let quoted: Vec<String> = args
    .iter()
    .map(|a| enquote::enquote('"', a))
    .collect();

  format!("[{}]", quoted.join(", "))
}

/// Joins `path` onto a working directory, normalizing `.` and `..`
/// components. Absolute paths replace the current directory entirely.
pub(crate) fn join_workdir(current: Option<&str>, path: &str) -> String {
  let base = if path.starts_with('/') {
    ""
  } else {
    current.unwrap_or("/")
  };

  let mut parts: Vec<&str> = Vec::new();
  for segment in base.split('/').chain(path.split('/')) {
    match segment {
      "" | "." => continue,
      ".." => {
        parts.pop();
      },
      s => parts.push(s)
    }
  }

  format!("/{}", parts.join("/"))
}
