//! Command template parsing and expansion.
//!
//! Build stage arguments may reference values that are only known once a
//! build run starts. This module parses argument strings and substitutes
//! those values.
//!
//! # Placeholder Formats
//!
//! - `{prefix}` - the resolved install prefix
//! - `{flags}` - the enabled feature flag tokens (`--enable-fftw3` ...)
//!
//! An argument that consists of exactly `{flags}` expands to one argument per
//! enabled flag, or to no argument at all when no flag is enabled. Inside a
//! larger argument the tokens are joined with spaces.
//!
//! # Escaping
//!
//! `{{` produces a literal `{` and `}}` a literal `}`. A lone `}` passes
//! through unchanged.
//!
//! # Example
//!
//! ```
//! use brewkit_lib::template::{parse, Placeholder, Segment};
//!
//! let segments = parse("--prefix={prefix}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("--prefix=".to_string()),
//!     Segment::Placeholder(Placeholder::Prefix),
//! ]);
//! ```

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  /// `{prefix}`
  Prefix,
  /// `{flags}`
  Flags,
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {{{0}}}")]
  Unknown(String),
}

/// Values placeholders expand to during a build run.
pub trait TemplateVars {
  fn prefix(&self) -> &str;

  /// Enabled flag names, without the leading `--`.
  fn flags(&self) -> &[String];
}

/// Render a feature flag name as the command line token passed to build tools.
pub fn flag_token(flag: &str) -> String {
  format!("--{flag}")
}

/// Parse a template string into segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    match ch {
      '{' => {
        if let Some((_, '{')) = chars.peek() {
          chars.next();
          literal.push('{');
          continue;
        }

        let mut name = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
          match c {
            '}' => {
              closed = true;
              break;
            }
            '{' => return Err(TemplateError::Unclosed(pos)),
            _ => name.push(c),
          }
        }
        if !closed {
          return Err(TemplateError::Unclosed(pos));
        }

        let placeholder = match name.as_str() {
          "prefix" => Placeholder::Prefix,
          "flags" => Placeholder::Flags,
          _ => return Err(TemplateError::Unknown(name)),
        };

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Placeholder(placeholder));
      }
      '}' => {
        if let Some((_, '}')) = chars.peek() {
          chars.next();
        }
        literal.push('}');
      }
      _ => literal.push(ch),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Expand a single template into zero or more arguments.
pub fn expand_arg(input: &str, vars: &impl TemplateVars) -> Result<Vec<String>, TemplateError> {
  let segments = parse(input)?;

  if let [Segment::Placeholder(Placeholder::Flags)] = segments.as_slice() {
    return Ok(vars.flags().iter().map(|f| flag_token(f)).collect());
  }

  Ok(vec![substitute_segments(&segments, vars)])
}

/// Expand a full argument list.
pub fn expand_args(args: &[String], vars: &impl TemplateVars) -> Result<Vec<String>, TemplateError> {
  let mut expanded = Vec::with_capacity(args.len());
  for arg in args {
    expanded.extend(expand_arg(arg, vars)?);
  }
  Ok(expanded)
}

/// Substitute placeholders into a single string.
pub fn substitute(input: &str, vars: &impl TemplateVars) -> Result<String, TemplateError> {
  let segments = parse(input)?;
  Ok(substitute_segments(&segments, vars))
}

fn substitute_segments(segments: &[Segment], vars: &impl TemplateVars) -> String {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(Placeholder::Prefix) => result.push_str(vars.prefix()),
      Segment::Placeholder(Placeholder::Flags) => {
        let tokens: Vec<String> = vars.flags().iter().map(|f| flag_token(f)).collect();
        result.push_str(&tokens.join(" "));
      }
    }
  }

  result
}
