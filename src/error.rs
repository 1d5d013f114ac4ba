//! Shared error utilities used across the compilation pipeline.
//!
//! Format errors point at the offending byte with a caret, the way a small
//! compiler front-end reports them. Capability errors name the call that the
//! fixed combinator vocabulary cannot express and the limit it ran into.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// The input does not have the shape `name(in) := expression`.
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Format {
    expr_line: String,
    marker: String,
    message: String,
  },

  /// The request is well formed but cannot be expressed with the primitives.
  #[snafu(display("cannot compile call to '{operator}': {limit}"))]
  Capability { operator: String, limit: Limitation },

  /// A compiler pass was handed a node it must never see.
  #[snafu(display("internal compiler error: {message}"))]
  Internal { message: String },
}

/// Hard limits of the downstream primitive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limitation {
  /// A static argument sits `position` slots deep; `flip` only reaches one.
  FlipDistance { index: usize, position: usize },
  /// More input-dependent arguments than `pipe2` can feed.
  DynamicArity { count: usize },
  /// More static arguments than `apply3` can bind.
  StaticArity { count: usize },
}

impl fmt::Display for Limitation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Limitation::FlipDistance { index, position } => write!(
        f,
        "static argument {index} would have to move {position} slots, flip moves at most one"
      ),
      Limitation::DynamicArity { count } => write!(
        f,
        "{count} input-dependent arguments, pipe2 composes at most 2"
      ),
      Limitation::StaticArity { count } => {
        write!(f, "{count} static arguments, apply3 binds at most 3")
      }
    }
  }
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  /// Only the line holding that offset is shown.
  pub fn at(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = floor_char_boundary(expr, loc.min(expr.len()));
    let line_start = expr[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = expr[safe_loc..]
      .find('\n')
      .map_or(expr.len(), |i| safe_loc + i);
    let line = expr[line_start..line_end].trim_end_matches('\r');

    let expr_line = format!("'{line}'");
    let char_offset = expr[line_start..safe_loc].chars().count() + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    Self::Format {
      expr_line,
      marker,
      message: message.into(),
    }
  }

  pub fn capability(operator: impl Into<String>, limit: Limitation) -> Self {
    Self::Capability {
      operator: operator.into(),
      limit,
    }
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal {
      message: message.into(),
    }
  }

  pub fn is_format(&self) -> bool {
    matches!(self, Self::Format { .. })
  }

  pub fn is_capability(&self) -> bool {
    matches!(self, Self::Capability { .. })
  }

  /// The violated limit, for capability errors.
  pub fn limitation(&self) -> Option<Limitation> {
    match self {
      Self::Capability { limit, .. } => Some(*limit),
      _ => None,
    }
  }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
  while !s.is_char_boundary(index) {
    index -= 1;
  }
  index
}
