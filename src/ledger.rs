//! Step ledger: every primitive operation the compiler emits, in order.
//!
//! Steps are recorded in single static assignment form against opaque
//! [`Placeholder`]s. Rendering drops every step the result does not depend
//! on, then names the survivors `<base>_<n>` in emission order.

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult};

/// Opaque identity of a not-yet-materialised result.
///
/// Two placeholders are equal only if they came from the same
/// [`Ledger::fresh`] call; the base name is kept by the ledger and never
/// takes part in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placeholder(u32);

impl Placeholder {
  pub fn id(self) -> u32 {
    self.0
  }
}

/// The closed vocabulary of the downstream execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
  OpByName,
  Apply0,
  Apply,
  Apply2,
  Apply3,
  Flip,
  Pipe,
  Pipe2,
  String,
  Integer,
  Double,
  Boolean,
}

impl Primitive {
  pub fn as_str(self) -> &'static str {
    match self {
      Primitive::OpByName => "op_by_name",
      Primitive::Apply0 => "apply0",
      Primitive::Apply => "apply",
      Primitive::Apply2 => "apply2",
      Primitive::Apply3 => "apply3",
      Primitive::Flip => "flip",
      Primitive::Pipe => "pipe",
      Primitive::Pipe2 => "pipe2",
      Primitive::String => "String",
      Primitive::Integer => "Integer",
      Primitive::Double => "Double",
      Primitive::Boolean => "Boolean",
    }
  }

  /// The `apply` flavour that binds `count` arguments at once.
  pub fn apply_n(count: usize) -> Option<Self> {
    match count {
      0 => Some(Primitive::Apply0),
      1 => Some(Primitive::Apply),
      2 => Some(Primitive::Apply2),
      3 => Some(Primitive::Apply3),
      _ => None,
    }
  }
}

impl fmt::Display for Primitive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A step input: either another step's output or text passed through as is.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  Slot(Placeholder),
  Literal(String),
}

impl Operand {
  pub fn slot(&self) -> Option<Placeholder> {
    match self {
      Operand::Slot(p) => Some(*p),
      Operand::Literal(_) => None,
    }
  }
}

impl From<Placeholder> for Operand {
  fn from(p: Placeholder) -> Self {
    Operand::Slot(p)
  }
}

#[derive(Debug, Clone)]
pub struct Step {
  pub output: Placeholder,
  pub primitive: Primitive,
  pub inputs: Vec<Operand>,
  pub comment: Option<String>,
}

/// Append-only record of emitted steps for one compile.
#[derive(Debug, Default)]
pub struct Ledger {
  steps: Vec<Step>,
  base_names: Vec<String>,
}

impl Ledger {
  pub fn clear(&mut self) {
    self.steps.clear();
    self.base_names.clear();
  }

  /// Allocate a new placeholder. Characters outside `[A-Za-z0-9_]` are dropped
  /// from the base name.
  pub fn fresh(&mut self, base_name: &str) -> Placeholder {
    let clean: String = base_name
      .chars()
      .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
      .collect();
    let id = self.base_names.len() as u32;
    self.base_names.push(if clean.is_empty() {
      "temp".to_string()
    } else {
      clean
    });
    Placeholder(id)
  }

  pub fn base_name(&self, p: Placeholder) -> &str {
    &self.base_names[p.0 as usize]
  }

  /// Record a step producing a fresh placeholder and return that placeholder.
  pub fn emit(
    &mut self,
    base_name: &str,
    primitive: Primitive,
    inputs: Vec<Operand>,
    comment: Option<String>,
  ) -> Placeholder {
    let output = self.fresh(base_name);
    trace!(id = output.id(), %primitive, base = base_name, "emit step");
    self.steps.push(Step {
      output,
      primitive,
      inputs,
      comment,
    });
    output
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.steps.len()
  }

  /// Steps the result transitively depends on, in emission order.
  pub fn live_steps(&self, result: Placeholder) -> Vec<&Step> {
    let mut live = vec![false; self.base_names.len()];
    live[result.0 as usize] = true;

    for step in self.steps.iter().rev() {
      if !live[step.output.0 as usize] {
        continue;
      }
      for input in step.inputs.iter().filter_map(Operand::slot) {
        live[input.0 as usize] = true;
      }
    }

    self
      .steps
      .iter()
      .filter(|step| live[step.output.0 as usize])
      .collect()
  }

  /// Dead-code eliminate and name the steps feeding `result`.
  ///
  /// Fails if a live step reads a placeholder no earlier step produced.
  pub fn render(
    &self,
    result: Placeholder,
    result_name: &str,
    comments: bool,
  ) -> CompileResult<Vec<RenderedStep>> {
    let live = self.live_steps(result);
    debug!(
      emitted = self.steps.len(),
      live = live.len(),
      "dead-code elimination"
    );

    let mut counters: IndexMap<&str, usize> = IndexMap::new();
    let mut positions: IndexMap<Placeholder, (usize, String)> = IndexMap::new();
    let mut rendered = Vec::with_capacity(live.len());

    for (position, step) in live.into_iter().enumerate() {
      let is_final = step.output == result;
      let name = if is_final {
        result_name.to_string()
      } else {
        let base = self.base_name(step.output);
        let counter = counters.entry(base).or_insert(0);
        *counter += 1;
        format!("{base}_{counter}")
      };

      let inputs = step
        .inputs
        .iter()
        .map(|input| match input {
          Operand::Slot(p) => match positions.get(p) {
            Some((index, target)) => Ok(RenderedInput::Ref {
              step: *index,
              name: target.clone(),
            }),
            None => Err(CompileError::internal(format!(
              "step `{name}` reads placeholder {} before it is defined",
              p.id()
            ))),
          },
          Operand::Literal(text) => Ok(RenderedInput::Text(text.clone())),
        })
        .collect::<CompileResult<Vec<_>>>()?;

      let comment = if !comments {
        None
      } else if is_final {
        Some(match &step.comment {
          Some(comment) => format!("{comment}; {FINAL_COMMENT}"),
          None => FINAL_COMMENT.to_string(),
        })
      } else {
        step.comment.clone()
      };

      positions.insert(step.output, (position, name.clone()));
      rendered.push(RenderedStep {
        name,
        primitive: step.primitive,
        inputs,
        comment,
        is_final,
      });
    }

    Ok(rendered)
  }
}

const FINAL_COMMENT: &str = "final composite operator";

/// An input of a rendered step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedInput {
  /// Output of the step at `step` in the rendered sequence.
  Ref { step: usize, name: String },
  Text(String),
}

impl fmt::Display for RenderedInput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RenderedInput::Ref { name, .. } => f.write_str(name),
      RenderedInput::Text(text) => f.write_str(text),
    }
  }
}

/// One line of compiler output: `name := primitive(inputs)  # comment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStep {
  pub name: String,
  pub primitive: Primitive,
  pub inputs: Vec<RenderedInput>,
  pub comment: Option<String>,
  /// Set on the step that produces the declared function.
  pub is_final: bool,
}

impl fmt::Display for RenderedStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} := {}(", self.name, self.primitive)?;
    for (i, input) in self.inputs.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{input}")?;
    }
    f.write_str(")")?;
    if let Some(comment) = &self.comment {
      write!(f, "  # {comment}")?;
    }
    Ok(())
  }
}
