//! Lowering of the expression AST into point-free operator steps.
//!
//! Two passes call into each other. Operator compilation turns a subtree that
//! reads `in` into a placeholder for a composed operator; value compilation
//! turns an input-independent subtree into a compile-time value. Static
//! arguments of a call are curried into the call's operator card one at a
//! time, and the remaining input-dependent arguments are wired in with `pipe`
//! or `pipe2`.
//!
//! Before either pass runs, the body is annotated once: every node gets a
//! structural key (equal for structurally equal subtrees) and its input
//! dependence. Both passes are memoized on that key, in separate tables, so a
//! repeated subexpression compiles to a single step.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, Limitation};
use crate::ledger::{Ledger, Operand, Placeholder, Primitive, RenderedStep};
use crate::parser::{AstNode, INPUT, Number, parse_definition};

/// A node's structure with its children replaced by their keys.
#[derive(Debug, PartialEq, Eq, Hash)]
enum Shape {
  Call(String, Vec<u32>),
  Var(String),
  Str(String),
  Int(String),
  Float(u64),
  Bool(bool),
}

/// Parsed node annotated for compilation.
#[derive(Debug)]
struct Node<'a> {
  ast: &'a AstNode,
  key: u32,
  dynamic: bool,
  args: Vec<Node<'a>>,
}

/// Reusable compiler. Every [`Compiler::compile`] call starts from a clean
/// ledger and empty memo tables; only the configuration carries over.
#[derive(Debug, Default)]
pub struct Compiler {
  config: CompilerConfig,
  ledger: Ledger,
  shapes: HashMap<Shape, u32>,
  /// `op_by_name` lookups, keyed by card name.
  cards: IndexMap<String, Placeholder>,
  operators: HashMap<u32, Placeholder>,
  values: HashMap<u32, Operand>,
}

impl Compiler {
  pub fn new(config: CompilerConfig) -> Self {
    Self {
      config,
      ..Self::default()
    }
  }

  /// Compile a `name(in) := expression` definition into rendered steps.
  pub fn compile(&mut self, source: &str) -> CompileResult<Vec<RenderedStep>> {
    self.reset();

    let definition = parse_definition(source)?;
    debug!(name = %definition.name, "compiling definition");

    let body = self.annotate(&definition.body);
    let result = self.compile_body(&body)?;
    let steps = self
      .ledger
      .render(result, &definition.name, self.config.comments)?;
    debug!(name = %definition.name, steps = steps.len(), "compiled definition");
    Ok(steps)
  }

  fn reset(&mut self) {
    self.ledger.clear();
    self.shapes.clear();
    self.cards.clear();
    self.operators.clear();
    self.values.clear();
  }

  fn annotate<'a>(&mut self, ast: &'a AstNode) -> Node<'a> {
    let (shape, dynamic, args) = match ast {
      AstNode::Call { op, args } => {
        let args: Vec<Node<'a>> = args.iter().map(|arg| self.annotate(arg)).collect();
        let keys = args.iter().map(|arg| arg.key).collect();
        let dynamic = args.iter().any(|arg| arg.dynamic);
        (Shape::Call(op.clone(), keys), dynamic, args)
      }
      AstNode::Var { name } => (Shape::Var(name.clone()), name == INPUT, Vec::new()),
      AstNode::Str { value } => (Shape::Str(value.clone()), false, Vec::new()),
      AstNode::Num {
        value: Number::Int(digits),
      } => (Shape::Int(digits.clone()), false, Vec::new()),
      AstNode::Num {
        value: Number::Float(value),
      } => (Shape::Float(value.to_bits()), false, Vec::new()),
      AstNode::Bool { value } => (Shape::Bool(*value), false, Vec::new()),
    };

    let next = self.shapes.len() as u32;
    let key = *self.shapes.entry(shape).or_insert(next);
    Node {
      ast,
      key,
      dynamic,
      args,
    }
  }

  /// The definition body becomes an operator even when it ignores the input.
  fn compile_body(&mut self, body: &Node) -> CompileResult<Placeholder> {
    if body.dynamic {
      return self.compile_operator(body);
    }

    let (card, value) = match body.ast {
      AstNode::Call { op, .. } => {
        // Currying runs before the constant is built, so its lookups come first.
        self.curry(op, &body.args)?;
        let card = self.constant_card();
        (card, self.compile_value(body)?)
      }
      _ => {
        let value = self.compile_value(body)?;
        (self.constant_card(), value)
      }
    };

    let base = match body.ast {
      AstNode::Var { name } => format!("op_const_{name}"),
      _ => "op_const".to_string(),
    };
    Ok(self.ledger.emit(
      &base,
      Primitive::Apply,
      vec![card.into(), value],
      Some(format!("operator that always returns {}", body.ast)),
    ))
  }

  fn op_card(&mut self, name: &str) -> Placeholder {
    if let Some(&card) = self.cards.get(name) {
      return card;
    }
    let card = self.ledger.emit(
      &format!("op_{name}"),
      Primitive::OpByName,
      vec![Operand::Literal(format!("{name:?}"))],
      None,
    );
    self.cards.insert(name.to_string(), card);
    card
  }

  fn identity_card(&mut self) -> Placeholder {
    let name = self.config.identity_card.clone();
    self.op_card(&name)
  }

  fn constant_card(&mut self) -> Placeholder {
    let name = self.config.constant_card.clone();
    self.op_card(&name)
  }

  fn is_identity(&self, op: Placeholder) -> bool {
    self.cards.get(&self.config.identity_card) == Some(&op)
  }

  fn compile_operator(&mut self, node: &Node) -> CompileResult<Placeholder> {
    if let Some(&op) = self.operators.get(&node.key) {
      debug!(key = node.key, "operator memo hit");
      return Ok(op);
    }

    if !node.dynamic {
      return Err(CompileError::internal(format!(
        "operator compilation reached input-independent node `{}`",
        node.ast
      )));
    }

    let op = match node.ast {
      // The only dynamic variable is the input itself.
      AstNode::Var { .. } => self.identity_card(),
      AstNode::Call { op, .. } => self.compile_call(op, &node.args)?,
      AstNode::Str { .. } | AstNode::Num { .. } | AstNode::Bool { .. } => {
        return Err(CompileError::internal(format!(
          "literal `{}` classified as input-dependent",
          node.ast
        )));
      }
    };

    self.operators.insert(node.key, op);
    Ok(op)
  }

  fn compile_call(&mut self, op: &str, args: &[Node]) -> CompileResult<Placeholder> {
    let curried = self.curry(op, args)?;

    // Collected in argument order, so pipe2 receives its inputs positionally.
    let dynamic: Vec<&Node> = args.iter().filter(|arg| arg.dynamic).collect();

    match dynamic.as_slice() {
      [] => Err(CompileError::internal(format!(
        "call to '{op}' has no input-dependent argument"
      ))),
      [only] => {
        let inner = self.compile_operator(only)?;
        if self.is_identity(inner) {
          return Ok(curried);
        }
        Ok(self.ledger.emit(
          "piped",
          Primitive::Pipe,
          vec![inner.into(), curried.into()],
          None,
        ))
      }
      [first, second] => {
        let first = self.compile_operator(first)?;
        let second = self.compile_operator(second)?;
        Ok(self.ledger.emit(
          "pipe2",
          Primitive::Pipe2,
          vec![first.into(), second.into(), curried.into()],
          None,
        ))
      }
      more => Err(CompileError::capability(
        op,
        Limitation::DynamicArity { count: more.len() },
      )),
    }
  }

  /// Fold the static arguments of `op(args)` into its card, lowest index first.
  fn curry(&mut self, op: &str, args: &[Node]) -> CompileResult<Placeholder> {
    let mut curried = self.op_card(op);
    let mut pending: Vec<usize> = (0..args.len()).collect();

    for (index, arg) in args.iter().enumerate() {
      if arg.dynamic {
        continue;
      }

      let value = self.compile_value(arg)?;
      let position = pending
        .iter()
        .position(|&slot| slot == index)
        .ok_or_else(|| {
          CompileError::internal(format!("argument {index} of '{op}' is already bound"))
        })?;

      let target = match position {
        0 => curried,
        1 => self
          .ledger
          .emit("flipped", Primitive::Flip, vec![curried.into()], None),
        _ => {
          return Err(CompileError::capability(
            op,
            Limitation::FlipDistance { index, position },
          ));
        }
      };

      curried = self.ledger.emit(
        "curried",
        Primitive::Apply,
        vec![target.into(), value],
        Some(format!("curry '{op}': bind argument {index} to {}", arg.ast)),
      );
      pending.remove(position);
    }

    Ok(curried)
  }

  fn compile_value(&mut self, node: &Node) -> CompileResult<Operand> {
    if let Some(value) = self.values.get(&node.key) {
      debug!(key = node.key, "value memo hit");
      return Ok(value.clone());
    }

    if node.dynamic {
      return Err(CompileError::internal(format!(
        "value compilation reached input-dependent node `{}`",
        node.ast
      )));
    }

    let value = match node.ast {
      AstNode::Var { name } => Operand::Literal(name.clone()),
      AstNode::Str { value } => self.literal(
        "str_lit",
        Primitive::String,
        format!("{value:?}"),
        "static string card",
      ),
      AstNode::Num {
        value: Number::Int(digits),
      } => self.literal(
        "int_lit",
        Primitive::Integer,
        digits.clone(),
        "static integer card",
      ),
      AstNode::Num {
        value: Number::Float(value),
      } => self.literal(
        "float_lit",
        Primitive::Double,
        format!("{value:?}"),
        "static double card",
      ),
      AstNode::Bool { value } => self.literal(
        "bool_lit",
        Primitive::Boolean,
        value.to_string(),
        "static boolean card",
      ),
      AstNode::Call { op, .. } => {
        let count = node.args.len();
        let Some(primitive) = Primitive::apply_n(count) else {
          return Err(CompileError::capability(
            op,
            Limitation::StaticArity { count },
          ));
        };

        let mut arg_values = Vec::with_capacity(count);
        for arg in &node.args {
          arg_values.push(self.compile_value(arg)?);
        }

        let mut inputs: Vec<Operand> = Vec::with_capacity(count + 1);
        inputs.push(self.op_card(op).into());
        inputs.extend(arg_values);
        self
          .ledger
          .emit(&format!("{op}_val"), primitive, inputs, None)
          .into()
      }
    };

    self.values.insert(node.key, value.clone());
    Ok(value)
  }

  fn literal(&mut self, base: &str, primitive: Primitive, text: String, comment: &str) -> Operand {
    self
      .ledger
      .emit(
        base,
        primitive,
        vec![Operand::Literal(text)],
        Some(comment.to_string()),
      )
      .into()
  }
}
