//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and composable:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the expression AST.
//! - `compiler` lowers the AST into operator-card steps, currying static
//!   arguments and composing input-dependent ones with `pipe`/`pipe2`.
//! - `ledger` records emitted steps, removes dead ones and names the rest.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod compiler;
pub mod config;
pub mod error;
pub mod ledger;
pub mod parser;
pub mod tokenizer;

pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult, Limitation};
pub use ledger::{Primitive, RenderedInput, RenderedStep};
pub use parser::{AstNode, Definition, Number, parse, parse_definition};

/// Compile a `name(in) := expression` definition with the default settings.
pub fn compile(source: &str) -> CompileResult<Vec<RenderedStep>> {
  Compiler::default().compile(source)
}
