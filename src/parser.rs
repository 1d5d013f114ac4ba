//! Recursive-descent parser producing the expression AST.
//!
//! The grammar is tiny: an expression is a call `name(args)`, a bare
//! identifier, a quoted string, a decimal number or a boolean. A definition
//! wraps one expression as `name(in) := expression`.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text, tokenize};

/// Name of the single input parameter every definition is parameterised over.
pub const INPUT: &str = "in";

/// Numeric literal payload. Integers keep their digits, so any length is
/// accepted; leading zeros are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
  Int(String),
  Float(f64),
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
  Call { op: String, args: Vec<AstNode> },
  Var { name: String },
  Str { value: String },
  Num { value: Number },
  Bool { value: bool },
}

impl AstNode {
  pub fn call(op: impl Into<String>, args: Vec<AstNode>) -> Self {
    Self::Call {
      op: op.into(),
      args,
    }
  }

  pub fn var(name: impl Into<String>) -> Self {
    Self::Var { name: name.into() }
  }

  pub fn string(value: impl Into<String>) -> Self {
    Self::Str {
      value: value.into(),
    }
  }

  pub fn int(digits: impl Into<String>) -> Self {
    Self::Num {
      value: Number::Int(digits.into()),
    }
  }

  pub fn float(value: f64) -> Self {
    Self::Num {
      value: Number::Float(value),
    }
  }

  pub fn boolean(value: bool) -> Self {
    Self::Bool { value }
  }
}

impl fmt::Display for Number {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Number::Int(digits) => f.write_str(digits),
      // Debug keeps the fraction so `3.0` never collides with `3`.
      Number::Float(value) => write!(f, "{value:?}"),
    }
  }
}

impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AstNode::Call { op, args } => {
        write!(f, "{op}(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{arg}")?;
        }
        f.write_str(")")
      }
      AstNode::Var { name } => f.write_str(name),
      AstNode::Str { value } => write!(f, "{value:?}"),
      AstNode::Num { value } => write!(f, "{value}"),
      AstNode::Bool { value } => write!(f, "{value}"),
    }
  }
}

/// A parsed `name(in) := body` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
  pub name: String,
  pub body: AstNode,
}

/// Parse a single expression.
pub fn parse(source: &str) -> CompileResult<AstNode> {
  let tokens = tokenize(source)?;
  let mut stream = TokenStream::new(tokens, source);

  if stream.is_eof() {
    return Err(CompileError::at(source, 0, "expression is empty"));
  }

  let node = parse_expr(&mut stream)?;
  stream.expect_eof()?;
  Ok(node)
}

/// Parse a whole `name(in) := expression` definition.
pub fn parse_definition(source: &str) -> CompileResult<Definition> {
  let tokens = tokenize(source)?;
  let mut stream = TokenStream::new(tokens, source);

  if stream.is_eof() {
    return Err(CompileError::at(source, 0, "program is empty"));
  }

  let (name, _) = stream.get_ident()?;
  stream.skip("(")?;
  let (param, loc) = stream.get_ident()?;
  if param != INPUT {
    return Err(CompileError::at(
      source,
      loc,
      format!("parameter must be named '{INPUT}', but got '{param}'"),
    ));
  }
  stream.skip(")")?;
  stream.skip(":=")?;

  let body = parse_expr(&mut stream)?;
  stream.expect_eof()?;

  Ok(Definition {
    name: name.to_string(),
    body,
  })
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let Some(token) = stream.peek().cloned() else {
    return Err(stream.error_here("expected an expression"));
  };
  let text = token_text(&token, stream.source);

  match token.kind {
    TokenKind::Str => {
      stream.pos += 1;
      Ok(AstNode::string(&text[1..text.len() - 1]))
    }
    TokenKind::Int => {
      stream.pos += 1;
      let digits = text.trim_start_matches('0');
      Ok(AstNode::int(if digits.is_empty() { "0" } else { digits }))
    }
    TokenKind::Float => {
      stream.pos += 1;
      let value = text.parse::<f64>().map_err(|err| {
        CompileError::at(stream.source, token.loc, format!("invalid number: {err}"))
      })?;
      Ok(AstNode::float(value))
    }
    TokenKind::Ident => {
      stream.pos += 1;
      if stream.equal("(") {
        let args = parse_args(stream)?;
        return Ok(AstNode::call(text, args));
      }
      if text.eq_ignore_ascii_case("true") {
        return Ok(AstNode::boolean(true));
      }
      if text.eq_ignore_ascii_case("false") {
        return Ok(AstNode::boolean(false));
      }
      Ok(AstNode::var(text))
    }
    TokenKind::Punctuator | TokenKind::Eof => {
      let got = describe_token(Some(&token), stream.source);
      Err(CompileError::at(
        stream.source,
        token.loc,
        format!("expected an expression, but got \"{got}\""),
      ))
    }
  }
}

/// Arguments after the opening parenthesis, up to and including the closing one.
fn parse_args(stream: &mut TokenStream) -> CompileResult<Vec<AstNode>> {
  let mut args = Vec::new();
  if stream.equal(")") {
    return Ok(args);
  }

  loop {
    args.push(parse_expr(stream)?);
    if stream.equal(",") {
      continue;
    }
    stream.skip(")")?;
    return Ok(args);
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn error_here(&self, message: impl Into<String>) -> CompileError {
    let loc = self.peek().map_or(self.source.len(), |token| token.loc);
    CompileError::at(self.source, loc, message)
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Punctuator
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let got = describe_token(self.peek(), self.source);
      Err(self.error_here(format!("expected \"{s}\", but got \"{got}\"")))
    }
  }

  /// Consume an identifier, returning its text and location.
  fn get_ident(&mut self) -> CompileResult<(&'a str, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let loc = token.loc;
      let text = token_text(token, self.source);
      self.pos += 1;
      return Ok((text, loc));
    }

    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("expected an identifier, but got \"{got}\"")))
  }

  fn expect_eof(&self) -> CompileResult<()> {
    if self.is_eof() {
      return Ok(());
    }
    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("unexpected token \"{got}\"")))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}
