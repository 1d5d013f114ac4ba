//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about calls or definitions. It recognises
//! words, quoted strings, decimal numbers and the handful of punctuators the
//! surface syntax uses. Whether a word is a boolean, a variable or the name of
//! a call is decided by the parser.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Ident,
  Int,
  Float,
  Str,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }
}

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let mut chars = input.char_indices().peekable();

  while let Some(&(i, c)) = chars.peek() {
    if c.is_whitespace() {
      chars.next();
      continue;
    }

    if c == '"' || c == '\'' {
      chars.next();
      let close = chars.find(|&(_, ch)| ch == c).map(|(j, _)| j);
      let Some(end) = close else {
        return Err(CompileError::at(input, i, "unterminated string literal"));
      };
      tokens.push(Token::new(TokenKind::Str, i, end + 1 - i));
      continue;
    }

    if is_word_char(c) {
      let start = i;
      let mut end = i;
      while let Some(&(j, ch)) = chars.peek()
        && is_word_char(ch)
      {
        end = j + ch.len_utf8();
        chars.next();
      }

      let word = &input[start..end];
      if !word.bytes().all(|b| b.is_ascii_digit()) {
        tokens.push(Token::new(TokenKind::Ident, start, end - start));
        continue;
      }

      // `digits.digits` is a float; a dot without trailing digits is left alone.
      let rest = &input[end..];
      let fraction = rest
        .strip_prefix('.')
        .map(|tail| tail.bytes().take_while(u8::is_ascii_digit).count())
        .unwrap_or(0);
      if fraction > 0 {
        let len = end - start + 1 + fraction;
        for _ in 0..=fraction {
          chars.next();
        }
        tokens.push(Token::new(TokenKind::Float, start, len));
      } else {
        tokens.push(Token::new(TokenKind::Int, start, end - start));
      }
      continue;
    }

    if input[i..].starts_with(":=") {
      tokens.push(Token::new(TokenKind::Punctuator, i, 2));
      chars.next();
      chars.next();
      continue;
    }

    if matches!(c, '(' | ')' | ',') {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1));
      chars.next();
      continue;
    }

    return Err(CompileError::at(input, i, format!("invalid token: '{c}'")));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0));
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}
