//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The lexer is a single forward pass with one character of lookahead (two
//! for the fractional-dot rule). Multi-character operators are matched
//! before single-character ones to avoid ambiguity. Errors are reported and
//! scanning continues, so one run surfaces every lexical problem at once.

use crate::error::Reporter;
use std::fmt;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  // Punctuation
  LParen,
  RParen,
  LBrace,
  RBrace,
  LBracket,
  RBracket,
  Comma,
  Colon,
  // Arithmetic
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  // Compound assignment
  PlusEq,
  MinusEq,
  StarEq,
  SlashEq,
  PercentEq,
  // Increment / decrement
  PlusPlus,
  MinusMinus,
  // Comparison
  EqEq,
  BangEq,
  Lt,
  Gt,
  LtEq,
  GtEq,
  // Logical
  AmpAmp,
  PipePipe,
  Bang,
  // Bitwise
  Amp,
  Pipe,
  Caret,
  Tilde,
  Shl,
  Shr,
  // Assignment
  Eq,
  // Literals
  Number,
  Str,
  InterpStr,
  Identifier,
  // Keywords
  Fr,
  Say,
  Lowkey,
  Midkey,
  Highkey,
  Goon,
  Edge,
  Vibe,
  Send,
  Ongod,
  Cap,
  Nah,
  Mog,
  Skip,
  Simp,
  Stan,
  Ghost,
  Yeet,
  Caught,
  // Special
  Eof,
  Invalid,
}

impl TokenKind {
  /// Uppercase tag used by the `--tokens` dump.
  pub fn name(self) -> &'static str {
    match self {
      TokenKind::LParen => "LPAREN",
      TokenKind::RParen => "RPAREN",
      TokenKind::LBrace => "LBRACE",
      TokenKind::RBrace => "RBRACE",
      TokenKind::LBracket => "LBRACKET",
      TokenKind::RBracket => "RBRACKET",
      TokenKind::Comma => "COMMA",
      TokenKind::Colon => "COLON",
      TokenKind::Plus => "PLUS",
      TokenKind::Minus => "MINUS",
      TokenKind::Star => "STAR",
      TokenKind::Slash => "SLASH",
      TokenKind::Percent => "PERCENT",
      TokenKind::PlusEq => "PLUS_EQ",
      TokenKind::MinusEq => "MINUS_EQ",
      TokenKind::StarEq => "STAR_EQ",
      TokenKind::SlashEq => "SLASH_EQ",
      TokenKind::PercentEq => "PERCENT_EQ",
      TokenKind::PlusPlus => "PLUS_PLUS",
      TokenKind::MinusMinus => "MINUS_MINUS",
      TokenKind::EqEq => "EQ",
      TokenKind::BangEq => "NEQ",
      TokenKind::Lt => "LT",
      TokenKind::Gt => "GT",
      TokenKind::LtEq => "LEQ",
      TokenKind::GtEq => "GEQ",
      TokenKind::AmpAmp => "AND",
      TokenKind::PipePipe => "OR",
      TokenKind::Bang => "NOT",
      TokenKind::Amp => "BIT_AND",
      TokenKind::Pipe => "BIT_OR",
      TokenKind::Caret => "BIT_XOR",
      TokenKind::Tilde => "BIT_NOT",
      TokenKind::Shl => "LSHIFT",
      TokenKind::Shr => "RSHIFT",
      TokenKind::Eq => "ASSIGN",
      TokenKind::Number => "NUMBER",
      TokenKind::Str => "STRING",
      TokenKind::InterpStr => "INTERP_STRING",
      TokenKind::Identifier => "IDENTIFIER",
      TokenKind::Fr => "FR",
      TokenKind::Say => "SAY",
      TokenKind::Lowkey => "LOWKEY",
      TokenKind::Midkey => "MIDKEY",
      TokenKind::Highkey => "HIGHKEY",
      TokenKind::Goon => "GOON",
      TokenKind::Edge => "EDGE",
      TokenKind::Vibe => "VIBE",
      TokenKind::Send => "SEND",
      TokenKind::Ongod => "ONGOD",
      TokenKind::Cap => "CAP",
      TokenKind::Nah => "NAH",
      TokenKind::Mog => "MOG",
      TokenKind::Skip => "SKIP",
      TokenKind::Simp => "SIMP",
      TokenKind::Stan => "STAN",
      TokenKind::Ghost => "GHOST",
      TokenKind::Yeet => "YEET",
      TokenKind::Caught => "CAUGHT",
      TokenKind::Eof => "EOF",
      TokenKind::Invalid => "INVALID",
    }
  }
}

/// Decoded literal payload. Integer literals keep `i64` precision until
/// code generation converts them; fractional literals go straight to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  Int(i64),
  Float(f64),
  Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub literal: Option<Literal>,
  pub line: u32,
}

impl Token {
  pub fn new(
    kind: TokenKind,
    lexeme: impl Into<String>,
    literal: Option<Literal>,
    line: u32,
  ) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      literal,
      line,
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{} '{}' L{}", self.kind.name(), self.lexeme, self.line)?;
    match &self.literal {
      Some(Literal::Int(v)) => write!(f, " = {v}")?,
      Some(Literal::Float(v)) => write!(f, " = {v}")?,
      Some(Literal::Str(s)) => write!(f, " = \"{s}\"")?,
      None => {}
    }
    write!(f, "]")
  }
}

/// Map reserved words to their token kinds.
fn keyword(text: &str) -> Option<TokenKind> {
  let kind = match text {
    "fr" => TokenKind::Fr,
    "say" => TokenKind::Say,
    "lowkey" => TokenKind::Lowkey,
    "midkey" => TokenKind::Midkey,
    "highkey" => TokenKind::Highkey,
    "goon" => TokenKind::Goon,
    "edge" => TokenKind::Edge,
    "vibe" => TokenKind::Vibe,
    "send" => TokenKind::Send,
    "ongod" => TokenKind::Ongod,
    "cap" => TokenKind::Cap,
    "nah" => TokenKind::Nah,
    "mog" => TokenKind::Mog,
    "skip" => TokenKind::Skip,
    "simp" => TokenKind::Simp,
    "stan" => TokenKind::Stan,
    "ghost" => TokenKind::Ghost,
    "yeet" => TokenKind::Yeet,
    "caught" => TokenKind::Caught,
    _ => return None,
  };
  Some(kind)
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(source: &str, reporter: &mut Reporter) -> Vec<Token> {
  let mut scanner = Scanner::new(source, reporter);
  while !scanner.is_at_end() {
    scanner.start = scanner.current;
    scanner.start_line = scanner.line;
    scanner.scan_token();
  }
  scanner
    .tokens
    .push(Token::new(TokenKind::Eof, "", None, scanner.line));
  scanner.tokens
}

struct Scanner<'a> {
  source: &'a [u8],
  text: &'a str,
  tokens: Vec<Token>,
  start: usize,
  current: usize,
  line: u32,
  start_line: u32,
  reporter: &'a mut Reporter,
}

impl<'a> Scanner<'a> {
  fn new(source: &'a str, reporter: &'a mut Reporter) -> Self {
    Self {
      source: source.as_bytes(),
      text: source,
      tokens: Vec::new(),
      start: 0,
      current: 0,
      line: 1,
      start_line: 1,
      reporter,
    }
  }

  fn scan_token(&mut self) {
    let c = self.advance();
    match c {
      b'(' => self.add_token(TokenKind::LParen),
      b')' => self.add_token(TokenKind::RParen),
      b'{' => self.add_token(TokenKind::LBrace),
      b'}' => self.add_token(TokenKind::RBrace),
      b'[' => self.add_token(TokenKind::LBracket),
      b']' => self.add_token(TokenKind::RBracket),
      b',' => self.add_token(TokenKind::Comma),
      b':' => self.add_token(TokenKind::Colon),
      b'~' => self.add_token(TokenKind::Tilde),
      b'^' => self.add_token(TokenKind::Caret),
      b'+' => {
        let kind = if self.matches(b'=') {
          TokenKind::PlusEq
        } else if self.matches(b'+') {
          TokenKind::PlusPlus
        } else {
          TokenKind::Plus
        };
        self.add_token(kind);
      }
      b'-' => {
        let kind = if self.matches(b'=') {
          TokenKind::MinusEq
        } else if self.matches(b'-') {
          TokenKind::MinusMinus
        } else {
          TokenKind::Minus
        };
        self.add_token(kind);
      }
      b'*' => {
        let kind = if self.matches(b'=') {
          TokenKind::StarEq
        } else {
          TokenKind::Star
        };
        self.add_token(kind);
      }
      b'/' => {
        let kind = if self.matches(b'=') {
          TokenKind::SlashEq
        } else {
          TokenKind::Slash
        };
        self.add_token(kind);
      }
      b'%' => {
        let kind = if self.matches(b'=') {
          TokenKind::PercentEq
        } else {
          TokenKind::Percent
        };
        self.add_token(kind);
      }
      b'!' => {
        let kind = if self.matches(b'=') {
          TokenKind::BangEq
        } else {
          TokenKind::Bang
        };
        self.add_token(kind);
      }
      b'=' => {
        let kind = if self.matches(b'=') {
          TokenKind::EqEq
        } else {
          TokenKind::Eq
        };
        self.add_token(kind);
      }
      b'<' => {
        let kind = if self.matches(b'=') {
          TokenKind::LtEq
        } else if self.matches(b'<') {
          TokenKind::Shl
        } else {
          TokenKind::Lt
        };
        self.add_token(kind);
      }
      b'>' => {
        let kind = if self.matches(b'=') {
          TokenKind::GtEq
        } else if self.matches(b'>') {
          TokenKind::Shr
        } else {
          TokenKind::Gt
        };
        self.add_token(kind);
      }
      b'&' => {
        let kind = if self.matches(b'&') {
          TokenKind::AmpAmp
        } else {
          TokenKind::Amp
        };
        self.add_token(kind);
      }
      b'|' => {
        let kind = if self.matches(b'|') {
          TokenKind::PipePipe
        } else {
          TokenKind::Pipe
        };
        self.add_token(kind);
      }
      b'#' => self.skip_comment(),
      b' ' | b'\r' | b'\t' => {}
      b'\n' => self.line += 1,
      b'"' => self.scan_string(),
      _ => {
        if c.is_ascii_digit() {
          self.scan_number();
        } else if is_ident_start(c) {
          self.scan_identifier();
        } else {
          let shown = self.text[self.start..].chars().next().unwrap_or('\0');
          // Swallow the whole character so multi-byte input stays aligned.
          self.current = self.start + shown.len_utf8();
          self
            .reporter
            .lexer_error(self.line, format!("Unexpected character: '{shown}'"));
          // Keep a placeholder so downstream consumers see the gap.
          self.add_token(TokenKind::Invalid);
        }
      }
    }
  }

  fn is_at_end(&self) -> bool {
    self.current >= self.source.len()
  }

  fn advance(&mut self) -> u8 {
    let c = self.source[self.current];
    self.current += 1;
    c
  }

  fn peek(&self) -> u8 {
    if self.is_at_end() {
      return 0;
    }
    self.source[self.current]
  }

  fn peek_next(&self) -> u8 {
    if self.current + 1 >= self.source.len() {
      return 0;
    }
    self.source[self.current + 1]
  }

  fn matches(&mut self, expected: u8) -> bool {
    if self.is_at_end() || self.source[self.current] != expected {
      return false;
    }
    self.current += 1;
    true
  }

  fn add_token(&mut self, kind: TokenKind) {
    self.add_literal_token(kind, None);
  }

  fn add_literal_token(&mut self, kind: TokenKind, literal: Option<Literal>) {
    let lexeme = &self.text[self.start..self.current];
    self
      .tokens
      .push(Token::new(kind, lexeme, literal, self.start_line));
  }

  fn scan_string(&mut self) {
    // Multi-line strings are allowed; the line counter keeps up.
    while self.peek() != b'"' && !self.is_at_end() {
      if self.peek() == b'\n' {
        self.line += 1;
      }
      self.current += 1;
    }

    if self.is_at_end() {
      self
        .reporter
        .lexer_error(self.line, "Unterminated string literal");
      return;
    }

    // Consume the closing quote.
    self.current += 1;

    // Escape sequences are kept verbatim; only the quotes are stripped.
    let value = self.text[self.start + 1..self.current - 1].to_string();
    let kind = if has_interpolation(&value) {
      TokenKind::InterpStr
    } else {
      TokenKind::Str
    };
    self.add_literal_token(kind, Some(Literal::Str(value)));
  }

  fn scan_number(&mut self) {
    while self.peek().is_ascii_digit() {
      self.current += 1;
    }

    let mut is_float = false;
    if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
      is_float = true;
      self.current += 1;
      while self.peek().is_ascii_digit() {
        self.current += 1;
      }
    }

    let text = &self.text[self.start..self.current];
    if is_float {
      match text.parse::<f64>() {
        Ok(value) => self.add_literal_token(TokenKind::Number, Some(Literal::Float(value))),
        Err(_) => {
          self.reporter.lexer_error(self.line, "Invalid number format");
          self.add_token(TokenKind::Invalid);
        }
      }
    } else {
      match text.parse::<i64>() {
        Ok(value) => self.add_literal_token(TokenKind::Number, Some(Literal::Int(value))),
        Err(_) => {
          self.reporter.lexer_error(self.line, "Invalid number format");
          self.add_token(TokenKind::Invalid);
        }
      }
    }
  }

  fn scan_identifier(&mut self) {
    while is_ident_continue(self.peek()) {
      self.current += 1;
    }

    let text = &self.text[self.start..self.current];
    match keyword(text) {
      Some(kind) => self.add_token(kind),
      None => self.add_token(TokenKind::Identifier),
    }
  }

  fn skip_comment(&mut self) {
    while self.peek() != b'\n' && !self.is_at_end() {
      self.current += 1;
    }
  }
}

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
  is_ident_start(c) || c.is_ascii_digit()
}

/// A string literal with a `{` later followed by `}` is interpolated.
fn has_interpolation(content: &str) -> bool {
  match content.find('{') {
    Some(open) => content[open..].contains('}'),
    None => false,
  }
}
