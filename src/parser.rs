//! Recursive-descent parser producing the statement-list AST.
//!
//! Statements descend through dedicated helpers; expressions climb the usual
//! precedence ladder. Errors raise a [`ParseError`] marker that unwinds to
//! the statement loop, which then synchronizes on the next statement keyword
//! so a single run can report several problems.

use crate::ast::{Expr, LiteralValue, Stmt, SwitchCase};
use crate::error::Reporter;
use crate::tokenizer::{Literal, Token, TokenKind};

const MAX_CALL_ARGS: usize = 255;
const MAX_PARAMS: usize = 255;

/// Panic-mode marker. The diagnostic itself is already on the reporter.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

/// Parse a token stream into a sequence of top-level statements.
pub fn parse(tokens: Vec<Token>, reporter: &mut Reporter) -> Vec<Stmt> {
  let mut parser = Parser {
    tokens,
    current: 0,
    reporter,
  };
  parser.parse_program()
}

struct Parser<'a> {
  tokens: Vec<Token>,
  current: usize,
  reporter: &'a mut Reporter,
}

impl<'a> Parser<'a> {
  fn parse_program(&mut self) -> Vec<Stmt> {
    let mut statements = Vec::new();
    while !self.is_at_end() {
      match self.declaration() {
        Ok(stmt) => statements.push(stmt),
        Err(ParseError) => self.synchronize(),
      }
    }
    statements
  }

  // ----- Statements -----

  fn declaration(&mut self) -> PResult<Stmt> {
    if self.matches(TokenKind::Fr) {
      return self.var_declaration();
    }
    if self.matches(TokenKind::Vibe) {
      return self.func_definition();
    }
    self.statement()
  }

  fn statement(&mut self) -> PResult<Stmt> {
    if self.matches(TokenKind::Say) {
      return self.print_statement();
    }
    if self.matches(TokenKind::Lowkey) {
      return self.if_statement();
    }
    if self.matches(TokenKind::Goon) {
      return self.while_statement();
    }
    if self.matches(TokenKind::Edge) {
      return self.for_statement();
    }
    if self.matches(TokenKind::Send) {
      return self.return_statement();
    }
    if self.matches(TokenKind::Mog) {
      let keyword = self.previous().clone();
      return Ok(Stmt::Break { keyword });
    }
    if self.matches(TokenKind::Skip) {
      let keyword = self.previous().clone();
      return Ok(Stmt::Continue { keyword });
    }
    if self.matches(TokenKind::Simp) {
      return self.switch_statement();
    }
    if self.matches(TokenKind::Yeet) {
      return self.try_catch_statement();
    }
    if self.matches(TokenKind::LBrace) {
      return self.block();
    }
    self.expression_statement()
  }

  // fr name = expression
  fn var_declaration(&mut self) -> PResult<Stmt> {
    let name = self.consume(TokenKind::Identifier, "Expected variable name after 'fr'.")?;
    self.consume(TokenKind::Eq, "Expected '=' after variable name.")?;
    let initializer = self.expression()?;
    Ok(Stmt::VarDecl { name, initializer })
  }

  fn print_statement(&mut self) -> PResult<Stmt> {
    let expr = self.expression()?;
    Ok(Stmt::Print { expr })
  }

  // lowkey (cond) block (midkey (cond) block)* (highkey block)?
  //
  // `midkey` chains are lowered into nested If nodes, so the rest of the
  // pipeline only ever sees plain two-way conditionals.
  fn if_statement(&mut self) -> PResult<Stmt> {
    let kw = self.previous().lexeme.clone();
    self.consume(TokenKind::LParen, &format!("Expected '(' after '{kw}'."))?;
    let condition = self.expression()?;
    self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
    self.consume(TokenKind::LBrace, &format!("Expected '{{' before '{kw}' body."))?;
    let then_branch = Box::new(self.block()?);

    let else_branch = if self.matches(TokenKind::Midkey) {
      Some(Box::new(self.if_statement()?))
    } else if self.matches(TokenKind::Highkey) {
      self.consume(TokenKind::LBrace, "Expected '{' before 'highkey' body.")?;
      Some(Box::new(self.block()?))
    } else {
      None
    };

    Ok(Stmt::If {
      condition,
      then_branch,
      else_branch,
    })
  }

  // goon (cond) block
  fn while_statement(&mut self) -> PResult<Stmt> {
    self.consume(TokenKind::LParen, "Expected '(' after 'goon'.")?;
    let condition = self.expression()?;
    self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
    self.consume(TokenKind::LBrace, "Expected '{' before 'goon' body.")?;
    let body = Box::new(self.block()?);
    Ok(Stmt::While { condition, body })
  }

  // edge (init, cond, incr) block -- any clause may be empty
  fn for_statement(&mut self) -> PResult<Stmt> {
    self.consume(TokenKind::LParen, "Expected '(' after 'edge'.")?;

    let initializer = if self.matches(TokenKind::Fr) {
      Some(Box::new(self.var_declaration()?))
    } else if !self.check(TokenKind::Comma) {
      Some(Box::new(self.expression_statement()?))
    } else {
      None
    };
    self.consume(TokenKind::Comma, "Expected ',' after loop initializer.")?;

    let condition = if !self.check(TokenKind::Comma) {
      Some(self.expression()?)
    } else {
      None
    };
    self.consume(TokenKind::Comma, "Expected ',' after loop condition.")?;

    let increment = if !self.check(TokenKind::RParen) {
      Some(self.expression()?)
    } else {
      None
    };
    self.consume(TokenKind::RParen, "Expected ')' after 'edge' clauses.")?;

    self.consume(TokenKind::LBrace, "Expected '{' before 'edge' body.")?;
    let body = Box::new(self.block()?);

    Ok(Stmt::For {
      initializer,
      condition,
      increment,
      body,
    })
  }

  // vibe name(params) block
  fn func_definition(&mut self) -> PResult<Stmt> {
    let name = self.consume(TokenKind::Identifier, "Expected function name after 'vibe'.")?;
    self.consume(TokenKind::LParen, "Expected '(' after function name.")?;

    let mut params = Vec::new();
    if !self.check(TokenKind::RParen) {
      loop {
        if params.len() >= MAX_PARAMS {
          // Diagnostic only; parsing keeps going.
          let token = self.peek().clone();
          self.error_at(&token, "Cannot have more than 255 parameters.");
        }
        params.push(self.consume(TokenKind::Identifier, "Expected parameter name.")?);
        if !self.matches(TokenKind::Comma) {
          break;
        }
      }
    }
    self.consume(TokenKind::RParen, "Expected ')' after parameters.")?;

    self.consume(TokenKind::LBrace, "Expected '{' before function body.")?;
    let mut body = Vec::new();
    while !self.check(TokenKind::RBrace) && !self.is_at_end() {
      body.push(self.declaration()?);
    }
    self.consume(TokenKind::RBrace, "Expected '}' after function body.")?;

    Ok(Stmt::FuncDef { name, params, body })
  }

  // send [expression]
  fn return_statement(&mut self) -> PResult<Stmt> {
    let keyword = self.previous().clone();
    let value = if !self.check(TokenKind::RBrace) && !self.is_at_end() {
      Some(self.expression()?)
    } else {
      None
    };
    Ok(Stmt::Return { keyword, value })
  }

  // simp (expr) { (stan expr: block | ghost: block)* }
  fn switch_statement(&mut self) -> PResult<Stmt> {
    self.consume(TokenKind::LParen, "Expected '(' after 'simp'.")?;
    let expr = self.expression()?;
    self.consume(TokenKind::RParen, "Expected ')' after 'simp' expression.")?;
    self.consume(TokenKind::LBrace, "Expected '{' before 'simp' body.")?;

    let mut cases = Vec::new();
    while !self.check(TokenKind::RBrace) && !self.is_at_end() {
      if self.matches(TokenKind::Stan) {
        let value = self.expression()?;
        self.consume(TokenKind::Colon, "Expected ':' after 'stan' value.")?;
        self.consume(TokenKind::LBrace, "Expected '{' before 'stan' body.")?;
        let body = self.block_statements()?;
        cases.push(SwitchCase {
          value: Some(value),
          body,
          is_default: false,
        });
      } else if self.matches(TokenKind::Ghost) {
        self.consume(TokenKind::Colon, "Expected ':' after 'ghost'.")?;
        self.consume(TokenKind::LBrace, "Expected '{' before 'ghost' body.")?;
        let body = self.block_statements()?;
        cases.push(SwitchCase {
          value: None,
          body,
          is_default: true,
        });
      } else {
        return Err(self.error_at_peek("Expected 'stan' or 'ghost' inside 'simp' body."));
      }
    }
    self.consume(TokenKind::RBrace, "Expected '}' after 'simp' body.")?;

    Ok(Stmt::Switch { expr, cases })
  }

  // yeet block caught block
  fn try_catch_statement(&mut self) -> PResult<Stmt> {
    self.consume(TokenKind::LBrace, "Expected '{' after 'yeet'.")?;
    let try_block = Box::new(self.block()?);
    self.consume(TokenKind::Caught, "Expected 'caught' after 'yeet' block.")?;
    self.consume(TokenKind::LBrace, "Expected '{' after 'caught'.")?;
    let catch_block = Box::new(self.block()?);
    Ok(Stmt::TryCatch {
      try_block,
      catch_block,
    })
  }

  /// `{ ... }` with the opening brace already consumed.
  fn block(&mut self) -> PResult<Stmt> {
    let statements = self.block_statements()?;
    Ok(Stmt::Block { statements })
  }

  fn block_statements(&mut self) -> PResult<Vec<Stmt>> {
    let mut statements = Vec::new();
    while !self.check(TokenKind::RBrace) && !self.is_at_end() {
      statements.push(self.declaration()?);
    }
    self.consume(TokenKind::RBrace, "Expected '}' after block.")?;
    Ok(statements)
  }

  fn expression_statement(&mut self) -> PResult<Stmt> {
    let expr = self.expression()?;
    Ok(Stmt::Expression { expr })
  }

  // ----- Expressions (precedence climbing) -----

  fn expression(&mut self) -> PResult<Expr> {
    self.assignment()
  }

  // Right-associative; simple and compound forms share the target check.
  fn assignment(&mut self) -> PResult<Expr> {
    let expr = self.logical_or()?;

    if self.matches(TokenKind::Eq) {
      let equals = self.previous().clone();
      let value = Box::new(self.assignment()?);
      return Ok(match expr {
        Expr::Identifier { name } => Expr::Assign { name, value },
        Expr::Index {
          object,
          bracket,
          index,
        } => Expr::IndexAssign {
          object,
          bracket,
          index,
          value,
        },
        other => {
          self.error_at(&equals, "Invalid assignment target.");
          other
        }
      });
    }

    if self.matches_any(&[
      TokenKind::PlusEq,
      TokenKind::MinusEq,
      TokenKind::StarEq,
      TokenKind::SlashEq,
      TokenKind::PercentEq,
    ]) {
      let op = self.previous().clone();
      let value = Box::new(self.assignment()?);
      return Ok(match expr {
        Expr::Identifier { name } => Expr::CompoundAssign { name, op, value },
        other => {
          self.error_at(&op, "Invalid assignment target.");
          other
        }
      });
    }

    Ok(expr)
  }

  fn logical_or(&mut self) -> PResult<Expr> {
    let mut expr = self.logical_and()?;
    while self.matches(TokenKind::PipePipe) {
      let op = self.previous().clone();
      let right = self.logical_and()?;
      expr = Expr::Logical {
        left: Box::new(expr),
        op,
        right: Box::new(right),
      };
    }
    Ok(expr)
  }

  fn logical_and(&mut self) -> PResult<Expr> {
    let mut expr = self.bit_or()?;
    while self.matches(TokenKind::AmpAmp) {
      let op = self.previous().clone();
      let right = self.bit_or()?;
      expr = Expr::Logical {
        left: Box::new(expr),
        op,
        right: Box::new(right),
      };
    }
    Ok(expr)
  }

  fn bit_or(&mut self) -> PResult<Expr> {
    let mut expr = self.bit_xor()?;
    while self.matches(TokenKind::Pipe) {
      let op = self.previous().clone();
      let right = self.bit_xor()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn bit_xor(&mut self) -> PResult<Expr> {
    let mut expr = self.bit_and()?;
    while self.matches(TokenKind::Caret) {
      let op = self.previous().clone();
      let right = self.bit_and()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn bit_and(&mut self) -> PResult<Expr> {
    let mut expr = self.equality()?;
    while self.matches(TokenKind::Amp) {
      let op = self.previous().clone();
      let right = self.equality()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn equality(&mut self) -> PResult<Expr> {
    let mut expr = self.comparison()?;
    while self.matches_any(&[TokenKind::EqEq, TokenKind::BangEq]) {
      let op = self.previous().clone();
      let right = self.comparison()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn comparison(&mut self) -> PResult<Expr> {
    let mut expr = self.shift()?;
    while self.matches_any(&[
      TokenKind::Lt,
      TokenKind::Gt,
      TokenKind::LtEq,
      TokenKind::GtEq,
    ]) {
      let op = self.previous().clone();
      let right = self.shift()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn shift(&mut self) -> PResult<Expr> {
    let mut expr = self.term()?;
    while self.matches_any(&[TokenKind::Shl, TokenKind::Shr]) {
      let op = self.previous().clone();
      let right = self.term()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn term(&mut self) -> PResult<Expr> {
    let mut expr = self.factor()?;
    while self.matches_any(&[TokenKind::Plus, TokenKind::Minus]) {
      let op = self.previous().clone();
      let right = self.factor()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn factor(&mut self) -> PResult<Expr> {
    let mut expr = self.unary()?;
    while self.matches_any(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent]) {
      let op = self.previous().clone();
      let right = self.unary()?;
      expr = binary(expr, op, right);
    }
    Ok(expr)
  }

  fn unary(&mut self) -> PResult<Expr> {
    if self.matches_any(&[TokenKind::Minus, TokenKind::Bang, TokenKind::Tilde]) {
      let op = self.previous().clone();
      let operand = self.unary()?;
      return Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
      });
    }

    // Prefix increment/decrement binds to a plain identifier only.
    if self.matches_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
      let op = self.previous().clone();
      let operand = self.unary()?;
      return Ok(match operand {
        Expr::Identifier { name } => Expr::Increment {
          name,
          op,
          is_prefix: true,
        },
        other => {
          self.error_at(&op, "Invalid increment/decrement target.");
          other
        }
      });
    }

    self.postfix()
  }

  // Postfix ++/--, calls and indexing chain left to right.
  fn postfix(&mut self) -> PResult<Expr> {
    let mut expr = self.primary()?;

    loop {
      if self.matches(TokenKind::LParen) {
        expr = self.finish_call(expr)?;
      } else if self.matches(TokenKind::LBracket) {
        let bracket = self.previous().clone();
        let index = self.expression()?;
        self.consume(TokenKind::RBracket, "Expected ']' after index.")?;
        expr = Expr::Index {
          object: Box::new(expr),
          bracket,
          index: Box::new(index),
        };
      } else if self.matches_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
        let op = self.previous().clone();
        expr = match expr {
          Expr::Identifier { name } => Expr::Increment {
            name,
            op,
            is_prefix: false,
          },
          other => {
            self.error_at(&op, "Invalid increment/decrement target.");
            other
          }
        };
      } else {
        break;
      }
    }

    Ok(expr)
  }

  fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
    let mut arguments = Vec::new();
    if !self.check(TokenKind::RParen) {
      loop {
        if arguments.len() >= MAX_CALL_ARGS {
          let token = self.peek().clone();
          self.error_at(&token, "Cannot have more than 255 arguments.");
        }
        arguments.push(self.expression()?);
        if !self.matches(TokenKind::Comma) {
          break;
        }
      }
    }
    let paren = self.consume(TokenKind::RParen, "Expected ')' after arguments.")?;
    Ok(Expr::Call {
      callee: Box::new(callee),
      paren,
      arguments,
    })
  }

  fn primary(&mut self) -> PResult<Expr> {
    if self.matches(TokenKind::Ongod) {
      return Ok(Expr::Literal {
        value: LiteralValue::Bool(true),
        line: self.previous().line,
      });
    }
    if self.matches(TokenKind::Cap) {
      return Ok(Expr::Literal {
        value: LiteralValue::Bool(false),
        line: self.previous().line,
      });
    }
    if self.matches(TokenKind::Nah) {
      return Ok(Expr::Literal {
        value: LiteralValue::Null,
        line: self.previous().line,
      });
    }

    if self.matches(TokenKind::Number) {
      let token = self.previous().clone();
      let value = match token.literal {
        Some(Literal::Int(v)) => LiteralValue::Int(v),
        Some(Literal::Float(v)) => LiteralValue::Float(v),
        _ => return Err(self.error_at_consumed(&token, "Malformed number literal.")),
      };
      return Ok(Expr::Literal {
        value,
        line: token.line,
      });
    }

    if self.matches(TokenKind::Str) {
      let token = self.previous().clone();
      let value = match token.literal {
        Some(Literal::Str(s)) => LiteralValue::Str(s),
        _ => return Err(self.error_at_consumed(&token, "Malformed string literal.")),
      };
      return Ok(Expr::Literal {
        value,
        line: token.line,
      });
    }

    if self.matches(TokenKind::InterpStr) {
      let token = self.previous().clone();
      return self.interpolation(token);
    }

    if self.matches(TokenKind::LBracket) {
      let bracket = self.previous().clone();
      let mut elements = Vec::new();
      if !self.check(TokenKind::RBracket) {
        loop {
          elements.push(self.expression()?);
          if !self.matches(TokenKind::Comma) {
            break;
          }
        }
      }
      self.consume(TokenKind::RBracket, "Expected ']' after array elements.")?;
      return Ok(Expr::ArrayLiteral { bracket, elements });
    }

    if self.matches(TokenKind::Identifier) {
      let name = self.previous().clone();
      return Ok(Expr::Identifier { name });
    }

    if self.matches(TokenKind::LParen) {
      let inner = self.expression()?;
      self.consume(TokenKind::RParen, "Expected ')' after expression.")?;
      return Ok(Expr::Grouping {
        inner: Box::new(inner),
      });
    }

    Err(self.error_at_peek("Expected expression."))
  }

  /// Split an interpolated string on `{...}` markers into alternating
  /// literal text and identifier references. Interiors are trimmed but not
  /// parsed as expressions; a dangling `{` folds into the literal text.
  fn interpolation(&mut self, token: Token) -> PResult<Expr> {
    let content = match &token.literal {
      Some(Literal::Str(s)) => s.clone(),
      _ => return Err(self.error_at_consumed(&token, "Malformed string literal.")),
    };

    let mut string_parts = Vec::new();
    let mut expr_parts = Vec::new();
    let mut lit = String::new();
    let mut rest = content.as_str();

    while let Some(open) = rest.find('{') {
      let Some(close) = rest[open..].find('}') else {
        break;
      };
      lit.push_str(&rest[..open]);
      string_parts.push(std::mem::take(&mut lit));

      let inner = rest[open + 1..open + close].trim();
      let name = Token::new(TokenKind::Identifier, inner, None, token.line);
      expr_parts.push(Expr::Identifier { name });

      rest = &rest[open + close + 1..];
    }
    lit.push_str(rest);
    string_parts.push(lit);

    Ok(Expr::InterpString {
      token,
      string_parts,
      expr_parts,
    })
  }

  // ----- Token navigation -----

  fn is_at_end(&self) -> bool {
    self.peek().kind == TokenKind::Eof
  }

  fn peek(&self) -> &Token {
    &self.tokens[self.current]
  }

  fn previous(&self) -> &Token {
    &self.tokens[self.current - 1]
  }

  fn advance(&mut self) -> &Token {
    if !self.is_at_end() {
      self.current += 1;
    }
    self.previous()
  }

  fn check(&self, kind: TokenKind) -> bool {
    if self.is_at_end() {
      return kind == TokenKind::Eof;
    }
    self.peek().kind == kind
  }

  fn matches(&mut self, kind: TokenKind) -> bool {
    if self.check(kind) && kind != TokenKind::Eof {
      self.advance();
      return true;
    }
    false
  }

  fn matches_any(&mut self, kinds: &[TokenKind]) -> bool {
    for &kind in kinds {
      if self.matches(kind) {
        return true;
      }
    }
    false
  }

  fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
    if self.check(kind) && kind != TokenKind::Eof {
      return Ok(self.advance().clone());
    }
    Err(self.error_at_peek(message))
  }

  // ----- Error handling -----

  fn error_at_peek(&mut self, message: &str) -> ParseError {
    let token = self.peek().clone();
    self.error_at_consumed(&token, message)
  }

  /// Report against a token we already hold, without unwinding.
  fn error_at(&mut self, token: &Token, message: &str) {
    let _ = self.error_at_consumed(token, message);
  }

  fn error_at_consumed(&mut self, token: &Token, message: &str) -> ParseError {
    let shown = if token.kind == TokenKind::Eof {
      "end of file"
    } else {
      token.lexeme.as_str()
    };
    self.reporter.parser_error(token.line, shown, message);
    ParseError
  }

  /// Panic-mode recovery: skip tokens until a statement boundary.
  fn synchronize(&mut self) {
    self.advance();
    while !self.is_at_end() {
      match self.peek().kind {
        TokenKind::Fr
        | TokenKind::Vibe
        | TokenKind::Say
        | TokenKind::Lowkey
        | TokenKind::Goon
        | TokenKind::Edge
        | TokenKind::Send
        | TokenKind::Mog
        | TokenKind::Skip
        | TokenKind::Simp
        | TokenKind::Yeet => return,
        _ => {
          self.advance();
        }
      }
    }
  }
}

fn binary(left: Expr, op: Token, right: Expr) -> Expr {
  Expr::Binary {
    left: Box::new(left),
    op,
    right: Box::new(right),
  }
}
