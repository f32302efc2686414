//! Abstract syntax tree: the parser's output and the generator's input.
//!
//! Two disjoint sum types, [`Expr`] and [`Stmt`], with exclusive ownership
//! of children. Nodes keep the token that introduced them so later stages
//! can anchor diagnostics without re-scanning the source.

use crate::tokenizer::Token;
use std::fmt::Write;

/// Literal values: numbers, strings, booleans, null.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
  Int(i64),
  Float(f64),
  Bool(bool),
  Str(String),
  Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Literal {
    value: LiteralValue,
    line: u32,
  },
  Identifier {
    name: Token,
  },
  Binary {
    left: Box<Expr>,
    op: Token,
    right: Box<Expr>,
  },
  Unary {
    op: Token,
    operand: Box<Expr>,
  },
  /// `&&` / `||` with short-circuit evaluation.
  Logical {
    left: Box<Expr>,
    op: Token,
    right: Box<Expr>,
  },
  Grouping {
    inner: Box<Expr>,
  },
  Call {
    callee: Box<Expr>,
    paren: Token,
    arguments: Vec<Expr>,
  },
  Assign {
    name: Token,
    value: Box<Expr>,
  },
  CompoundAssign {
    name: Token,
    op: Token,
    value: Box<Expr>,
  },
  Increment {
    name: Token,
    op: Token,
    is_prefix: bool,
  },
  Index {
    object: Box<Expr>,
    bracket: Token,
    index: Box<Expr>,
  },
  IndexAssign {
    object: Box<Expr>,
    bracket: Token,
    index: Box<Expr>,
    value: Box<Expr>,
  },
  ArrayLiteral {
    bracket: Token,
    elements: Vec<Expr>,
  },
  /// Alternating literal text and identifier references; there is always
  /// exactly one more string part than expression parts.
  InterpString {
    token: Token,
    string_parts: Vec<String>,
    expr_parts: Vec<Expr>,
  },
}

impl Expr {
  /// Source line of the node's leading token, for diagnostics.
  pub fn line(&self) -> u32 {
    match self {
      Expr::Literal { line, .. } => *line,
      Expr::Identifier { name } => name.line,
      Expr::Binary { op, .. } | Expr::Unary { op, .. } | Expr::Logical { op, .. } => op.line,
      Expr::Grouping { inner } => inner.line(),
      Expr::Call { paren, .. } => paren.line,
      Expr::Assign { name, .. }
      | Expr::CompoundAssign { name, .. }
      | Expr::Increment { name, .. } => name.line,
      Expr::Index { bracket, .. }
      | Expr::IndexAssign { bracket, .. }
      | Expr::ArrayLiteral { bracket, .. } => bracket.line,
      Expr::InterpString { token, .. } => token.line,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
  pub value: Option<Expr>,
  pub body: Vec<Stmt>,
  pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  VarDecl {
    name: Token,
    initializer: Expr,
  },
  Print {
    expr: Expr,
  },
  Expression {
    expr: Expr,
  },
  Block {
    statements: Vec<Stmt>,
  },
  If {
    condition: Expr,
    then_branch: Box<Stmt>,
    else_branch: Option<Box<Stmt>>,
  },
  While {
    condition: Expr,
    body: Box<Stmt>,
  },
  For {
    initializer: Option<Box<Stmt>>,
    condition: Option<Expr>,
    increment: Option<Expr>,
    body: Box<Stmt>,
  },
  FuncDef {
    name: Token,
    params: Vec<Token>,
    body: Vec<Stmt>,
  },
  Return {
    keyword: Token,
    value: Option<Expr>,
  },
  Break {
    keyword: Token,
  },
  Continue {
    keyword: Token,
  },
  Switch {
    expr: Expr,
    cases: Vec<SwitchCase>,
  },
  TryCatch {
    try_block: Box<Stmt>,
    catch_block: Box<Stmt>,
  },
}

/// Render an indented tree of the whole program, one node per line.
/// Debugging aid behind the driver's `--ast` flag.
pub fn dump(program: &[Stmt]) -> String {
  let mut out = String::new();
  for stmt in program {
    dump_stmt(stmt, 0, &mut out);
  }
  out
}

fn indent(depth: usize, out: &mut String) {
  for _ in 0..depth {
    out.push_str("  ");
  }
}

fn dump_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
  indent(depth, out);
  match stmt {
    Stmt::VarDecl { name, initializer } => {
      let _ = writeln!(out, "VarDecl {}", name.lexeme);
      dump_expr(initializer, depth + 1, out);
    }
    Stmt::Print { expr } => {
      out.push_str("Print\n");
      dump_expr(expr, depth + 1, out);
    }
    Stmt::Expression { expr } => {
      out.push_str("ExprStmt\n");
      dump_expr(expr, depth + 1, out);
    }
    Stmt::Block { statements } => {
      out.push_str("Block\n");
      for s in statements {
        dump_stmt(s, depth + 1, out);
      }
    }
    Stmt::If {
      condition,
      then_branch,
      else_branch,
    } => {
      out.push_str("If\n");
      dump_expr(condition, depth + 1, out);
      dump_stmt(then_branch, depth + 1, out);
      if let Some(else_branch) = else_branch {
        indent(depth, out);
        out.push_str("Else\n");
        dump_stmt(else_branch, depth + 1, out);
      }
    }
    Stmt::While { condition, body } => {
      out.push_str("While\n");
      dump_expr(condition, depth + 1, out);
      dump_stmt(body, depth + 1, out);
    }
    Stmt::For {
      initializer,
      condition,
      increment,
      body,
    } => {
      out.push_str("For\n");
      if let Some(init) = initializer {
        dump_stmt(init, depth + 1, out);
      }
      if let Some(cond) = condition {
        dump_expr(cond, depth + 1, out);
      }
      if let Some(incr) = increment {
        dump_expr(incr, depth + 1, out);
      }
      dump_stmt(body, depth + 1, out);
    }
    Stmt::FuncDef { name, params, body } => {
      let names: Vec<&str> = params.iter().map(|p| p.lexeme.as_str()).collect();
      let _ = writeln!(out, "FuncDef {}({})", name.lexeme, names.join(", "));
      for s in body {
        dump_stmt(s, depth + 1, out);
      }
    }
    Stmt::Return { value, .. } => {
      out.push_str("Return\n");
      if let Some(value) = value {
        dump_expr(value, depth + 1, out);
      }
    }
    Stmt::Break { .. } => out.push_str("Break\n"),
    Stmt::Continue { .. } => out.push_str("Continue\n"),
    Stmt::Switch { expr, cases } => {
      out.push_str("Switch\n");
      dump_expr(expr, depth + 1, out);
      for case in cases {
        indent(depth + 1, out);
        if case.is_default {
          out.push_str("Default\n");
        } else {
          out.push_str("Case\n");
          if let Some(value) = &case.value {
            dump_expr(value, depth + 2, out);
          }
        }
        for s in &case.body {
          dump_stmt(s, depth + 2, out);
        }
      }
    }
    Stmt::TryCatch {
      try_block,
      catch_block,
    } => {
      out.push_str("Try\n");
      dump_stmt(try_block, depth + 1, out);
      indent(depth, out);
      out.push_str("Catch\n");
      dump_stmt(catch_block, depth + 1, out);
    }
  }
}

fn dump_expr(expr: &Expr, depth: usize, out: &mut String) {
  indent(depth, out);
  match expr {
    Expr::Literal { value, .. } => {
      let _ = match value {
        LiteralValue::Int(v) => writeln!(out, "Literal {v}"),
        LiteralValue::Float(v) => writeln!(out, "Literal {v}"),
        LiteralValue::Bool(v) => writeln!(out, "Literal {v}"),
        LiteralValue::Str(s) => writeln!(out, "Literal \"{s}\""),
        LiteralValue::Null => writeln!(out, "Literal null"),
      };
    }
    Expr::Identifier { name } => {
      let _ = writeln!(out, "Identifier {}", name.lexeme);
    }
    Expr::Binary { left, op, right } => {
      let _ = writeln!(out, "Binary {}", op.lexeme);
      dump_expr(left, depth + 1, out);
      dump_expr(right, depth + 1, out);
    }
    Expr::Unary { op, operand } => {
      let _ = writeln!(out, "Unary {}", op.lexeme);
      dump_expr(operand, depth + 1, out);
    }
    Expr::Logical { left, op, right } => {
      let _ = writeln!(out, "Logical {}", op.lexeme);
      dump_expr(left, depth + 1, out);
      dump_expr(right, depth + 1, out);
    }
    Expr::Grouping { inner } => {
      out.push_str("Grouping\n");
      dump_expr(inner, depth + 1, out);
    }
    Expr::Call {
      callee, arguments, ..
    } => {
      out.push_str("Call\n");
      dump_expr(callee, depth + 1, out);
      for arg in arguments {
        dump_expr(arg, depth + 1, out);
      }
    }
    Expr::Assign { name, value } => {
      let _ = writeln!(out, "Assign {}", name.lexeme);
      dump_expr(value, depth + 1, out);
    }
    Expr::CompoundAssign { name, op, value } => {
      let _ = writeln!(out, "CompoundAssign {} {}", name.lexeme, op.lexeme);
      dump_expr(value, depth + 1, out);
    }
    Expr::Increment { name, op, is_prefix } => {
      let kind = if *is_prefix { "prefix" } else { "postfix" };
      let _ = writeln!(out, "Increment {} {} ({kind})", op.lexeme, name.lexeme);
    }
    Expr::Index { object, index, .. } => {
      out.push_str("Index\n");
      dump_expr(object, depth + 1, out);
      dump_expr(index, depth + 1, out);
    }
    Expr::IndexAssign {
      object,
      index,
      value,
      ..
    } => {
      out.push_str("IndexAssign\n");
      dump_expr(object, depth + 1, out);
      dump_expr(index, depth + 1, out);
      dump_expr(value, depth + 1, out);
    }
    Expr::ArrayLiteral { elements, .. } => {
      let _ = writeln!(out, "ArrayLiteral [{}]", elements.len());
      for elem in elements {
        dump_expr(elem, depth + 1, out);
      }
    }
    Expr::InterpString {
      string_parts,
      expr_parts,
      ..
    } => {
      let _ = writeln!(out, "InterpString ({} parts)", string_parts.len());
      for (i, part) in string_parts.iter().enumerate() {
        indent(depth + 1, out);
        let _ = writeln!(out, "Text \"{part}\"");
        if i < expr_parts.len() {
          dump_expr(&expr_parts[i], depth + 1, out);
        }
      }
    }
  }
}
