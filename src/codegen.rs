//! IR generation: lower the AST into a textual LLVM module.
//!
//! Two passes over the program: the first declares every top-level function
//! so bodies may call forward, the second emits `main` plus the function
//! bodies in place. All source numbers are 64-bit floats; strings are
//! pointers into deduplicated private globals; arrays are fixed-length
//! stack allocations of doubles. Locals live in stack cells created in the
//! owning function's entry block, and a name whose value changes physical
//! type gets a fresh cell rather than a runtime tag.

use crate::ast::{Expr, LiteralValue, Stmt, SwitchCase};
use crate::error::Reporter;
use crate::ir::{fmt_f64, BlockId, FuncId, Module, Terminator, Ty, Value};
use crate::tokenizer::{Token, TokenKind};
use std::collections::HashMap;

/// Physical shape of a bound name. Arrays remember their length because
/// every element access re-derives the `[N x double]` type.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VarKind {
  Number,
  Str,
  Array(usize),
}

#[derive(Debug, Clone)]
struct VarInfo {
  cell: String,
  kind: VarKind,
}

/// Branch targets for `skip` and `mog` inside the innermost loop.
struct LoopFrame {
  continue_dest: String,
  break_dest: String,
}

/// Lower a program to LLVM IR text. Returns `None` when any diagnostic was
/// raised; partial modules are never rendered.
pub fn generate(program: &[Stmt], filename: &str, reporter: &mut Reporter) -> Option<String> {
  let mut module = Module::new(filename);
  let mut functions: HashMap<String, FuncId> = HashMap::new();
  let mut had_error = false;

  // Pass 1: declare every top-level function so call sites resolve in
  // source order or against later definitions alike.
  for stmt in program {
    if let Stmt::FuncDef { name, params, .. } = stmt {
      if functions.contains_key(&name.lexeme) {
        reporter.semantic_error(name.line, format!("Function already defined: {}", name.lexeme));
        had_error = true;
        continue;
      }
      let params = params.iter().map(|p| p.lexeme.clone()).collect();
      let id = module.add_function(name.lexeme.clone(), params, Ty::Double);
      functions.insert(name.lexeme.clone(), id);
    }
  }
  if had_error {
    return None;
  }
  log::debug!("predeclared {} function(s)", functions.len());

  // Top-level code becomes the body of `main`.
  let main = module.add_function("main", Vec::new(), Ty::I32);
  let entry = module.func_mut(main).add_block("entry");

  let mut gen = CodeGen {
    module,
    cur_func: main,
    cur_block: entry,
    functions,
    scopes: vec![HashMap::new()],
    loops: Vec::new(),
    strings: HashMap::new(),
    in_function: false,
    had_error: false,
    reporter,
  };

  // Pass 2: emit statements in source order.
  for stmt in program {
    gen.gen_stmt(stmt);
    if gen.had_error {
      return None;
    }
  }

  gen.terminate(Terminator::Ret {
    value: Value::new("0", Ty::I32),
  });

  if let Err(message) = gen.module.verify() {
    gen
      .reporter
      .semantic_error(1, format!("Module verification failed: {message}"));
    return None;
  }

  Some(gen.module.to_string())
}

struct CodeGen<'a> {
  module: Module,
  cur_func: FuncId,
  cur_block: BlockId,
  functions: HashMap<String, FuncId>,
  scopes: Vec<HashMap<String, VarInfo>>,
  loops: Vec<LoopFrame>,
  /// Content-keyed cache shared by string literals and format strings.
  strings: HashMap<String, Value>,
  in_function: bool,
  had_error: bool,
  reporter: &'a mut Reporter,
}

impl<'a> CodeGen<'a> {
  // ----- Statements -----

  fn gen_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::VarDecl { name, initializer } => self.gen_var_decl(name, initializer),
      Stmt::Print { expr } => self.gen_print(expr),
      Stmt::Expression { expr } => {
        self.gen_expr(expr);
      }
      Stmt::Block { statements } => self.gen_block(statements),
      Stmt::If {
        condition,
        then_branch,
        else_branch,
      } => self.gen_if(condition, then_branch, else_branch.as_deref()),
      Stmt::While { condition, body } => self.gen_while(condition, body),
      Stmt::For {
        initializer,
        condition,
        increment,
        body,
      } => self.gen_for(
        initializer.as_deref(),
        condition.as_ref(),
        increment.as_ref(),
        body,
      ),
      Stmt::FuncDef { name, params, body } => self.gen_func_def(name, params, body),
      Stmt::Return { keyword, value } => self.gen_return(keyword, value.as_ref()),
      Stmt::Break { keyword } => self.gen_break(keyword),
      Stmt::Continue { keyword } => self.gen_continue(keyword),
      Stmt::Switch { expr, cases } => self.gen_switch(expr, cases),
      Stmt::TryCatch {
        try_block,
        catch_block,
      } => self.gen_try_catch(try_block, catch_block),
    }
  }

  // fr x = expression
  fn gen_var_decl(&mut self, name: &Token, initializer: &Expr) {
    // Array literals bind directly: the cell is the array itself and the
    // length is fixed here for the binding's lifetime.
    if let Expr::ArrayLiteral { elements, .. } = initializer {
      if let Some(info) = self.gen_array_alloc(&name.lexeme, elements, name.line) {
        self.declare(&name.lexeme, info);
      }
      return;
    }

    let Some(value) = self.gen_expr(initializer) else {
      return;
    };

    let (cell_ty, kind) = if value.ty == Ty::Ptr {
      (Ty::Ptr, VarKind::Str)
    } else {
      (Ty::Double, VarKind::Number)
    };

    let cell = self.entry_alloca(&name.lexeme, cell_ty);
    self.push(format!("store {}, ptr {cell}", value.typed()));
    self.declare(&name.lexeme, VarInfo { cell, kind });
  }

  // say expression
  fn gen_print(&mut self, expr: &Expr) {
    // Interpolated strings compose one format string plus all the values.
    if let Expr::InterpString {
      string_parts,
      expr_parts,
      ..
    } = expr
    {
      self.gen_interp_print(string_parts, expr_parts);
      return;
    }

    let Some(value) = self.gen_expr(expr) else {
      return;
    };

    let fmt = match value.ty {
      Ty::Ptr => self.global_string("fmt", "%s\n"),
      _ => self.global_string("fmt", "%g\n"),
    };
    let t = self.tmp();
    self.push(format!(
      "{t} = call i32 (ptr, ...) @printf({}, {})",
      fmt.typed(),
      value.typed()
    ));
  }

  fn gen_interp_print(&mut self, string_parts: &[String], expr_parts: &[Expr]) {
    let (fmt, values) = self.build_interp_format(string_parts, expr_parts, true);
    let fmt_ptr = self.global_string("interp", &fmt);

    let mut args = vec![fmt_ptr.typed()];
    args.extend(values.iter().map(Value::typed));
    let t = self.tmp();
    self.push(format!("{t} = call i32 (ptr, ...) @printf({})", args.join(", ")));
  }

  /// Weave literal text and `%g`/`%s` specifiers. Values whose emission
  /// failed are skipped; the error is already recorded.
  fn build_interp_format(
    &mut self,
    string_parts: &[String],
    expr_parts: &[Expr],
    newline: bool,
  ) -> (String, Vec<Value>) {
    let mut fmt = String::new();
    let mut values = Vec::new();

    for (i, part) in string_parts.iter().enumerate() {
      fmt.push_str(part);
      if i < expr_parts.len() {
        let Some(value) = self.gen_expr(&expr_parts[i]) else {
          continue;
        };
        match value.ty {
          Ty::Ptr => fmt.push_str("%s"),
          _ => fmt.push_str("%g"),
        }
        values.push(value);
      }
    }
    if newline {
      fmt.push('\n');
    }
    (fmt, values)
  }

  fn gen_block(&mut self, statements: &[Stmt]) {
    self.push_scope();
    for stmt in statements {
      self.gen_stmt(stmt);
      if self.had_error {
        break;
      }
    }
    self.pop_scope();
  }

  // lowkey (cond) { ... } highkey { ... }
  fn gen_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
    let Some(cond) = self.gen_expr(condition) else {
      return;
    };
    let Some(cond) = self.to_bool(cond, condition.line()) else {
      return;
    };

    let then_b = self.new_block("then");
    let else_b = else_branch.map(|_| self.new_block("else"));
    let merge_b = self.new_block("ifcont");
    let then_label = self.label_of(then_b);
    let merge_label = self.label_of(merge_b);

    let else_dest = match else_b {
      Some(b) => self.label_of(b),
      None => merge_label.clone(),
    };
    self.terminate(Terminator::CondBr {
      cond: cond.repr,
      then_dest: then_label,
      else_dest,
    });

    self.set_block(then_b);
    self.gen_stmt(then_branch);
    if !self.is_terminated() {
      self.terminate(Terminator::Br {
        dest: merge_label.clone(),
      });
    }

    if let (Some(else_b), Some(else_stmt)) = (else_b, else_branch) {
      self.set_block(else_b);
      self.gen_stmt(else_stmt);
      if !self.is_terminated() {
        self.terminate(Terminator::Br {
          dest: merge_label.clone(),
        });
      }
    }

    self.set_block(merge_b);
  }

  // goon (cond) { ... }
  fn gen_while(&mut self, condition: &Expr, body: &Stmt) {
    let cond_b = self.new_block("whilecond");
    let body_b = self.new_block("whilebody");
    let after_b = self.new_block("whileend");
    let cond_label = self.label_of(cond_b);
    let body_label = self.label_of(body_b);
    let after_label = self.label_of(after_b);

    self.loops.push(LoopFrame {
      continue_dest: cond_label.clone(),
      break_dest: after_label.clone(),
    });
    self.terminate(Terminator::Br {
      dest: cond_label.clone(),
    });

    self.set_block(cond_b);
    let cond = self
      .gen_expr(condition)
      .and_then(|v| self.to_bool(v, condition.line()));
    let Some(cond) = cond else {
      self.loops.pop();
      return;
    };
    self.terminate(Terminator::CondBr {
      cond: cond.repr,
      then_dest: body_label,
      else_dest: after_label,
    });

    self.set_block(body_b);
    self.gen_stmt(body);
    if !self.is_terminated() {
      self.terminate(Terminator::Br { dest: cond_label });
    }

    self.set_block(after_b);
    self.loops.pop();
  }

  // edge (init, cond, incr) { ... }
  fn gen_for(
    &mut self,
    initializer: Option<&Stmt>,
    condition: Option<&Expr>,
    increment: Option<&Expr>,
    body: &Stmt,
  ) {
    if let Some(init) = initializer {
      self.gen_stmt(init);
    }

    let cond_b = self.new_block("forcond");
    let body_b = self.new_block("forbody");
    let incr_b = self.new_block("forincr");
    let after_b = self.new_block("forend");
    let cond_label = self.label_of(cond_b);
    let body_label = self.label_of(body_b);
    let incr_label = self.label_of(incr_b);
    let after_label = self.label_of(after_b);

    // continue re-runs the increment, break leaves the loop
    self.loops.push(LoopFrame {
      continue_dest: incr_label.clone(),
      break_dest: after_label.clone(),
    });
    self.terminate(Terminator::Br {
      dest: cond_label.clone(),
    });

    self.set_block(cond_b);
    match condition {
      Some(cond_expr) => {
        let cond = self
          .gen_expr(cond_expr)
          .and_then(|v| self.to_bool(v, cond_expr.line()));
        let Some(cond) = cond else {
          self.loops.pop();
          return;
        };
        self.terminate(Terminator::CondBr {
          cond: cond.repr,
          then_dest: body_label,
          else_dest: after_label,
        });
      }
      // No condition is an infinite loop.
      None => self.terminate(Terminator::Br { dest: body_label }),
    }

    self.set_block(body_b);
    self.gen_stmt(body);
    if !self.is_terminated() {
      self.terminate(Terminator::Br { dest: incr_label });
    }

    self.set_block(incr_b);
    if let Some(incr) = increment {
      self.gen_expr(incr);
    }
    self.terminate(Terminator::Br { dest: cond_label });

    self.set_block(after_b);
    self.loops.pop();
  }

  // vibe name(params) { ... }
  fn gen_func_def(&mut self, name: &Token, _params: &[Token], body: &[Stmt]) {
    let Some(&id) = self.functions.get(&name.lexeme) else {
      self.error(name.line, format!("Function not found: {}", name.lexeme));
      return;
    };

    let saved_func = self.cur_func;
    let saved_block = self.cur_block;
    let saved_scopes = std::mem::take(&mut self.scopes);
    let saved_in_function = self.in_function;

    let entry = self.module.func_mut(id).add_block("entry");
    self.cur_func = id;
    self.cur_block = entry;
    self.in_function = true;
    self.scopes.push(HashMap::new());

    // Spill every parameter into a stack cell so the body can assign it.
    let param_names = self.module.func(id).params.clone();
    for param in &param_names {
      let cell = self.entry_alloca(param, Ty::Double);
      self.push(format!("store double %{param}, ptr {cell}"));
      self.declare(
        param,
        VarInfo {
          cell,
          kind: VarKind::Number,
        },
      );
    }

    for stmt in body {
      self.gen_stmt(stmt);
    }

    if !self.is_terminated() {
      self.terminate(Terminator::Ret {
        value: Value::num(0.0),
      });
    }

    if let Err(message) = self.module.func(id).verify() {
      self.error(
        name.line,
        format!("Function verification failed: {}: {message}", name.lexeme),
      );
    }

    self.cur_func = saved_func;
    self.cur_block = saved_block;
    self.scopes = saved_scopes;
    self.in_function = saved_in_function;
  }

  // send [expression]
  fn gen_return(&mut self, keyword: &Token, value: Option<&Expr>) {
    if !self.in_function {
      self.error(keyword.line, "'send' used outside of function");
      return;
    }

    let ret = match value {
      Some(expr) => {
        let Some(v) = self.gen_expr(expr) else {
          return;
        };
        let Some(v) = self.expect_number(v, keyword.line, "Return value must be a number") else {
          return;
        };
        v
      }
      None => Value::num(0.0),
    };
    self.terminate(Terminator::Ret { value: ret });
  }

  // mog
  fn gen_break(&mut self, keyword: &Token) {
    let Some(frame) = self.loops.last() else {
      self.reporter.semantic_error_with_hint(
        keyword.line,
        "'mog' (break) used outside of loop",
        "'mog' can only appear inside 'goon' or 'edge' loops",
      );
      self.had_error = true;
      return;
    };
    let dest = frame.break_dest.clone();
    self.terminate(Terminator::Br { dest });
  }

  // skip
  fn gen_continue(&mut self, keyword: &Token) {
    let Some(frame) = self.loops.last() else {
      self.reporter.semantic_error_with_hint(
        keyword.line,
        "'skip' (continue) used outside of loop",
        "'skip' can only appear inside 'goon' or 'edge' loops",
      );
      self.had_error = true;
      return;
    };
    let dest = frame.continue_dest.clone();
    self.terminate(Terminator::Br { dest });
  }

  // simp (expr) { stan v: { ... } ghost: { ... } }
  //
  // Case values are doubles, so there is no integer jump table; the
  // dispatch is a cascade of equality comparisons falling through to the
  // default (or straight to the merge point).
  fn gen_switch(&mut self, expr: &Expr, cases: &[SwitchCase]) {
    let Some(value) = self.gen_expr(expr) else {
      return;
    };
    let Some(value) = self.expect_number(value, expr.line(), "'simp' value must be a number")
    else {
      return;
    };

    let merge_b = self.new_block("switch.end");
    let default_b = if cases.iter().any(|c| c.is_default) {
      self.new_block("switch.default")
    } else {
      merge_b
    };
    let merge_label = self.label_of(merge_b);

    // Arm blocks and their comparison values, in source order.
    let mut arms: Vec<(String, BlockId)> = Vec::new();
    for case in cases.iter().filter(|c| !c.is_default) {
      let block = self.new_block("switch.case");
      let Some(case_value) = case.value.as_ref().and_then(|v| self.gen_expr(v)) else {
        return;
      };
      let Some(case_value) =
        self.expect_number(case_value, expr.line(), "'stan' value must be a number")
      else {
        return;
      };
      arms.push((case_value.repr, block));
    }

    if arms.is_empty() {
      let default_label = self.label_of(default_b);
      self.terminate(Terminator::Br {
        dest: default_label,
      });
    }
    let arm_count = arms.len();
    for (i, (case_value, block)) in arms.clone().into_iter().enumerate() {
      let cmp = self.emit(
        Ty::I1,
        format!("fcmp oeq double {}, {case_value}", value.repr),
      );
      let next = if i + 1 < arm_count {
        self.new_block("switch.next")
      } else {
        default_b
      };
      let then_dest = self.label_of(block);
      let else_dest = self.label_of(next);
      self.terminate(Terminator::CondBr {
        cond: cmp.repr,
        then_dest,
        else_dest,
      });
      self.set_block(next);
    }

    // Arm bodies; each one rejoins at the merge block, no fall-through.
    let mut arm_index = 0;
    for case in cases {
      let block = if case.is_default {
        default_b
      } else {
        let block = arms[arm_index].1;
        arm_index += 1;
        block
      };
      self.set_block(block);
      self.push_scope();
      for stmt in &case.body {
        self.gen_stmt(stmt);
      }
      self.pop_scope();
      if !self.is_terminated() {
        self.terminate(Terminator::Br {
          dest: merge_label.clone(),
        });
      }
    }

    self.set_block(merge_b);
  }

  // yeet { ... } caught { ... }
  //
  // There is no exception runtime: the try block wires straight to the
  // merge point and the catch block is emitted unreachable.
  fn gen_try_catch(&mut self, try_block: &Stmt, catch_block: &Stmt) {
    let try_b = self.new_block("try");
    let catch_b = self.new_block("catch");
    let end_b = self.new_block("tryend");
    let try_label = self.label_of(try_b);
    let end_label = self.label_of(end_b);

    self.terminate(Terminator::Br { dest: try_label });

    self.set_block(try_b);
    self.gen_stmt(try_block);
    if !self.is_terminated() {
      self.terminate(Terminator::Br {
        dest: end_label.clone(),
      });
    }

    self.set_block(catch_b);
    self.gen_stmt(catch_block);
    if !self.is_terminated() {
      self.terminate(Terminator::Br { dest: end_label });
    }

    self.set_block(end_b);
  }

  // ----- Expressions -----

  fn gen_expr(&mut self, expr: &Expr) -> Option<Value> {
    match expr {
      Expr::Literal { value, .. } => self.gen_literal(value),
      Expr::Identifier { name } => self.gen_identifier(name),
      Expr::Binary { left, op, right } => self.gen_binary(left, op, right),
      Expr::Unary { op, operand } => self.gen_unary(op, operand),
      Expr::Logical { left, op, right } => self.gen_logical(left, op, right),
      Expr::Grouping { inner } => self.gen_expr(inner),
      Expr::Call {
        callee,
        paren,
        arguments,
      } => self.gen_call(callee, paren, arguments),
      Expr::Assign { name, value } => self.gen_assign(name, value),
      Expr::CompoundAssign { name, op, value } => self.gen_compound_assign(name, op, value),
      Expr::Increment {
        name,
        op,
        is_prefix,
      } => self.gen_increment(name, op, *is_prefix),
      Expr::Index {
        object,
        bracket,
        index,
      } => self.gen_index(object, bracket, index),
      Expr::IndexAssign {
        object,
        bracket,
        index,
        value,
      } => self.gen_index_assign(object, bracket, index, value),
      Expr::ArrayLiteral { bracket, elements } => self
        .gen_array_alloc("array", elements, bracket.line)
        .map(|info| Value::new(info.cell, Ty::Ptr)),
      Expr::InterpString {
        string_parts,
        expr_parts,
        ..
      } => {
        // In expression position the composed format string itself is the
        // value; the woven-in operands are evaluated and dropped.
        let (fmt, _values) = self.build_interp_format(string_parts, expr_parts, false);
        Some(self.global_string("interp", &fmt))
      }
    }
  }

  fn gen_literal(&mut self, value: &LiteralValue) -> Option<Value> {
    let v = match value {
      LiteralValue::Int(v) => Value::num(*v as f64),
      LiteralValue::Float(v) => Value::num(*v),
      LiteralValue::Bool(v) => Value::num(if *v { 1.0 } else { 0.0 }),
      LiteralValue::Null => Value::num(0.0),
      LiteralValue::Str(s) => self.global_string("str", s),
    };
    Some(v)
  }

  fn gen_identifier(&mut self, name: &Token) -> Option<Value> {
    let Some(info) = self.lookup(&name.lexeme) else {
      self.error(name.line, format!("Unknown variable: {}", name.lexeme));
      return None;
    };
    let v = match info.kind {
      // Arrays are their cell; indexing peels elements off later.
      VarKind::Array(_) => Value::new(info.cell, Ty::Ptr),
      VarKind::Str => self.emit(Ty::Ptr, format!("load ptr, ptr {}", info.cell)),
      VarKind::Number => self.emit(Ty::Double, format!("load double, ptr {}", info.cell)),
    };
    Some(v)
  }

  fn gen_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Option<Value> {
    let l = self.gen_expr(left)?;
    let r = self.gen_expr(right)?;
    let message = format!("Operands of '{}' must be numbers", op.lexeme);
    let l = self.expect_number(l, op.line, &message)?;
    let r = self.expect_number(r, op.line, &message)?;

    let v = match op.kind {
      TokenKind::Plus => self.emit(Ty::Double, format!("fadd double {}, {}", l.repr, r.repr)),
      TokenKind::Minus => self.emit(Ty::Double, format!("fsub double {}, {}", l.repr, r.repr)),
      TokenKind::Star => self.emit(Ty::Double, format!("fmul double {}, {}", l.repr, r.repr)),
      TokenKind::Slash => self.emit(Ty::Double, format!("fdiv double {}, {}", l.repr, r.repr)),
      TokenKind::Percent => self.emit(Ty::Double, format!("frem double {}, {}", l.repr, r.repr)),
      TokenKind::Lt => self.fcmp("olt", &l, &r),
      TokenKind::Gt => self.fcmp("ogt", &l, &r),
      TokenKind::LtEq => self.fcmp("ole", &l, &r),
      TokenKind::GtEq => self.fcmp("oge", &l, &r),
      TokenKind::EqEq => self.fcmp("oeq", &l, &r),
      TokenKind::BangEq => self.fcmp("one", &l, &r),
      TokenKind::Amp => self.bitwise("and", &l, &r),
      TokenKind::Pipe => self.bitwise("or", &l, &r),
      TokenKind::Caret => self.bitwise("xor", &l, &r),
      TokenKind::Shl => self.bitwise("shl", &l, &r),
      TokenKind::Shr => self.bitwise("ashr", &l, &r),
      _ => {
        self.error(op.line, "Unknown binary operator");
        return None;
      }
    };
    Some(v)
  }

  fn gen_unary(&mut self, op: &Token, operand: &Expr) -> Option<Value> {
    let v = self.gen_expr(operand)?;
    let message = format!("Operand of '{}' must be a number", op.lexeme);
    let v = self.expect_number(v, op.line, &message)?;

    let result = match op.kind {
      TokenKind::Minus => self.emit(Ty::Double, format!("fneg double {}", v.repr)),
      TokenKind::Bang => {
        // !x is 1.0 exactly when x compares equal to zero.
        let cmp = self.emit(Ty::I1, format!("fcmp oeq double {}, 0.0", v.repr));
        self.emit(Ty::Double, format!("uitofp i1 {} to double", cmp.repr))
      }
      TokenKind::Tilde => {
        let int = self.emit(Ty::I64, format!("fptosi double {} to i64", v.repr));
        let not = self.emit(Ty::I64, format!("xor i64 {}, -1", int.repr));
        self.emit(Ty::Double, format!("sitofp i64 {} to double", not.repr))
      }
      _ => {
        self.error(op.line, "Unknown unary operator");
        return None;
      }
    };
    Some(result)
  }

  // Short-circuit || and &&. The right operand only runs when the left
  // does not decide the result; a phi joins the two paths.
  fn gen_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Option<Value> {
    let l = self.gen_expr(left)?;
    let l_bool = self.to_bool(l, op.line)?;
    let entry_label = self.cur_label();

    let is_or = op.kind == TokenKind::PipePipe;
    let (rhs_hint, merge_hint) = if is_or {
      ("or.rhs", "or.merge")
    } else {
      ("and.rhs", "and.merge")
    };
    let rhs_b = self.new_block(rhs_hint);
    let merge_b = self.new_block(merge_hint);
    let rhs_label = self.label_of(rhs_b);
    let merge_label = self.label_of(merge_b);

    if is_or {
      self.terminate(Terminator::CondBr {
        cond: l_bool.repr,
        then_dest: merge_label.clone(),
        else_dest: rhs_label,
      });
    } else {
      self.terminate(Terminator::CondBr {
        cond: l_bool.repr,
        then_dest: rhs_label,
        else_dest: merge_label.clone(),
      });
    }

    self.set_block(rhs_b);
    let r = self.gen_expr(right)?;
    let r_bool = self.to_bool(r, op.line)?;
    let r_value = self.emit(Ty::Double, format!("uitofp i1 {} to double", r_bool.repr));
    // The RHS can split blocks itself, so the phi edge must name whatever
    // block we actually ended up in.
    let rhs_end_label = self.cur_label();
    self.terminate(Terminator::Br {
      dest: merge_label.clone(),
    });

    self.set_block(merge_b);
    let short_value = fmt_f64(if is_or { 1.0 } else { 0.0 });
    let phi = self.emit(
      Ty::Double,
      format!(
        "phi double [ {short_value}, %{entry_label} ], [ {}, %{rhs_end_label} ]",
        r_value.repr
      ),
    );
    Some(phi)
  }

  fn gen_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Option<Value> {
    let Expr::Identifier { name } = callee else {
      self.error(paren.line, "Expected function name in call");
      return None;
    };

    let Some(&id) = self.functions.get(&name.lexeme) else {
      self.error(name.line, format!("Unknown function: {}", name.lexeme));
      return None;
    };

    let arity = self.module.func(id).params.len();
    if arity != arguments.len() {
      self.error(
        paren.line,
        format!("Wrong number of arguments for function: {}", name.lexeme),
      );
      return None;
    }

    let mut args = Vec::new();
    for argument in arguments {
      let v = self.gen_expr(argument)?;
      let message = format!("Argument to '{}' must be a number", name.lexeme);
      let v = self.expect_number(v, paren.line, &message)?;
      args.push(v.typed());
    }

    let callee_name = name.lexeme.clone();
    Some(self.emit(
      Ty::Double,
      format!("call double @{callee_name}({})", args.join(", ")),
    ))
  }

  fn gen_assign(&mut self, name: &Token, value: &Expr) -> Option<Value> {
    let value = self.gen_expr(value)?;

    let Some(info) = self.lookup(&name.lexeme) else {
      self.error(
        name.line,
        format!("Unknown variable in assignment: {}", name.lexeme),
      );
      return None;
    };

    let (cell_ty, new_kind) = if value.ty == Ty::Ptr {
      (Ty::Ptr, VarKind::Str)
    } else {
      (Ty::Double, VarKind::Number)
    };

    if info.kind != new_kind {
      // The physical type changed: bind the name to a fresh cell. The old
      // cell stays valid for values already loaded from it.
      let cell = self.entry_alloca(&name.lexeme, cell_ty);
      self.push(format!("store {}, ptr {cell}", value.typed()));
      if let Some(slot) = self.lookup_mut(&name.lexeme) {
        slot.cell = cell;
        slot.kind = new_kind;
      }
    } else {
      self.push(format!("store {}, ptr {}", value.typed(), info.cell));
    }

    Some(value)
  }

  fn gen_compound_assign(&mut self, name: &Token, op: &Token, value: &Expr) -> Option<Value> {
    let Some(info) = self.lookup(&name.lexeme) else {
      self.error(
        name.line,
        format!("Unknown variable in compound assignment: {}", name.lexeme),
      );
      return None;
    };
    if info.kind != VarKind::Number {
      self.error(
        name.line,
        format!("Variable '{}' in compound assignment must be a number", name.lexeme),
      );
      return None;
    }

    let current = self.emit(Ty::Double, format!("load double, ptr {}", info.cell));
    let rhs = self.gen_expr(value)?;
    let message = format!("Operand of '{}' must be a number", op.lexeme);
    let rhs = self.expect_number(rhs, op.line, &message)?;

    let result = match op.kind {
      TokenKind::PlusEq => self.emit(
        Ty::Double,
        format!("fadd double {}, {}", current.repr, rhs.repr),
      ),
      TokenKind::MinusEq => self.emit(
        Ty::Double,
        format!("fsub double {}, {}", current.repr, rhs.repr),
      ),
      TokenKind::StarEq => self.emit(
        Ty::Double,
        format!("fmul double {}, {}", current.repr, rhs.repr),
      ),
      TokenKind::SlashEq => self.emit(
        Ty::Double,
        format!("fdiv double {}, {}", current.repr, rhs.repr),
      ),
      TokenKind::PercentEq => self.emit(
        Ty::Double,
        format!("frem double {}, {}", current.repr, rhs.repr),
      ),
      _ => {
        self.error(op.line, "Unknown compound assignment operator");
        return None;
      }
    };

    self.push(format!("store double {}, ptr {}", result.repr, info.cell));
    Some(result)
  }

  fn gen_increment(&mut self, name: &Token, op: &Token, is_prefix: bool) -> Option<Value> {
    let Some(info) = self.lookup(&name.lexeme) else {
      self.error(
        name.line,
        format!("Unknown variable in increment/decrement: {}", name.lexeme),
      );
      return None;
    };
    if info.kind != VarKind::Number {
      self.error(
        name.line,
        format!("Variable '{}' in increment/decrement must be a number", name.lexeme),
      );
      return None;
    }

    let current = self.emit(Ty::Double, format!("load double, ptr {}", info.cell));
    let one = fmt_f64(1.0);
    let updated = if op.kind == TokenKind::PlusPlus {
      self.emit(Ty::Double, format!("fadd double {}, {one}", current.repr))
    } else {
      self.emit(Ty::Double, format!("fsub double {}, {one}", current.repr))
    };
    self.push(format!("store double {}, ptr {}", updated.repr, info.cell));

    // Prefix yields the new value, postfix the old one.
    Some(if is_prefix { updated } else { current })
  }

  fn gen_index(&mut self, object: &Expr, bracket: &Token, index: &Expr) -> Option<Value> {
    let (cell, len) = self.array_binding(object, bracket)?;

    let idx = self.gen_expr(index)?;
    let idx = self.expect_number(idx, bracket.line, "Array index must be a number")?;

    let i = self.emit(Ty::I64, format!("fptosi double {} to i64", idx.repr));
    let ep = self.emit(
      Ty::Ptr,
      format!("getelementptr inbounds [{len} x double], ptr {cell}, i64 0, i64 {}", i.repr),
    );
    Some(self.emit(Ty::Double, format!("load double, ptr {}", ep.repr)))
  }

  fn gen_index_assign(
    &mut self,
    object: &Expr,
    bracket: &Token,
    index: &Expr,
    value: &Expr,
  ) -> Option<Value> {
    let (cell, len) = self.array_binding(object, bracket)?;

    let idx = self.gen_expr(index)?;
    let idx = self.expect_number(idx, bracket.line, "Array index must be a number")?;
    let value = self.gen_expr(value)?;
    let value = self.expect_number(value, bracket.line, "Array elements must be numbers")?;

    let i = self.emit(Ty::I64, format!("fptosi double {} to i64", idx.repr));
    let ep = self.emit(
      Ty::Ptr,
      format!("getelementptr inbounds [{len} x double], ptr {cell}, i64 0, i64 {}", i.repr),
    );
    self.push(format!("store double {}, ptr {}", value.repr, ep.repr));
    Some(value)
  }

  /// Resolve an indexing target to its cell and length. Only plain
  /// identifiers bound to arrays qualify.
  fn array_binding(&mut self, object: &Expr, bracket: &Token) -> Option<(String, usize)> {
    let Expr::Identifier { name } = object else {
      self.error(bracket.line, "Array index access requires an identifier");
      return None;
    };
    match self.lookup(&name.lexeme) {
      Some(VarInfo {
        cell,
        kind: VarKind::Array(len),
      }) => Some((cell, len)),
      _ => {
        self.error(
          name.line,
          format!("Variable is not an array: {}", name.lexeme),
        );
        None
      }
    }
  }

  /// Stack-allocate a fixed-size array of doubles and store each element.
  fn gen_array_alloc(&mut self, hint: &str, elements: &[Expr], line: u32) -> Option<VarInfo> {
    let len = elements.len();
    let cell = self.module.func_mut(self.cur_func).fresh_cell(hint);
    self.push(format!("{cell} = alloca [{len} x double]"));

    for (i, element) in elements.iter().enumerate() {
      let v = self.gen_expr(element)?;
      let v = self.expect_number(v, line, "Array elements must be numbers")?;
      let ep = self.emit(
        Ty::Ptr,
        format!("getelementptr inbounds [{len} x double], ptr {cell}, i64 0, i64 {i}"),
      );
      self.push(format!("store double {}, ptr {}", v.repr, ep.repr));
    }

    Some(VarInfo {
      cell,
      kind: VarKind::Array(len),
    })
  }

  // ----- Scope and loop bookkeeping -----

  fn push_scope(&mut self) {
    self.scopes.push(HashMap::new());
  }

  fn pop_scope(&mut self) {
    self.scopes.pop();
  }

  fn declare(&mut self, name: &str, info: VarInfo) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.insert(name.to_string(), info);
    }
  }

  /// Innermost-first name resolution.
  fn lookup(&self, name: &str) -> Option<VarInfo> {
    for scope in self.scopes.iter().rev() {
      if let Some(info) = scope.get(name) {
        return Some(info.clone());
      }
    }
    None
  }

  fn lookup_mut(&mut self, name: &str) -> Option<&mut VarInfo> {
    for scope in self.scopes.iter_mut().rev() {
      if let Some(info) = scope.get_mut(name) {
        return Some(info);
      }
    }
    None
  }

  // ----- Emission helpers -----

  fn push(&mut self, inst: String) {
    let block = self.cur_block;
    self.module.func_mut(self.cur_func).push(block, inst);
  }

  fn tmp(&mut self) -> String {
    self.module.func_mut(self.cur_func).fresh_tmp()
  }

  /// Emit `%tN = <body>` and hand back the result value.
  fn emit(&mut self, ty: Ty, body: String) -> Value {
    let t = self.tmp();
    self.push(format!("{t} = {body}"));
    Value::new(t, ty)
  }

  fn new_block(&mut self, hint: &str) -> BlockId {
    self.module.func_mut(self.cur_func).add_block(hint)
  }

  fn set_block(&mut self, block: BlockId) {
    self.cur_block = block;
  }

  fn label_of(&self, block: BlockId) -> String {
    self.module.func(self.cur_func).label(block).to_string()
  }

  fn cur_label(&self) -> String {
    self.label_of(self.cur_block)
  }

  fn terminate(&mut self, term: Terminator) {
    let block = self.cur_block;
    self.module.func_mut(self.cur_func).terminate(block, term);
  }

  fn is_terminated(&self) -> bool {
    self.module.func(self.cur_func).is_terminated(self.cur_block)
  }

  /// Alloca in the entry block of the current function, so the cell
  /// dominates every use regardless of where the declaration sits.
  fn entry_alloca(&mut self, base: &str, ty: Ty) -> String {
    let function = self.module.func_mut(self.cur_func);
    let cell = function.fresh_cell(base);
    function.push_entry(format!("{cell} = alloca {ty}"));
    cell
  }

  /// Truthiness: any non-zero double is true.
  fn to_bool(&mut self, value: Value, line: u32) -> Option<Value> {
    match value.ty {
      Ty::Double => Some(self.emit(Ty::I1, format!("fcmp one double {}, 0.0", value.repr))),
      Ty::I1 => Some(value),
      _ => {
        self.error(line, "Condition must be a number");
        None
      }
    }
  }

  fn fcmp(&mut self, pred: &str, l: &Value, r: &Value) -> Value {
    let cmp = self.emit(Ty::I1, format!("fcmp {pred} double {}, {}", l.repr, r.repr));
    self.emit(Ty::Double, format!("uitofp i1 {} to double", cmp.repr))
  }

  /// Bitwise ops round-trip through i64: truncate, operate, widen back.
  fn bitwise(&mut self, op: &str, l: &Value, r: &Value) -> Value {
    let li = self.emit(Ty::I64, format!("fptosi double {} to i64", l.repr));
    let ri = self.emit(Ty::I64, format!("fptosi double {} to i64", r.repr));
    let result = self.emit(Ty::I64, format!("{op} i64 {}, {}", li.repr, ri.repr));
    self.emit(Ty::Double, format!("sitofp i64 {} to double", result.repr))
  }

  fn expect_number(&mut self, value: Value, line: u32, message: &str) -> Option<Value> {
    if value.ty == Ty::Double {
      Some(value)
    } else {
      self.error(line, message);
      None
    }
  }

  /// Look up or intern a string constant; identical contents share one
  /// global, format strings included.
  fn global_string(&mut self, hint: &str, content: &str) -> Value {
    if let Some(v) = self.strings.get(content) {
      return v.clone();
    }
    let v = self.module.add_string_global(hint, content);
    self.strings.insert(content.to_string(), v.clone());
    v
  }

  fn error(&mut self, line: u32, message: impl Into<String>) {
    self.reporter.semantic_error(line, message);
    self.had_error = true;
  }
}
