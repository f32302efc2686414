use sigmac::ast::{Expr, LiteralValue, Stmt};
use sigmac::tokenizer::TokenKind;
use sigmac::{parser, tokenizer, Reporter};

fn parse_ok(src: &str) -> Vec<Stmt> {
  let mut reporter = Reporter::new();
  let tokens = tokenizer::tokenize(src, &mut reporter);
  assert!(!reporter.had_error(), "lexer failed: {:?}", reporter.errors());
  let program = parser::parse(tokens, &mut reporter);
  assert!(
    !reporter.had_error(),
    "unexpected parse errors: {:?}",
    reporter.errors()
  );
  program
}

fn parse_with_errors(src: &str) -> (Vec<Stmt>, Reporter) {
  let mut reporter = Reporter::new();
  let tokens = tokenizer::tokenize(src, &mut reporter);
  let program = parser::parse(tokens, &mut reporter);
  assert!(reporter.had_error(), "expected parse errors for {src:?}");
  (program, reporter)
}

fn only_expr(program: &[Stmt]) -> &Expr {
  match program {
    [Stmt::Print { expr }] => expr,
    [Stmt::Expression { expr }] => expr,
    other => panic!("expected a single expression-bearing statement, got {other:?}"),
  }
}

#[test]
fn var_decl_shape() {
  let program = parse_ok("fr x = 5");
  match &program[..] {
    [Stmt::VarDecl { name, initializer }] => {
      assert_eq!(name.lexeme, "x");
      assert_eq!(
        initializer,
        &Expr::Literal {
          value: LiteralValue::Int(5),
          line: 1
        }
      );
    }
    other => panic!("unexpected program: {other:?}"),
  }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
  let program = parse_ok("say 1 + 2 * 3");
  let Expr::Binary { op, right, .. } = only_expr(&program) else {
    panic!("expected binary root");
  };
  assert_eq!(op.kind, TokenKind::Plus);
  let Expr::Binary { op: inner, .. } = right.as_ref() else {
    panic!("expected nested binary");
  };
  assert_eq!(inner.kind, TokenKind::Star);
}

#[test]
fn bitwise_precedence_chain() {
  // | is loosest, then ^, then &.
  let program = parse_ok("say 1 | 2 ^ 3 & 4");
  let Expr::Binary { op, right, .. } = only_expr(&program) else {
    panic!("expected binary root");
  };
  assert_eq!(op.kind, TokenKind::Pipe);
  let Expr::Binary { op: xor, right, .. } = right.as_ref() else {
    panic!("expected xor below or");
  };
  assert_eq!(xor.kind, TokenKind::Caret);
  let Expr::Binary { op: and, .. } = right.as_ref() else {
    panic!("expected and below xor");
  };
  assert_eq!(and.kind, TokenKind::Amp);
}

#[test]
fn shift_binds_tighter_than_comparison() {
  let program = parse_ok("say 1 < 2 << 3");
  let Expr::Binary { op, right, .. } = only_expr(&program) else {
    panic!("expected binary root");
  };
  assert_eq!(op.kind, TokenKind::Lt);
  let Expr::Binary { op: shift, .. } = right.as_ref() else {
    panic!("expected shift below comparison");
  };
  assert_eq!(shift.kind, TokenKind::Shl);
}

#[test]
fn logical_sits_above_bitwise() {
  let program = parse_ok("say 1 && 2 | 3");
  let Expr::Logical { op, right, .. } = only_expr(&program) else {
    panic!("expected logical root");
  };
  assert_eq!(op.kind, TokenKind::AmpAmp);
  assert!(matches!(right.as_ref(), Expr::Binary { .. }));
}

#[test]
fn assignment_is_right_associative() {
  let program = parse_ok("x = y = 5");
  let Expr::Assign { name, value } = only_expr(&program) else {
    panic!("expected assignment root");
  };
  assert_eq!(name.lexeme, "x");
  assert!(matches!(value.as_ref(), Expr::Assign { .. }));
}

#[test]
fn index_assignment_target() {
  let program = parse_ok("a[0] = 5");
  assert!(matches!(
    only_expr(&program),
    Expr::IndexAssign { .. }
  ));
}

#[test]
fn invalid_assignment_target() {
  let (_, reporter) = parse_with_errors("1 = 2");
  assert_eq!(reporter.error_count(), 1);
  assert!(reporter.errors()[0]
    .message
    .contains("Invalid assignment target"));
}

#[test]
fn compound_assignment_rejects_index_target() {
  let (_, reporter) = parse_with_errors("a[0] += 1");
  assert!(reporter.errors()[0]
    .message
    .contains("Invalid assignment target"));
}

#[test]
fn prefix_and_postfix_increment() {
  let program = parse_ok("say ++x");
  assert!(matches!(
    only_expr(&program),
    Expr::Increment {
      is_prefix: true,
      ..
    }
  ));

  let program = parse_ok("say x--");
  assert!(matches!(
    only_expr(&program),
    Expr::Increment {
      is_prefix: false,
      ..
    }
  ));
}

#[test]
fn midkey_chain_lowers_to_nested_ifs() {
  let program = parse_ok("lowkey (1) { } midkey (2) { } highkey { }");
  let [Stmt::If { else_branch, .. }] = &program[..] else {
    panic!("expected if root");
  };
  let Some(else_branch) = else_branch else {
    panic!("expected a midkey arm");
  };
  let Stmt::If {
    else_branch: tail, ..
  } = else_branch.as_ref()
  else {
    panic!("midkey should nest as another If");
  };
  assert!(matches!(
    tail.as_deref(),
    Some(Stmt::Block { .. })
  ));
}

#[test]
fn for_clauses_may_all_be_empty() {
  let program = parse_ok("edge (,,) { }");
  let [Stmt::For {
    initializer,
    condition,
    increment,
    ..
  }] = &program[..]
  else {
    panic!("expected for root");
  };
  assert!(initializer.is_none());
  assert!(condition.is_none());
  assert!(increment.is_none());
}

#[test]
fn for_with_decl_initializer() {
  let program = parse_ok("edge (fr i = 1, i <= 5, i = i + 1) { say i }");
  let [Stmt::For {
    initializer,
    condition,
    increment,
    ..
  }] = &program[..]
  else {
    panic!("expected for root");
  };
  assert!(matches!(
    initializer.as_deref(),
    Some(Stmt::VarDecl { .. })
  ));
  assert!(condition.is_some());
  assert!(increment.is_some());
}

#[test]
fn switch_cases_and_default() {
  let program = parse_ok("simp (x) { stan 1: { say 1 } ghost: { say 0 } }");
  let [Stmt::Switch { cases, .. }] = &program[..] else {
    panic!("expected switch root");
  };
  assert_eq!(cases.len(), 2);
  assert!(!cases[0].is_default);
  assert!(cases[0].value.is_some());
  assert!(cases[1].is_default);
  assert!(cases[1].value.is_none());
}

#[test]
fn try_catch_requires_both_blocks() {
  let program = parse_ok("yeet { say 1 } caught { say 2 }");
  assert!(matches!(&program[..], [Stmt::TryCatch { .. }]));

  let (_, reporter) = parse_with_errors("yeet { say 1 }");
  assert!(reporter.errors()[0].message.contains("caught"));
}

#[test]
fn bare_send_has_no_value() {
  let program = parse_ok("vibe f() { send }");
  let [Stmt::FuncDef { body, .. }] = &program[..] else {
    panic!("expected function root");
  };
  assert!(matches!(&body[..], [Stmt::Return { value: None, .. }]));
}

#[test]
fn interpolation_split_keeps_arity() {
  let program = parse_ok(r#"say "a {x} b {y} c""#);
  let Expr::InterpString {
    string_parts,
    expr_parts,
    ..
  } = only_expr(&program)
  else {
    panic!("expected interpolated string");
  };
  assert_eq!(string_parts.len(), expr_parts.len() + 1);
  assert_eq!(string_parts, &["a ", " b ", " c"]);
  match &expr_parts[..] {
    [Expr::Identifier { name: x }, Expr::Identifier { name: y }] => {
      assert_eq!(x.lexeme, "x");
      assert_eq!(y.lexeme, "y");
    }
    other => panic!("expected two identifier parts, got {other:?}"),
  }
}

#[test]
fn interpolation_trailing_placeholder() {
  let program = parse_ok(r#"say "greet {name}""#);
  let Expr::InterpString { string_parts, .. } = only_expr(&program) else {
    panic!("expected interpolated string");
  };
  assert_eq!(string_parts, &["greet ", ""]);
}

#[test]
fn panic_mode_recovers_at_statement_keyword() {
  // The first declaration is broken; the second still parses.
  let (program, reporter) = parse_with_errors("fr = 1\nfr x = 2");
  assert_eq!(reporter.error_count(), 1);
  assert_eq!(program.len(), 1);
  assert!(matches!(&program[..], [Stmt::VarDecl { name, .. }] if name.lexeme == "x"));
}

#[test]
fn missing_initializer_reports_error() {
  let (program, reporter) = parse_with_errors("fr x =");
  assert!(program.is_empty());
  assert!(reporter.error_count() >= 1);
  assert!(reporter.errors()[0].message.contains("Expected expression"));
}

#[test]
fn too_many_arguments_is_non_fatal() {
  let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
  let src = format!("foo({})", args.join(", "));
  let (program, reporter) = parse_with_errors(&src);
  assert!(reporter.errors()[0].message.contains("255 arguments"));
  // The call itself still parses.
  assert!(matches!(
    only_expr(&program),
    Expr::Call { .. }
  ));
}

#[test]
fn too_many_parameters_is_non_fatal() {
  let params: Vec<String> = (0..256).map(|i| format!("p{i}")).collect();
  let src = format!("vibe f({}) {{ }}", params.join(", "));
  let (program, reporter) = parse_with_errors(&src);
  assert!(reporter.errors()[0].message.contains("255 parameters"));
  assert!(matches!(&program[..], [Stmt::FuncDef { .. }]));
}
