use sigmac::error::DiagnosticKind;
use sigmac::{compile, Reporter};

fn compile_ok(src: &str) -> String {
  let mut reporter = Reporter::new();
  match compile(src, "test.sigma", &mut reporter) {
    Ok(ir) => ir,
    Err(err) => panic!("compile failed ({err}): {:?}", reporter.errors()),
  }
}

fn compile_err(src: &str) -> Reporter {
  let mut reporter = Reporter::new();
  let result = compile(src, "test.sigma", &mut reporter);
  assert!(result.is_err(), "expected compilation to fail for {src:?}");
  reporter
}

fn count(haystack: &str, needle: &str) -> usize {
  haystack.matches(needle).count()
}

/// Every labelled block in the rendered IR must end in a branch or return.
fn assert_terminators(ir: &str) {
  let mut last_inst: Option<&str> = None;
  let mut in_function = false;
  for line in ir.lines() {
    let trimmed = line.trim();
    if trimmed.starts_with("define ") {
      in_function = true;
      continue;
    }
    if !in_function {
      continue;
    }
    if trimmed.ends_with(':') || trimmed == "}" {
      if let Some(inst) = last_inst {
        assert!(
          inst.starts_with("br ") || inst.starts_with("ret "),
          "block does not end in a terminator before {trimmed:?}: {inst:?}"
        );
      }
      last_inst = None;
      if trimmed == "}" {
        in_function = false;
      }
      continue;
    }
    if !trimmed.is_empty() {
      last_inst = Some(trimmed);
    }
  }
}

#[test]
fn module_shape() {
  let ir = compile_ok("fr x = 5\nsay x");
  assert_eq!(count(&ir, "define i32 @main()"), 1);
  assert_eq!(count(&ir, "declare i32 @printf(ptr, ...)"), 1);
  assert!(ir.contains("ret i32 0"));
  assert_terminators(&ir);
}

#[test]
fn printf_declared_once_across_many_prints() {
  let ir = compile_ok("say 1\nsay 2\nsay \"x\"\nsay 3");
  assert_eq!(count(&ir, "declare i32 @printf"), 1);
}

#[test]
fn string_literals_deduplicate() {
  let ir = compile_ok("say \"hi\"\nsay \"hi\"\nsay \"other\"");
  assert_eq!(count(&ir, "c\"hi\\00\""), 1);
  assert_eq!(count(&ir, "c\"other\\00\""), 1);
}

#[test]
fn format_strings_share_the_cache() {
  let ir = compile_ok("say 1\nsay 2\nsay 3");
  assert_eq!(count(&ir, "c\"%g\\0A\\00\""), 1);
}

#[test]
fn user_function_signature() {
  let ir = compile_ok("vibe add(a, b) { send a + b }\nsay add(10, 20)");
  assert!(ir.contains("define double @add(double %a, double %b)"));
  assert!(ir.contains("fadd double"));
  assert!(ir.contains("call double @add(double 10.0, double 20.0)"));
  assert_terminators(&ir);
}

#[test]
fn function_without_send_returns_zero() {
  let ir = compile_ok("vibe f() { say 1 }\nsay f()");
  assert!(ir.contains("ret double 0.0"));
}

#[test]
fn short_circuit_or_uses_phi() {
  let ir = compile_ok("say 1 || 2");
  assert!(ir.contains("or.rhs"));
  assert!(ir.contains("or.merge"));
  assert!(ir.contains("phi double [ 1.0, %entry ]"));
  assert_terminators(&ir);
}

#[test]
fn short_circuit_and_uses_phi() {
  let ir = compile_ok("say 0 && 2");
  assert!(ir.contains("and.rhs"));
  assert!(ir.contains("and.merge"));
  assert!(ir.contains("phi double [ 0.0, %entry ]"));
}

#[test]
fn nested_logical_refreshes_phi_edge() {
  // The RHS of && is itself an ||, which splits blocks; the && phi must
  // name the || merge block, not the && RHS entry.
  let ir = compile_ok("say 1 && (2 || 3)");
  assert!(ir.contains("phi double"));
  assert!(ir.contains("or.merge"));
  assert_terminators(&ir);
}

#[test]
fn while_loop_blocks() {
  let ir = compile_ok("fr i = 0\ngoon (i < 3) { i = i + 1 }");
  assert!(ir.contains("whilecond"));
  assert!(ir.contains("whilebody"));
  assert!(ir.contains("whileend"));
  assert!(ir.contains("fcmp olt double"));
  assert_terminators(&ir);
}

#[test]
fn for_loop_blocks() {
  let ir = compile_ok("edge (fr i = 1, i <= 5, i = i + 1) { say i }");
  assert!(ir.contains("forcond"));
  assert!(ir.contains("forbody"));
  assert!(ir.contains("forincr"));
  assert!(ir.contains("forend"));
  assert!(ir.contains("fcmp ole double"));
  assert_terminators(&ir);
}

#[test]
fn break_and_continue_target_loop_frames() {
  let ir = compile_ok(
    "fr i = 0\ngoon (i < 5) { i = i + 1\nlowkey (i == 3) { skip }\nlowkey (i == 4) { mog }\nsay i }",
  );
  // skip jumps back to the condition, mog jumps past the loop.
  assert!(ir.contains("br label %whilecond"));
  assert!(ir.contains("br label %whileend"));
  assert_terminators(&ir);
}

#[test]
fn continue_in_for_targets_increment() {
  let ir = compile_ok("edge (fr i = 0, i < 3, i = i + 1) { skip }");
  assert!(ir.contains("br label %forincr"));
  assert_terminators(&ir);
}

#[test]
fn array_literal_and_indexing() {
  let ir = compile_ok("fr a = [10, 20, 30]\nsay a[1]\na[1] = 99\nsay a[1]");
  assert!(ir.contains("alloca [3 x double]"));
  assert!(ir.contains("getelementptr inbounds [3 x double]"));
  assert!(ir.contains("fptosi double"));
  assert_terminators(&ir);
}

#[test]
fn empty_array_has_length_zero() {
  let ir = compile_ok("fr a = []");
  assert!(ir.contains("alloca [0 x double]"));
}

#[test]
fn interpolated_print_composes_format() {
  let ir = compile_ok("fr x = \"hello\"\nfr name = \"world\"\nsay \"greet {name}\"");
  assert!(ir.contains("c\"greet %s\\0A\\00\""));
  assert_eq!(count(&ir, "call i32 (ptr, ...) @printf"), 1);
}

#[test]
fn interpolated_numbers_use_g_specifier() {
  let ir = compile_ok("fr age = 30\nsay \"age {age} ok\"");
  assert!(ir.contains("c\"age %g ok\\0A\\00\""));
}

#[test]
fn switch_lowers_to_comparison_cascade() {
  let ir = compile_ok("fr x = 2\nsimp (x) { stan 1: { say 1 } stan 2: { say 2 } ghost: { say 0 } }");
  assert_eq!(count(&ir, "fcmp oeq double"), 2);
  assert!(ir.contains("switch.case"));
  assert!(ir.contains("switch.default"));
  assert!(ir.contains("switch.end"));
  assert_terminators(&ir);
}

#[test]
fn switch_without_cases_branches_to_merge() {
  let ir = compile_ok("fr x = 1\nsimp (x) { }");
  assert!(ir.contains("br label %switch.end"));
  assert_terminators(&ir);
}

#[test]
fn try_catch_emits_both_blocks() {
  let ir = compile_ok("yeet { say 1 } caught { say 2 }");
  assert!(ir.contains("try"));
  assert!(ir.contains("catch"));
  assert!(ir.contains("tryend"));
  assert_terminators(&ir);
}

#[test]
fn type_flip_rebinds_to_fresh_cell() {
  let ir = compile_ok("fr x = 1\nx = \"s\"\nsay x");
  assert!(ir.contains("alloca double"));
  assert!(ir.contains("alloca ptr"));
  // The later read goes through the string path.
  assert!(ir.contains("c\"%s\\0A\\00\""));
}

#[test]
fn bitwise_round_trips_through_i64() {
  let ir = compile_ok("say 6 & 3\nsay 1 << 4\nsay ~0");
  assert!(ir.contains("fptosi double"));
  assert!(ir.contains("and i64"));
  assert!(ir.contains("shl i64"));
  assert!(ir.contains("xor i64"));
  assert!(ir.contains("sitofp i64"));
}

#[test]
fn generation_is_deterministic() {
  let src = "vibe f(a) { send a * 2 }\nfr x = f(21)\nsay x";
  assert_eq!(compile_ok(src), compile_ok(src));
}

#[test]
fn break_outside_loop_is_an_error() {
  let reporter = compile_err("mog");
  let diag = &reporter.errors()[0];
  assert_eq!(diag.kind, DiagnosticKind::Semantic);
  assert!(diag.message.contains("break"));
  assert!(diag.message.contains("outside of loop"));
}

#[test]
fn continue_outside_loop_is_an_error() {
  let reporter = compile_err("skip");
  assert!(reporter.errors()[0].message.contains("outside of loop"));
}

#[test]
fn send_at_top_level_is_an_error() {
  let reporter = compile_err("send 5");
  assert!(reporter.errors()[0]
    .message
    .contains("'send' used outside of function"));
}

#[test]
fn unknown_function_names_the_identifier() {
  let reporter = compile_err("say foo(1)");
  assert!(reporter.errors()[0].message.contains("foo"));
  assert!(reporter.errors()[0].message.contains("Unknown function"));
}

#[test]
fn unknown_variable_is_an_error() {
  let reporter = compile_err("say ghost_town");
  assert!(reporter.errors()[0].message.contains("Unknown variable"));
}

#[test]
fn wrong_argument_count_is_an_error() {
  let reporter = compile_err("vibe f(a) { send a }\nsay f(1, 2)");
  assert!(reporter.errors()[0]
    .message
    .contains("Wrong number of arguments"));
}

#[test]
fn indexing_a_non_array_is_an_error() {
  let reporter = compile_err("fr x = 5\nsay x[0]");
  assert!(reporter.errors()[0].message.contains("not an array"));
}

#[test]
fn parse_error_means_no_ir() {
  let mut reporter = Reporter::new();
  let result = compile("fr x =", "test.sigma", &mut reporter);
  assert!(result.is_err());
  assert!(reporter.had_error());
}
