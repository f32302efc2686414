//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the statement AST.
//! - `codegen` lowers the program to a textual LLVM IR module.
//! - `ir` models that module so structural breakage is caught before print.
//! - `error` centralises the reporter shared by the other stages.
//!
//! Each stage appends into the caller's [`Reporter`]; a stage that left
//! errors behind stops the pipeline before the next one runs.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod parser;
pub mod tokenizer;

pub use error::{CompileError, CompileResult, Reporter};

use snafu::ensure;

/// Compile a source string into LLVM IR text.
pub fn compile(source: &str, filename: &str, reporter: &mut Reporter) -> CompileResult<String> {
  reporter.set_current_file(filename);

  let tokens = tokenizer::tokenize(source, reporter);
  log::debug!("lexed {} token(s)", tokens.len());
  check_stage(reporter)?;

  let program = parser::parse(tokens, reporter);
  log::debug!("parsed {} top-level statement(s)", program.len());
  check_stage(reporter)?;

  let ir = codegen::generate(&program, filename, reporter);
  check_stage(reporter)?;

  match ir {
    Some(text) => Ok(text),
    None => error::SourceErrorsSnafu {
      count: reporter.error_count(),
    }
    .fail(),
  }
}

/// Bail out of the pipeline when the previous stage reported anything.
fn check_stage(reporter: &Reporter) -> CompileResult<()> {
  ensure!(
    !reporter.had_error(),
    error::SourceErrorsSnafu {
      count: reporter.error_count()
    }
  );
  Ok(())
}
