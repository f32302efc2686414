//! Driver: argument handling, the REPL, and handing IR to a native
//! toolchain. Everything language-related lives in the library; this file
//! only decides what to do with the text the pipeline produces.

use anyhow::{bail, Context, Result};
use clap::Parser;
use sigmac::{ast, parser, tokenizer, Reporter};
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler for the Sigma language.
#[derive(Parser, Debug)]
#[command(
  name = "sigmac",
  about = "Compiler for the Sigma language",
  disable_version_flag = true
)]
struct Args {
  /// Source file to compile (omit to start the REPL)
  file: Option<PathBuf>,

  /// Compile and run the program (default when a file is given)
  #[arg(long)]
  run: bool,

  /// Compile to a native executable
  #[arg(short = 'o', value_name = "FILE")]
  output: Option<PathBuf>,

  /// Write LLVM IR to standard output
  #[arg(long = "emit-ir")]
  emit_ir: bool,

  /// Show lexer tokens
  #[arg(long)]
  tokens: bool,

  /// Show the AST
  #[arg(long)]
  ast: bool,

  /// Print version information
  #[arg(short = 'v', long = "version")]
  version: bool,
}

fn main() {
  env_logger::init();
  let args = Args::parse();

  let code = match run_driver(args) {
    Ok(code) => code,
    Err(err) => {
      eprintln!("sigmac: {err:#}");
      1
    }
  };
  process::exit(code);
}

fn run_driver(args: Args) -> Result<i32> {
  if args.version {
    println!("Sigma Language Compiler");
    println!("Version: {VERSION}");
    return Ok(0);
  }

  let Some(path) = &args.file else {
    repl();
    return Ok(0);
  };

  let source = read_source(path)?;
  let filename = path.display().to_string();

  if args.tokens {
    let mut reporter = Reporter::new();
    let tokens = tokenizer::tokenize(&source, &mut reporter);
    println!("=== TOKENS ===");
    for token in &tokens {
      println!("{token}");
    }
    println!();
  }

  if args.ast {
    let mut reporter = Reporter::new();
    reporter.set_current_file(&filename);
    let tokens = tokenizer::tokenize(&source, &mut reporter);
    if !reporter.had_error() {
      let program = parser::parse(tokens, &mut reporter);
      if !reporter.had_error() {
        println!("=== AST ===");
        print!("{}", ast::dump(&program));
        println!("Total statements: {}", program.len());
        println!();
      }
    }
  }

  if let Some(output) = &args.output {
    return compile_to_file(&source, &filename, output);
  }
  if args.emit_ir {
    return emit_ir(&source, &filename);
  }
  if args.run || !(args.tokens || args.ast) {
    return compile_and_run(&source, &filename);
  }
  Ok(0)
}

/// Read a source file, dropping an optional `#!...` first line so scripts
/// can self-execute.
fn read_source(path: &Path) -> Result<String> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("could not read '{}'", path.display()))?;

  if content.starts_with("#!") {
    return Ok(match content.find('\n') {
      Some(newline) => content[newline + 1..].to_string(),
      None => String::new(),
    });
  }
  Ok(content)
}

fn emit_ir(source: &str, filename: &str) -> Result<i32> {
  let mut reporter = Reporter::new();
  match sigmac::compile(source, filename, &mut reporter) {
    Ok(ir) => {
      print!("{ir}");
      Ok(0)
    }
    Err(_) => {
      report_failure(&reporter);
      Ok(1)
    }
  }
}

fn compile_to_file(source: &str, filename: &str, output: &Path) -> Result<i32> {
  let mut reporter = Reporter::new();
  let ir = match sigmac::compile(source, filename, &mut reporter) {
    Ok(ir) => ir,
    Err(_) => {
      report_failure(&reporter);
      return Ok(1);
    }
  };

  build_native(&ir, output)?;
  println!("Compiled: {}", output.display());
  Ok(0)
}

/// Compile, link into a scratch directory, execute, and hand the program's
/// own exit status back to the shell.
fn compile_and_run(source: &str, filename: &str) -> Result<i32> {
  let mut reporter = Reporter::new();
  let ir = match sigmac::compile(source, filename, &mut reporter) {
    Ok(ir) => ir,
    Err(_) => {
      report_failure(&reporter);
      return Ok(1);
    }
  };

  let dir = tempfile::tempdir().context("could not create temp directory")?;
  let exe = dir.path().join("program");
  build_native(&ir, &exe)?;

  let status = Command::new(&exe)
    .status()
    .with_context(|| format!("could not run '{}'", exe.display()))?;
  Ok(status.code().unwrap_or(1))
}

/// Turn IR text into a native executable with whatever toolchain is on
/// PATH: clang directly, or llc plus a C compiler for the link step.
fn build_native(ir: &str, output: &Path) -> Result<()> {
  let dir = tempfile::tempdir().context("could not create temp directory")?;
  let ir_file = dir.path().join("program.ll");
  fs::write(&ir_file, ir).context("could not write IR file")?;

  if command_exists("clang") {
    run_tool(
      Command::new("clang")
        .arg(&ir_file)
        .arg("-o")
        .arg(output)
        .arg("-Wno-override-module"),
      "clang",
    )?;
  } else if command_exists("llc") {
    let asm_file = dir.path().join("program.s");
    run_tool(
      Command::new("llc").arg(&ir_file).arg("-o").arg(&asm_file),
      "llc",
    )?;
    let cc = if command_exists("gcc") { "gcc" } else { "cc" };
    run_tool(
      Command::new(cc)
        .arg(&asm_file)
        .arg("-o")
        .arg(output)
        .arg("-lm"),
      cc,
    )?;
  } else {
    bail!("no suitable native compiler found; install clang, or llc plus gcc");
  }
  Ok(())
}

fn run_tool(command: &mut Command, name: &str) -> Result<()> {
  let status = command
    .status()
    .with_context(|| format!("could not invoke '{name}'"))?;
  if !status.success() {
    bail!("'{name}' failed with status {status}");
  }
  Ok(())
}

fn command_exists(name: &str) -> bool {
  Command::new(name)
    .arg("--version")
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .is_ok()
}

fn report_failure(reporter: &Reporter) {
  reporter.print_errors(io::stderr().is_terminal());
  eprintln!();
  eprintln!("{} error(s) found.", reporter.error_count());
}

/// Interactive loop: each submission runs the whole pipeline and prints
/// either the IR or the diagnostics.
fn repl() {
  let color = io::stdout().is_terminal();

  if color {
    print!("\x1b[1;36m");
  }
  print!("Sigma Language REPL v{VERSION}");
  if color {
    print!("\x1b[0m");
  }
  println!();
  println!("Type code to compile, 'exit' to quit, or '...' for multi-line mode.");
  println!();

  let mut buffer = String::new();
  let mut in_multi_line = false;

  loop {
    let prompt = if in_multi_line { "...   " } else { "sigma> " };
    if color {
      print!("\x1b[1;32m{prompt}\x1b[0m");
    } else {
      print!("{prompt}");
    }
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
      Ok(0) | Err(_) => break,
      Ok(_) => {}
    }
    let line = line.trim_end_matches(['\n', '\r']);

    if line == "exit" || line == "quit" {
      break;
    }

    if line == "..." && !in_multi_line {
      in_multi_line = true;
      buffer.clear();
      continue;
    }

    // An empty line closes multi-line mode and submits the buffer.
    if in_multi_line && line.is_empty() {
      in_multi_line = false;
      if !buffer.is_empty() {
        repl_submit(&buffer);
        println!();
      }
      buffer.clear();
      continue;
    }

    if in_multi_line {
      buffer.push_str(line);
      buffer.push('\n');
      continue;
    }

    if line.is_empty() {
      continue;
    }
    repl_submit(line);
    println!();
  }

  println!("Goodbye! Stay sigma.");
}

fn repl_submit(source: &str) {
  let mut reporter = Reporter::new();
  match sigmac::compile(source, "<repl>", &mut reporter) {
    Ok(ir) => print!("{ir}"),
    Err(_) => report_failure(&reporter),
  }
}
