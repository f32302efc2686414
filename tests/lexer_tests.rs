use sigmac::tokenizer::{tokenize, Literal, Token, TokenKind};
use sigmac::Reporter;

fn lex(src: &str) -> Vec<Token> {
  let mut reporter = Reporter::new();
  let tokens = tokenize(src, &mut reporter);
  assert!(
    !reporter.had_error(),
    "unexpected lexer errors: {:?}",
    reporter.errors()
  );
  tokens
}

fn kinds(src: &str) -> Vec<TokenKind> {
  lex(src).into_iter().map(|t| t.kind).collect()
}

#[test]
fn single_char_tokens() {
  assert_eq!(
    kinds("(){}[],:~^"),
    vec![
      TokenKind::LParen,
      TokenKind::RParen,
      TokenKind::LBrace,
      TokenKind::RBrace,
      TokenKind::LBracket,
      TokenKind::RBracket,
      TokenKind::Comma,
      TokenKind::Colon,
      TokenKind::Tilde,
      TokenKind::Caret,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn operators() {
  assert_eq!(
    kinds("+ - * / % = == != < <= > >= && || ! & |"),
    vec![
      TokenKind::Plus,
      TokenKind::Minus,
      TokenKind::Star,
      TokenKind::Slash,
      TokenKind::Percent,
      TokenKind::Eq,
      TokenKind::EqEq,
      TokenKind::BangEq,
      TokenKind::Lt,
      TokenKind::LtEq,
      TokenKind::Gt,
      TokenKind::GtEq,
      TokenKind::AmpAmp,
      TokenKind::PipePipe,
      TokenKind::Bang,
      TokenKind::Amp,
      TokenKind::Pipe,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn compound_assignment() {
  assert_eq!(
    kinds("+= -= *= /= %="),
    vec![
      TokenKind::PlusEq,
      TokenKind::MinusEq,
      TokenKind::StarEq,
      TokenKind::SlashEq,
      TokenKind::PercentEq,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn increment_decrement_and_shift() {
  assert_eq!(
    kinds("++ -- << >>"),
    vec![
      TokenKind::PlusPlus,
      TokenKind::MinusMinus,
      TokenKind::Shl,
      TokenKind::Shr,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn keywords_vs_identifiers() {
  assert_eq!(
    kinds("fr frfr say says goon gooner"),
    vec![
      TokenKind::Fr,
      TokenKind::Identifier,
      TokenKind::Say,
      TokenKind::Identifier,
      TokenKind::Goon,
      TokenKind::Identifier,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn all_nineteen_keywords() {
  assert_eq!(
    kinds("fr say lowkey midkey highkey goon edge vibe send ongod cap nah mog skip simp stan ghost yeet caught"),
    vec![
      TokenKind::Fr,
      TokenKind::Say,
      TokenKind::Lowkey,
      TokenKind::Midkey,
      TokenKind::Highkey,
      TokenKind::Goon,
      TokenKind::Edge,
      TokenKind::Vibe,
      TokenKind::Send,
      TokenKind::Ongod,
      TokenKind::Cap,
      TokenKind::Nah,
      TokenKind::Mog,
      TokenKind::Skip,
      TokenKind::Simp,
      TokenKind::Stan,
      TokenKind::Ghost,
      TokenKind::Yeet,
      TokenKind::Caught,
      TokenKind::Eof,
    ]
  );
}

#[test]
fn integer_literal_tags_i64() {
  let tokens = lex("42 9223372036854775807");
  assert_eq!(tokens[0].literal, Some(Literal::Int(42)));
  assert_eq!(tokens[1].literal, Some(Literal::Int(i64::MAX)));
}

#[test]
fn fractional_literal_tags_f64() {
  let tokens = lex("1.0 3.25");
  assert_eq!(tokens[0].literal, Some(Literal::Float(1.0)));
  assert_eq!(tokens[1].literal, Some(Literal::Float(3.25)));
}

#[test]
fn string_literal_content() {
  let tokens = lex(r#""hello""#);
  assert_eq!(tokens[0].kind, TokenKind::Str);
  assert_eq!(tokens[0].literal, Some(Literal::Str("hello".to_string())));
}

#[test]
fn escapes_stay_verbatim() {
  let tokens = lex(r#""a\nb""#);
  assert_eq!(tokens[0].literal, Some(Literal::Str("a\\nb".to_string())));
}

#[test]
fn interpolation_detection() {
  let tokens = lex(r#""greet {name}" "plain" "open { only" "} before {""#);
  assert_eq!(tokens[0].kind, TokenKind::InterpStr);
  assert_eq!(tokens[1].kind, TokenKind::Str);
  assert_eq!(tokens[2].kind, TokenKind::Str);
  assert_eq!(tokens[3].kind, TokenKind::Str);
}

#[test]
fn line_numbers_follow_newlines() {
  let tokens = lex("fr x = 1\n# comment line\nsay x");
  let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
  assert_eq!(lines, vec![1, 1, 1, 1, 3, 3, 3]);
}

#[test]
fn multiline_string_counts_lines() {
  let tokens = lex("\"a\nb\"\nsay");
  // The token is anchored at its opening quote.
  assert_eq!(tokens[0].kind, TokenKind::Str);
  assert_eq!(tokens[0].line, 1);
  assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".to_string())));
  // Both embedded and plain newlines advance the counter.
  assert_eq!(tokens[1].kind, TokenKind::Say);
  assert_eq!(tokens[1].line, 3);
}

#[test]
fn eof_is_always_last() {
  for src in ["", "fr x = 1", "# only a comment"] {
    let tokens = lex(src);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
  }
}

#[test]
fn unterminated_string_reports_error() {
  let mut reporter = Reporter::new();
  let tokens = tokenize("say \"oops", &mut reporter);
  assert!(reporter.had_error());
  assert!(reporter.errors()[0].message.contains("Unterminated"));
  // The stream still ends with EOF.
  assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}

#[test]
fn unexpected_character_continues_lexing() {
  let mut reporter = Reporter::new();
  let tokens = tokenize("fr x = 1 @ say x", &mut reporter);
  assert_eq!(reporter.error_count(), 1);
  assert!(reporter.errors()[0].message.contains("Unexpected character"));
  // Lexing recovers: the tokens after the bad byte are all there.
  assert!(tokens.iter().any(|t| t.kind == TokenKind::Invalid));
  assert!(tokens.iter().any(|t| t.kind == TokenKind::Say));
}

#[test]
fn integer_overflow_is_an_error() {
  let mut reporter = Reporter::new();
  tokenize("99999999999999999999", &mut reporter);
  assert!(reporter.had_error());
  assert!(reporter.errors()[0].message.contains("Invalid number"));
}

#[test]
fn relex_token_lexemes_reproduces_kinds() {
  let src = "fr x = 10\ngoon (x > 0) { x = x - 1 }";
  let first = lex(src);
  let joined: Vec<String> = first
    .iter()
    .filter(|t| t.kind != TokenKind::Eof)
    .map(|t| t.lexeme.clone())
    .collect();
  let second = lex(&joined.join(" "));
  let first_kinds: Vec<TokenKind> = first.iter().map(|t| t.kind).collect();
  let second_kinds: Vec<TokenKind> = second.iter().map(|t| t.kind).collect();
  assert_eq!(first_kinds, second_kinds);
}
