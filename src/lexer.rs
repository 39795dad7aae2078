//! Character stream → token stream, with one-token lookahead.

use crate::error::{GossipError, Result};
use crate::stream::CharStream;
use crate::token::{Token, TokenType, KEYWORDS, SYMBOLIC_OPERATOR_CHARS, SYMBOL_CHARS, WORD_OPERATORS};
use crate::value::Number;

/// Scans a `CharStream` into `Token`s on demand. `peek` is idempotent;
/// `advance` consumes whatever `peek` last produced.
pub struct Lexer {
	stream: CharStream,
	peeked: Option<Token>,
	/// Set right after scanning the opening `'` of a string literal, so
	/// the next scan reads everything up to the matching `'` as one
	/// `Identifier` token instead of applying the ordinary identifier
	/// rules. This is the widened quoted-string scan licensed by the
	/// open question over bare single-word strings.
	in_string: bool,
}

impl Lexer {
	#[must_use]
	pub fn new(source: &str) -> Self {
		Self { stream: CharStream::new(source), peeked: None, in_string: false }
	}

	/// One-token lookahead; repeated calls without an intervening
	/// `advance` return the same token.
	pub fn peek(&mut self) -> Result<&Token> {
		if self.peeked.is_none() {
			self.peeked = Some(self.scan_token()?);
		}
		Ok(self.peeked.as_ref().expect("just populated"))
	}

	/// Consumes and returns the peeked token, scanning one if `peek`
	/// was not already called.
	pub fn advance(&mut self) -> Result<Token> {
		if let Some(token) = self.peeked.take() {
			return Ok(token);
		}
		self.scan_token()
	}

	/// Peeks, and if the token matches `expected` by discriminant and
	/// value, advances past it; otherwise raises `TokenError` without
	/// consuming anything.
	pub fn match_token(&mut self, expected: &TokenType) -> Result<Token> {
		let found = self.peek()?;
		if found.kind == *expected {
			self.advance()
		} else {
			Err(GossipError::TokenError {
				expected: expected.to_string(),
				actual: found.to_string(),
				span: Some(crate::error::Span { line: found.line, column: found.column }),
			})
		}
	}

	fn scan_token(&mut self) -> Result<Token> {
		if self.in_string {
			return self.scan_string_body();
		}

		let Some(first) = self.skip_whitespace_and_take()? else {
			return Err(GossipError::EndOfTokens);
		};
		let (line, column) = (self.stream.line(), self.stream.column());

		if first == '\'' {
			self.in_string = true;
			return Ok(Token { kind: TokenType::Symbol('\''), line, column });
		}
		if first.is_ascii_digit() {
			return self.scan_number(first, line, column);
		}
        if first.is_alphabetic() || first == '_' {
			return self.scan_word(first, line, column);
		}
		if SYMBOLIC_OPERATOR_CHARS.contains(&first) {
			return self.scan_symbolic_operator(first, line, column);
		}
		if SYMBOL_CHARS.contains(&first) {
			return Ok(Token { kind: TokenType::Symbol(first), line, column });
		}

		Err(GossipError::TokenError {
			expected: "a recognized token".to_owned(),
			actual: format!("'{first}'"),
			span: Some(crate::error::Span { line, column }),
		})
	}

	/// Reads until (but not including) the next `'`, treating every
	/// character — including spaces and digits — as part of the string
	/// body, then clears the in-string flag.
	fn scan_string_body(&mut self) -> Result<Token> {
		let (line, column) = (self.stream.line(), self.stream.column());
		let mut body = String::new();
		loop {
			match self.stream.next_char() {
				Ok('\'') => {
					self.stream.unget();
					break;
				},
				Ok(c) => body.push(c),
				Err(GossipError::EndOfStream) => return Err(GossipError::EndOfTokens),
				Err(other) => return Err(other),
			}
		}
		self.in_string = false;
		Ok(Token { kind: TokenType::Identifier(body), line, column })
	}

	fn skip_whitespace_and_take(&mut self) -> Result<Option<char>> {
		loop {
			match self.stream.next_char() {
				Ok(c) if c.is_whitespace() => continue,
				Ok(c) => return Ok(Some(c)),
				Err(GossipError::EndOfStream) => return Ok(None),
				Err(other) => return Err(other),
			}
		}
	}

	fn scan_number(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
		let mut whole = String::from(first);
		let mut fraction = String::new();
		let mut saw_dot = false;

		loop {
			match self.stream.next_char() {
				Ok(c) if c.is_ascii_digit() => {
					if saw_dot {
						fraction.push(c);
					} else {
						whole.push(c);
					}
				},
				Ok('.') if !saw_dot => saw_dot = true,
				Ok('.') => {
					return Err(GossipError::TokenError {
						expected: "at most one decimal point".to_owned(),
						actual: "a second '.'".to_owned(),
						span: Some(crate::error::Span { line, column }),
					});
				},
				Ok(c) => {
					self.stream.unget();
					let _ = c;
					break;
				},
				Err(GossipError::EndOfStream) => break,
				Err(other) => return Err(other),
			}
		}

		let denominator = 10i64.pow(u32::try_from(fraction.len()).unwrap_or(0));
		let combined = format!("{whole}{fraction}");
		let numerator: i64 = combined.parse().map_err(|_| GossipError::TokenError {
			expected: "a valid number".to_owned(),
			actual: combined.clone(),
			span: Some(crate::error::Span { line, column }),
		})?;
		let value = Number::new(numerator, denominator);
		Ok(Token { kind: TokenType::Num(value, saw_dot), line, column })
	}

	fn scan_word(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
		let mut word = String::from(first);
		loop {
			match self.stream.next_char() {
				Ok(c) if c.is_alphanumeric() || c == '_' => word.push(c),
				Ok(_) => {
					self.stream.unget();
					break;
				},
				Err(GossipError::EndOfStream) => break,
				Err(other) => return Err(other),
			}
		}

		let kind = if KEYWORDS.contains(word.as_str()) {
			TokenType::Keyword(word)
		} else if word == "True" {
			TokenType::Bool(true)
		} else if word == "False" {
			TokenType::Bool(false)
		} else if WORD_OPERATORS.contains(word.as_str()) {
			TokenType::Operator(word)
		} else {
			TokenType::Identifier(word)
		};
		Ok(Token { kind, line, column })
	}

	fn scan_symbolic_operator(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
		let mut op = String::from(first);
		loop {
			match self.stream.next_char() {
				Ok(c) if SYMBOLIC_OPERATOR_CHARS.contains(&c) => op.push(c),
				Ok(_) => {
					self.stream.unget();
					break;
				},
				Err(GossipError::EndOfStream) => break,
				Err(other) => return Err(other),
			}
		}
		Ok(Token { kind: TokenType::Operator(op), line, column })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(source: &str) -> Vec<TokenType> {
		let mut lexer = Lexer::new(source);
		let mut out = Vec::new();
		loop {
			match lexer.advance() {
				Ok(token) => out.push(token.kind),
				Err(GossipError::EndOfTokens) => break,
				Err(other) => panic!("unexpected lexer error: {other}"),
			}
		}
		out
	}

	#[test]
	fn lexes_a_declaration() {
		let tokens = kinds("declare x = 5 ;");
		assert_eq!(
			tokens,
			vec![
				TokenType::Keyword("declare".to_owned()),
				TokenType::Identifier("x".to_owned()),
				TokenType::Operator("=".to_owned()),
				TokenType::Num(Number::from_int(5), false),
				TokenType::Symbol(';'),
			]
		);
	}

	#[test]
	fn greedily_lexes_multi_char_operator() {
		let tokens = kinds("a <= b");
		assert_eq!(tokens[1], TokenType::Operator("<=".to_owned()));
	}

	#[test]
	fn lexes_fractional_number() {
		let tokens = kinds("12.5");
		assert_eq!(tokens[0], TokenType::Num(Number::new(125, 10), true));
	}

	#[test]
	fn second_decimal_point_is_an_error() {
		let mut lexer = Lexer::new("1.2.3");
		assert!(lexer.advance().is_err());
	}

	#[test]
	fn lexes_quoted_string_with_space() {
		let tokens = kinds("'hello world'");
		assert_eq!(
			tokens,
			vec![TokenType::Symbol('\''), TokenType::Identifier("hello world".to_owned()), TokenType::Symbol('\''),]
		);
	}

	#[test]
	fn peek_is_idempotent() {
		let mut lexer = Lexer::new("a b");
		let first = lexer.peek().unwrap().clone();
		let second = lexer.peek().unwrap().clone();
		assert_eq!(first, second);
		let advanced = lexer.advance().unwrap();
		assert_eq!(advanced, first);
	}
}
