//! Token kinds and the reserved-word/operator classification tables.

use std::fmt;

use convert_case::Casing as _;

use crate::value::Number;

/// The shape of a token, with its payload stripped off. Kept as its own
/// unit-only enum (rather than matching on `TokenType` directly) so it
/// can derive `strum_macros::EnumIter` and be iterated and Title-Cased
/// uniformly for error messages, the way the teacher's `TokenType` does
/// for its own (payload-free) token-type enum.
#[derive(strum_macros::EnumIter, PartialEq, Eq, Debug, Clone, Copy)]
pub enum TokenKind {
	Num,
	Bool,
	Keyword,
	Identifier,
	Operator,
	Symbol,
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", format!("{self:?}").to_case(convert_case::Case::Title))
	}
}

/// Reserved words, checked after an identifier-like run of letters is
/// scanned. Built as a constant perfect-hash set so classification
/// costs a single lookup rather than a chain of string comparisons.
pub static KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
	"let", "assign", "declare", "if", "then", "else", "for", "in", "do",
	"while", "repeat", "range", "print", "deffunct", "callfun", "functret",
	"to", "end",
};

/// Word-shaped operators: `and`, `or`, `not` (booleans) and `quot`,
/// `rem` (integer quotient/remainder).
pub static WORD_OPERATORS: phf::Set<&'static str> = phf::phf_set! {
	"and", "or", "not", "quot", "rem",
};

/// Every character that can appear in a symbolic-operator run. A run
/// of these is scanned greedily so that `<=` lexes as one token rather
/// than `<` followed by `=`.
pub const SYMBOLIC_OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '%', '<', '>', '=', '!', '&', '|'];

/// Single-character punctuation tokens.
pub const SYMBOL_CHARS: &[char] = &[';', ',', '(', ')', '{', '}', '[', ']', '\'', '.'];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
	Num(Number, bool),
	Bool(bool),
	Keyword(String),
	Identifier(String),
	Operator(String),
	Symbol(char),
}

impl TokenType {
	#[must_use]
	pub const fn kind(&self) -> TokenKind {
		match self {
			Self::Num(..) => TokenKind::Num,
			Self::Bool(_) => TokenKind::Bool,
			Self::Keyword(_) => TokenKind::Keyword,
			Self::Identifier(_) => TokenKind::Identifier,
			Self::Operator(_) => TokenKind::Operator,
			Self::Symbol(_) => TokenKind::Symbol,
		}
	}
}

impl fmt::Display for TokenType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Num(value, _) => write!(f, "{} '{value}'", self.kind()),
			Self::Bool(value) => write!(f, "{} '{value}'", self.kind()),
			Self::Keyword(word) => write!(f, "{} '{word}'", self.kind()),
			Self::Identifier(word) => write!(f, "{} '{word}'", self.kind()),
			Self::Operator(op) => write!(f, "{} '{op}'", self.kind()),
			Self::Symbol(c) => write!(f, "{} '{c}'", self.kind()),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
	pub kind: TokenType,
	pub line: usize,
	pub column: usize,
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.kind)
	}
}

#[cfg(test)]
mod tests {
	use strum::IntoEnumIterator as _;

	use super::*;

	#[test]
	fn every_token_kind_title_cases_to_a_non_empty_word() {
		for kind in TokenKind::iter() {
			let rendered = kind.to_string();
			assert!(!rendered.is_empty());
			assert_eq!(rendered.chars().next().unwrap(), rendered.chars().next().unwrap().to_ascii_uppercase());
		}
	}
}
