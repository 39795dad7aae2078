//! The structured error taxonomy surfaced to the host. Every kind is a
//! flat variant carrying a small, matchable payload rather than an
//! opaque message string — the host (the REPL, in particular) needs to
//! distinguish a bad assignment from an out-of-bounds index to decide
//! how to recover.

use std::fmt;

use crate::value::TypeTag;

/// A source location, used by the host to render a one-line
/// diagnostic snippet. Kept separate from the error message itself so
/// that `GossipError`'s `Display` stays a plain one-liner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
	pub line: usize,
	pub column: usize,
}

impl fmt::Display for Span {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "line {}, column {}", self.line, self.column)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum GossipError {
	/// The character stream is exhausted. Used internally for control
	/// flow inside the lexer; it should never escape to the host.
	#[error("end of input stream")]
	EndOfStream,

	/// The token stream is exhausted mid-expression.
	#[error("end of token stream")]
	EndOfTokens,

	#[error("expected {expected}, found {actual}")]
	TokenError { expected: String, actual: String, span: Option<Span> },

	#[error("'{name}' is not defined")]
	DeclarationError { name: String, span: Option<Span> },

	#[error("'{name}' is already declared in this scope")]
	VariableRedeclarationError { name: String, span: Option<Span> },

	#[error("cannot assign a value of type {actual_tag} to '{name}', which holds a {expected_tag}")]
	BadAssignment { name: String, expected_tag: TypeTag, actual_tag: TypeTag, span: Option<Span> },

	#[error("condition '{expr}' did not evaluate to a bool")]
	InvalidConditionError { expr: String, span: Option<Span> },

	#[error("cannot concatenate these operand types with '+'")]
	InvalidConcatenationError,

	#[error("operator '{op}' is not defined for these operand types")]
	InvalidOperation { op: String, left: TypeTag, right: Option<TypeTag> },

	#[error("index out of bounds")]
	IndexOutOfBoundsError,

	#[error("list error: {message}")]
	ListError { message: String },

	#[error("the runtime does not support this program shape: {node}")]
	InvalidProgramError { node: String },

	#[error("unrecognized file extension: '{ext}'")]
	InvalidFileExtensionError { ext: String },

	/// A catch-all for arithmetic failures `spec.md` leaves as an
	/// ordinary runtime error rather than a dedicated kind (division by
	/// zero, exponent overflow).
	#[error("{0}")]
	RuntimeError(String),
}

impl GossipError {
	/// The source location this error occurred at, if known. Lexer and
	/// parser errors always carry one; evaluator/VM errors currently do
	/// not track spans past the AST boundary.
	#[must_use]
	pub const fn span(&self) -> Option<Span> {
		match self {
			Self::TokenError { span, .. }
			| Self::DeclarationError { span, .. }
			| Self::VariableRedeclarationError { span, .. }
			| Self::BadAssignment { span, .. }
			| Self::InvalidConditionError { span, .. } => *span,
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, GossipError>;
