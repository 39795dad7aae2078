//! `repl_step`: feeds one line at a time to a persistent `Evaluator`,
//! buffering across lines while a block is still open.
//!
//! A line is buffered until its accumulated brace count balances and
//! the buffer's trailing non-whitespace ends a statement — either
//! `};` closing a block, or a bare `;` closing a simple statement. A
//! line that pushes the brace count negative (more `}` than `{`) is a
//! malformed block and is reported immediately, discarding the buffer
//! so the session can continue cleanly from the next line.

use crate::error::{GossipError, Result};
use crate::eval::Evaluator;
use crate::parser::Parser;
use crate::value::Value;

/// The state one REPL session threads across `repl_step` calls: the
/// persistent evaluator (frames survive between statements) and the
/// not-yet-complete-statement buffer.
#[derive(Default)]
pub struct ReplState {
	evaluator: Evaluator,
	buffer: String,
}

impl ReplState {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn evaluator(&self) -> &Evaluator {
		&self.evaluator
	}
}

/// Feeds one line of input to `state`. Returns `None` while a block
/// opened by a trailing `{` is still accumulating; returns `Some` with
/// the evaluated value (or error) once a complete statement has been
/// read.
pub fn repl_step(line: &str, state: &mut ReplState) -> Option<Result<Value>> {
	if !state.buffer.is_empty() {
		state.buffer.push('\n');
	}
	state.buffer.push_str(line);

	let balance = brace_balance(&state.buffer);
	if balance < 0 {
		state.buffer.clear();
		return Some(Err(GossipError::TokenError { expected: "a matching '{'".to_owned(), actual: "an unmatched '}'".to_owned(), span: None }));
	}
	let trimmed = state.buffer.trim_end();
	if balance > 0 || !trimmed.ends_with(';') {
		return None;
	}

	let source = std::mem::take(&mut state.buffer);
	let result = Parser::new(&source).parse_program().and_then(|ast| state.evaluator.eval(&ast));
	Some(result)
}

fn brace_balance(source: &str) -> i64 {
	let mut depth: i64 = 0;
	for ch in source.chars() {
		match ch {
			'{' => depth += 1,
			'}' => depth -= 1,
			_ => {},
		}
	}
	depth
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Number;

	#[test]
	fn a_single_line_statement_evaluates_immediately() {
		let mut state = ReplState::new();
		let result = repl_step("declare x = 5 ;", &mut state).expect("complete statement");
		assert_eq!(result.unwrap(), Value::Number(Number::from_int(5)));
	}

	#[test]
	fn an_open_brace_buffers_until_the_matching_close() {
		let mut state = ReplState::new();
		assert!(repl_step("while False do {", &mut state).is_none());
		assert!(repl_step("declare y = 1 ;", &mut state).is_none());
		let result = repl_step("} ;", &mut state).expect("brace count balanced and ';' seen");
		assert_eq!(result.unwrap(), Value::Unit);
	}

	#[test]
	fn bindings_persist_across_steps() {
		let mut state = ReplState::new();
		repl_step("declare x = 1 ;", &mut state).unwrap().unwrap();
		let second = repl_step("assign x = x + 1 ;", &mut state).unwrap().unwrap();
		assert_eq!(second, Value::Number(Number::from_int(2)));
	}

	#[test]
	fn an_unmatched_close_brace_is_reported_and_clears_the_buffer() {
		let mut state = ReplState::new();
		let result = repl_step("} ;", &mut state).expect("reported immediately");
		assert!(result.is_err());
		assert!(state.buffer.is_empty());
	}
}
