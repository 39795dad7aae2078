//! The tree-walking evaluator: `eval(ast) → Value`, threading a shared
//! `Evaluator` (frame stack plus output sink) through the recursion.

use crate::ast::{Ast, BinOpKind, ListOpKind};
use crate::error::{GossipError, Result};
use crate::scope::ScopeStack;
use crate::value::{FunctionRecord, Number, TypeTag, Value};

/// Raised internally by `FunctReturn` to short-circuit the enclosing
/// `ASTSequence`/function body. Not part of the public error taxonomy:
/// `eval_sequence` and `call_function` catch it, everything else lets
/// it propagate like any other error via `?`.
enum Signal {
	Error(GossipError),
	Return(Value),
}

impl From<GossipError> for Signal {
	fn from(error: GossipError) -> Self {
		Self::Error(error)
	}
}

type EvalResult = std::result::Result<Value, Signal>;

/// Owns the frame stack and the output sink for one program run. A
/// fresh `Evaluator` never leaks frames across an error boundary: the
/// host is expected to discard it and start clean on failure, per the
/// error-handling propagation policy.
pub struct Evaluator {
	scope: ScopeStack,
	output: Vec<String>,
}

impl Default for Evaluator {
	fn default() -> Self {
		Self::new()
	}
}

impl Evaluator {
	#[must_use]
	pub fn new() -> Self {
		Self { scope: ScopeStack::new(), output: Vec::new() }
	}

	/// Lines written by `Print`, in order. The REPL/CLI flushes these
	/// to standard output; tests can inspect them directly.
	#[must_use]
	pub fn output(&self) -> &[String] {
		&self.output
	}

	#[must_use]
	pub fn frame_depth(&self) -> usize {
		self.scope.depth()
	}

	pub fn eval(&mut self, ast: &Ast) -> Result<Value> {
		match self.eval_inner(ast) {
			Ok(value) | Err(Signal::Return(value)) => Ok(value),
			Err(Signal::Error(error)) => Err(error),
		}
	}

	fn eval_inner(&mut self, ast: &Ast) -> EvalResult {
		match ast {
			Ast::NumLiteral(n) => Ok(Value::Number(*n)),
			Ast::BoolLiteral(b) => Ok(Value::Bool(*b)),
			Ast::StringLiteral(s) => Ok(Value::String(s.clone())),

			Ast::Variable(name) => Ok(self.scope.lookup(name)?.clone()),

			Ast::Declare(name, expr) => {
				let value = self.eval_inner(expr)?;
				self.scope.declare(name, value.clone())?;
				Ok(value)
			},

			Ast::Assign(name, expr) => {
				let value = self.eval_inner(expr)?;
				self.scope.assign(name, value.clone())?;
				Ok(value)
			},

			Ast::Let(var, init, body) => {
				let value = self.eval_inner(init)?;
				self.scope.push_frame();
				let declared = self.scope.declare(var, value);
				let result = match declared {
					Ok(()) => self.eval_inner(body),
					Err(error) => Err(Signal::Error(error)),
				};
				self.scope.pop_frame();
				result
			},

			Ast::ASTSequence(items) => self.eval_sequence(items),

			Ast::BinOp(op, left, right) => self.eval_binop(*op, left, right),

			Ast::UnOp(operand) => {
				let value = self.eval_inner(operand)?;
				match value {
					Value::Number(n) => Ok(Value::Number(n.negate())),
					other => Err(Signal::Error(GossipError::InvalidOperation { op: "-".to_owned(), left: other.tag(), right: None })),
				}
			},

			Ast::Not(operand) => {
				let value = self.eval_inner(operand)?;
				match value {
					Value::Bool(b) => Ok(Value::Bool(!b)),
					other => Err(Signal::Error(GossipError::InvalidOperation { op: "not".to_owned(), left: other.tag(), right: None })),
				}
			},

			Ast::If(cond, then_branch, else_branch) => {
				let cond_value = self.eval_inner(cond)?;
				let Value::Bool(truthy) = cond_value else {
					return Err(Signal::Error(GossipError::InvalidConditionError { expr: format!("{cond:?}"), span: None }));
				};
				if truthy {
					self.eval_in_new_frame(then_branch)
				} else if let Some(else_branch) = else_branch {
					self.eval_in_new_frame(else_branch)
				} else {
					Ok(Value::Unit)
				}
			},

			Ast::While(cond, body) => self.eval_while(cond, body),

			Ast::DoWhile(body, cond) => {
				self.eval_in_new_frame(body)?;
				self.eval_while(cond, body)
			},

			Ast::ForLoop(var, seq_expr, body) => {
				let sequence = self.eval_to_values(seq_expr)?;
				let mut last = Value::Unit;
				for element in sequence {
					self.scope.push_frame();
					let declared = self.scope.declare(var, element);
					let result = match declared {
						Ok(()) => self.eval_inner(body),
						Err(error) => Err(Signal::Error(error)),
					};
					self.scope.pop_frame();
					last = result?;
				}
				Ok(last)
			},

			Ast::Range(start, end) => {
				let start = self.eval_number(start)?.floor_to_i64();
				let end = self.eval_number(end)?.floor_to_i64();
				let items = (start..=end).map(|i| Ast::NumLiteral(Number::from_int(i))).collect();
				self.eval_sequence(&items)
			},

			Ast::Print(expr) => {
				let value = self.eval_inner(expr)?;
				self.output.push(value.to_string());
				Ok(value)
			},

			Ast::ListObject(elements) => self.eval_list_object(elements),

			Ast::ListCons(elem, list_name) => self.eval_list_cons(elem, list_name),

			Ast::ListOp(kind, list_name) => self.eval_list_op(*kind, list_name),

			Ast::ListIndex(index, list_name) => self.eval_list_index(index, list_name),

			Ast::StringSlice(var, start, end) => self.eval_string_slice(var, start, end),

			Ast::FunctDef(name, params, body) => {
				// Functions are ordinary bindings in the current frame
				// (dynamic scoping, not a separate global function
				// table), so redefining one in the same frame is an
				// ordinary redeclaration.
				let record = FunctionRecord { params: params.clone(), body: (**body).clone() };
				self.scope.declare(name, Value::Function(record.clone()))?;
				Ok(Value::Function(record))
			},

			Ast::FunctCall(name, args) => self.call_function(name, args),

			Ast::FunctReturn(expr) => {
				let value = self.eval_inner(expr)?;
				Err(Signal::Return(value))
			},
		}
	}

	fn eval_sequence(&mut self, items: &[Ast]) -> EvalResult {
		let mut last = Value::Unit;
		for item in items {
			last = self.eval_inner(item)?;
		}
		Ok(last)
	}

	fn eval_in_new_frame(&mut self, branch: &Ast) -> EvalResult {
		self.scope.push_frame();
		let result = self.eval_inner(branch);
		self.scope.pop_frame();
		result
	}

	fn eval_while(&mut self, cond: &Ast, body: &Ast) -> EvalResult {
		let mut last = Value::Unit;
		loop {
			let Value::Bool(truthy) = self.eval_inner(cond)? else {
				return Err(Signal::Error(GossipError::InvalidConditionError { expr: format!("{cond:?}"), span: None }));
			};
			if !truthy {
				break;
			}
			self.scope.push_frame();
			let result = self.eval_inner(body);
			self.scope.pop_frame();
			last = result?;
		}
		Ok(last)
	}

	fn eval_binop(&mut self, op: BinOpKind, left: &Ast, right: &Ast) -> EvalResult {
		// §9 Design Notes REQUIRES short-circuit semantics in the
		// tree-walker for both `&&` and `||`, overriding the more
		// permissive "both sides evaluated" wording earlier in the spec.
		if op == BinOpKind::And {
			let left_value = self.eval_inner(left)?;
			let Value::Bool(left_bool) = left_value else {
				return Err(Signal::Error(GossipError::InvalidOperation { op: "&&".to_owned(), left: left_value.tag(), right: None }));
			};
			if !left_bool {
				return Ok(Value::Bool(false));
			}
			return self.eval_inner(right);
		}
		if op == BinOpKind::Or {
			let left_value = self.eval_inner(left)?;
			let Value::Bool(left_bool) = left_value else {
				return Err(Signal::Error(GossipError::InvalidOperation { op: "||".to_owned(), left: left_value.tag(), right: None }));
			};
			if left_bool {
				return Ok(Value::Bool(true));
			}
			return self.eval_inner(right);
		}

		let left_value = self.eval_inner(left)?;
		let right_value = self.eval_inner(right)?;
		apply_binop(op, left_value, right_value).map_err(Signal::Error)
	}

	fn eval_list_object(&mut self, elements: &[Ast]) -> EvalResult {
		let mut values = Vec::with_capacity(elements.len());
		for element in elements {
			values.push(self.eval_inner(element)?);
		}
		let tag = values.first().map_or(TypeTag::Unit, Value::tag);
		Ok(Value::List(values, tag))
	}

	fn eval_list_cons(&mut self, elem: &Ast, list_name: &str) -> EvalResult {
		let elem_value = self.eval_inner(elem)?;
		let Value::List(items, tag) = self.scope.lookup(list_name)?.clone() else {
			return Err(Signal::Error(GossipError::ListError { message: format!("'{list_name}' is not a list") }));
		};
		if !items.is_empty() && elem_value.tag() != tag {
			return Err(Signal::Error(GossipError::ListError { message: "cons element tag does not match the list's element tag".to_owned() }));
		}
		let new_tag = if items.is_empty() { elem_value.tag() } else { tag };
		let mut new_items = vec![elem_value];
		new_items.extend(items);
		Ok(Value::List(new_items, new_tag))
	}

	fn eval_list_op(&mut self, kind: ListOpKind, list_name: &str) -> EvalResult {
		let Value::List(items, tag) = self.scope.lookup(list_name)?.clone() else {
			return Err(Signal::Error(GossipError::ListError { message: format!("'{list_name}' is not a list") }));
		};
		match kind {
			ListOpKind::IsEmpty => Ok(Value::Bool(items.is_empty())),
			ListOpKind::Head => items.first().cloned().ok_or_else(|| Signal::Error(GossipError::ListError { message: "head of an empty list".to_owned() })),
			ListOpKind::Tail => {
				if items.is_empty() {
					return Err(Signal::Error(GossipError::ListError { message: "tail of an empty list".to_owned() }));
				}
				Ok(Value::List(items[1..].to_vec(), tag))
			},
		}
	}

	fn eval_list_index(&mut self, index: &Ast, list_name: &str) -> EvalResult {
		let index = self.eval_number(index)?.floor_to_i64();
		let Value::List(items, _) = self.scope.lookup(list_name)?.clone() else {
			return Err(Signal::Error(GossipError::ListError { message: format!("'{list_name}' is not a list") }));
		};
		usize::try_from(index)
			.ok()
			.and_then(|i| items.get(i).cloned())
			.ok_or(Signal::Error(GossipError::IndexOutOfBoundsError))
	}

	fn eval_string_slice(&mut self, var: &str, start: &Ast, end: &Ast) -> EvalResult {
		let start = self.eval_number(start)?.floor_to_i64();
		let end = self.eval_number(end)?.floor_to_i64();
		let Value::String(text) = self.scope.lookup(var)?.clone() else {
			return Err(Signal::Error(GossipError::InvalidOperation { op: "slice".to_owned(), left: TypeTag::String, right: None }));
		};
		let chars: Vec<char> = text.chars().collect();
		if start < 0 || end < start || end as usize > chars.len() {
			return Err(Signal::Error(GossipError::IndexOutOfBoundsError));
		}
		#[allow(clippy::cast_sign_loss)]
		let slice: String = chars[start as usize..end as usize].iter().collect();
		Ok(Value::String(slice))
	}

	fn call_function(&mut self, name: &str, args: &[Ast]) -> EvalResult {
		let Value::Function(record) = self.scope.lookup(name)?.clone() else {
			return Err(Signal::Error(GossipError::InvalidOperation { op: "call".to_owned(), left: TypeTag::Unit, right: None }));
		};
		if record.params.len() != args.len() {
			return Err(Signal::Error(GossipError::InvalidProgramError { node: format!("'{name}' called with {} args, expected {}", args.len(), record.params.len()) }));
		}
		let mut evaluated = Vec::with_capacity(args.len());
		for arg in args {
			evaluated.push(self.eval_inner(arg)?);
		}

		self.scope.push_frame();
		let mut declare_error = None;
		for (param, value) in record.params.iter().zip(evaluated) {
			if let Err(error) = self.scope.declare(param, value) {
				declare_error = Some(error);
				break;
			}
		}
		let result = if let Some(error) = declare_error {
			Err(Signal::Error(error))
		} else {
			match self.eval_inner(&record.body) {
				Ok(value) => Ok(value),
				Err(Signal::Return(value)) => Ok(value),
				Err(error) => Err(error),
			}
		};
		self.scope.pop_frame();
		result
	}

	/// `ForLoop`'s sequence expression is special-cased rather than run
	/// through `eval_inner` and a `Value::List` expected back: both
	/// `Range` and a bare `ASTSequence` reduce to their *last* element
	/// under the generic "a sequence evaluates to its last value" rule,
	/// which would turn `for i in range(a, b) do ...` into an error
	/// instead of a counted loop. Evaluating each element and collecting
	/// them directly keeps the tree-walker in agreement with the VM,
	/// where `Instruction::Range` already builds the list at runtime.
	fn eval_to_values(&mut self, seq_expr: &Ast) -> std::result::Result<Vec<Value>, Signal> {
		match seq_expr {
			Ast::Range(start, end) => {
				let start = self.eval_number(start)?.floor_to_i64();
				let end = self.eval_number(end)?.floor_to_i64();
				Ok((start..=end).map(Number::from_int).map(Value::Number).collect())
			},
			Ast::ASTSequence(items) => items.iter().map(|item| self.eval_inner(item)).collect(),
			_ => match self.eval_inner(seq_expr)? {
				Value::List(items, _) => Ok(items),
				other => Err(Signal::Error(GossipError::InvalidProgramError { node: format!("'for' requires an iterable sequence, found {}", other.tag()) })),
			},
		}
	}

	fn eval_number(&mut self, ast: &Ast) -> std::result::Result<Number, Signal> {
		match self.eval_inner(ast)? {
			Value::Number(n) => Ok(n),
			other => Err(Signal::Error(GossipError::InvalidOperation { op: "numeric".to_owned(), left: other.tag(), right: None })),
		}
	}
}

/// Shared with `vm.rs`, so the tree-walker and the stack VM agree on
/// every binary operator bit for bit.
pub(crate) fn apply_binop(op: BinOpKind, left: Value, right: Value) -> Result<Value> {
	use BinOpKind::{Add, Div, Eq, Exp, Ge, Gt, Le, Lt, Mod, Mul, Neq, Quot, Rem, Sub};

	if op == Eq {
		return Ok(Value::Bool(left == right));
	}
	if op == Neq {
		return Ok(Value::Bool(left != right));
	}
	if op == Add {
		if let (Value::String(a), Value::String(b)) = (&left, &right) {
			return Ok(Value::String(format!("{a}{b}")));
		}
	}

	let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
		if op == Add {
			return Err(GossipError::InvalidConcatenationError);
		}
		return Err(GossipError::InvalidOperation { op: op.symbol().to_owned(), left: left.tag(), right: Some(right.tag()) });
	};
	let (a, b) = (*a, *b);

	match op {
		Add => Ok(Value::Number(a.add(b))),
		Sub => Ok(Value::Number(a.sub(b))),
		Mul => Ok(Value::Number(a.mul(b))),
		Div => Ok(Value::Number(a.div(b))),
		Mod => Ok(Value::Number(Number::from_int(a.floor_to_i64() % b.floor_to_i64()))),
		Exp => Ok(Value::Number(a.pow(b))),
		Quot => {
			if !a.is_integral() || !b.is_integral() {
				return Err(GossipError::RuntimeError("quot requires integral operands".to_owned()));
			}
			Ok(Value::Number(Number::from_int(a.floor_to_i64() / b.floor_to_i64())))
		},
		Rem => {
			if !a.is_integral() || !b.is_integral() {
				return Err(GossipError::RuntimeError("rem requires integral operands".to_owned()));
			}
			Ok(Value::Number(Number::from_int(a.floor_to_i64() % b.floor_to_i64())))
		},
		Lt => Ok(Value::Bool(a < b)),
		Gt => Ok(Value::Bool(a > b)),
		Le => Ok(Value::Bool(a <= b)),
		Ge => Ok(Value::Bool(a >= b)),
		Eq | Neq | BinOpKind::And | BinOpKind::Or => unreachable!("handled above"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::Parser;

	fn eval_source(source: &str) -> Value {
		let ast = Parser::new(source).parse_program().unwrap();
		Evaluator::new().eval(&ast).unwrap()
	}

	#[test]
	fn arithmetic_scenario() {
		let value = eval_source("(7 + 9) / 5 * 2");
		assert_eq!(value, Value::Number(Number::new(32, 5)));
	}

	#[test]
	fn nested_let_shadowing() {
		let value = eval_source("let a = 5 in (a + let a = a + a in a + a ;) ;");
		assert_eq!(value, Value::Number(Number::from_int(25)));
	}

	#[test]
	fn bad_assignment_leaves_binding_untouched() {
		let ast = Parser::new("declare x = 5 ; assign x = 'hello' ;").parse_program().unwrap();
		let mut evaluator = Evaluator::new();
		let result = evaluator.eval(&ast);
		assert!(result.is_err());
	}

	#[test]
	fn while_false_initially_is_unit_and_zero_iterations() {
		let ast = Parser::new("while False do { declare y = 1 ; } ;").parse_program().unwrap();
		let mut evaluator = Evaluator::new();
		let value = evaluator.eval(&ast).unwrap();
		assert_eq!(value, Value::Unit);
	}

	#[test]
	fn do_while_runs_body_exactly_once() {
		let ast = Parser::new("declare x = 0 ; repeat { assign x = x + 1 ; } while False ;").parse_program().unwrap();
		let mut evaluator = Evaluator::new();
		evaluator.eval(&ast).unwrap();
		assert_eq!(*evaluator.scope.lookup("x").unwrap(), Value::Number(Number::from_int(1)));
	}

	#[test]
	fn for_loop_over_range_yields_last_body_value_like_the_vm() {
		let value = eval_source("declare total = 0 ; for i in range(1, 4) do { assign total = total + i ; } ;");
		assert_eq!(value, Value::Number(Number::from_int(10)));
	}

	#[test]
	fn head_and_tail_of_empty_list_error() {
		let ast = Parser::new("declare y = [] ; y . head").parse_program().unwrap();
		let mut evaluator = Evaluator::new();
		assert!(matches!(evaluator.eval(&ast), Err(GossipError::ListError { .. })));
	}

	#[test]
	fn frame_stack_returns_to_depth_one() {
		let ast = Parser::new("declare j = 0 ; while j < 3 do { assign j = j + 1 ; } ;").parse_program().unwrap();
		let mut evaluator = Evaluator::new();
		evaluator.eval(&ast).unwrap();
		assert_eq!(evaluator.frame_depth(), 1);
	}
}
