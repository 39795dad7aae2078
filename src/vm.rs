//! The stack VM: executes the flat instruction vector `bytecode::codegen`
//! produces. Reuses `ScopeStack` exactly as the tree-walker does —
//! `PUSH_FRAME`/`POP_FRAME`/`DECLARE`/`STORE`/`LOAD` are a one-to-one
//! gloss of `Evaluator`'s frame handling — so a program with no
//! user-defined functions and no side effects produces the same value
//! through either path.
//!
//! This simplifies away the `LOAD_SCOPE`/`STORE_SCOPE`/`funct_sc`
//! machinery the instruction set was distilled from: that scheme
//! anchors a called function's frame at a fixed index computed from
//! where the function was declared, which stops tracking later
//! `PUSH_FRAME`/`POP_FRAME` pairs taken inside the call (they land past
//! the anchor and become unreachable to `LOAD`/`STORE`). Calling
//! `scope.push_frame()`/`pop_frame()` on the same stack the rest of the
//! VM uses avoids that discontinuity and keeps the dynamic-scoping
//! story identical to `eval.rs`.

use crate::bytecode::{ByteCode, Instruction};
use crate::error::{GossipError, Result};
use crate::eval::apply_binop;
use crate::scope::ScopeStack;
use crate::value::{Number, TypeTag, Value};

pub struct Vm<'a> {
	instructions: &'a [Instruction],
	ip: usize,
	data: Vec<Value>,
	scope: ScopeStack,
	call_stack: Vec<(usize, usize)>,
	output: Vec<String>,
}

impl<'a> Vm<'a> {
	#[must_use]
	pub fn new(code: &'a ByteCode) -> Self {
		Self { instructions: &code.instructions, ip: 0, data: Vec::new(), scope: ScopeStack::new(), call_stack: Vec::new(), output: Vec::new() }
	}

	/// Lines written by `PRINT`, in execution order.
	#[must_use]
	pub fn output(&self) -> &[String] {
		&self.output
	}

	/// The current depth of the scope frame stack. 1 once execution has
	/// returned to the global frame with every `Call`/`PushFrame` matched
	/// by its `Return`/`PopFrame`.
	#[must_use]
	pub fn frame_depth(&self) -> usize {
		self.scope.depth()
	}

	/// Runs to completion (`HALT`) and returns the value left on top of
	/// the operand stack.
	pub fn execute(&mut self) -> Result<Value> {
		loop {
			let instruction = self.instructions.get(self.ip).ok_or(GossipError::RuntimeError("instruction pointer ran off the end of the program".to_owned()))?;

			match instruction.clone() {
				Instruction::Halt => return self.pop(),

				Instruction::Push(value) => {
					self.data.push(value);
					self.ip += 1;
				},

				Instruction::Pop => {
					self.pop()?;
					self.ip += 1;
				},

				Instruction::Dup => {
					let top = self.pop()?;
					self.data.push(top.clone());
					self.data.push(top);
					self.ip += 1;
				},

				Instruction::Add | Instruction::Sub | Instruction::Mul | Instruction::Div | Instruction::Mod | Instruction::Exp | Instruction::Quot | Instruction::Rem | Instruction::Eq | Instruction::Neq | Instruction::Lt | Instruction::Gt | Instruction::Le | Instruction::Ge => {
					let right = self.pop()?;
					let left = self.pop()?;
					let op = binop_kind(instruction);
					self.data.push(apply_binop(op, left, right)?);
					self.ip += 1;
				},

				Instruction::Not => {
					let value = self.pop()?;
					let Value::Bool(b) = value else {
						return Err(GossipError::InvalidOperation { op: "not".to_owned(), left: value.tag(), right: None });
					};
					self.data.push(Value::Bool(!b));
					self.ip += 1;
				},

				Instruction::UMinus => {
					let value = self.pop()?;
					let Value::Number(n) = value else {
						return Err(GossipError::InvalidOperation { op: "-".to_owned(), left: value.tag(), right: None });
					};
					self.data.push(Value::Number(n.negate()));
					self.ip += 1;
				},

				Instruction::Jmp(label) => self.ip = target(&label)?,

				Instruction::JmpIfFalse(label) => {
					let Value::Bool(truthy) = self.pop()? else {
						return Err(GossipError::InvalidConditionError { expr: "jump condition".to_owned(), span: None });
					};
					self.ip = if truthy { self.ip + 1 } else { target(&label)? };
				},

				Instruction::JmpIfTrue(label) => {
					let Value::Bool(truthy) = self.pop()? else {
						return Err(GossipError::InvalidConditionError { expr: "jump condition".to_owned(), span: None });
					};
					self.ip = if truthy { target(&label)? } else { self.ip + 1 };
				},

				Instruction::Declare(name) => {
					let value = self.pop()?;
					self.scope.declare(&name, value)?;
					self.ip += 1;
				},

				Instruction::Store(name) => {
					let value = self.pop()?;
					self.scope.assign(&name, value)?;
					self.ip += 1;
				},

				Instruction::Load(name) => {
					let value = self.scope.lookup(&name)?.clone();
					self.data.push(value);
					self.ip += 1;
				},

				Instruction::PushFn(label) => {
					self.data.push(Value::CodeAddress(target(&label)?));
					self.ip += 1;
				},

				Instruction::Call => {
					let entry = match self.pop()? {
						Value::CodeAddress(entry) => entry,
						other => return Err(GossipError::InvalidOperation { op: "call".to_owned(), left: other.tag(), right: None }),
					};
					self.call_stack.push((self.ip + 1, self.scope.depth()));
					self.scope.push_frame();
					self.ip = entry;
				},

				Instruction::Return => {
					let (return_ip, depth_at_call) = self.call_stack.pop().ok_or(GossipError::RuntimeError("'return' outside a function call".to_owned()))?;
					// A `return` inside an `if`/`while` branch fires before that
					// branch's own `PopFrame`, so more than one frame — the
					// branch's plus the call's parameter frame — can be open.
					// Pop back down to the depth the call started from rather
					// than assuming exactly one frame is outstanding.
					while self.scope.depth() > depth_at_call {
						self.scope.pop_frame();
					}
					self.ip = return_ip;
				},

				Instruction::PushFrame => {
					self.scope.push_frame();
					self.ip += 1;
				},

				Instruction::PopFrame => {
					self.scope.pop_frame();
					self.ip += 1;
				},

				Instruction::Print => {
					let value = self.pop()?;
					self.output.push(value.to_string());
					self.data.push(value);
					self.ip += 1;
				},

				Instruction::ListNew(count) => {
					let mut items = Vec::with_capacity(count);
					for _ in 0..count {
						items.push(self.pop()?);
					}
					items.reverse();
					let tag = items.first().map_or(TypeTag::Unit, Value::tag);
					self.data.push(Value::List(items, tag));
					self.ip += 1;
				},

				Instruction::ListCons(name) => {
					let elem = self.pop()?;
					let Value::List(items, tag) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					if !items.is_empty() && elem.tag() != tag {
						return Err(GossipError::ListError { message: "cons element tag does not match the list's element tag".to_owned() });
					}
					let new_tag = if items.is_empty() { elem.tag() } else { tag };
					let mut new_items = vec![elem];
					new_items.extend(items);
					self.data.push(Value::List(new_items, new_tag));
					self.ip += 1;
				},

				Instruction::ListHead(name) => {
					let Value::List(items, _) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					let head = items.first().cloned().ok_or_else(|| GossipError::ListError { message: "head of an empty list".to_owned() })?;
					self.data.push(head);
					self.ip += 1;
				},

				Instruction::ListTail(name) => {
					let Value::List(items, tag) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					if items.is_empty() {
						return Err(GossipError::ListError { message: "tail of an empty list".to_owned() });
					}
					self.data.push(Value::List(items[1..].to_vec(), tag));
					self.ip += 1;
				},

				Instruction::ListIsEmpty(name) => {
					let Value::List(items, _) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					self.data.push(Value::Bool(items.is_empty()));
					self.ip += 1;
				},

				Instruction::ListIndex(name) => {
					let index = self.pop_number()?.floor_to_i64();
					let Value::List(items, _) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					let item = usize::try_from(index).ok().and_then(|i| items.get(i).cloned()).ok_or(GossipError::IndexOutOfBoundsError)?;
					self.data.push(item);
					self.ip += 1;
				},

				Instruction::ListLen(name) => {
					let Value::List(items, _) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::ListError { message: format!("'{name}' is not a list") });
					};
					self.data.push(Value::Number(Number::from_int(i64::try_from(items.len()).unwrap_or(i64::MAX))));
					self.ip += 1;
				},

				Instruction::Range => {
					let end = self.pop_number()?.floor_to_i64();
					let start = self.pop_number()?.floor_to_i64();
					let items: Vec<Value> = (start..=end).map(|i| Value::Number(Number::from_int(i))).collect();
					let tag = items.first().map_or(TypeTag::Unit, Value::tag);
					self.data.push(Value::List(items, tag));
					self.ip += 1;
				},

				Instruction::StringSlice(name) => {
					let end = self.pop_number()?.floor_to_i64();
					let start = self.pop_number()?.floor_to_i64();
					let Value::String(text) = self.scope.lookup(&name)?.clone() else {
						return Err(GossipError::InvalidOperation { op: "slice".to_owned(), left: TypeTag::String, right: None });
					};
					let chars: Vec<char> = text.chars().collect();
					if start < 0 || end < start || end as usize > chars.len() {
						return Err(GossipError::IndexOutOfBoundsError);
					}
					#[allow(clippy::cast_sign_loss)]
					let slice: String = chars[start as usize..end as usize].iter().collect();
					self.data.push(Value::String(slice));
					self.ip += 1;
				},
			}
		}
	}

	fn pop(&mut self) -> Result<Value> {
		self.data.pop().ok_or(GossipError::RuntimeError("operand stack underflow".to_owned()))
	}

	fn pop_number(&mut self) -> Result<Number> {
		match self.pop()? {
			Value::Number(n) => Ok(n),
			other => Err(GossipError::InvalidOperation { op: "numeric".to_owned(), left: other.tag(), right: None }),
		}
	}
}

fn target(label: &crate::bytecode::Label) -> Result<usize> {
	usize::try_from(label.target()).map_err(|_| GossipError::RuntimeError("jump target was never patched".to_owned()))
}

const fn binop_kind(instruction: &Instruction) -> crate::ast::BinOpKind {
	use crate::ast::BinOpKind;
	match instruction {
		Instruction::Add => BinOpKind::Add,
		Instruction::Sub => BinOpKind::Sub,
		Instruction::Mul => BinOpKind::Mul,
		Instruction::Div => BinOpKind::Div,
		Instruction::Mod => BinOpKind::Mod,
		Instruction::Exp => BinOpKind::Exp,
		Instruction::Quot => BinOpKind::Quot,
		Instruction::Rem => BinOpKind::Rem,
		Instruction::Eq => BinOpKind::Eq,
		Instruction::Neq => BinOpKind::Neq,
		Instruction::Lt => BinOpKind::Lt,
		Instruction::Gt => BinOpKind::Gt,
		Instruction::Le => BinOpKind::Le,
		Instruction::Ge => BinOpKind::Ge,
		_ => unreachable!("only called for binary-operator instructions"),
	}
}

/// Lowers and runs `program` in one call, for callers that do not need
/// the intermediate `ByteCode`.
pub fn run(program: &crate::ast::Ast) -> Result<(Value, Vec<String>)> {
	let code = crate::bytecode::codegen(program);
	let mut vm = Vm::new(&code);
	let value = vm.execute()?;
	Ok((value, vm.output().to_vec()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::Parser;

	fn run_source(source: &str) -> Value {
		let ast = Parser::new(source).parse_program().unwrap();
		run(&ast).unwrap().0
	}

	#[test]
	fn frame_stack_returns_to_depth_one_after_a_call_returning_from_inside_if() {
		let source = "deffunct fact(n) { if n <= 1 then { functret(1) ; } else { functret(n * callfun fact(n - 1)) ; } ; } ; callfun fact(7) ;";
		let ast = Parser::new(source).parse_program().unwrap();
		let code = crate::bytecode::codegen(&ast);
		let mut vm = Vm::new(&code);
		let value = vm.execute().unwrap();
		assert_eq!(value, Value::Number(Number::from_int(5040)));
		assert_eq!(vm.frame_depth(), 1);
	}

	#[test]
	fn arithmetic_scenario_matches_tree_walker() {
		let value = run_source("(7 + 9) / 5 * 2");
		assert_eq!(value, Value::Number(Number::new(32, 5)));
	}

	#[test]
	fn short_circuit_and_does_not_evaluate_right_side() {
		let value = run_source("declare x = False ; x && (1 / 0 == 0)");
		assert_eq!(value, Value::Bool(false));
	}

	#[test]
	fn while_loop_sums_to_expected_total() {
		let value = run_source("declare x = 0 ; declare j = 0 ; while j < 9 do { assign x = x + j ; assign j = j + 1 ; } ;");
		assert_eq!(value, Value::Unit);
	}

	#[test]
	fn function_call_computes_factorial() {
		let source = "deffunct fact(n) { if n <= 1 then { functret(1) ; } else { functret(n * callfun fact(n - 1)) ; } ; } ; callfun fact(7) ;";
		let value = run_source(source);
		assert_eq!(value, Value::Number(Number::from_int(5040)));
	}

	#[test]
	fn for_loop_yields_last_body_value_like_the_tree_walker() {
		let value = run_source("declare total = 0 ; for i in range(1, 4) do { assign total = total + i ; } ;");
		assert_eq!(value, Value::Number(Number::from_int(10)));
	}

	#[test]
	fn list_cons_and_head_round_trip() {
		let value = run_source("declare xs = [] ; declare ys = 9.cons(xs) ; ys . head");
		assert_eq!(value, Value::Number(Number::from_int(9)));
	}
}
