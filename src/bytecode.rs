//! Lowers the AST to a flat instruction vector with patched jump
//! labels, mirroring the tree-walking evaluator's semantics for the
//! stack VM to execute.

use std::cell::Cell;
use std::rc::Rc;

use crate::ast::{Ast, BinOpKind, ListOpKind};
use crate::value::{Number, Value};

/// A mutable holder for an instruction-stream position: `-1` until
/// `ByteCode::emit_label` stamps it. Every instruction that jumps to a
/// given label clones this handle, so patching the label once updates
/// every instruction that references it — mirroring a plain mutable
/// struct shared by reference, the way the interpreter this was
/// distilled from represents labels.
#[derive(Debug, Clone)]
pub struct Label(Rc<Cell<i64>>);

impl Label {
	fn unresolved() -> Self {
		Self(Rc::new(Cell::new(-1)))
	}

	#[must_use]
	pub fn target(&self) -> i64 {
		self.0.get()
	}

	fn resolve(&self, target: usize) {
		#[allow(clippy::cast_possible_wrap)]
		self.0.set(target as i64);
	}
}

impl PartialEq for Label {
	fn eq(&self, other: &Self) -> bool {
		self.target() == other.target()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	Push(Value),
	Pop,
	Dup,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Exp,
	Quot,
	Rem,
	Eq,
	Neq,
	Lt,
	Gt,
	Le,
	Ge,
	Not,
	UMinus,
	Jmp(Label),
	JmpIfFalse(Label),
	JmpIfTrue(Label),
	Declare(String),
	Store(String),
	Load(String),
	PushFn(Label),
	Call,
	Return,
	PushFrame,
	PopFrame,
	Print,
	ListNew(usize),
	ListCons(String),
	ListHead(String),
	ListTail(String),
	ListIsEmpty(String),
	ListIndex(String),
	ListLen(String),
	Range,
	StringSlice(String),
	Halt,
}

/// An append-only instruction vector plus the label machinery used to
/// patch forward jumps during codegen.
#[derive(Debug, Default)]
pub struct ByteCode {
	pub instructions: Vec<Instruction>,
}

impl ByteCode {
	#[must_use]
	fn label(&self) -> Label {
		Label::unresolved()
	}

	fn emit(&mut self, instruction: Instruction) {
		self.instructions.push(instruction);
	}

	/// Stamps `label`'s target with the current instruction count —
	/// the position the next `emit` will land at.
	fn emit_label(&mut self, label: &Label) {
		label.resolve(self.instructions.len());
	}
}

/// Lowers `program` to a complete, runnable `ByteCode`: a `PUSH` of a
/// stack-bottom sentinel, the program body, then `HALT`.
#[must_use]
pub fn codegen(program: &Ast) -> ByteCode {
	let mut code = ByteCode::default();
	code.emit(Instruction::Push(Value::String("stack bottom".to_owned())));
	emit_node(program, &mut code);
	code.emit(Instruction::Halt);
	code
}

#[allow(clippy::too_many_lines)]
fn emit_node(node: &Ast, code: &mut ByteCode) {
	match node {
		Ast::NumLiteral(n) => code.emit(Instruction::Push(Value::Number(*n))),
		Ast::BoolLiteral(b) => code.emit(Instruction::Push(Value::Bool(*b))),
		Ast::StringLiteral(s) => code.emit(Instruction::Push(Value::String(s.clone()))),

		Ast::Variable(name) => code.emit(Instruction::Load(name.clone())),

		Ast::BinOp(BinOpKind::And, left, right) => {
			let end = code.label();
			emit_node(left, code);
			code.emit(Instruction::Dup);
			code.emit(Instruction::JmpIfFalse(end.clone()));
			code.emit(Instruction::Pop);
			emit_node(right, code);
			code.emit_label(&end);
		},

		Ast::BinOp(BinOpKind::Or, left, right) => {
			let end = code.label();
			emit_node(left, code);
			code.emit(Instruction::Dup);
			code.emit(Instruction::JmpIfTrue(end.clone()));
			code.emit(Instruction::Pop);
			emit_node(right, code);
			code.emit_label(&end);
		},

		Ast::BinOp(op, left, right) => {
			emit_node(left, code);
			emit_node(right, code);
			code.emit(binop_instruction(*op));
		},

		Ast::UnOp(operand) => {
			emit_node(operand, code);
			code.emit(Instruction::UMinus);
		},

		Ast::Not(operand) => {
			emit_node(operand, code);
			code.emit(Instruction::Not);
		},

		Ast::ASTSequence(items) => emit_sequence(items, code),

		Ast::If(cond, then_branch, else_branch) => {
			let else_label = code.label();
			let end_label = code.label();

			emit_node(cond, code);
			code.emit(Instruction::JmpIfFalse(else_label.clone()));
			code.emit(Instruction::PushFrame);
			emit_node(then_branch, code);
			code.emit(Instruction::PopFrame);
			code.emit(Instruction::Jmp(end_label.clone()));

			code.emit_label(&else_label);
			code.emit(Instruction::PushFrame);
			if let Some(else_branch) = else_branch {
				emit_node(else_branch, code);
			} else {
				code.emit(Instruction::Push(Value::Unit));
			}
			code.emit(Instruction::PopFrame);
			code.emit_label(&end_label);
		},

		Ast::While(cond, body) => emit_while(cond, body, code),

		Ast::DoWhile(body, cond) => {
			code.emit(Instruction::PushFrame);
			emit_node(body, code);
			code.emit(Instruction::PopFrame);
			code.emit(Instruction::Pop);
			emit_while(cond, body, code);
		},

		Ast::ForLoop(var, seq_expr, body) => emit_for(var, seq_expr, body, code),

		Ast::Range(start, end) => {
			emit_node(start, code);
			emit_node(end, code);
			code.emit(Instruction::Range);
		},

		Ast::Declare(name, expr) => {
			emit_node(expr, code);
			code.emit(Instruction::Declare(name.clone()));
		},

		Ast::Assign(name, expr) => {
			emit_node(expr, code);
			code.emit(Instruction::Store(name.clone()));
		},

		Ast::Let(var, init, body) => {
			code.emit(Instruction::PushFrame);
			emit_node(init, code);
			code.emit(Instruction::Declare(var.clone()));
			emit_node(body, code);
			code.emit(Instruction::PopFrame);
		},

		Ast::Print(expr) => {
			emit_node(expr, code);
			code.emit(Instruction::Print);
		},

		Ast::ListObject(elements) => {
			for element in elements {
				emit_node(element, code);
			}
			code.emit(Instruction::ListNew(elements.len()));
		},

		Ast::ListCons(elem, list_name) => {
			emit_node(elem, code);
			code.emit(Instruction::ListCons(list_name.clone()));
		},

		Ast::ListOp(ListOpKind::Head, name) => code.emit(Instruction::ListHead(name.clone())),
		Ast::ListOp(ListOpKind::Tail, name) => code.emit(Instruction::ListTail(name.clone())),
		Ast::ListOp(ListOpKind::IsEmpty, name) => code.emit(Instruction::ListIsEmpty(name.clone())),

		Ast::ListIndex(index, name) => {
			emit_node(index, code);
			code.emit(Instruction::ListIndex(name.clone()));
		},

		Ast::StringSlice(name, start, end) => {
			emit_node(start, code);
			emit_node(end, code);
			code.emit(Instruction::StringSlice(name.clone()));
		},

		Ast::FunctDef(name, params, body) => {
			let skip_body = code.label();
			let f_begin = code.label();

			code.emit(Instruction::Jmp(skip_body.clone()));
			code.emit_label(&f_begin);
			for param in params.iter().rev() {
				code.emit(Instruction::Declare(param.clone()));
			}
			emit_node(body, code);
			code.emit(Instruction::Return);
			code.emit_label(&skip_body);

			code.emit(Instruction::PushFn(f_begin));
			code.emit(Instruction::Declare(name.clone()));
		},

		Ast::FunctCall(name, args) => {
			for arg in args {
				emit_node(arg, code);
			}
			code.emit(Instruction::Load(name.clone()));
			code.emit(Instruction::Call);
		},

		Ast::FunctReturn(expr) => {
			emit_node(expr, code);
			code.emit(Instruction::Return);
		},
	}
}

fn emit_sequence(items: &[Ast], code: &mut ByteCode) {
	let Some((last, rest)) = items.split_last() else {
		code.emit(Instruction::Push(Value::Unit));
		return;
	};
	for item in rest {
		emit_node(item, code);
		code.emit(Instruction::Pop);
	}
	emit_node(last, code);
}

/// `While(c, b) → B: c; JMP_IF_FALSE E; PUSH_FRAME; b; POP_FRAME; POP;
/// JMP B; E: PUSH(Unit)` — the bytecode form always yields `Unit`,
/// even though the tree-walker yields the last body value; this
/// mismatch is the documented quirk the design notes call out for
/// `&&`/`||` in the other direction, kept here exactly as the lowering
/// table specifies.
fn emit_while(cond: &Ast, body: &Ast, code: &mut ByteCode) {
	let begin = code.label();
	let end = code.label();
	code.emit_label(&begin);

	emit_node(cond, code);
	code.emit(Instruction::JmpIfFalse(end.clone()));
	code.emit(Instruction::PushFrame);
	emit_node(body, code);
	code.emit(Instruction::PopFrame);
	code.emit(Instruction::Pop);
	code.emit(Instruction::Jmp(begin));
	code.emit_label(&end);
	code.emit(Instruction::Push(Value::Unit));
}

/// Not part of the original lowering table (`ForLoop` is absent from
/// it entirely); desugared here into an indexed walk over a
/// materialized sequence using two hidden, frame-scoped bindings, and
/// — unlike `While` — threading the last body value through as its
/// result, matching the tree-walking evaluator's `ForLoop` semantics
/// exactly (so the AST-level round-trip property holds for loops too).
fn emit_for(var: &str, seq_expr: &Ast, body: &Ast, code: &mut ByteCode) {
	let seq_name = format!("__for_seq_{var}");
	let idx_name = format!("__for_idx_{var}");

	code.emit(Instruction::PushFrame);
	emit_node(seq_expr, code);
	code.emit(Instruction::Declare(seq_name.clone()));
	code.emit(Instruction::Push(Value::Number(Number::from_int(0))));
	code.emit(Instruction::Declare(idx_name.clone()));
	code.emit(Instruction::Push(Value::Unit));

	let begin = code.label();
	let end = code.label();
	code.emit_label(&begin);

	code.emit(Instruction::Load(idx_name.clone()));
	code.emit(Instruction::ListLen(seq_name.clone()));
	code.emit(Instruction::Lt);
	code.emit(Instruction::JmpIfFalse(end.clone()));

	code.emit(Instruction::Pop);
	code.emit(Instruction::PushFrame);
	code.emit(Instruction::Load(idx_name.clone()));
	code.emit(Instruction::ListIndex(seq_name.clone()));
	code.emit(Instruction::Declare(var.to_owned()));
	emit_node(body, code);
	code.emit(Instruction::PopFrame);

	code.emit(Instruction::Load(idx_name.clone()));
	code.emit(Instruction::Push(Value::Number(Number::from_int(1))));
	code.emit(Instruction::Add);
	code.emit(Instruction::Store(idx_name));
	code.emit(Instruction::Jmp(begin));

	code.emit_label(&end);
	code.emit(Instruction::PopFrame);
}

const fn binop_instruction(op: BinOpKind) -> Instruction {
	match op {
		BinOpKind::Add => Instruction::Add,
		BinOpKind::Sub => Instruction::Sub,
		BinOpKind::Mul => Instruction::Mul,
		BinOpKind::Div => Instruction::Div,
		BinOpKind::Mod => Instruction::Mod,
		BinOpKind::Exp => Instruction::Exp,
		BinOpKind::Quot => Instruction::Quot,
		BinOpKind::Rem => Instruction::Rem,
		BinOpKind::Eq => Instruction::Eq,
		BinOpKind::Neq => Instruction::Neq,
		BinOpKind::Lt => Instruction::Lt,
		BinOpKind::Gt => Instruction::Gt,
		BinOpKind::Le => Instruction::Le,
		BinOpKind::Ge => Instruction::Ge,
		BinOpKind::And | BinOpKind::Or => unreachable!("short-circuit ops are lowered separately"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn if_then_else_patches_distinct_labels() {
		let ast = Ast::If(Box::new(Ast::BoolLiteral(true)), Box::new(Ast::NumLiteral(Number::from_int(1))), Some(Box::new(Ast::NumLiteral(Number::from_int(2)))));
		let code = codegen(&ast);
		for instruction in &code.instructions {
			match instruction {
				Instruction::Jmp(label) | Instruction::JmpIfFalse(label) => assert!(label.target() >= 0, "label left unpatched"),
				_ => {},
			}
		}
	}

	#[test]
	fn and_short_circuits_with_dup_jump_pop() {
		let ast = Ast::BinOp(BinOpKind::And, Box::new(Ast::BoolLiteral(false)), Box::new(Ast::BoolLiteral(true)));
		let code = codegen(&ast);
		assert!(code.instructions.iter().any(|i| matches!(i, Instruction::Dup)));
		assert!(code.instructions.iter().any(|i| matches!(i, Instruction::JmpIfFalse(_))));
	}
}
