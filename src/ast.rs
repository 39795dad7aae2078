//! The abstract syntax tree: the parser's output, and the shared input
//! to the tree-walking evaluator and the bytecode generator.

use crate::value::Number;

/// The binary operators, spanning arithmetic, comparison, and boolean
/// connectives. Kept as one closed enum rather than splitting by
/// category, since every consumer (`eval`, `codegen`) dispatches on
/// all of them in one `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
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
	And,
	Or,
}

impl BinOpKind {
	#[must_use]
	pub const fn symbol(self) -> &'static str {
		match self {
			Self::Add => "+",
			Self::Sub => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
			Self::Exp => "**",
			Self::Quot => "quot",
			Self::Rem => "rem",
			Self::Eq => "==",
			Self::Neq => "!=",
			Self::Lt => "<",
			Self::Gt => ">",
			Self::Le => "<=",
			Self::Ge => ">=",
			Self::And => "&&",
			Self::Or => "||",
		}
	}
}

/// A list operation that does not need an explicit argument beyond the
/// list itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOpKind {
	Head,
	Tail,
	IsEmpty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
	NumLiteral(Number),
	BoolLiteral(bool),
	StringLiteral(String),
	Variable(String),
	BinOp(BinOpKind, Box<Ast>, Box<Ast>),
	UnOp(Box<Ast>),
	Not(Box<Ast>),
	If(Box<Ast>, Box<Ast>, Option<Box<Ast>>),
	While(Box<Ast>, Box<Ast>),
	DoWhile(Box<Ast>, Box<Ast>),
	ForLoop(String, Box<Ast>, Box<Ast>),
	Range(Box<Ast>, Box<Ast>),
	ASTSequence(Vec<Ast>),
	Declare(String, Box<Ast>),
	Assign(String, Box<Ast>),
	Let(String, Box<Ast>, Box<Ast>),
	Print(Box<Ast>),
	ListObject(Vec<Ast>),
	ListCons(Box<Ast>, String),
	ListOp(ListOpKind, String),
	ListIndex(Box<Ast>, String),
	StringSlice(String, Box<Ast>, Box<Ast>),
	FunctDef(String, Vec<String>, Box<Ast>),
	FunctCall(String, Vec<Ast>),
	FunctReturn(Box<Ast>),
}

impl Ast {
	/// A short human-readable label for error messages that name an
	/// unsupported AST shape (`InvalidProgramError`).
	#[must_use]
	pub const fn label(&self) -> &'static str {
		match self {
			Self::NumLiteral(_) => "NumLiteral",
			Self::BoolLiteral(_) => "BoolLiteral",
			Self::StringLiteral(_) => "StringLiteral",
			Self::Variable(_) => "Variable",
			Self::BinOp(..) => "BinOp",
			Self::UnOp(_) => "UnOp",
			Self::Not(_) => "Not",
			Self::If(..) => "If",
			Self::While(..) => "While",
			Self::DoWhile(..) => "DoWhile",
			Self::ForLoop(..) => "ForLoop",
			Self::Range(..) => "Range",
			Self::ASTSequence(_) => "ASTSequence",
			Self::Declare(..) => "Declare",
			Self::Assign(..) => "Assign",
			Self::Let(..) => "Let",
			Self::Print(_) => "Print",
			Self::ListObject(_) => "ListObject",
			Self::ListCons(..) => "ListCons",
			Self::ListOp(..) => "ListOp",
			Self::ListIndex(..) => "ListIndex",
			Self::StringSlice(..) => "StringSlice",
			Self::FunctDef(..) => "FunctDef",
			Self::FunctCall(..) => "FunctCall",
			Self::FunctReturn(_) => "FunctReturn",
		}
	}
}
