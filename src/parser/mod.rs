//! Recursive-descent parser: token stream → AST, with explicit
//! precedence levels for the expression grammar and one dedicated
//! parse function per statement-like form.

use crate::ast::{Ast, BinOpKind, ListOpKind};
use crate::error::{GossipError, Result, Span};
use crate::lexer::Lexer;
use crate::token::TokenType;

pub struct Parser {
	lexer: Lexer,
}

impl Parser {
	#[must_use]
	pub fn new(source: &str) -> Self {
		Self { lexer: Lexer::new(source) }
	}

	/// Parses every top-level form until the token stream is
	/// exhausted, per `parse_expression`'s iteration contract: one
	/// top-level AST per call until `EndOfTokens` terminates the
	/// program.
	pub fn parse_program(&mut self) -> Result<Ast> {
		let mut items = Vec::new();
		loop {
			match self.lexer.peek() {
				Ok(_) => items.push(self.parse_expression()?),
				Err(GossipError::EndOfTokens) => break,
				Err(other) => return Err(other),
			}
		}
		Ok(Ast::ASTSequence(items))
	}

	/// The shared entry point used both for top-level program items and
	/// for each item inside a `block`: dispatches to a dedicated
	/// statement parser when the next token is a statement-introducing
	/// keyword, otherwise parses a bare expression and swallows an
	/// optional trailing `;` (the non-final-statement case).
	pub fn parse_expression(&mut self) -> Result<Ast> {
		if let TokenType::Keyword(word) = &self.lexer.peek()?.kind {
			let word = word.clone();
			match word.as_str() {
				"let" => return self.parse_let(),
				"declare" => return self.parse_declare(),
				"assign" => return self.parse_assign(),
				"if" => return self.parse_if(),
				"while" => return self.parse_while(),
				"repeat" => return self.parse_do_while(),
				"for" => return self.parse_for(),
				"print" => return self.parse_print(),
				"deffunct" => return self.parse_funct_def(),
				"functret" => return self.parse_funct_return(),
				_ => {},
			}
		}
		if self.peek_is_symbol('{') {
			return self.parse_block();
		}
		let expr = self.parse_simple()?;
		if self.peek_is_symbol(';') {
			self.lexer.advance()?;
		}
		Ok(expr)
	}

	// ---- statement-like forms ----

	fn parse_let(&mut self) -> Result<Ast> {
		self.expect_keyword("let")?;
		let name = self.expect_identifier()?;
		self.expect_operator("=")?;
		let init = self.parse_simple()?;
		if self.peek_is_keyword("in") {
			self.lexer.advance()?;
			let body = self.parse_branch()?;
			self.expect_symbol(';')?;
			Ok(Ast::Let(name.clone(), Box::new(init), Box::new(body)))
		} else {
			// Two-argument `Let(v, e)` sugar for `Let(v, e, Variable(v))`.
			self.expect_symbol(';')?;
			Ok(Ast::Let(name.clone(), Box::new(init), Box::new(Ast::Variable(name))))
		}
	}

	fn parse_declare(&mut self) -> Result<Ast> {
		self.expect_keyword("declare")?;
		let name = self.expect_identifier()?;
		self.expect_operator("=")?;
		let value = self.parse_simple()?;
		self.expect_symbol(';')?;
		Ok(Ast::Declare(name, Box::new(value)))
	}

	fn parse_assign(&mut self) -> Result<Ast> {
		self.expect_keyword("assign")?;
		let name = self.expect_identifier()?;
		self.expect_operator("=")?;
		let value = self.parse_simple()?;
		self.expect_symbol(';')?;
		Ok(Ast::Assign(name, Box::new(value)))
	}

	fn parse_if(&mut self) -> Result<Ast> {
		self.expect_keyword("if")?;
		let cond = self.parse_simple()?;
		self.expect_keyword("then")?;
		let then_branch = self.parse_branch()?;
		let else_branch = if self.peek_is_keyword("else") {
			self.lexer.advance()?;
			Some(Box::new(self.parse_branch()?))
		} else {
			None
		};
		self.expect_symbol(';')?;
		Ok(Ast::If(Box::new(cond), Box::new(then_branch), else_branch))
	}

	fn parse_while(&mut self) -> Result<Ast> {
		self.expect_keyword("while")?;
		let cond = self.parse_simple()?;
		self.expect_keyword("do")?;
		let body = self.parse_branch()?;
		self.expect_symbol(';')?;
		Ok(Ast::While(Box::new(cond), Box::new(body)))
	}

	fn parse_do_while(&mut self) -> Result<Ast> {
		self.expect_keyword("repeat")?;
		let body = self.parse_branch()?;
		self.expect_keyword("while")?;
		let cond = self.parse_simple()?;
		self.expect_symbol(';')?;
		Ok(Ast::DoWhile(Box::new(body), Box::new(cond)))
	}

	fn parse_for(&mut self) -> Result<Ast> {
		self.expect_keyword("for")?;
		let var = self.expect_identifier()?;
		self.expect_keyword("in")?;
		let seq = self.parse_simple()?;
		self.expect_keyword("do")?;
		let body = self.parse_branch()?;
		self.expect_symbol(';')?;
		Ok(Ast::ForLoop(var, Box::new(seq), Box::new(body)))
	}

	fn parse_print(&mut self) -> Result<Ast> {
		self.expect_keyword("print")?;
		self.expect_symbol('(')?;
		let expr = self.parse_simple()?;
		self.expect_symbol(')')?;
		self.expect_symbol(';')?;
		Ok(Ast::Print(Box::new(expr)))
	}

	fn parse_funct_def(&mut self) -> Result<Ast> {
		self.expect_keyword("deffunct")?;
		let name = self.expect_identifier()?;
		self.expect_symbol('(')?;
		let params = self.parse_identifier_list(')')?;
		self.expect_symbol(')')?;
		let body = self.parse_block()?;
		self.expect_symbol(';')?;
		Ok(Ast::FunctDef(name, params, Box::new(body)))
	}

	/// A primary expression, not a statement: `callfun name(args)` can
	/// appear nested inside arithmetic (`n * callfun fact(n - 1)`), so
	/// this is reached from `parse_atom` rather than `parse_expression`'s
	/// statement dispatch, and does not consume a trailing `;` itself —
	/// the enclosing `parse_expression` call does that when `callfun`
	/// starts a whole statement.
	fn parse_funct_call(&mut self) -> Result<Ast> {
		self.expect_keyword("callfun")?;
		let name = self.expect_identifier()?;
		self.expect_symbol('(')?;
		let args = self.parse_expr_list(')')?;
		self.expect_symbol(')')?;
		Ok(Ast::FunctCall(name, args))
	}

	fn parse_funct_return(&mut self) -> Result<Ast> {
		self.expect_keyword("functret")?;
		self.expect_symbol('(')?;
		let expr = self.parse_simple()?;
		self.expect_symbol(')')?;
		self.expect_symbol(';')?;
		Ok(Ast::FunctReturn(Box::new(expr)))
	}

	/// A branch of `if`/`while`/`repeat`/`for` is either a `block` or a
	/// bare `simple` expression; neither consumes the enclosing
	/// statement's own trailing `;`.
	fn parse_branch(&mut self) -> Result<Ast> {
		if self.peek_is_symbol('{') {
			self.parse_block()
		} else {
			self.parse_simple()
		}
	}

	fn parse_block(&mut self) -> Result<Ast> {
		self.expect_symbol('{')?;
		let mut items = Vec::new();
		while !self.peek_is_symbol('}') {
			items.push(self.parse_expression()?);
		}
		self.expect_symbol('}')?;
		Ok(Ast::ASTSequence(items))
	}

	// ---- expression precedence chain ----

	fn parse_simple(&mut self) -> Result<Ast> {
		let left = self.parse_comparison()?;
		if self.peek_is_operator("&&") {
			self.lexer.advance()?;
			let right = self.parse_comparison()?;
			return Ok(Ast::BinOp(BinOpKind::And, Box::new(left), Box::new(right)));
		}
		if self.peek_is_operator("||") {
			self.lexer.advance()?;
			let right = self.parse_comparison()?;
			return Ok(Ast::BinOp(BinOpKind::Or, Box::new(left), Box::new(right)));
		}
		Ok(left)
	}

	fn parse_comparison(&mut self) -> Result<Ast> {
		let left = self.parse_addition()?;
		let kind = match self.peek_operator_str() {
			Some("==") => Some(BinOpKind::Eq),
			Some("!=") => Some(BinOpKind::Neq),
			Some("<=") => Some(BinOpKind::Le),
			Some(">=") => Some(BinOpKind::Ge),
			Some("<") => Some(BinOpKind::Lt),
			Some(">") => Some(BinOpKind::Gt),
			Some("quot") => Some(BinOpKind::Quot),
			Some("rem") => Some(BinOpKind::Rem),
			_ => None,
		};
		let Some(kind) = kind else {
			return Ok(left);
		};
		self.lexer.advance()?;
		let right = self.parse_addition()?;
		Ok(Ast::BinOp(kind, Box::new(left), Box::new(right)))
	}

	fn parse_addition(&mut self) -> Result<Ast> {
		let mut left = self.parse_multiplication()?;
		loop {
			let kind = match self.peek_operator_str() {
				Some("+") => BinOpKind::Add,
				Some("-") => BinOpKind::Sub,
				_ => break,
			};
			self.lexer.advance()?;
			let right = self.parse_multiplication()?;
			left = Ast::BinOp(kind, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_multiplication(&mut self) -> Result<Ast> {
		let mut left = self.parse_modulo()?;
		loop {
			let kind = match self.peek_operator_str() {
				Some("*") => BinOpKind::Mul,
				Some("/") => BinOpKind::Div,
				_ => break,
			};
			self.lexer.advance()?;
			let right = self.parse_modulo()?;
			left = Ast::BinOp(kind, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_modulo(&mut self) -> Result<Ast> {
		let mut left = self.parse_exponent()?;
		while self.peek_is_operator("%") {
			self.lexer.advance()?;
			let right = self.parse_exponent()?;
			left = Ast::BinOp(BinOpKind::Mod, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	/// `**` sits between `mod` and `atom` in the precedence chain; the
	/// grammar table lists it among the symbolic operators without
	/// naming its level explicitly, so it is placed here, right-
	/// associatively, the conventional slot for exponentiation.
	fn parse_exponent(&mut self) -> Result<Ast> {
		let base = self.parse_unary()?;
		if self.peek_is_operator("**") {
			self.lexer.advance()?;
			let exponent = self.parse_exponent()?;
			return Ok(Ast::BinOp(BinOpKind::Exp, Box::new(base), Box::new(exponent)));
		}
		Ok(base)
	}

	/// `UnOp("-", ...)` and `Not(...)` are not placed explicitly in the
	/// grammar table either; as prefix operators they sit directly
	/// above `atom`.
	fn parse_unary(&mut self) -> Result<Ast> {
		if self.peek_is_operator("-") {
			self.lexer.advance()?;
			let operand = self.parse_unary()?;
			return Ok(Ast::UnOp(Box::new(operand)));
		}
		if self.peek_is_operator("not") {
			self.lexer.advance()?;
			let operand = self.parse_unary()?;
			return Ok(Ast::Not(Box::new(operand)));
		}
		self.parse_atom()
	}

	fn parse_atom(&mut self) -> Result<Ast> {
		let token = self.lexer.peek()?.clone();
		match token.kind {
			TokenType::Num(value, _) => {
				self.lexer.advance()?;
				Ok(Ast::NumLiteral(value))
			},
			TokenType::Bool(value) => {
				self.lexer.advance()?;
				Ok(Ast::BoolLiteral(value))
			},
			TokenType::Symbol('\'') => {
				self.lexer.advance()?;
				let body = self.expect_identifier()?;
				self.expect_symbol('\'')?;
				Ok(Ast::StringLiteral(body))
			},
			TokenType::Symbol('[') => self.parse_list_literal(),
			TokenType::Keyword(ref word) if word == "range" => self.parse_range(),
			TokenType::Keyword(ref word) if word == "callfun" => self.parse_funct_call(),
			TokenType::Symbol('(') => {
				self.lexer.advance()?;
				let inner = self.parse_simple()?;
				self.expect_symbol(')')?;
				Ok(inner)
			},
			TokenType::Identifier(name) => {
				self.lexer.advance()?;
				self.parse_atom_suffix(name)
			},
			other => Err(GossipError::TokenError {
				expected: "a number, bool, string, list, or identifier".to_owned(),
				actual: other.to_string(),
				span: Some(Span { line: token.line, column: token.column }),
			}),
		}
	}

	fn parse_atom_suffix(&mut self, name: String) -> Result<Ast> {
		if self.peek_is_symbol('.') {
			self.lexer.advance()?;
			let op_name = self.expect_identifier()?;
			return match op_name.as_str() {
				"cons" => {
					self.expect_symbol('(')?;
					let elem = self.parse_simple()?;
					self.expect_symbol(')')?;
					Ok(Ast::ListCons(Box::new(elem), name))
				},
				"head" => Ok(Ast::ListOp(ListOpKind::Head, name)),
				"tail" => Ok(Ast::ListOp(ListOpKind::Tail, name)),
				"empty" => Ok(Ast::ListOp(ListOpKind::IsEmpty, name)),
				other => Err(GossipError::TokenError {
					expected: "cons, head, tail, or empty".to_owned(),
					actual: other.to_owned(),
					span: None,
				}),
			};
		}
		if self.peek_is_symbol('[') {
			self.lexer.advance()?;
			let start = self.parse_simple()?;
			if self.peek_is_symbol('.') {
				self.lexer.advance()?;
				self.expect_symbol('.')?;
				let end = self.parse_simple()?;
				self.expect_symbol(']')?;
				return Ok(Ast::StringSlice(name, Box::new(start), Box::new(end)));
			}
			self.expect_symbol(']')?;
			return Ok(Ast::ListIndex(Box::new(start), name));
		}
		Ok(Ast::Variable(name))
	}

	fn parse_list_literal(&mut self) -> Result<Ast> {
		self.expect_symbol('[')?;
		let elements = self.parse_expr_list(']')?;
		self.expect_symbol(']')?;
		Ok(Ast::ListObject(elements))
	}

	fn parse_range(&mut self) -> Result<Ast> {
		self.expect_keyword("range")?;
		self.expect_symbol('(')?;
		let start = self.parse_simple()?;
		self.expect_symbol(',')?;
		let end = self.parse_simple()?;
		self.expect_symbol(')')?;
		Ok(Ast::Range(Box::new(start), Box::new(end)))
	}

	// ---- shared helpers ----

	fn parse_identifier_list(&mut self, closing: char) -> Result<Vec<String>> {
		let mut names = Vec::new();
		if self.peek_is_symbol(closing) {
			return Ok(names);
		}
		names.push(self.expect_identifier()?);
		while self.peek_is_symbol(',') {
			self.lexer.advance()?;
			names.push(self.expect_identifier()?);
		}
		Ok(names)
	}

	fn parse_expr_list(&mut self, closing: char) -> Result<Vec<Ast>> {
		let mut items = Vec::new();
		if self.peek_is_symbol(closing) {
			return Ok(items);
		}
		items.push(self.parse_simple()?);
		while self.peek_is_symbol(',') {
			self.lexer.advance()?;
			items.push(self.parse_simple()?);
		}
		Ok(items)
	}

	fn peek_is_symbol(&mut self, expected: char) -> bool {
		matches!(self.lexer.peek(), Ok(token) if token.kind == TokenType::Symbol(expected))
	}

	fn peek_is_keyword(&mut self, expected: &str) -> bool {
		matches!(self.lexer.peek(), Ok(token) if matches!(&token.kind, TokenType::Keyword(word) if word == expected))
	}

	fn peek_is_operator(&mut self, expected: &str) -> bool {
		matches!(self.lexer.peek(), Ok(token) if matches!(&token.kind, TokenType::Operator(op) if op == expected))
	}

	fn peek_operator_str(&mut self) -> Option<&str> {
		match self.lexer.peek() {
			Ok(token) => match &token.kind {
				TokenType::Operator(op) => Some(op.as_str()),
				_ => None,
			},
			Err(_) => None,
		}
	}

	fn expect_symbol(&mut self, expected: char) -> Result<()> {
		self.lexer.match_token(&TokenType::Symbol(expected)).map(|_| ())
	}

	fn expect_keyword(&mut self, expected: &str) -> Result<()> {
		self.lexer.match_token(&TokenType::Keyword(expected.to_owned())).map(|_| ())
	}

	fn expect_operator(&mut self, expected: &str) -> Result<()> {
		self.lexer.match_token(&TokenType::Operator(expected.to_owned())).map(|_| ())
	}

	fn expect_identifier(&mut self) -> Result<String> {
		let token = self.lexer.advance()?;
		match token.kind {
			TokenType::Identifier(name) => Ok(name),
			other => Err(GossipError::TokenError {
				expected: "an identifier".to_owned(),
				actual: other.to_string(),
				span: Some(Span { line: token.line, column: token.column }),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Number;

	#[test]
	fn parses_arithmetic_precedence() {
		let ast = Parser::new("(7 + 9) / 5 * 2").parse_simple().unwrap();
		let seven_plus_nine = Ast::BinOp(BinOpKind::Add, Box::new(Ast::NumLiteral(Number::from_int(7))), Box::new(Ast::NumLiteral(Number::from_int(9))));
		let divided = Ast::BinOp(BinOpKind::Div, Box::new(seven_plus_nine), Box::new(Ast::NumLiteral(Number::from_int(5))));
		let expected = Ast::BinOp(BinOpKind::Mul, Box::new(divided), Box::new(Ast::NumLiteral(Number::from_int(2))));
		assert_eq!(ast, expected);
	}

	#[test]
	fn parses_declare_statement() {
		let ast = Parser::new("declare x = 5 ;").parse_expression().unwrap();
		assert_eq!(ast, Ast::Declare("x".to_owned(), Box::new(Ast::NumLiteral(Number::from_int(5)))));
	}

	#[test]
	fn parses_let_two_argument_sugar() {
		let ast = Parser::new("let a = 5 ;").parse_expression().unwrap();
		assert_eq!(
			ast,
			Ast::Let("a".to_owned(), Box::new(Ast::NumLiteral(Number::from_int(5))), Box::new(Ast::Variable("a".to_owned())))
		);
	}

	#[test]
	fn parses_if_with_block_branches() {
		let ast = Parser::new("if True then { declare x = 1 ; } else { declare x = 2 ; } ;").parse_expression().unwrap();
		assert!(matches!(ast, Ast::If(_, _, Some(_))));
	}

	#[test]
	fn parses_function_definition_and_call() {
		let def = Parser::new("deffunct add(a, b) { functret(a + b) ; } ;").parse_expression().unwrap();
		assert!(matches!(def, Ast::FunctDef(name, params, _) if name == "add" && params == vec!["a".to_owned(), "b".to_owned()]));

		let call = Parser::new("callfun add(1, 2) ;").parse_expression().unwrap();
		assert!(matches!(call, Ast::FunctCall(name, args) if name == "add" && args.len() == 2));
	}

	#[test]
	fn parses_list_cons_and_head() {
		let cons = Parser::new("y . cons(9) ;").parse_expression().unwrap();
		assert!(matches!(cons, Ast::ListCons(_, name) if name == "y"));
		let head = Parser::new("y . head").parse_expression().unwrap();
		assert!(matches!(head, Ast::ListOp(ListOpKind::Head, name) if name == "y"));
	}
}
