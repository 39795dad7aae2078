//! The conceptual host entry points: parse a full source string and run
//! it through either backend. Neither function depends on how the host
//! reads source or prints results — that is `cli`'s job.

use crate::error::Result;
use crate::eval::Evaluator;
use crate::parser::Parser;
use crate::value::Value;
use crate::vm;

/// Parses `source` in full and evaluates it through the tree-walking
/// path. A fresh `Evaluator` is used for each call, so no frames or
/// bindings persist across successive invocations — callers that want
/// a persistent session (the REPL) drive `Parser`/`Evaluator`
/// themselves; see `repl.rs`.
pub fn compile_and_run(source: &str) -> Result<Value> {
	let ast = Parser::new(source).parse_program()?;
	Evaluator::new().eval(&ast)
}

/// The same program run through the bytecode generator and stack VM
/// instead of the tree-walker. Per the round-trip property, this
/// agrees with `compile_and_run` for any program with no side effects
/// and no user-defined functions.
pub fn compile_and_run_bytecode(source: &str) -> Result<Value> {
	let ast = Parser::new(source).parse_program()?;
	vm::run(&ast).map(|(value, _output)| value)
}

/// `compile_and_run`, but also returns every line the program printed
/// along the way, in order, regardless of whether evaluation ultimately
/// succeeded or failed. Used by the `-f`/`-s` file-run path, where the
/// accumulated `Print` output must survive even a program that errors
/// out partway through.
pub fn compile_and_run_with_output(source: &str) -> (Result<Value>, Vec<String>) {
	let mut evaluator = Evaluator::new();
	let outcome = Parser::new(source).parse_program().and_then(|ast| evaluator.eval(&ast));
	(outcome, evaluator.output().to_vec())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Number;

	#[test]
	fn compile_and_run_evaluates_a_full_program() {
		let value = compile_and_run("declare x = 2 ; declare y = 3 ; x * y").unwrap();
		assert_eq!(value, Value::Number(Number::from_int(6)));
	}

	#[test]
	fn both_paths_agree_on_a_side_effect_free_program() {
		let source = "(7 + 9) / 5 * 2";
		assert_eq!(compile_and_run(source).unwrap(), compile_and_run_bytecode(source).unwrap());
	}

	#[test]
	fn scenario_arithmetic() {
		let value = compile_and_run("(7 + 9) / 5 * 2").unwrap();
		assert_eq!(value, Value::Number(Number::new(32, 5)));
	}

	#[test]
	fn scenario_nested_let_shadowing() {
		let value = compile_and_run("let a = 5 in (a + let a = a+a in a+a ;) ;").unwrap();
		assert_eq!(value, Value::Number(Number::from_int(25)));
	}

	#[test]
	fn scenario_while_sum() {
		let source = "
			declare j = 0 ;
			declare x = 0 ;
			while j <= 8 do {
				declare i = 0 ;
				assign i = 2 * j ;
				assign x = x + i ;
				assign j = j + 1 ;
			} ;
			x
		";
		let value = compile_and_run(source).unwrap();
		assert_eq!(value, Value::Number(Number::from_int(72)));
	}

	#[test]
	fn scenario_recursive_factorial() {
		let source = "
			deffunct f(a) {
				if a <= 1 then {
					functret(1) ;
				} else {
					assign a = a - 1 ;
					functret((a + 1) * callfun f(a)) ;
				} ;
			} ;
			callfun f(7) ;
		";
		let value = compile_and_run(source).unwrap();
		assert_eq!(value, Value::Number(Number::from_int(5040)));

		let vm_value = compile_and_run_bytecode(source).unwrap();
		assert_eq!(vm_value, Value::Number(Number::from_int(5040)));
	}

	#[test]
	fn scenario_list_cons_and_head() {
		let source = "
			declare y = [1, 2, 3, 4, 5] ;
			declare z = y.cons(9) ;
			z.head
		";
		assert_eq!(compile_and_run(source).unwrap(), Value::Number(Number::from_int(9)));

		let tail_source = "
			declare y = [1, 2, 3, 4, 5] ;
			declare z = y.cons(9) ;
			z.tail
		";
		let tail = compile_and_run(tail_source).unwrap();
		let Value::List(items, _) = tail else { panic!("expected a list, got {tail:?}") };
		let expected: Vec<i64> = vec![1, 2, 3, 4, 5];
		let actual: Vec<i64> = items
			.into_iter()
			.map(|value| match value {
				Value::Number(number) => number.floor_to_i64(),
				other => panic!("expected a number element, got {other:?}"),
			})
			.collect();
		assert_eq!(actual, expected);
	}

	#[test]
	fn scenario_bad_assignment_leaves_binding_untouched() {
		let source = "declare x = 5 ; assign x = 'hello' ;";
		assert!(compile_and_run(source).is_err());
	}
}
