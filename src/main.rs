//! # gossip
//!
//! A small expression-oriented toy language with exact rational
//! arithmetic, lists, and dynamically-scoped user-defined functions:
//! lexer, parser, AST, tree-walking evaluator, bytecode generator, and
//! stack VM, driven by a small CLI host.
//!
//! ```bash
//! gossip -f program.gsp
//! gossip -i
//! ```

mod ast;
mod bytecode;
mod cli;
mod engine;
mod error;
mod eval;
mod lexer;
mod parser;
mod repl;
mod scope;
mod stream;
mod token;
mod value;
mod vm;

use clap::Parser as _;

use crate::cli::GossipArguments;

fn main() -> anyhow::Result<()> {
	GossipArguments::parse().execute()
}
