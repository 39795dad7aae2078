//! The command-line host: argument parsing and the two run modes
//! (`-f`/`-i`) the core's `eval`/`repl_step` are driven through.
//! Everything here is a thin collaborator — no language semantics live
//! in this module.

use std::io::{self, BufRead, Write as _};

use colored::Colorize as _;

use crate::engine::compile_and_run_with_output;
use crate::error::{GossipError, Result as GossipResult};
use crate::repl::{repl_step, ReplState};
use crate::value::Value;

/// Command-line arguments for the `gossip` binary.
#[derive(clap::Parser)]
#[command(name = "gossip", about = "The core execution engine of Gossip, a small expression-oriented toy language.")]
pub struct GossipArguments {
	/// Run the program in the given file and print its final value.
	#[arg(long, short = 'f')]
	pub from_file: Option<String>,

	/// Start an interactive read-eval-print loop instead of running a file.
	#[arg(long, short = 'i')]
	pub interpret: bool,

	/// Print the evaluator's accumulated `Print` output alongside the
	/// final value, instead of only the final value.
	#[arg(long, short = 's')]
	pub show_feedback: bool,

	/// Emit a graph file of the parsed AST. The visualizer itself is an
	/// external collaborator (see `spec.md` §1's Non-goals); this flag
	/// is accepted so the CLI surface matches §6, but is reported as
	/// not implemented in this build rather than silently ignored.
	#[arg(long, short = 'v')]
	pub visualize: bool,

	/// Self-update the `gossip` binary. Also an external collaborator;
	/// see `visualize` above.
	#[arg(long, short = 'u')]
	pub update: bool,
}

impl GossipArguments {
	/// Dispatches to the requested run mode. Mirrors the exit-code
	/// contract of §6: 0 on normal termination.
	pub fn execute(&self) -> anyhow::Result<()> {
		if self.update {
			println!("{}", "gossip -u/--update is not implemented by this build; self-update is an external collaborator.".yellow());
			return Ok(());
		}
		if self.visualize {
			println!("{}", "gossip -v/--visualize is not implemented by this build; the AST visualizer is an external collaborator.".yellow());
			return Ok(());
		}

		if self.interpret {
			return run_repl(self.show_feedback);
		}

		let Some(path) = &self.from_file else {
			anyhow::bail!("no program given: pass -f/--from-file PATH or -i/--interpret");
		};
		run_file(path, self.show_feedback)
	}
}

fn run_file(path: &str, show_feedback: bool) -> anyhow::Result<()> {
	let extension_ok = path.ends_with(".gsp") || path.ends_with(".gossip");
	if !extension_ok {
		print_error(&GossipError::InvalidFileExtensionError { ext: path.rsplit('.').next().unwrap_or_default().to_owned() });
		anyhow::bail!("unrecognized file extension");
	}

	let source = std::fs::read_to_string(path).map_err(|error| anyhow::anyhow!("could not read '{path}': {error}"))?;

	let (outcome, output) = compile_and_run_with_output(&source);

	if show_feedback {
		for line in &output {
			println!("{} {line}", "print:".truecolor(100, 100, 100));
		}
	}

	match outcome {
		Ok(value) => {
			println!("{} {value}", "=>".green().bold());
			Ok(())
		},
		Err(error) => {
			print_error(&error);
			anyhow::bail!("program terminated with an error");
		},
	}
}

fn run_repl(show_feedback: bool) -> anyhow::Result<()> {
	println!("{}", "gossip interactive session. Ctrl-D to exit.".cyan().bold());
	let mut state = ReplState::new();
	let mut reported_output = 0usize;
	let stdin = io::stdin();
	loop {
		print!("{} ", ">".blue().bold());
		io::stdout().flush()?;

		let mut line = String::new();
		if stdin.lock().read_line(&mut line)? == 0 {
			println!();
			return Ok(());
		}
		let line = line.trim_end_matches('\n');

		if let Some(result) = repl_step(line, &mut state) {
			report_step(result, &state, show_feedback, &mut reported_output);
		}
	}
}

fn report_step(result: GossipResult<Value>, state: &ReplState, show_feedback: bool, reported_output: &mut usize) {
	match result {
		Ok(value) => {
			if show_feedback {
				for line in &state.evaluator().output()[*reported_output..] {
					println!("{} {line}", "print:".truecolor(100, 100, 100));
				}
				*reported_output = state.evaluator().output().len();
			}
			println!("{} {value}", "=>".green().bold());
		},
		Err(error) => print_error(&error),
	}
}

fn print_error(error: &GossipError) {
	if let Some(span) = error.span() {
		eprintln!("{} {error} ({span})", "error:".red().bold());
	} else {
		eprintln!("{} {error}", "error:".red().bold());
	}
}
