use std::fs;
use std::path::PathBuf;
use std::process;

use cardc::{Compiler, CompilerConfig};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "cardc")]
#[command(about = "Compile `name(in) := expression` into operator-card steps")]
struct Args {
  /// Program text, e.g. `f(in) := pair(in, "x")`
  #[arg(conflicts_with = "file", required_unless_present = "file")]
  program: Option<String>,

  /// Read the program from a file instead
  #[arg(long, short)]
  file: Option<PathBuf>,

  /// Omit explanatory comments from the listing
  #[arg(long = "no-comments")]
  no_comments: bool,

  /// Print steps without line numbers
  #[arg(long)]
  plain: bool,

  /// Name of the identity operator card
  #[arg(long = "identity-card", default_value = "identity")]
  identity_card: String,

  /// Name of the constant operator card
  #[arg(long = "constant-card", default_value = "constant")]
  constant_card: String,
}

/// Logs go to stderr so stdout carries only the listing. `RUST_LOG` overrides
/// the default filter.
fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  init_logging();

  let args = Args::parse();

  let source = match (&args.program, &args.file) {
    (Some(program), _) => program.clone(),
    (None, Some(path)) => match fs::read_to_string(path) {
      Ok(text) => text,
      Err(err) => {
        error!("failed to read {}: {err}", path.display());
        process::exit(1);
      }
    },
    (None, None) => {
      error!("no program given");
      process::exit(1);
    }
  };

  let config = CompilerConfig::default()
    .with_identity_card(args.identity_card)
    .with_constant_card(args.constant_card)
    .with_comments(!args.no_comments);
  let mut compiler = Compiler::new(config);

  match compiler.compile(&source) {
    Ok(steps) => {
      debug!(steps = steps.len(), "compilation succeeded");
      for (i, step) in steps.iter().enumerate() {
        if args.plain {
          println!("{step}");
        } else {
          println!("{:02}. {step}", i + 1);
        }
      }
    }
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
