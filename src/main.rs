//! Reads and processes binary files.
//!
//! Usage: `binary_reader -f format.def -i data.bin [-t TypeName]`
//!
//! Emits the parsed record as JSON on stdout; diagnostics go to stderr one
//! per line. Exit code 0 on success, 1 otherwise.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use binary_reader::{ErrorCollection, FileParser, JsonOptions};

#[derive(Parser)]
#[command(name = "binary_reader", version, about = "Reads and processes binary files")]
struct Cli {
    /// The path to the binary file definition.
    #[arg(short = 'f', long = "format")]
    format: String,

    /// The path to the binary file.
    #[arg(short = 'i', long = "input")]
    input: String,

    /// The root type name to parse; defaults to the last type in the
    /// definition.
    #[arg(short = 't', long = "type")]
    type_name: Option<String>,

    /// Emit compact JSON on a single line.
    #[arg(long)]
    compact: bool,

    /// Indent width for pretty output.
    #[arg(long, default_value_t = 2)]
    indent: usize,
}

fn print_diagnostics(errors: &ErrorCollection) {
    for error in errors {
        eprintln!("{error}");
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let mut errors = ErrorCollection::new();
    let parser = FileParser::from_file(&cli.format, &mut errors);
    print_diagnostics(&errors);
    let Some(parser) = parser else {
        return Ok(false);
    };

    errors.clear();
    let record = parser.parse_file(&cli.input, cli.type_name.as_deref(), &mut errors);
    print_diagnostics(&errors);
    let Some(record) = record else {
        return Ok(false);
    };

    let options = JsonOptions {
        pretty: !cli.compact,
        indent: cli.indent,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match binary_reader::write_record(&mut out, &options, &record) {
        Ok(()) => {}
        Err(binary_reader::json::JsonError::Read(error)) => {
            eprintln!("{error}");
            return Ok(false);
        }
        Err(e) => return Err(e).context("writing JSON output"),
    }
    out.flush().context("flushing stdout")?;
    Ok(true)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
