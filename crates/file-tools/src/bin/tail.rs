use anyhow::{Result, bail};
use cli_executor::{FlagKind, ParsedArguments, Registry};
use file_tools::tail::{self, DEFAULT_LINES};
use std::path::Path;

fn main() {
    file_tools::init_tracing();

    let mut registry = Registry::new("tail", "Display the last lines of input");
    registry.add_command("show", "Show last N lines of input", |args| {
        file_tools::exit_code(show(args))
    });
    registry.add_command_flag(
        "show",
        "-n,--lines",
        FlagKind::MultiArg,
        "Number of lines to display (default: 10)",
        false,
    );
    registry.add_command_flag(
        "show",
        "-f,--file",
        FlagKind::MultiArg,
        "Input file (use - for stdin)",
        false,
    );
    registry.add_global_flag("-v,--verbose", FlagKind::Boolean, "Enable verbose output", false);

    std::process::exit(registry.run_env());
}

fn show(args: &ParsedArguments) -> Result<()> {
    let count = match args.get_args("--lines").first() {
        Some(raw) => tail::parse_line_count(raw)?,
        None => DEFAULT_LINES,
    };
    let verbose = args.get_bool("--verbose");

    let lines = match args.get_args("--file").first().map(String::as_str) {
        Some(path) if path != "-" => {
            if verbose {
                eprintln!("Reading from file: {path}");
            }
            tail::tail_file(Path::new(path), count)?
        }
        _ if line_reader::has_piped_input() => {
            if verbose {
                eprintln!("Reading from stdin...");
            }
            line_reader::read_last_n_lines(count)?
        }
        _ => bail!("no input provided. Pipe data or use -f/--file"),
    };

    for line in &lines {
        println!("{line}");
    }
    if verbose {
        eprintln!("Displayed {} lines", lines.len());
    }
    Ok(())
}
