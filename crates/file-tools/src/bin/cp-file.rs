use anyhow::{Context, Result};
use cli_executor::{FlagKind, ParsedArguments, Registry};
use std::path::Path;

fn main() {
    file_tools::init_tracing();

    let mut registry = Registry::new("cp_file", "Copy files from source to destination");
    registry.add_command("copy", "Copy a file", |args| file_tools::exit_code(copy(args)));
    registry.add_command_flag("copy", "-s,--source", FlagKind::MultiArg, "Source file path", true);
    registry.add_command_flag("copy", "-d,--dest", FlagKind::MultiArg, "Destination file path", true);
    registry.add_command_flag("copy", "-f,--force", FlagKind::Boolean, "Overwrite existing files", false);
    registry.add_global_flag("-v,--verbose", FlagKind::Boolean, "Enable verbose output", false);

    std::process::exit(registry.run_env());
}

fn copy(args: &ParsedArguments) -> Result<()> {
    let source = args.get_args("--source").first().context("no source file specified")?;
    let dest = args.get_args("--dest").first().context("no destination specified")?;
    let verbose = args.get_bool("--verbose");

    if verbose {
        println!("Copying '{source}' to '{dest}'...");
    }
    let bytes = file_tools::copy::copy_file(Path::new(source), Path::new(dest), args.get_bool("--force"))?;
    if verbose {
        println!("Copied {bytes} bytes");
    }
    Ok(())
}
