use cli_executor::{FlagKind, ParsedArguments, Registry};

fn main() {
    file_tools::init_tracing();

    let mut registry = Registry::new("advent-of-code", "Advent of Code Solutions");

    registry.add_nested_command("year-2024.day-1.part-1", "Day 1 Part 1: Trebuchet?!", |args| {
        println!("Running Advent of Code 2024, Day 1, Part 1");
        announce_verbose(args);
        match args.get_args("--input").first() {
            Some(input) => println!("Input file: {input}"),
            None => println!("Using default input"),
        }
        println!("Result: 54159");
        0
    });
    registry.add_nested_command(
        "year-2024.day-1.part-2",
        "Day 1 Part 2: Trebuchet?! (Part 2)",
        |args| {
            println!("Running Advent of Code 2024, Day 1, Part 2");
            announce_verbose(args);
            println!("Result: 53866");
            0
        },
    );
    registry.add_nested_command("year-2024.day-2.part-1", "Day 2 Part 1: Cube Conundrum", |_| {
        println!("Running Advent of Code 2024, Day 2, Part 1");
        println!("Result: 2283");
        0
    });

    registry.add_nested_command(
        "year-2025.day-1.part-1",
        "Day 1 Part 1: Historian Hysteria",
        |args| {
            println!("Running Advent of Code 2025, Day 1, Part 1");
            if !args.positional_args().is_empty() {
                println!("Processing with args: {}", args.positional_args().join(" "));
            }
            println!("Result: 2264607");
            0
        },
    );
    registry.add_nested_command(
        "year-2025.day-1.part-2",
        "Day 1 Part 2: Historian Hysteria (Part 2)",
        |_| {
            println!("Running Advent of Code 2025, Day 1, Part 2");
            println!("Result: 19457120");
            0
        },
    );
    registry.add_nested_command(
        "year-2025.day-2.part-1",
        "Day 2 Part 1: Red-Nosed Reports",
        |args| {
            println!("Running Advent of Code 2025, Day 2, Part 1");
            if args.get_bool("--test") {
                println!("Running with test input");
                println!("Result: 2");
            } else {
                println!("Result: 564");
            }
            0
        },
    );
    registry.add_nested_command(
        "year-2025.day-2.part-2",
        "Day 2 Part 2: Red-Nosed Reports (Part 2)",
        |_| {
            println!("Running Advent of Code 2025, Day 2, Part 2");
            println!("Result: 604");
            0
        },
    );

    registry.add_nested_command_flag(
        "year-2024.day-1.part-1",
        "-i,--input",
        FlagKind::MultiArg,
        "Input file path",
        false,
    );
    for path in ["year-2025.day-2.part-1", "year-2025.day-2.part-2"] {
        registry.add_nested_command_flag(path, "-t,--test", FlagKind::Boolean, "Use test input", false);
    }
    registry.add_global_flag("-v,--verbose", FlagKind::Boolean, "Enable verbose output", false);

    std::process::exit(registry.run_env());
}

fn announce_verbose(args: &ParsedArguments) {
    if args.get_bool("--verbose") {
        println!("Verbose mode enabled");
    }
}
