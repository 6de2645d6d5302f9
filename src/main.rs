use std::io::Read;
use std::process;

use clap::Parser;
use jmespath_engine::{compile, Registry, SearchOptions};
use serde_json::Value;
use tracing::Level;

/// Evaluate a JMESPath expression against a JSON document.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JMESPath expression
    expression: String,
    /// JSON document. Read from stdin when omitted.
    json: Option<String>,
    /// Enable the powertools_json / powertools_base64 / powertools_base64_gzip functions
    #[arg(long)]
    powertools: bool,
    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
    /// Print the parsed AST as JSON instead of evaluating
    #[arg(long, conflicts_with = "dot")]
    ast: bool,
    /// Print the parsed AST as a Graphviz digraph instead of evaluating
    #[arg(long)]
    dot: bool,
    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Err(message) = run(args) {
        eprintln!("{message}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let parsed = compile(&args.expression).map_err(|e| e.to_string())?;

    if args.dot {
        print!("{}", parsed.render_dot_file());
        return Ok(());
    }
    if args.ast {
        return print_value(&parsed.ast, true);
    }

    let text = match args.json {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {e}"))?;
            buf
        }
    };
    let data: Value = serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {e}"))?;

    let options = if args.powertools {
        SearchOptions::with_functions(Registry::with_powertools())
    } else {
        SearchOptions::default()
    };
    let out = parsed.search(&data, &options).map_err(|e| e.to_string())?;
    print_value(&out, args.pretty)
}

fn print_value<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", rendered.map_err(|e| e.to_string())?);
    Ok(())
}
