//! CLI wrapper for the jcse machine.
//!
//! Usage:
//!   jcse <File.java>            # Run a program from its main method
//!   jcse -e "expr"              # Evaluate an expression
//!   jcse --tokens <File.java>   # Print the parse tree of a file
//!
//! Options:
//!   --steps N                   # Stop after N machine steps
//!   --trace                     # Print the final control and stash

use jcse::parser::JavaParser;
use jcse::runner::api::{run_expression_with, run_program_with};
use jcse::runner::config::MachineConfig;
use jcse::runner::eval::EvalContext;
use jcse::runner::plugin::NativeRegistry;
use std::env;
use std::fs;
use std::process;

struct Options {
    config: MachineConfig,
    trace: bool,
    tokens: bool,
}

fn main() {
    use tracing_subscriber::{fmt, EnvFilter};

    // RUST_LOG controls the level, WARN when unset.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut args = env::args().skip(1);
    let mut options = Options {
        config: MachineConfig::default(),
        trace: false,
        tokens: false,
    };
    let mut file = None;
    let mut expression = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-e" | "--eval" => match args.next() {
                Some(e) => expression = Some(e),
                None => usage_error("-e needs an expression"),
            },
            "--steps" => match args.next().and_then(|n| n.parse().ok()) {
                Some(n) => options.config = MachineConfig::with_step_limit(n),
                None => usage_error("--steps needs a number"),
            },
            "--trace" => options.trace = true,
            "--tokens" => options.tokens = true,
            _ if file.is_none() && !arg.starts_with('-') => file = Some(arg),
            _ => usage_error(&format!("unexpected argument '{}'", arg)),
        }
    }

    match (file, expression) {
        (Some(file), None) if options.tokens => print_tokens(&file),
        (None, Some(_)) if options.tokens => usage_error("--tokens needs a file"),
        (Some(file), None) => run_file(&file, &options),
        (None, Some(expression)) => eval_code(&expression, &options),
        _ => usage_error("expected a file or -e"),
    }
}

fn print_usage() {
    eprintln!("jcse - CSE machine for a Java subset");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  jcse <File.java>            Run a program from its main method");
    eprintln!("  jcse -e \"expr\"              Evaluate an expression");
    eprintln!("  jcse --tokens <File.java>   Print the parse tree of a file");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --steps N                   Stop after N machine steps");
    eprintln!("  --trace                     Print the final control and stash");
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    print_usage();
    process::exit(1);
}

fn print_trace(ctx: &EvalContext) {
    println!("steps: {}", ctx.total_steps);
    println!("control:\n{}", ctx.control);
    println!("stash:\n{}", ctx.stash);
}

fn read_source(filename: &str) -> String {
    match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn print_tokens(filename: &str) {
    match JavaParser::parse_to_token_tree(&read_source(filename)) {
        Ok(tree) => println!("{}", tree),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_file(filename: &str, options: &Options) {
    let source = read_source(filename);

    match run_program_with(&source, options.config, NativeRegistry::new()) {
        Ok(ctx) => {
            if !ctx.is_finished() {
                eprintln!("Stopped after {} steps", ctx.total_steps);
            }
            if options.trace {
                print_trace(&ctx);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn eval_code(code: &str, options: &Options) {
    match run_expression_with(code, options.config) {
        Ok((value, ctx)) => {
            println!("{}", value);
            if options.trace {
                print_trace(&ctx);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
