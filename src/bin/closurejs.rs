//! CLI wrapper for the closure-js engine.
//!
//! Usage:
//!   closurejs [--config <file.json>] <file.js>   # Execute a JavaScript file
//!   closurejs [--config <file.json>] -e "code"   # Evaluate JavaScript code
//!   closurejs [--config <file.json>]             # Start REPL (interactive mode)
//!
//! Set `RUST_LOG=closure_js=debug` to see the analysis and compilation passes.

use closure_js::runner::api::Engine;
use closure_js::runner::config::EngineConfig;
use closure_js::runner::ds::value::JsValue;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

enum Mode {
    File(String),
    Eval(String),
    Repl,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config = EngineConfig::default();
    if let Some(i) = args.iter().position(|a| a == "--config") {
        if i + 1 >= args.len() {
            print_usage();
            process::exit(1);
        }
        let path = args.remove(i + 1);
        args.remove(i);
        config = match EngineConfig::load(Path::new(&path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        };
    }

    let mode = match args.as_slice() {
        [] => Mode::Repl,
        [arg] if arg == "-h" || arg == "--help" => {
            print_usage();
            process::exit(0);
        }
        [flag, code] if flag == "-e" || flag == "--eval" => Mode::Eval(code.clone()),
        [file] => Mode::File(file.clone()),
        _ => {
            print_usage();
            process::exit(1);
        }
    };

    let engine = Engine::with_config(&config);
    match mode {
        Mode::File(filename) => run_file(&engine, &filename),
        Mode::Eval(code) => eval_code(&engine, &code),
        Mode::Repl => run_repl(&engine),
    }
}

fn print_usage() {
    eprintln!("closurejs - JavaScript Engine");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  closurejs <file.js>              Execute a JavaScript file");
    eprintln!("  closurejs -e \"code\"              Evaluate JavaScript code");
    eprintln!("  closurejs --eval \"code\"          Evaluate JavaScript code");
    eprintln!("  closurejs                        Start REPL (interactive mode)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file.json>             Load engine settings");
}

fn run_file(engine: &Engine, filename: &str) {
    let source = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };
    if let Err(e) = engine.eval(&source) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn eval_code(engine: &Engine, code: &str) {
    match engine.eval(code) {
        Ok(JsValue::Undefined) => {}
        Ok(val) => println!("{}", val),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn run_repl(engine: &Engine) {
    println!("closurejs v{} - JavaScript Engine", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript code and press Enter. Type .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }

        let input = input.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match engine.eval(input) {
            Ok(JsValue::Undefined) => {}
            Ok(val) => println!("{}", val),
            Err(e) => eprintln!("{}", e),
        }
    }

    println!("Goodbye!");
}
