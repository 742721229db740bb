// stacc: single-pass compiler for a small imperative language

mod codegen;
mod parser;
mod vm;

use std::fs;
use std::path::Path;
use std::process;

use parser::parse::Parser;
use vm::Vm;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("stacc");

    if args.len() < 2 {
        eprintln!("Error: No input file provided");
        eprintln!();
        eprintln!("Usage: {} <file> [--emit] [input values...]", program_name);
        eprintln!();
        eprintln!("  --emit   print the compiled instruction listing");
        eprintln!("           instead of running the program");
        eprintln!();
        eprintln!("Trailing integers are queued for 'read'.");
        process::exit(1);
    }

    let source_file = &args[1];
    if !Path::new(source_file).exists() {
        eprintln!("Error: File '{}' not found", source_file);
        process::exit(1);
    }

    let source = match fs::read_to_string(source_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading '{}': {}", source_file, e);
            process::exit(1);
        }
    };

    let parser = match Parser::new(&source) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let code = match parser.parse() {
        Ok(code) => code,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", error);
            }
            eprintln!("Compilation failed with {} error(s).", errors.len());
            process::exit(1);
        }
    };

    let emit_only = args.iter().any(|a| a == "--emit");
    if emit_only {
        for (addr, instr) in code.iter().enumerate() {
            println!("{:4}: {}", addr, instr);
        }
        return;
    }

    let mut input = Vec::new();
    for arg in &args[2..] {
        match arg.parse::<i32>() {
            Ok(value) => input.push(value),
            Err(_) => {
                eprintln!("Error: '{}' is not an integer input value", arg);
                process::exit(1);
            }
        }
    }

    let mut vm = Vm::new(code).with_input(&input);
    match vm.run() {
        Ok(()) => {
            for value in vm.output() {
                println!("{}", value);
            }
        }
        Err(e) => {
            for value in vm.output() {
                println!("{}", value);
            }
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}
