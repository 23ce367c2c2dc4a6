//! Paged MMU emulator - Main Entry Point
//!
//! Usage: paged-mmu [OPTIONS] <trace_file> <output_file>
//!
//! Arguments:
//!   trace_file  - File of operations, one per line: `r <addr>` or `w <addr> <value>`
//!   output_file - File to write one result token per operation
//!
//! Options:
//!   -v, --verbose  Log table creation, restores and evictions
//!   -h, --help     Print help information

use std::env;
use std::process;

use log::info;

use paged_mmu::io::{read_trace, run_trace, write_results};
use paged_mmu::{Mmu, VmConfig};

/// Command-line configuration
struct Config {
    trace_file: String,
    output_file: String,
    verbose: bool,
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    init_logging(config.verbose);

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn print_help(program: &str) {
    eprintln!("Paged MMU emulator - runs a memory trace through a multi-level page table");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] <trace_file> <output_file>", program);
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  trace_file  - Operations, one per line: 'r <addr>' or 'w <addr> <value>'");
    eprintln!("  output_file - Output file for per-operation results");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --verbose  Log table creation, restores and evictions");
    eprintln!("  -h, --help     Print this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} trace.txt output.txt", program);
    eprintln!("  {} -v trace.txt output.txt", program);
}

fn parse_args() -> Result<Config, String> {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];

    let mut verbose = false;
    let mut positional: Vec<&String> = Vec::new();

    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(program);
                process::exit(0);
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}\nUse --help for usage information.", arg));
            }
            _ => {
                positional.push(arg);
            }
        }
    }

    if positional.len() != 2 {
        print_help(program);
        return Err(format!("\nError: Expected 2 arguments, got {}", positional.len()));
    }

    Ok(Config {
        trace_file: positional[0].clone(),
        output_file: positional[1].clone(),
        verbose,
    })
}

/// Main logic separated from main() for cleaner error handling
fn run(config: &Config) -> Result<(), String> {
    let vm_config = VmConfig::default();
    let mut mmu = Mmu::new(vm_config).map_err(|e| e.to_string())?;
    mmu.initialize();

    let ops = read_trace(&config.trace_file).map_err(|e| e.to_string())?;
    info!(
        "running {} operations over {} frames of {} words",
        ops.len(),
        vm_config.num_frames,
        vm_config.page_size()
    );

    let results = run_trace(&mut mmu, &ops);
    write_results(&config.output_file, &results).map_err(|e| e.to_string())?;

    info!("results written to: {}", config.output_file);
    Ok(())
}
