//! tmos-confgen CLI
//!
//! Usage:
//!   tmos-confgen [OPTIONS] [FILE]
//!
//! Options:
//!   -t, --target <VERSION>    Compile for this version instead of the file's
//!   -p, --partition <NAME>    Render a single partition
//!       --no-recursive        Render the start folder and its direct children only
//!       --templates           Print every registered template and exit
//!   -v, --verbose             Raise log verbosity (repeatable)
//!   -h, --help                Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::info;

use tmos_confgen::template::registry;
use tmos_confgen::{
    compile_topology_with_config, parse, CompileError, ConfgenError, Config, Encoder, RenderConfig,
    TopologyError, Version,
};

#[derive(Parser)]
#[command(name = "tmos-confgen")]
#[command(about = "Compile a TOML topology into TMOS configuration text")]
struct Cli {
    /// Topology file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Target version, e.g. "bigip 11.5.0" or "EM 2.0"
    #[arg(short, long)]
    target: Option<Version>,

    /// Render only this partition
    #[arg(short, long)]
    partition: Option<String>,

    /// Do not descend into nested folders
    #[arg(long)]
    no_recursive: bool,

    /// Print every registered template, re-encoded, and exit
    #[arg(long)]
    templates: bool,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.templates {
        print_templates();
        return;
    }

    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut config =
        Config::new().with_render(RenderConfig::new().with_recursive(!cli.no_recursive));
    if let Some(target) = cli.target {
        config = config.with_target(target);
    }
    if let Some(partition) = cli.partition {
        config = config.with_partition(partition);
    }

    match compile_topology_with_config(&source, &config) {
        Ok(text) => print!("{}", text),
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level from `warn`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn report(err: &ConfgenError) {
    match err {
        ConfgenError::Compile(CompileError::Grammar(e)) => eprint!("{}", e.format("template")),
        ConfgenError::Topology(TopologyError::Grammar(e)) => eprint!("{}", e.format("raw stamp")),
        other => eprintln!("Error: {}", other),
    }
}

fn print_templates() {
    let encoder = Encoder::default();
    let mut count = 0usize;
    for (kind, dialect, text) in registry::sources() {
        match parse(text) {
            Ok(template) => {
                println!("# {} ({})", kind, dialect);
                print!("{}", encoder.encode(&template));
                println!();
                count += 1;
            }
            Err(e) => {
                eprint!("{}", e.format(&format!("{}/{}", kind, dialect)));
                std::process::exit(1);
            }
        }
    }
    info!(count, "printed templates");
}
