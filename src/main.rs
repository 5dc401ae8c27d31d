//! cards – turns flower-order form responses into printable card PDFs.
//!
//! Usage:
//!   cards [--config cards.json] [--input responses.csv] [--out out/]
//!
//! With no arguments the built-in defaults are used: responses are read from
//! `csv/responses.csv` and the PDFs are written to `out/`.

use std::{env, path::PathBuf, process};

use flower_cards::config::CardConfig;
use flower_cards::pipeline::CardPipeline;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("cards");

    let mut config_path: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let target = match arg.as_str() {
            "--config" | "-c" => &mut config_path,
            "--input" | "-i" => &mut input,
            "--out" | "-o" => &mut out_dir,
            "--help" | "-h" => {
                print_usage(prog);
                process::exit(0);
            }
            other => {
                eprintln!("Unexpected argument: {other}");
                print_usage(prog);
                process::exit(1);
            }
        };
        match iter.next() {
            Some(value) => *target = Some(PathBuf::from(value)),
            None => {
                eprintln!("Missing value for {arg}");
                print_usage(prog);
                process::exit(1);
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => match CardConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => CardConfig::default(),
    };
    if let Some(path) = input {
        config.input_csv = path;
    }
    if let Some(dir) = out_dir {
        config.output_dir = dir;
    }

    match CardPipeline::new(config).run() {
        Ok(paths) => eprintln!("Wrote '{}'", paths.finished.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("cards – flower card PDF generator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} [--config cards.json] [--input responses.csv] [--out out/]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  -c, --config <file>   JSON configuration (missing fields use defaults)");
    eprintln!("  -i, --input <file>    Form responses CSV  (default: csv/responses.csv)");
    eprintln!("  -o, --out <dir>       Output directory    (default: out)");
    eprintln!("  -h, --help            Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=info (or debug) for progress output.");
}
