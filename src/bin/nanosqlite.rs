//! The line-oriented shell (spec §6.3, §6.4): reads a database file path
//! from the command line, then loops over stdin accepting meta-commands
//! (`.exit`, `.btree`) and the `insert`/`select` statement grammar.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nanosqlite::{execute_insert, execute_select, print_tree, prepare_insert, Error, Table};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "nanosqlite", version = VERSION, about = "Tiny B+ tree key-value store.")]
struct Cli {
    /// Path to the database file. Created if it does not already exist.
    database_file: String,
}

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^insert\s+(-?\d+)\s+(\S+)\s+(\S+)\s*$").expect("static pattern is valid")
});

fn main() -> ExitCode {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("nanosqlite.log")
        .expect("failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut table = match Table::open(&cli.database_file) {
        Ok(table) => table,
        Err(e) => {
            println!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(database_file = %cli.database_file, "opened database");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("db > ");
        io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(%e, "failed to read line");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(meta) = line.strip_prefix('.') {
            match run_meta_command(meta, &mut table) {
                MetaOutcome::Continue => continue,
                MetaOutcome::Exit => break,
                MetaOutcome::Unrecognized => {
                    println!("Unrecognized command '{line}'");
                    continue;
                }
            }
        }

        match run_statement(line, &mut table) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => println!("Error: {e}"),
            Err(e) => {
                eprintln!("Fatal error: {e}");
                let _ = table.close();
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = table.close() {
        eprintln!("Fatal error while closing database: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

enum MetaOutcome {
    Continue,
    Exit,
    Unrecognized,
}

fn run_meta_command(meta: &str, table: &mut Table) -> MetaOutcome {
    match meta {
        "exit" => MetaOutcome::Exit,
        "btree" => {
            match print_tree(&mut table.pager, table.root_page_num) {
                Ok(dump) => print!("{dump}"),
                Err(e) => println!("Error: {e}"),
            }
            MetaOutcome::Continue
        }
        _ => MetaOutcome::Unrecognized,
    }
}

fn run_statement(line: &str, table: &mut Table) -> Result<(), Error> {
    let lowered = line.to_ascii_lowercase();
    if lowered == "select" {
        let rows = execute_select(table)?;
        for row in &rows {
            println!("({}, {}, {})", row.id, row.username_str(), row.email_str());
        }
        println!("Executed.");
        Ok(())
    } else if lowered.starts_with("insert") {
        let caps = INSERT_RE
            .captures(line)
            .ok_or_else(|| Error::SyntaxError(format!("could not parse statement: {line}")))?;
        let id: i64 = caps[1]
            .parse()
            .map_err(|_| Error::SyntaxError(format!("invalid id: {}", &caps[1])))?;
        let row = prepare_insert(id, &caps[2], &caps[3])?;
        execute_insert(table, &row)?;
        println!("Executed.");
        Ok(())
    } else {
        Err(Error::SyntaxError(format!("unrecognized keyword at start of '{line}'")))
    }
}
