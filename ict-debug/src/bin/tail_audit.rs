//! Tail the most recent daily-rotated audit log written by
//! [`ict_core::audit::AuditLogger`], pretty-printing each JSON line.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory the audit logger writes `audit_YYYYMMDD.jsonl` files into.
    #[arg(short, long, default_value = "logs/audit")]
    directory: PathBuf,

    /// How many trailing lines to print before exiting (or before
    /// switching to follow mode).
    #[arg(short = 'n', long, default_value = "20")]
    lines: usize,

    /// Keep polling for newly appended lines, like `tail -f`.
    #[arg(short, long)]
    follow: bool,
}

fn latest_audit_file(directory: &PathBuf) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(directory)
        .with_context(|| format!("reading audit directory {}", directory.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .collect();
    candidates.sort();
    candidates.into_iter().next_back().with_context(|| format!("no audit_*.jsonl files under {}", directory.display()))
}

fn print_pretty(line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| line.to_string())),
        Err(_) => println!("{line}"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let path = latest_audit_file(&args.directory)?;
    tracing::info!(path = %path.display(), "tailing audit log");

    let content = fs::read_to_string(&path)?;
    let all_lines: Vec<&str> = content.lines().collect();
    let start = all_lines.len().saturating_sub(args.lines);
    for line in &all_lines[start..] {
        print_pretty(line);
    }

    if !args.follow {
        return Ok(());
    }

    let mut file = fs::File::open(&path)?;
    let mut offset = content.len() as u64;
    loop {
        std::thread::sleep(Duration::from_millis(500));
        let metadata = fs::metadata(&path)?;
        if metadata.len() < offset {
            offset = 0;
        }
        if metadata.len() > offset {
            file.seek(SeekFrom::Start(offset))?;
            use std::io::Read;
            let mut buf = String::new();
            file.read_to_string(&mut buf)?;
            for line in buf.lines() {
                print_pretty(line);
            }
            offset = metadata.len();
        }
    }
}
