// File: ./src/cli.rs
//! Shared command-line interface logic: argument parsing and help text.
use crate::dates::parse_date;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    MoveAll,
    DismissAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan,
    Review(Option<BatchDecision>),
    Toggle(usize),
    Reset,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub root: Option<PathBuf>,
    /// Overrides "today".
    pub date: Option<NaiveDate>,
    pub verbose: bool,
}

/// Parse the arguments after the binary name.
pub fn parse_args<I, S>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut command: Option<Command> = None;
    let mut batch: Option<BatchDecision> = None;
    let mut toggle_line: Option<usize> = None;
    let mut root = None;
    let mut date = None;
    let mut verbose = false;

    let mut iter = args.into_iter().map(Into::into);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => command = Some(Command::Help),
            "-v" | "--verbose" => verbose = true,
            "-r" | "--root" => {
                let value = iter.next().ok_or_else(|| anyhow!("--root needs a path"))?;
                root = Some(PathBuf::from(value));
            }
            "--date" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--date needs a YYYY-MM-DD value"))?;
                date = Some(
                    parse_date(&value).ok_or_else(|| anyhow!("Invalid date '{}'", value))?,
                );
            }
            "--move-all" => set_batch(&mut batch, BatchDecision::MoveAll)?,
            "--dismiss-all" => set_batch(&mut batch, BatchDecision::DismissAll)?,
            "scan" | "review" | "reset" | "toggle" if command.is_none() => {
                command = Some(match arg.as_str() {
                    "scan" => Command::Scan,
                    "review" => Command::Review(None),
                    "reset" => Command::Reset,
                    _ => Command::Toggle(0),
                });
            }
            other if matches!(command, Some(Command::Toggle(_))) && toggle_line.is_none() => {
                let line: usize = other
                    .parse()
                    .map_err(|_| anyhow!("Invalid line number '{}'", other))?;
                if line == 0 {
                    bail!("Line numbers start at 1");
                }
                toggle_line = Some(line);
            }
            other => bail!("Unexpected argument '{}'", other),
        }
    }

    let command = match command {
        Some(Command::Help) => Command::Help,
        Some(Command::Review(_)) => Command::Review(batch),
        Some(_) | None if batch.is_some() => {
            bail!("--move-all and --dismiss-all only apply to 'review'")
        }
        Some(Command::Toggle(_)) => {
            Command::Toggle(toggle_line.ok_or_else(|| anyhow!("'toggle' needs a line number"))?)
        }
        Some(other) => other,
        None => Command::Help,
    };

    Ok(CliArgs {
        command,
        root,
        date,
        verbose,
    })
}

fn set_batch(slot: &mut Option<BatchDecision>, value: BatchDecision) -> Result<()> {
    if slot.is_some_and(|current| current != value) {
        bail!("--move-all and --dismiss-all are mutually exclusive");
    }
    *slot = Some(value);
    Ok(())
}

pub fn print_help(binary_name: &str) {
    println!(
        "Daylog v{} - Daily log task migration",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} scan [--date <YYYY-MM-DD>]", binary_name);
    println!(
        "    {} review [--date <YYYY-MM-DD>] [--move-all | --dismiss-all]",
        binary_name
    );
    println!("    {} toggle <line> [--date <YYYY-MM-DD>]", binary_name);
    println!("    {} reset", binary_name);
    println!("    {} --help", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    --date <YYYY-MM-DD>   Act as if today were this date.");
    println!("    -v, --verbose         Debug logging.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("REVIEW KEYS:");
    println!("    m    Move the task into today's log");
    println!("    d    Dismiss the task");
    println!("    M    Move every remaining task");
    println!("    D    Dismiss every remaining task");
    println!();
    println!("    Every task needs a decision; there is no skip.");
    println!();
    println!("DAILY LOG SYNTAX:");
    println!("    * [ ] Task          Open task ('-' works too; indent two spaces per level)");
    println!("    * [x] Task          Completed task");
    println!("    * [ ] 10:30 Task    Scheduled task");
    println!("    + [ ] 09:00 Block   Time block");
}
