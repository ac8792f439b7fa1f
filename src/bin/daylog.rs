// File: ./src/bin/daylog.rs
use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use daylog::cli::{self, BatchDecision, Command};
use daylog::config::Config;
use daylog::context::StandardContext;
use daylog::daily::{DailyLogStore, FileDailyLogStore};
use daylog::dates::format_date_for_display;
use daylog::ledger::Ledger;
use daylog::migration::{MigrationReview, MigrationScanner, ReviewState};
use daylog::model::mutator::toggle_task;
use daylog::model::{Decision, parse};
use daylog::settings::JsonSettingsStore;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args(env::args().skip(1))?;
    if args.command == Command::Help {
        cli::print_help("daylog");
        return Ok(());
    }

    let ctx = StandardContext::new(args.root.clone());
    let config = Config::load_or_default(&ctx)?;
    init_logging(&config, args.verbose);
    log::debug!(
        "Config: {}",
        Config::get_path_string(&ctx).unwrap_or_else(|_| "<unavailable>".to_string())
    );

    let logs: Arc<dyn DailyLogStore> = Arc::new(FileDailyLogStore::from_context(&ctx, &config)?);
    let ledger = Ledger::new(Arc::new(JsonSettingsStore::from_context(&ctx)?));
    let today = args.date.unwrap_or_else(|| Local::now().date_naive());

    match args.command {
        Command::Scan => scan(logs, &ledger, &config, today).await,
        Command::Review(batch) => review(logs, ledger, &config, today, batch).await,
        Command::Toggle(line) => toggle(logs.as_ref(), today, line).await,
        Command::Reset => {
            ledger.reset().await?;
            println!("Review history and watermark cleared.");
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        config.log_level_filter()
    };
    let log_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // A logger may already be installed when embedded; that's fine.
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);
}

async fn scan(
    logs: Arc<dyn DailyLogStore>,
    ledger: &Ledger,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let queue = MigrationScanner::new(logs.as_ref(), ledger)
        .with_lookback_days(config.lookback_days)
        .scan(today)
        .await?;
    if queue.is_empty() {
        println!("Nothing to review for {}.", format_date_for_display(today));
        return Ok(());
    }
    println!(
        "{} unfinished task(s) from {}:",
        queue.len(),
        queue[0].original_date
    );
    for task in &queue {
        println!(
            "  {:>4}  {}{}",
            task.line_number,
            "  ".repeat(task.indent_level),
            task.content
        );
    }
    Ok(())
}

async fn review(
    logs: Arc<dyn DailyLogStore>,
    ledger: Ledger,
    config: &Config,
    today: NaiveDate,
    batch: Option<BatchDecision>,
) -> Result<()> {
    let mut session = MigrationReview::new(logs, ledger, today).with_config(config);
    if session.start().await?.is_empty() {
        println!("Nothing to review for {}.", format_date_for_display(today));
        return Ok(());
    }

    if let Some(batch) = batch {
        let (decision, verb) = match batch {
            BatchDecision::MoveAll => (Decision::Move, "Moved"),
            BatchDecision::DismissAll => (Decision::Dismiss, "Dismissed"),
        };
        let count = session.queue().len();
        session.decide_all(decision).await?;
        println!("{} {} task(s).", verb, count);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while session.state() == ReviewState::Reviewing {
        let Some(task) = session.current().cloned() else {
            break;
        };
        let (done, total) = session.progress();
        println!(
            "[{}/{}] {} (from {}, line {})",
            done + 1,
            total,
            task.content,
            task.original_date,
            task.line_number
        );
        println!("  [m]ove / [d]ismiss / [M]ove all / [D]ismiss all");

        let Some(input) = lines.next_line().await? else {
            bail!("Input closed with {} task(s) undecided", total - done);
        };
        let result = match input.trim() {
            "m" => session.decide(&task.id, Decision::Move).await,
            "d" => session.decide(&task.id, Decision::Dismiss).await,
            "M" => session.decide_all(Decision::Move).await,
            "D" => session.decide_all(Decision::Dismiss).await,
            other => {
                println!("  '{}' is not a choice; every task needs a decision.", other);
                continue;
            }
        };
        if let Err(e) = result {
            eprintln!("  Could not apply decision: {}. Try again.", e);
        }
    }
    println!("Review for {} complete.", format_date_for_display(today));
    Ok(())
}

async fn toggle(logs: &dyn DailyLogStore, date: NaiveDate, line: usize) -> Result<()> {
    let Some(current) = logs.read_opt(date).await? else {
        bail!("No daily log for {}", date);
    };
    if parse(&current, date).task_at_line(line).is_none() {
        bail!("Line {} of {} is not a task", line, date);
    }
    let written = logs.update(date, &|text| toggle_task(text.unwrap_or_default(), line)).await?;
    if let Some(task) = parse(&written, date).task_at_line(line) {
        println!(
            "[{}] {}",
            if task.completed { "x" } else { " " },
            task.content
        );
    }
    Ok(())
}
