use std::io::{Write, stdout};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{booking, month, recalc, report};
use wt_cli::{BookingAction, Cli, Commands, Config, ConfigCalendar, MonthAction, WtEngine};
use wt_engine::{Engine, StaticPlan};

/// Load config and assemble the engine, ensuring the database directory
/// exists.
fn open_engine(config_path: Option<&Path>) -> Result<(WtEngine, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wt_db::Database::open(&config.database_path).context("failed to open database")?;
    let plan = config
        .plan
        .to_day_plan()
        .context("invalid day plan configuration")?;
    let mappings = config
        .account_mappings()
        .context("invalid account configuration")?;
    let engine = Engine::new(
        db,
        StaticPlan(plan),
        ConfigCalendar::new(config.holidays.clone()),
        mappings,
    );
    Ok((engine, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut out = stdout().lock();

    match &cli.command {
        Some(Commands::Booking { action }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            match action {
                BookingAction::Add {
                    employee,
                    date,
                    category,
                    time,
                    note,
                } => booking::add(
                    &engine,
                    &mut out,
                    employee,
                    *date,
                    *category,
                    time,
                    note.clone(),
                )?,
                BookingAction::Edit { id, time } => booking::edit(&engine, &mut out, id, time)?,
                BookingAction::Note { id, note } => {
                    booking::note(&engine, &mut out, id, note.as_deref())?;
                }
                BookingAction::List { employee, date } => {
                    booking::list(&engine, &mut out, employee, *date)?;
                }
            }
        }
        Some(Commands::Recalc {
            employee,
            date,
            month,
        }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            recalc::run(&engine, &mut out, employee, *date, *month)?;
        }
        Some(Commands::Month { action }) => {
            let (engine, config) = open_engine(cli.config.as_deref())?;
            match action {
                MonthAction::Aggregate { employee, month } => {
                    month::aggregate(&engine, &config, &mut out, employee, *month)?;
                }
                MonthAction::Close { employee, month } => {
                    month::close(&engine, &mut out, employee, *month)?;
                }
                MonthAction::Reopen { employee, month } => {
                    month::reopen(&engine, &mut out, employee, *month)?;
                }
                MonthAction::Show {
                    employee,
                    month,
                    json,
                } => month::show(&engine, &mut out, employee, *month, *json)?,
            }
        }
        Some(Commands::Day {
            employee,
            date,
            json,
        }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            report::day(&engine, &mut out, employee, *date, *json)?;
        }
        Some(Commands::Balance {
            employee,
            account,
            as_of,
        }) => {
            let (engine, _config) = open_engine(cli.config.as_deref())?;
            report::balance(&engine, &mut out, employee, account, *as_of)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    Ok(())
}
