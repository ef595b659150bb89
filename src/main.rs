use clap::Parser;
use clarity::cli::{self, Cli, Commands};
use clarity::notifications::FileNotificationCenter;
use clarity::report::{CommandGenerator, ReportGenerator};
use clarity::{Config, Database, Journal, Profile};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev selects the separate dev config and data directories
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match &cli.config {
        Some(path) => Config::load_from(&PathBuf::from(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG wins over the config file; logs go to stderr so stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!(?profile, "configuration loaded");

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?
    )?;
    let notifications = FileNotificationCenter::new(config.get_notifications_path());
    let mut journal = Journal::new(db, notifications);

    // App start is one of the reminder's trigger points
    if let Some(fire_at) = journal.start() {
        info!(%fire_at, "next check-in reminder");
    }

    let generator = match config.report_command.as_deref() {
        Some(command) => CommandGenerator::from_command_line(command)?,
        None => None,
    };

    match cli.command.unwrap_or(Commands::Today) {
        Commands::Checkin { date, fields } => cli::handle_checkin(&mut journal, date, fields)?,
        Commands::Edit { id, date, fields } => cli::handle_edit(&mut journal, id, date, fields)?,
        Commands::Delete { id } => cli::handle_delete(&mut journal, id)?,
        Commands::Show { id } => cli::handle_show(&journal, id)?,
        Commands::Day { date } => cli::handle_day(&journal, &date)?,
        Commands::Today => cli::handle_today(&journal)?,
        Commands::Week => cli::handle_week(&journal)?,
        Commands::List => cli::handle_list(&journal)?,
        Commands::Streak => cli::handle_streak(&journal)?,
        Commands::Report { id } => {
            let generator = generator.as_ref().map(|g| g as &dyn ReportGenerator);
            cli::handle_report(&journal, generator, id)?
        }
        Commands::Reminder { action } => cli::handle_reminder(&mut journal, action)?,
        Commands::Thought { action } => cli::handle_thought(&journal, action)?,
        Commands::Profile { action } => cli::handle_profile(&journal, action)?,
        Commands::Clear { yes } => cli::handle_clear(&mut journal, yes)?,
    }

    Ok(())
}
