use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitcan", version, about = "Habitcan CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit catalog management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Recorded occurrences
    Occurrence {
        #[command(subcommand)]
        action: commands::occurrence::OccurrenceAction,
    },
    /// Day, week, trend and heatmap views
    View {
        #[command(subcommand)]
        action: commands::view::ViewAction,
    },
    /// Monthly reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Unlocked achievements
    Achievement {
        #[command(subcommand)]
        action: commands::achievement::AchievementAction,
    },
    /// Re-evaluate a closed sleep-day
    Settle(commands::settle::SettleArgs),
    /// Run the realtime monitor and daily settlement until Ctrl-C
    Monitor(commands::monitor::MonitorArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HABITCAN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Occurrence { action } => commands::occurrence::run(action),
        Commands::View { action } => commands::view::run(action),
        Commands::Report { action } => commands::report::run(action),
        Commands::Achievement { action } => commands::achievement::run(action),
        Commands::Settle(args) => commands::settle::run(args),
        Commands::Monitor(args) => commands::monitor::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
