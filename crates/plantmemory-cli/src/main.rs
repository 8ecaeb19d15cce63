use clap::{Parser, Subcommand};
use plantmemory_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "plantmemory", version, about = "Plant Memory CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the memory for today, or for a past day
    Save {
        /// Memory text
        text: String,
        /// Icon category (see `icons`)
        #[arg(long)]
        icon: Option<String>,
        /// Local day as YYYY-MM-DD; future days clamp to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the entry for a local day, or null
    Show {
        #[arg(long)]
        date: String,
    },
    /// Get an entry by id
    Get { id: i64 },
    /// Delete an entry by id
    Delete { id: i64 },
    /// List entries, oldest first
    List {
        /// Only this year
        #[arg(long)]
        year: Option<i32>,
        /// Newest first
        #[arg(long)]
        desc: bool,
    },
    /// Most recent entries
    Recent {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Years with entries, plus the current year
    Years,
    /// Entry count, first entry and days of growth
    Stats,
    /// Garden view for a year
    Garden {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Widget refresh snapshot; never fails
    Widget {
        #[arg(long)]
        year: Option<i32>,
    },
    /// List icon categories
    Icons,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("PLANTMEMORY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = Config::load();
    let filter = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "warn".to_string());
    init_tracing(&filter);

    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Icons => commands::icons::run(),
        Commands::Widget { year } => {
            commands::garden::widget(config.as_ref().ok(), year).await;
            Ok(())
        }
        command => match config {
            Ok(config) => run_journal(command, &config).await,
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_journal(command: Commands, config: &Config) -> commands::CliResult {
    let service = commands::open_service(config)?;
    match command {
        Commands::Save { text, icon, date } => {
            commands::entry::save(&service, &text, icon.as_deref(), date.as_deref()).await
        }
        Commands::Show { date } => commands::entry::show(&service, &date).await,
        Commands::Get { id } => commands::entry::get(&service, id).await,
        Commands::Delete { id } => commands::entry::delete(&service, id).await,
        Commands::List { year, desc } => commands::entry::list(&service, year, desc).await,
        Commands::Recent { limit } => {
            let limit = limit.unwrap_or(config.widget.recent_limit);
            commands::entry::recent(&service, limit).await
        }
        Commands::Years => commands::stats::years(&service).await,
        Commands::Stats => commands::stats::stats(&service).await,
        Commands::Garden { year } => commands::garden::garden(&service, year).await,
        Commands::Widget { .. } | Commands::Icons | Commands::Config { .. } => Ok(()),
    }
}
