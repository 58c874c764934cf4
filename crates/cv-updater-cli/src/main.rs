use clap::{Parser, Subcommand, ValueEnum};
use cv_updater_cli::cmd::{self, App, Overrides};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "cv-updater",
    about = "Keep a work.ua session alive and bump your CVs on a jittered schedule",
    version,
    propagate_version = true
)]
struct Cli {
    /// Application data directory (default: ~/.config/workua-cv-updater)
    #[arg(short = 'd', long, global = true, env = "CV_UPDATER_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// WebDriver wait timeout in seconds
    #[arg(short = 't', long, global = true, value_parser = parse_positive_float)]
    timeout: Option<f64>,

    /// Browser type, a key of `browsers` in config.yaml
    #[arg(short = 'b', long, global = true)]
    browser: Option<String>,

    /// Logging verbosity
    #[arg(short = 'v', long, global = true, value_enum, default_value_t = Verbosity::Info)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in manually in a visible browser window
    Login,

    /// Run the refresh/update schedule with a headless browser until stopped
    Update,

    /// Show the last success time of each action
    Status {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Verbosity {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Verbosity> for tracing::Level {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Debug => tracing::Level::DEBUG,
            Verbosity::Info => tracing::Level::INFO,
            Verbosity::Warn => tracing::Level::WARN,
            Verbosity::Error => tracing::Level::ERROR,
        }
    }
}

fn parse_positive_float(arg: &str) -> Result<f64, String> {
    match arg.parse::<f64>() {
        Ok(v) if v > 0.0 && Duration::try_from_secs_f64(v).is_ok() => Ok(v),
        _ => Err(format!("{arg:?} is not a valid positive float")),
    }
}

fn main() {
    let cli = Cli::parse();

    let level: tracing::Level = cli.verbosity.into();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let overrides = Overrides {
        data_dir: cli.data_dir,
        timeout: cli.timeout,
        browser: cli.browser,
    };

    let result = App::load(&overrides).and_then(|app| match cli.command {
        Commands::Login => cmd::login::run(&app),
        Commands::Update => cmd::update::run(&app),
        Commands::Status { json } => cmd::status::run(&app, json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_positive_float("2.5"), Ok(2.5));
        assert!(parse_positive_float("0").is_err());
        assert!(parse_positive_float("-1").is_err());
        assert!(parse_positive_float("inf").is_err());
        assert!(parse_positive_float("NaN").is_err());
        assert!(parse_positive_float("1e300").is_err());
        assert!(parse_positive_float("soon").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
