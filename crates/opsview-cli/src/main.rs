//! opsview CLI
//!
//! Reconciles host downtimes and configuration reloads against an Opsview
//! server and prints the outcome as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use opsview_client::HttpClient;
use opsview_core::{
    Cancellation, DEFAULT_DURATION, DesiredState, DowntimeRequest, reconcile_downtime,
    reconcile_reload,
};

mod config;

use config::{CONFIG_ENV, Config, LogConfig, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "opsview", version)]
#[command(about = "Reconcile Opsview downtimes and configuration reloads", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Opsview base URL
    #[arg(long, env = "OPSVIEW_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "OPSVIEW_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "OPSVIEW_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Existing session token
    #[arg(long, env = "OPSVIEW_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Verify TLS certificates: a boolean or a CA bundle path
    #[arg(long, env = "OPSVIEW_VERIFY_SSL")]
    verify_ssl: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Establish a session and print its token
    Login,

    /// Schedule or remove downtime for a host
    Downtime {
        /// Opsview host name
        #[arg(long)]
        host: String,

        #[arg(long, value_enum, default_value_t = StateArg::Present)]
        state: StateArg,

        /// Length such as "1h 30m" (units s, m, h, d, w)
        #[arg(long, default_value = DEFAULT_DURATION)]
        duration: String,

        /// Text placed before the identifier tag
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reload the configuration if changes are pending
    Reload {
        /// Reload even when nothing is pending
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => DesiredState::Present,
            StateArg::Absent => DesiredState::Absent,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginReport<'a> {
    changed: bool,
    token: &'a str,
    opsview_version: &'a str,
}

impl Cli {
    /// Command line and environment take precedence over the file
    fn apply_to(&self, config: &mut Config) {
        let opsview = &mut config.opsview;
        if let Some(endpoint) = &self.endpoint {
            opsview.endpoint = Some(endpoint.clone());
        }
        if let Some(username) = &self.username {
            opsview.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            opsview.password = Some(password.clone());
        }
        if let Some(token) = &self.token {
            opsview.token = Some(token.clone());
        }
        if let Some(verify_ssl) = &self.verify_ssl {
            opsview.verify_ssl.clone_from(verify_ssl);
        }
        if let Some(level) = &self.log_level {
            config.log.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
    }
}

/// Logs go to stderr so stdout carries only the result
fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    match log.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let path = cli.config.clone().or_else(Config::locate);
    let mut config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply_to(&mut config);

    init_tracing(&config.log);
    match &path {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no config file found, using defaults"),
    }

    let client = HttpClient::connect(&config.client_config()?).await?;

    let (handle, cancel) = Cancellation::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            handle.cancel();
        }
    });

    let report = match cli.command {
        Commands::Login => serde_json::to_value(LoginReport {
            changed: true,
            token: client.token().unwrap_or_default(),
            opsview_version: client.version().unwrap_or_default(),
        })?,
        Commands::Downtime {
            host,
            state,
            duration,
            comment,
        } => {
            let request = DowntimeRequest {
                host,
                state: state.into(),
                duration,
                comment,
            };
            let outcome =
                reconcile_downtime(&client, &request, &config.reconcile, &cancel).await?;
            serde_json::to_value(outcome)?
        }
        Commands::Reload { force } => {
            let outcome = reconcile_reload(&client, force, &config.reconcile, &cancel).await?;
            serde_json::to_value(outcome)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
