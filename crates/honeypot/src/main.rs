mod config;
mod geo;
mod handler;
mod recorder;
mod server;
mod tui;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::geo::Enricher;
use crate::handler::Capture;
use crate::recorder::{open_daily_log, Recorder};
use crate::tui::state::ConsoleState;

#[derive(Debug, Parser)]
#[command(name = "ssh-honeypot")]
#[command(about = "Decoy SSH server that records and rejects every login", version, author)]
struct Cli {
    /// TOML config file (default: <config dir>/ssh-honeypot/config.toml if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<IpAddr>,

    /// GeoLite2/GeoIP2 City database
    #[arg(long, value_name = "PATH")]
    geoip_db: Option<PathBuf>,

    /// Private key presented as the server's host identity
    #[arg(long, value_name = "PATH")]
    host_key: Option<PathBuf>,

    /// Directory for the daily audit log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Seconds to stall before rejecting each password
    #[arg(long)]
    delay_secs: Option<u64>,

    /// Run without the operator console
    #[arg(long, default_value_t = false)]
    headless: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port,
            bind: self.bind,
            geoip_db: self.geoip_db.clone(),
            host_key: self.host_key.clone(),
            log_dir: self.log_dir.clone(),
            delay_secs: self.delay_secs,
            headless: self.headless,
        }
    }
}

fn init_tracing(cfg: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cfg.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    } else {
        // The console owns stdout; diagnostics go beside the audit log.
        std::fs::create_dir_all(&cfg.log_dir)
            .with_context(|| format!("failed to create {}", cfg.log_dir.display()))?;
        let path = cfg.log_dir.join("honeypot-service.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .compact()
            .init();
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref(), &cli.overrides())?;
    init_tracing(&cfg)?;

    // Everything that can fail at startup happens before the port is bound.
    let host_key = server::load_host_key(&cfg.host_key)?;
    let started_at = chrono::Local::now();
    let (log_file, log_path) = open_daily_log(&cfg.log_dir, started_at.date_naive())
        .await
        .with_context(|| format!("failed to open audit log in {}", cfg.log_dir.display()))?;
    info!(path = %log_path.display(), "audit log opened");

    let enricher = Enricher::open(&cfg.geoip_db, cfg.loopback_substitute);
    let geo_enabled = enricher.has_database();

    let (feed_tx, feed_rx) = if cfg.headless {
        (None, None)
    } else {
        let (tx, rx) = mpsc::unbounded_channel();
        (Some(tx), Some(rx))
    };
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let recorder = Arc::new(Recorder::new(log_file, feed_tx, fatal_tx));
    let capture = Arc::new(Capture::new(enricher, recorder, cfg.delay()));

    let ssh = Arc::new(server::ssh_config(&cfg, host_key));
    let listener = server::bind(SocketAddr::new(cfg.bind, cfg.port)).await?;
    let mut server_task = tokio::spawn(server::serve(listener, ssh, capture));

    let console = async {
        match feed_rx {
            Some(feed) => {
                let host = hostname::get()
                    .map(|h| h.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| "localhost".to_string());
                let state = ConsoleState::new(cfg.theme, started_at, host, cfg.port, geo_enabled, 0);
                tui::run_console(state, feed).await
            }
            None => {
                setup_shutdown_handler().await;
                info!("Shutdown signal received, stopping honeypot");
                Ok(())
            }
        }
    };

    tokio::select! {
        result = console => result,
        Some(err) = fatal_rx.recv() => {
            Err(err).with_context(|| format!("audit log {} is no longer writable", log_path.display()))
        }
        result = &mut server_task => {
            result.context("listener task failed")?.context("listener stopped")
        }
    }
}

async fn setup_shutdown_handler() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
