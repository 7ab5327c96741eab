use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::client::event_bus::{ClientEvent, EventBus, NoticeLevel};
use crate::client::session::{parse_line, ScanSession, SessionCommand, HELP};
use crate::client::{BatchSender, HttpIntakeApi};
use crate::config::{save_config, AppConfig, CONFIG_FILE};
use crate::errors::{IntakeError, IntakeResult};
use crate::server;

#[derive(Debug, Parser)]
#[command(name = "intake", version, about = "Barcode scan intake: log server and terminal client")]
pub struct Cli {
    /// Path to config.toml (searched next to the executable and in the
    /// working directory when omitted).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the intake HTTP server (default).
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        bind: Option<String>,
    },
    /// Buffer scans from stdin and send them to a server.
    Scan {
        /// Server base URL, e.g. http://192.168.1.20:3000
        #[arg(long)]
        server: Option<String>,
    },
    /// Write the effective configuration to a file.
    InitConfig {
        #[arg(default_value = CONFIG_FILE)]
        path: PathBuf,
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn init_config(config: &AppConfig, path: &Path, force: bool) -> IntakeResult<()> {
    if path.exists() && !force {
        return Err(IntakeError::Config(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    save_config(config, path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub async fn serve(mut config: AppConfig, port: Option<u16>, bind: Option<String>) -> IntakeResult<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    server::serve(&config, server::shutdown_signal()).await
}

pub async fn scan(mut config: AppConfig, server_url: Option<String>) -> IntakeResult<()> {
    if let Some(url) = server_url {
        config.client.server_url = url;
    }
    let api = HttpIntakeApi::new(
        &config.client.server_url,
        Duration::from_secs(config.client.request_timeout_secs),
    )?;
    tracing::info!(server = %api.base_url(), "scan session starting");

    let bus = EventBus::new();
    let printer = tokio::spawn(print_events(bus.subscribe()));

    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(32);
    let reader_bus = bus.clone();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(cmd) => {
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(msg) => reader_bus.notify(NoticeLevel::Error, msg),
                },
                Ok(None) => {
                    let _ = cmd_tx.send(SessionCommand::Quit).await;
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "stdin read failed");
                    let _ = cmd_tx.send(SessionCommand::Quit).await;
                    break;
                }
            }
        }
    });

    bus.notify(NoticeLevel::Info, HELP);
    let sender = BatchSender::new(Arc::new(api), bus.clone());
    let mut session = ScanSession::new(sender, bus);
    session.run_loop(cmd_rx).await;

    reader.abort();
    // Dropping the session closes the bus; the printer drains and exits.
    drop(session);
    let _ = printer.await;
    Ok(())
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<ClientEvent>) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match rx.recv().await {
            Ok(ClientEvent::Notice(notice)) => {
                let tag = match notice.level {
                    NoticeLevel::Info => "",
                    NoticeLevel::Success => "[ok] ",
                    NoticeLevel::Warning => "[warn] ",
                    NoticeLevel::Error => "[error] ",
                };
                println!("{tag}{}", notice.message);
            }
            Ok(ClientEvent::BufferView { table }) => print!("{table}"),
            Ok(ClientEvent::ItemSent { index, written, .. }) => {
                println!("  sent #{}: {written}", index + 1);
            }
            Ok(ClientEvent::BatchStarted { count, .. }) => println!("Sending {count} item(s)…"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig::default();

        init_config(&config, &path, false).unwrap();
        assert!(crate::config::load_config_from(&path).is_ok());
        assert!(matches!(init_config(&config, &path, false), Err(IntakeError::Config(_))));
        assert!(init_config(&config, &path, true).is_ok());
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["intake"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["intake", "scan", "--server", "http://10.0.0.5:3000"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Scan { server: Some(ref s) }) if s == "http://10.0.0.5:3000"));
    }
}
