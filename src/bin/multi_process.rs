//! Runs one side of the socket exchange -- start a `responder`, then an `initiator`:
//!   multi_process responder
//!   multi_process initiator
//! The endpoint defaults to `localhost:8080` and may be changed with `--host`, `--port` or a `.ron` `--config` file.

use std::path::PathBuf;
use structopt::StructOpt;
use turn_messaging::prelude::*;
use log::{error, info};


#[derive(Debug, StructOpt)]
#[structopt(name = "multi_process", about = "One participant of a turn-based message exchange over TCP")]
struct Options {
    /// `initiator` or `responder` (case-insensitive)
    role: Role,
    /// Overrides the responder host
    #[structopt(long)]
    host: Option<String>,
    /// Overrides the responder port
    #[structopt(long)]
    port: Option<u16>,
    /// A `.ron` file with an `ExchangeConfig`
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
}

impl Options {
    fn exchange_config(&self) -> Result<ExchangeConfig> {
        let mut config = match &self.config {
            Some(path) => ExchangeConfig::from_ron_file(path)?,
            None => ExchangeConfig::default(),
        };
        if let Some(host) = &self.host {
            config = config.with_host(host.as_str());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        Ok(config)
    }
}


#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Sync + Send>> {

    simple_logger::SimpleLogger::new().with_utc_timestamps().init().unwrap_or_else(|_| eprintln!("--> LOGGER WAS ALREADY STARTED"));

    let options = Options::from_args();
    let config = options.exchange_config()?;
    let participant = Participant::with_limit(options.role.as_ref(), config.message_limit);

    println!("[{} Process] Starting...", participant.name());
    let result = match options.role {
        Role::Initiator => initiate(&participant, &config).await,
        Role::Responder => respond(&participant, &config).await,
    };
    // the tallies are reported on every exit path
    println!("{}", participant.tally());

    let report = result?;
    info!("[{}] Exchange ended ({}) after {:?}", participant.name(), report.outcome, report.elapsed);
    Ok(())
}

/// Connects to the responder and runs the initiator loop -- no connection retries are attempted
async fn initiate(participant: &Participant, config: &ExchangeConfig) -> Result<ExchangeReport> {
    let name = participant.name();
    info!("[{name}] Attempting to connect to {}...", config.address());
    let mut connection = SocketConnection::connect(config).await
        .inspect_err(|err| error!("[{name}] Error: {err}"))?;
    info!("[{name}] Connection established (connection #{}).", connection.id());
    run_initiator(participant, &mut connection, config.message_limit).await
        .inspect_err(|err| error!("[{name}] I/O Error: {err}"))
}

/// Listens on the configured endpoint, accepts a single initiator and runs the responder loop
async fn respond(participant: &Participant, config: &ExchangeConfig) -> Result<ExchangeReport> {
    let name = participant.name();
    let listener = ResponderListener::bind(config).await
        .inspect_err(|err| error!("[{name}] Error: {err}"))?;
    info!("[{name}] Listening on port {}...", listener.local_address().port());
    let mut connection = listener.accept().await?;
    info!("[{name}] Initiator connected from {}.", connection.peer_address());
    let report = run_responder(participant, &mut connection, config.message_limit).await
        .inspect_err(|err| error!("[{name}] I/O Error: {err}"))?;
    info!("[{name}] Connection closed by initiator or STOP received.");
    Ok(report)
}
