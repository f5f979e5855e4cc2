//! Runs the in-process simulation: both participants take turns inside this process,
//! exchanging messages through a pair of queues polled with a bounded wait.

use std::path::PathBuf;
use structopt::StructOpt;
use turn_messaging::prelude::*;
use log::error;


#[derive(Debug, StructOpt)]
#[structopt(name = "single_process", about = "A turn-based message exchange between two participants of the same process")]
struct Options {
    /// A `.ron` file with an `ExchangeConfig`
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
}


#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Sync + Send>> {

    simple_logger::SimpleLogger::new().with_utc_timestamps().init().unwrap_or_else(|_| eprintln!("--> LOGGER WAS ALREADY STARTED"));

    let options = Options::from_args();
    let config = match &options.config {
        Some(path) => ExchangeConfig::from_ron_file(path)?,
        None => ExchangeConfig::default(),
    };

    let mut simulation = Simulation::new(&config);
    let completed = tokio::select! {
        report = simulation.run() => report.map(|_report| true)?,
        _ = tokio::signal::ctrl_c() => false,
    };

    let (initiator, responder) = (simulation.initiator().tally(), simulation.responder().tally());
    if completed {
        println!();
        println!("--- Simulation Finished ---");
    } else {
        error!("Simulation interrupted.");
        println!();
        println!("--- Simulation Interrupted ---");
    }
    println!("Final Stats:");
    println!("  Initiator Sent: {}", initiator.sent);
    println!("  Initiator Received: {}", initiator.received);
    println!("  Responder Sent: {}", responder.sent);
    println!("  Responder Received: {}", responder.received);
    println!("  Poll Timeouts: {}", simulation.poll_timeouts());
    println!("-----------------------------");

    if completed {
        Ok(())
    } else {
        Err(Box::from("simulation interrupted"))
    }
}
