use std::net::IpAddr;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::info;

use dots_boxes_referee::logger::{init_logger, shifted_level};
use dots_boxes_referee::prelude::*;

/// Start agent to play Dots and Boxes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Port to use for server
    #[arg(value_name = "PORT")]
    port: u16,

    /// Verbose output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Quiet output
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,

    /// Address to listen on
    #[arg(long)]
    address: Option<IpAddr>,

    /// Built-in agent: random or first-free
    #[arg(long)]
    agent: Option<AgentKind>,

    /// Seed for the random agent
    #[arg(long)]
    seed: Option<u64>,

    /// Log to a file in the current directory instead of stdout
    #[arg(long)]
    log_file: bool,

    /// Forget games as soon as they end
    #[arg(long)]
    evict_ended: bool,
}

impl Cli {
    fn configuration(&self) -> Configuration {
        let mut config = Configuration::from_env().with_port(self.port);
        if let Some(address) = self.address {
            config = config.with_address(address);
        }
        if let Some(agent) = self.agent {
            config = config.with_agent(agent);
        }
        if self.seed.is_some() {
            config = config.with_seed(self.seed);
        }
        if self.verbose > 0 || self.quiet > 0 {
            let shift = i32::from(self.verbose) - i32::from(self.quiet);
            config = config.with_log_level(shifted_level(shift));
        }
        if self.log_file {
            config = config.with_log_to_file(true);
        }
        if self.evict_ended {
            config = config.with_evict_ended(true);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.configuration();

    // before the runtime spawns threads, so the local UTC offset can be read
    init_logger(config.log_level(), config.log_to_file())?;
    info!(?config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("could not start tokio runtime")?;

    runtime.block_on(async move {
        let server = Server::bind(&config).await?;
        println!("Running on ws://{}", server.local_addr()?);
        server
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("could not listen for ctrl-c: {e}");
                    std::future::pending::<()>().await;
                }
            })
            .await
    })
}
