//! Websocket front of the referee.
//!
//! The [`Server`] owns the listening socket and the [`SessionRegistry`]. Every accepted
//! connection is upgraded to a websocket and served by its own tokio task, so a client that
//! stalls, disconnects or sends garbage only ever affects its own task.
//!
//! There is no timeout: a peer that stops sending simply leaves its game idle.
//!
//! # Example
//!
//! ```no_run
//! use dots_boxes_referee::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Configuration::new().with_port(8089).with_agent(AgentKind::FirstFree);
//!     let server = Server::bind(&config).await?;
//!     println!("Running on ws://{}", server.local_addr()?);
//!     server.run_until(async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{info, info_span, instrument, warn, Instrument};

use crate::agent::BaselineFactory;
use crate::client_handler::handle_connection;
use crate::configuration::Configuration;
use crate::dispatcher::Dispatcher;
use crate::game_interface::AgentFactory;
use crate::session_registry::SessionRegistry;

/// A bound, not yet running, referee server.
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind using the built-in agent selected in `config`.
    pub async fn bind(config: &Configuration) -> anyhow::Result<Server> {
        let factory = BaselineFactory::new(config.agent(), config.seed());
        Self::bind_with_factory(config, Arc::new(factory)).await
    }

    /// Bind with a custom agent factory.
    ///
    /// # Errors
    /// Returned if the address cannot be bound.
    #[instrument(skip_all, fields(addr = %config.socket_addr()))]
    pub async fn bind_with_factory(
        config: &Configuration,
        factory: Arc<dyn AgentFactory>,
    ) -> anyhow::Result<Server> {
        let listener = TcpListener::bind(config.socket_addr())
            .await
            .with_context(|| format!("could not bind {}", config.socket_addr()))?;
        let registry = Arc::new(SessionRegistry::new(factory));
        let dispatcher = Dispatcher::new(registry).with_evict_ended(config.evict_ended());
        info!(agent = %config.agent(), "server bound");
        Ok(Server {
            listener,
            dispatcher,
        })
    }

    /// Actual address, useful when bound on port 0.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("could not read listener address")
    }

    /// Sessions shared by every connection of this server.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.dispatcher.registry().clone()
    }

    /// Serve until the process is terminated.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. Connections already accepted keep running.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("Running on ws://{}", self.local_addr()?);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let dispatcher = self.dispatcher.clone();
                        tokio::spawn(
                            serve_connection(stream, dispatcher)
                                .instrument(info_span!("connection", %peer)),
                        );
                    }
                    Err(e) => warn!("could not accept connection: {e}"),
                },
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, dispatcher: Dispatcher) {
    match accept_async(stream).await {
        Ok(ws) => handle_connection(ws, dispatcher).await,
        Err(e) => warn!("websocket handshake failed: {e}"),
    }
}
