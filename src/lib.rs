//! # Dots and Boxes referee
//!
//! A websocket server hosting Dots and Boxes agents. A game front-end opens one connection per
//! player it wants the server to play, and the server answers with the agent's moves whenever it
//! is one of the agent's turns.
//!
//! It provides:
//! - A session registry keeping one agent per game identifier (`SessionRegistry`)
//! - The message state machine driving agents (`Dispatcher`)
//! - A tokio websocket server running one task per connection (`Server`)
//! - The agent contract via the [`DecisionAgent`] and [`AgentFactory`] traits
//! - Placeholder agents playing random or first free lines (`BaselineAgent`)
//!
//! # Documentation Overview
//!
//! - For the wire format, see the [`protocol`] module.
//! - For turn handling, see the [`dispatcher`] module.
//! - For configuring the server, see [`Configuration`](crate::configuration::Configuration).
//! - To plug in your own agent, implement [`DecisionAgent`] and [`AgentFactory`] and pass the
//!   factory to [`Server::bind_with_factory`](crate::server::Server::bind_with_factory).
//!
//! # Usage Example
//!
//! ```no_run
//! # use std::collections::BTreeSet;
//! use std::sync::Arc;
//! use dots_boxes_referee::prelude::*;
//!
//! struct YourAgent {
//!     players: BTreeSet<Player>,
//!     grid: Grid,
//!     ended: bool,
//! }
//!
//! impl DecisionAgent for YourAgent {
//!     fn next_action(&mut self) -> Decision {
//!         Decision::GameOver
//!     }
//!     fn register_action(&mut self, _line: Line, _player: Player) {}
//!     fn attach_player(&mut self, player: Player) {
//!         self.players.insert(player);
//!     }
//!     fn end_game(&mut self) {
//!         self.ended = true;
//!     }
//!     fn owns(&self, player: Player) -> bool {
//!         self.players.contains(&player)
//!     }
//!     fn owned_players(&self) -> BTreeSet<Player> {
//!         self.players.clone()
//!     }
//!     fn grid(&self) -> Grid {
//!         self.grid
//!     }
//!     fn is_ended(&self) -> bool {
//!         self.ended
//!     }
//! }
//!
//! struct YourFactory;
//!
//! impl AgentFactory for YourFactory {
//!     fn new_agent(&self, player: Player, grid: Grid) -> Box<dyn DecisionAgent> {
//!         Box::new(YourAgent { players: BTreeSet::from([player]), grid, ended: false })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Configuration::new().with_port(8089);
//!     let server = Server::bind_with_factory(&config, Arc::new(YourFactory)).await?;
//!     server.run().await
//! }
//! ```

pub use anyhow;
pub mod agent;
pub mod client_handler;
pub mod configuration;
pub mod dispatcher;
pub mod game_interface;
pub mod logger;
pub mod protocol;
pub mod server;
pub mod session_registry;

pub use game_interface::{AgentFactory, DecisionAgent};

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use dots_boxes_referee::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{AgentKind, BaselineAgent, BaselineFactory};
    pub use crate::configuration::Configuration;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::game_interface::{
        AgentFactory, Decision, DecisionAgent, Grid, Line, Orientation, Player,
    };
    pub use crate::server::Server;
    pub use crate::session_registry::SessionRegistry;
}
