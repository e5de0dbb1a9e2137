//! Message-type state machine.
//!
//! | message  | condition                          | reply                          |
//! |----------|------------------------------------|--------------------------------|
//! | `start`  | `player == 1`                      | next move, or nothing if over  |
//! | `start`  | `player == 2`                      | nothing                        |
//! | `action` | `nextplayer` controlled by us      | next move, or nothing if over  |
//! | `action` | `nextplayer` is the opponent       | nothing                        |
//! | `action` | unknown game                       | nothing                        |
//! | `end`    | any                                | nothing                        |
//!
//! Every `start` creates or joins the game; every `action` on a known game is registered with
//! the agent before the turn is checked.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument, warn, Span};

use crate::game_interface::{Decision, Player};
use crate::protocol::{Inbound, Outbound};
use crate::session_registry::{SessionRef, SessionRegistry};

/// Interprets inbound messages against the [`SessionRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    evict_ended: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>) -> Dispatcher {
        Dispatcher {
            registry,
            evict_ended: false,
        }
    }

    /// Forget ended games as soon as an `end` message arrives.
    pub fn with_evict_ended(mut self, value: bool) -> Self {
        self.evict_ended = value;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handles `inbound` on the blocking pool and returns the reply, if any.
    ///
    /// The work runs inside the caller's current span, so agent logs keep the connection
    /// they came from.
    ///
    /// # Errors
    /// Returned only if the agent panicked while handling the message.
    pub async fn dispatch(&self, inbound: Inbound) -> anyhow::Result<Option<Outbound>> {
        let dispatcher = self.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| dispatcher.handle(inbound)))
            .await
            .context("agent failed while handling message")
    }

    /// Synchronous core of [`Dispatcher::dispatch`]. May block for as long as the agent thinks.
    #[instrument(skip_all, fields(game = inbound.game()))]
    pub fn handle(&self, inbound: Inbound) -> Option<Outbound> {
        match inbound {
            Inbound::Start { game, player, grid } => {
                let session = self.registry.get_or_create(&game, player, grid);
                if player == Player::ONE {
                    next_move(&session)
                } else {
                    debug!(%player, "waiting for the opponent");
                    None
                }
            }
            Inbound::Action {
                game,
                next_player,
                line,
                player,
            } => {
                let Some(session) = self.registry.lookup(&game) else {
                    warn!(%line, "action for unknown game, ignored");
                    return None;
                };
                let mover = player.unwrap_or_else(|| next_player.opponent());
                let our_turn = {
                    let mut agent = session.agent();
                    agent.register_action(line, mover);
                    agent.owns(next_player)
                };
                if our_turn {
                    next_move(&session)
                } else {
                    debug!(%next_player, "opponent to play");
                    None
                }
            }
            Inbound::End { game } => {
                self.registry.mark_ended(&game);
                if self.evict_ended {
                    self.registry.remove_ended();
                }
                None
            }
        }
    }
}

fn next_move(session: &SessionRef) -> Option<Outbound> {
    let decision = session.agent().next_action();
    match decision {
        Decision::Move(line) => {
            debug!(%line, "move selected");
            Some(Outbound::action(line))
        }
        Decision::GameOver => {
            info!("Game over");
            None
        }
    }
}
