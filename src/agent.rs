//! Built-in agents.
//!
//! These agents only keep track of which lines are still free. They are placeholders for a
//! real strategy and exist so the server can be run and tested end to end.

use std::collections::{BTreeSet, HashSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::game_interface::{AgentFactory, Decision, DecisionAgent, Grid, Line, Player};

/// How a [`BaselineAgent`] picks among free lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentKind {
    /// Uniformly random free line.
    #[default]
    Random,
    /// First free line in board order. Deterministic.
    FirstFree,
}

impl FromStr for AgentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(AgentKind::Random),
            "first-free" | "first_free" | "firstfree" => Ok(AgentKind::FirstFree),
            other => bail!("unknown agent kind '{other}' (expected 'random' or 'first-free')"),
        }
    }
}

impl Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Random => write!(f, "random"),
            AgentKind::FirstFree => write!(f, "first-free"),
        }
    }
}

enum Selection {
    Random(StdRng),
    FirstFree,
}

/// Agent playing any line that is still free.
pub struct BaselineAgent {
    players: BTreeSet<Player>,
    grid: Grid,
    ended: bool,
    played: HashSet<Line>,
    selection: Selection,
}

impl BaselineAgent {
    pub fn new(kind: AgentKind, player: Player, grid: Grid, seed: Option<u64>) -> BaselineAgent {
        let selection = match kind {
            AgentKind::Random => Selection::Random(match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            }),
            AgentKind::FirstFree => Selection::FirstFree,
        };
        BaselineAgent {
            players: BTreeSet::from([player]),
            grid,
            ended: false,
            played: HashSet::new(),
            selection,
        }
    }

    fn free_lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.grid.lines().filter(|line| !self.played.contains(line))
    }
}

impl DecisionAgent for BaselineAgent {
    fn next_action(&mut self) -> Decision {
        info!(
            "Computing next move (grid={}, players={:?})",
            self.grid, self.players
        );
        if self.ended {
            return Decision::GameOver;
        }

        // played only holds lines of the grid, see register_action
        let Some(free) = self
            .grid
            .line_count()
            .map(|total| total.saturating_sub(self.played.len()))
        else {
            warn!(grid = %self.grid, "grid is too large to play on");
            return Decision::GameOver;
        };
        if free == 0 {
            return Decision::GameOver;
        }

        let index = match &mut self.selection {
            Selection::Random(rng) => rng.random_range(0..free),
            Selection::FirstFree => 0,
        };
        match self.free_lines().nth(index) {
            Some(line) => Decision::Move(line),
            None => Decision::GameOver,
        }
    }

    fn register_action(&mut self, line: Line, player: Player) {
        if !self.grid.contains(&line) {
            warn!(%line, grid = %self.grid, "ignoring line outside of the grid");
            return;
        }
        if !self.played.insert(line) {
            debug!(%line, %player, "line was already played");
        }
    }

    fn attach_player(&mut self, player: Player) {
        self.players.insert(player);
    }

    fn end_game(&mut self) {
        self.ended = true;
    }

    fn owns(&self, player: Player) -> bool {
        self.players.contains(&player)
    }

    fn owned_players(&self) -> BTreeSet<Player> {
        self.players.clone()
    }

    fn grid(&self) -> Grid {
        self.grid
    }

    fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Builds a [`BaselineAgent`] of a fixed kind for every new game.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFactory {
    kind: AgentKind,
    seed: Option<u64>,
}

impl BaselineFactory {
    /// With `seed` set, every game's random agent replays the same sequence.
    pub fn new(kind: AgentKind, seed: Option<u64>) -> BaselineFactory {
        BaselineFactory { kind, seed }
    }
}

impl AgentFactory for BaselineFactory {
    fn new_agent(&self, player: Player, grid: Grid) -> Box<dyn DecisionAgent> {
        Box::new(BaselineAgent::new(self.kind, player, grid, self.seed))
    }
}
