//! Module defining what a decision agent must implement to be hosted by the server
//!
//! The server never looks inside an agent: it only forwards observed moves, asks for the next
//! move when one of the agent's player slots is due to play, and tells it when the game ends.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// One of the two player slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Player(u8);

impl Player {
    /// Player that moves first.
    pub const ONE: Player = Player(1);
    /// Player that moves second.
    pub const TWO: Player = Player(2);

    /// Returns `None` for anything but 1 or 2.
    pub fn new(number: u8) -> Option<Player> {
        match number {
            1 | 2 => Some(Player(number)),
            _ => None,
        }
    }

    /// Slot number, 1 or 2.
    pub fn number(self) -> u8 {
        self.0
    }

    /// The other slot.
    pub fn opponent(self) -> Player {
        if self == Player::ONE {
            Player::TWO
        } else {
            Player::ONE
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Player::new(value).ok_or_else(|| format!("player must be 1 or 2, got {value}"))
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.0
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a line between two adjacent dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Line from `(row, column)` to `(row, column + 1)`
    #[serde(rename = "h")]
    Horizontal,
    /// Line from `(row, column)` to `(row + 1, column)`
    #[serde(rename = "v")]
    Vertical,
}

impl Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "h"),
            Orientation::Vertical => write!(f, "v"),
        }
    }
}

/// A single edge placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Line {
    pub row: usize,
    pub column: usize,
    pub orientation: Orientation,
}

impl Line {
    pub fn new(row: usize, column: usize, orientation: Orientation) -> Line {
        Line {
            row,
            column,
            orientation,
        }
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.row, self.column, self.orientation)
    }
}

/// Board size, counted in boxes.
///
/// A `rows` x `cols` grid has `rows + 1` rows of `cols` horizontal lines and `rows` rows of
/// `cols + 1` vertical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    /// Largest number of boxes accepted on either side of a board received from a peer.
    pub const MAX_SIDE: usize = 1000;

    pub fn new(rows: usize, cols: usize) -> Grid {
        Grid { rows, cols }
    }

    /// True if `line` lies on this board.
    pub fn contains(&self, line: &Line) -> bool {
        match line.orientation {
            Orientation::Horizontal => line.row <= self.rows && line.column < self.cols,
            Orientation::Vertical => line.row < self.rows && line.column <= self.cols,
        }
    }

    /// True if neither side exceeds [`Grid::MAX_SIDE`].
    pub fn is_playable(&self) -> bool {
        self.rows <= Self::MAX_SIDE && self.cols <= Self::MAX_SIDE
    }

    /// Number of lines on the board, `None` if it does not fit in a `usize`.
    pub fn line_count(&self) -> Option<usize> {
        let horizontal = self.rows.checked_add(1)?.checked_mul(self.cols)?;
        let vertical = self.rows.checked_mul(self.cols.checked_add(1)?)?;
        horizontal.checked_add(vertical)
    }

    /// Every line of the board, row by row, horizontal lines of a row before its vertical ones.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        (0..=self.rows).flat_map(move |row| {
            let horizontal =
                (0..self.cols).map(move |column| Line::new(row, column, Orientation::Horizontal));
            let vertical = (0..=self.cols)
                .take_while(move |_| row < self.rows)
                .map(move |column| Line::new(row, column, Orientation::Vertical));
            horizontal.chain(vertical)
        })
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Outcome of asking an agent for its next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Move(Line),
    /// Nothing left to play, or the session already ended. Not an error.
    GameOver,
}

/// What a server-side agent should implement.
///
/// One agent instance backs one game and may control one or both player slots.
pub trait DecisionAgent: Send {
    /// The move the agent wants to play now.
    ///
    /// May be arbitrarily slow: the server calls it off the async workers.
    fn next_action(&mut self) -> Decision;

    /// Inform the agent of a line played by any player, itself included.
    ///
    /// Must not panic for well-formed input.
    fn register_action(&mut self, line: Line, player: Player);

    /// Give control of another player slot to this agent. Idempotent.
    fn attach_player(&mut self, player: Player);

    /// Mark the game as finished. Idempotent.
    fn end_game(&mut self);

    /// True if this agent plays for `player`.
    fn owns(&self, player: Player) -> bool;

    /// Slots controlled by this agent, never empty.
    fn owned_players(&self) -> BTreeSet<Player>;

    /// Board size, fixed at creation.
    fn grid(&self) -> Grid;

    /// True once [`DecisionAgent::end_game`] has been called.
    fn is_ended(&self) -> bool;
}

/// What will be given to the registry to allow it to create agents
pub trait AgentFactory: Send + Sync {
    /// Returns an agent controlling `player` on a board of size `grid`
    fn new_agent(&self, player: Player, grid: Grid) -> Box<dyn DecisionAgent>;
}
