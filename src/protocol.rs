//! JSON frames exchanged with the game front-end.
//!
//! Inbound:
//! ```text
//! {"type":"start","game":"g1","player":1,"grid":[2,2]}
//! {"type":"action","game":"g1","nextplayer":2,"row":0,"column":1,"orientation":"h"}
//! {"type":"end","game":"g1"}
//! ```
//! Outbound:
//! ```text
//! {"type":"action","action":[0,1,"v"]}
//! ```

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game_interface::{Grid, Line, Orientation, Player};

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start {
        game: String,
        player: Player,
        grid: Grid,
    },
    Action {
        game: String,
        next_player: Player,
        line: Line,
        /// Who drew `line`, when the front-end says so.
        player: Option<Player>,
    },
    End {
        game: String,
    },
}

impl Inbound {
    pub fn game(&self) -> &str {
        match self {
            Inbound::Start { game, .. } | Inbound::Action { game, .. } | Inbound::End { game } => {
                game
            }
        }
    }
}

/// Result of decoding one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Inbound),
    /// Well-formed JSON object whose `type` is not part of the protocol.
    Unknown(Value),
}

/// Reply sent back to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Action {
        action: (usize, usize, Orientation),
    },
}

impl Outbound {
    pub fn action(line: Line) -> Outbound {
        Outbound::Action {
            action: (line.row, line.column, line.orientation),
        }
    }
}

#[derive(Deserialize)]
struct StartFrame {
    game: String,
    player: Player,
    grid: (usize, usize),
}

#[derive(Deserialize)]
struct ActionFrame {
    game: String,
    #[serde(rename = "nextplayer")]
    next_player: Player,
    row: usize,
    column: usize,
    orientation: Orientation,
    #[serde(default)]
    player: Option<Player>,
}

#[derive(Deserialize)]
struct EndFrame {
    game: String,
}

/// Decode a text frame.
///
/// # Errors
/// Returned when the text is not a JSON object, or when a `start`, `action` or `end` message
/// misses a field or carries an invalid one. A `start` whose grid has a side larger than
/// [`Grid::MAX_SIDE`] is malformed too. An unrecognized `type` is not an error.
pub fn decode(text: &str) -> anyhow::Result<Frame> {
    let value: Value = serde_json::from_str(text).context("frame is not valid JSON")?;
    if !value.is_object() {
        bail!("frame is not a JSON object");
    }

    let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
    let inbound = match kind.as_deref() {
        Some("start") => {
            let frame: StartFrame = serde_json::from_value(value).context("malformed 'start'")?;
            let grid = Grid::new(frame.grid.0, frame.grid.1);
            if !grid.is_playable() {
                bail!(
                    "malformed 'start': grid {grid} exceeds {max}x{max}",
                    max = Grid::MAX_SIDE
                );
            }
            Inbound::Start {
                game: frame.game,
                player: frame.player,
                grid,
            }
        }
        Some("action") => {
            let frame: ActionFrame =
                serde_json::from_value(value).context("malformed 'action'")?;
            Inbound::Action {
                game: frame.game,
                next_player: frame.next_player,
                line: Line::new(frame.row, frame.column, frame.orientation),
                player: frame.player,
            }
        }
        Some("end") => {
            let frame: EndFrame = serde_json::from_value(value).context("malformed 'end'")?;
            Inbound::End { game: frame.game }
        }
        _ => return Ok(Frame::Unknown(value)),
    };
    Ok(Frame::Message(inbound))
}

/// Encode a reply as a text frame.
pub fn encode(outbound: &Outbound) -> anyhow::Result<String> {
    serde_json::to_string(outbound).map_err(|e| anyhow!("could not encode {outbound:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_start() {
        let frame = decode(r#"{"type":"start","game":"g1","player":1,"grid":[2,3]}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Message(Inbound::Start {
                game: "g1".to_string(),
                player: Player::ONE,
                grid: Grid::new(2, 3),
            })
        );
    }

    #[test]
    fn decode_action_with_extra_fields() {
        let text = r#"{"type":"action","game":"g1","player":1,"nextplayer":2,
            "score":[0,0],"row":1,"column":0,"orientation":"v"}"#;
        let Frame::Message(inbound) = decode(text).unwrap() else {
            panic!("expected a protocol message");
        };
        assert_eq!(
            inbound,
            Inbound::Action {
                game: "g1".to_string(),
                next_player: Player::TWO,
                line: Line::new(1, 0, Orientation::Vertical),
                player: Some(Player::ONE),
            }
        );
        assert_eq!(inbound.game(), "g1");
    }

    #[test]
    fn decode_end() {
        let frame = decode(r#"{"type":"end","game":"abc"}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Message(Inbound::End {
                game: "abc".to_string()
            })
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert!(matches!(
            decode(r#"{"type":"chat","game":"g1"}"#).unwrap(),
            Frame::Unknown(_)
        ));
        assert!(matches!(
            decode(r#"{"game":"g1"}"#).unwrap(),
            Frame::Unknown(_)
        ));
    }

    #[test]
    fn malformed_frames() {
        assert!(decode("not json").is_err());
        assert!(decode("[1,2]").is_err());
        assert!(decode(r#"{"type":"start","game":"g1","grid":[2,2]}"#).is_err());
        assert!(decode(r#"{"type":"start","game":"g1","player":3,"grid":[2,2]}"#).is_err());
        assert!(decode(r#"{"type":"start","game":"g1","player":1,"grid":[-1,2]}"#).is_err());
        assert!(decode(
            r#"{"type":"action","game":"g1","nextplayer":1,"row":0,"column":0,"orientation":"d"}"#
        )
        .is_err());
        assert!(decode(r#"{"type":"end"}"#).is_err());
    }

    #[test]
    fn oversized_grid_is_malformed() {
        let error = decode(r#"{"type":"start","game":"g1","player":1,"grid":[100000,100000]}"#)
            .unwrap_err();
        assert!(error.to_string().contains("malformed 'start'"));
        assert!(decode(r#"{"type":"start","game":"g1","player":1,"grid":[2,1001]}"#).is_err());

        let largest = decode(r#"{"type":"start","game":"g1","player":2,"grid":[1000,1000]}"#);
        assert!(matches!(
            largest.unwrap(),
            Frame::Message(Inbound::Start { grid, .. }) if grid == Grid::new(1000, 1000)
        ));
    }

    #[test]
    fn encode_action() {
        let text = encode(&Outbound::action(Line::new(2, 1, Orientation::Horizontal))).unwrap();
        assert_eq!(text, r#"{"type":"action","action":[2,1,"h"]}"#);
    }
}
