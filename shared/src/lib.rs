//! Wire protocol shared by the server and the client
//!
//! Every message is a JSON envelope `{"Tag": ..., "Data": ...}` written on its
//! own line. The tag selects how `Data` is interpreted:
//!
//! | Tag        | Data                                   |
//! |------------|----------------------------------------|
//! | `"update"` | `{"You": int, "Others": {id: int}}`    |
//! | `"key"`    | `"a"` (move left) or `"d"` (move right) |
//! | `"mouse"`  | reserved, any value                    |
//!
//! Decoding never panics. Anything that is not a well-formed envelope with a
//! known tag and a payload of the right shape is reported as a
//! [`ProtocolError`] so the caller can drop the offending connection.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Distance a single move command shifts a position
pub const MOVE_STEP: Position = 5;
/// Position assigned to every newly registered connection
pub const START_POSITION: Position = 0;
pub const DEFAULT_PORT: u16 = 8080;
/// Default broadcast cadence of the server (every 200ms)
pub const BROADCASTS_PER_SECOND: u32 = 5;

/// Opaque per-connection key assigned by the server
pub type Identity = String;
/// Single-axis position, unbounded
pub type Position = i64;

/// A discrete movement impulse sent by a client
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveCommand {
    #[serde(rename = "a")]
    MoveLeft,
    #[serde(rename = "d")]
    MoveRight,
}

impl MoveCommand {
    /// Signed shift this command applies to a position
    pub fn delta(self) -> Position {
        match self {
            MoveCommand::MoveLeft => -MOVE_STEP,
            MoveCommand::MoveRight => MOVE_STEP,
        }
    }

    pub fn apply(self, position: Position) -> Position {
        position + self.delta()
    }
}

/// The view of the world personalized for one connection
///
/// `others` never contains the viewer's own identity.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ClientGameState {
    #[serde(rename = "You")]
    pub you: Position,
    #[serde(rename = "Others", default, deserialize_with = "null_as_empty")]
    pub others: HashMap<Identity, Position>,
}

impl ClientGameState {
    pub fn new(you: Position, others: HashMap<Identity, Position>) -> Self {
        Self { you, others }
    }
}

// Some peers encode an empty map as `null`.
fn null_as_empty<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<Identity, Position>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<Identity, Position>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope tags understood by this protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    StateUpdate,
    KeyPress,
    MouseClick,
}

impl MessageTag {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageTag::StateUpdate => "update",
            MessageTag::KeyPress => "key",
            MessageTag::MouseClick => "mouse",
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageTag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "update" => Ok(MessageTag::StateUpdate),
            "key" => Ok(MessageTag::KeyPress),
            "mouse" => Ok(MessageTag::MouseClick),
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Server to client: personalized snapshot
    StateUpdate(ClientGameState),
    /// Client to server: movement input
    Move(MoveCommand),
    /// Client to server: pointer input, currently ignored by the server
    MouseClick(Value),
}

impl Message {
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::StateUpdate(_) => MessageTag::StateUpdate,
            Message::Move(_) => MessageTag::KeyPress,
            Message::MouseClick(_) => MessageTag::MouseClick,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Data", default)]
    data: Value,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown message tag {0:?}")]
    UnknownTag(String),

    #[error("invalid {tag} payload: {source}")]
    InvalidPayload {
        tag: MessageTag,
        source: serde_json::Error,
    },

    #[error("expected {expected} message, got {found}")]
    UnexpectedTag {
        expected: MessageTag,
        found: MessageTag,
    },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Outgoing envelope borrowing its payload; fields keep declaration order
#[derive(Serialize)]
struct OutgoingEnvelope<'a, T: Serialize> {
    #[serde(rename = "Tag")]
    tag: &'static str,
    #[serde(rename = "Data")]
    data: &'a T,
}

fn encode_payload<T: Serialize>(tag: MessageTag, data: &T) -> Result<String> {
    let envelope = OutgoingEnvelope {
        tag: tag.as_str(),
        data,
    };
    serde_json::to_string(&envelope).map_err(ProtocolError::Encode)
}

/// Encodes a message as a single JSON envelope without a line terminator
pub fn encode(message: &Message) -> Result<String> {
    let tag = message.tag();
    match message {
        Message::StateUpdate(state) => encode_payload(tag, state),
        Message::Move(command) => encode_payload(tag, command),
        Message::MouseClick(value) => encode_payload(tag, value),
    }
}

/// Encodes a message and appends the `\n` line terminator
pub fn encode_line(message: &Message) -> Result<String> {
    let mut line = encode(message)?;
    line.push('\n');
    Ok(line)
}

/// Decodes one line into a message
pub fn decode(line: &str) -> Result<Message> {
    let envelope: Envelope = serde_json::from_str(line).map_err(ProtocolError::Malformed)?;
    let tag: MessageTag = envelope.tag.parse()?;

    let invalid = |source| ProtocolError::InvalidPayload { tag, source };
    match tag {
        MessageTag::StateUpdate => serde_json::from_value(envelope.data)
            .map(Message::StateUpdate)
            .map_err(invalid),
        MessageTag::KeyPress => serde_json::from_value(envelope.data)
            .map(Message::Move)
            .map_err(invalid),
        MessageTag::MouseClick => Ok(Message::MouseClick(envelope.data)),
    }
}

/// Decodes a line that must carry a state update
pub fn decode_state_update(line: &str) -> Result<ClientGameState> {
    match decode(line)? {
        Message::StateUpdate(state) => Ok(state),
        other => Err(ProtocolError::UnexpectedTag {
            expected: MessageTag::StateUpdate,
            found: other.tag(),
        }),
    }
}

/// Decodes a line that must carry a move command
pub fn decode_move_command(line: &str) -> Result<MoveCommand> {
    match decode(line)? {
        Message::Move(command) => Ok(command),
        other => Err(ProtocolError::UnexpectedTag {
            expected: MessageTag::KeyPress,
            found: other.tag(),
        }),
    }
}
