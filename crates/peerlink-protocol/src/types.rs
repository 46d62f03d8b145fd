//! Core protocol types for Peerlink's wire format.
//!
//! Every type in this module either travels on the wire or is a field of
//! something that does. The byte layout itself lives in the codec; these
//! are the plain Rust values on either side of it.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a remote player.
///
/// The server has shipped two encodings for player ids over time: a
/// length-prefixed string and a 64-bit integer. The codec normalizes both
/// to this string form, so nothing past the codec ever sees a number.
///
/// `#[serde(transparent)]` keeps the JSON form a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a `PeerId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<u64> for PeerId {
    /// Renders a numeric wire id to its decimal string.
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// A point in world space.
///
/// No bounds are enforced here. Wrapping at the stage edge is the movement
/// system's business.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f32,
    pub y: f32,
}

impl Position2D {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Bitwise equality: `-0.0` differs from `0.0` and `NaN` equals
    /// itself. This agrees with whether the encoded bytes would differ.
    pub fn same_bits(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

/// Which movement keys the local player is holding.
///
/// The four flags are independent. Holding left and right at once is
/// representable; whether that is allowed is up to the input collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerControlState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl PlayerControlState {
    const UP: u8 = 0b0001;
    const DOWN: u8 = 0b0010;
    const LEFT: u8 = 0b0100;
    const RIGHT: u8 = 0b1000;

    /// Mask of the bits a control byte may carry.
    pub const VALID_BITS: u8 = 0b1111;

    pub fn new(up: bool, down: bool, left: bool, right: bool) -> Self {
        Self {
            up,
            down,
            left,
            right,
        }
    }

    /// Packs the flags into the low nibble of a byte.
    pub fn to_bits(self) -> u8 {
        let mut bits = 0;
        if self.up {
            bits |= Self::UP;
        }
        if self.down {
            bits |= Self::DOWN;
        }
        if self.left {
            bits |= Self::LEFT;
        }
        if self.right {
            bits |= Self::RIGHT;
        }
        bits
    }

    /// Unpacks a control byte. Returns `None` if any of the high four bits
    /// are set.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::VALID_BITS != 0 {
            return None;
        }
        Some(Self {
            up: bits & Self::UP != 0,
            down: bits & Self::DOWN != 0,
            left: bits & Self::LEFT != 0,
            right: bits & Self::RIGHT != 0,
        })
    }

    /// `true` if any direction is held.
    pub fn is_moving(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// One entry of a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerPosition {
    pub peer_id: PeerId,
    pub position: Position2D,
}

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// The discriminant written as the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    PlayerMoved = 0x01,
    WeaponFired = 0x02,
    PeerJoined = 0x10,
    PeerLeft = 0x11,
    PeerPositionUpdate = 0x12,
    WorldSnapshot = 0x13,
}

impl MessageKind {
    /// The tag byte for this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Maps a tag byte back to a kind. Unknown tags yield `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::PlayerMoved),
            0x02 => Some(Self::WeaponFired),
            0x10 => Some(Self::PeerJoined),
            0x11 => Some(Self::PeerLeft),
            0x12 => Some(Self::PeerPositionUpdate),
            0x13 => Some(Self::WorldSnapshot),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlayerMoved => "PlayerMoved",
            Self::WeaponFired => "WeaponFired",
            Self::PeerJoined => "PeerJoined",
            Self::PeerLeft => "PeerLeft",
            Self::PeerPositionUpdate => "PeerPositionUpdate",
            Self::WorldSnapshot => "WorldSnapshot",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// Every message that can travel in a frame.
///
/// The first two variants flow client → server, the rest server → client.
/// One frame carries exactly one `WireMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// The local player's held keys and current position.
    PlayerMoved {
        control: PlayerControlState,
        position: Position2D,
    },

    /// The local player fired. Angle in radians, power unitless.
    WeaponFired { angle: f32, power: f32 },

    /// A remote player entered the world.
    PeerJoined { peer_id: PeerId, position: Position2D },

    /// A remote player left the world.
    PeerLeft { peer_id: PeerId },

    /// A remote player moved.
    PeerPositionUpdate { peer_id: PeerId, position: Position2D },

    /// Positions of every peer currently in the world.
    WorldSnapshot { peers: Vec<PeerPosition> },
}

impl WireMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::PlayerMoved { .. } => MessageKind::PlayerMoved,
            Self::WeaponFired { .. } => MessageKind::WeaponFired,
            Self::PeerJoined { .. } => MessageKind::PeerJoined,
            Self::PeerLeft { .. } => MessageKind::PeerLeft,
            Self::PeerPositionUpdate { .. } => MessageKind::PeerPositionUpdate,
            Self::WorldSnapshot { .. } => MessageKind::WorldSnapshot,
        }
    }
}
