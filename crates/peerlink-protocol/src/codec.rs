//! Codec trait and the binary codec implementation.
//!
//! A codec converts between [`WireMessage`] and the bytes of one frame.
//! Callers only depend on the [`Codec`] trait, so the byte layout can be
//! swapped without touching the tracker or the dispatcher.
//!
//! # Frame layout
//!
//! All numbers are little-endian.
//!
//! ```text
//! PlayerMoved         [0x01][control: u8][x: f32][y: f32]
//! WeaponFired         [0x02][angle: f32][power: f32]
//! PeerJoined          [0x10][id][x: f32][y: f32]
//! PeerLeft            [0x11][id]
//! PeerPositionUpdate  [0x12][id][x: f32][y: f32]
//! WorldSnapshot       [0x13][count: u16]{[id][x: f32][y: f32]} * count
//!
//! id (Utf8)           [len: u16][utf-8 bytes]
//! id (U64)            [id: u64]
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{MessageKind, PeerId, PeerPosition, PlayerControlState, Position2D, WireMessage};
use crate::ProtocolError;

/// Converts messages to frame bytes and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes one message into the bytes of one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the message can't be
    /// represented, e.g. an id too long for its length prefix.
    fn encode(&self, message: &WireMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Parses one frame.
    ///
    /// Returns `Ok(None)` for a discriminant this codec doesn't know, so a
    /// newer server can add message kinds without breaking older clients.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the frame is truncated, has trailing
    /// bytes, or carries an invalid field.
    fn decode(&self, data: &[u8]) -> Result<Option<WireMessage>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// PeerIdWire
// ---------------------------------------------------------------------------

/// How peer ids are represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerIdWire {
    /// `u16` byte length followed by UTF-8 bytes.
    #[default]
    Utf8,
    /// Eight-byte unsigned integer. Decoded ids are its decimal string.
    U64,
}

// ---------------------------------------------------------------------------
// BinaryCodec
// ---------------------------------------------------------------------------

/// The fixed-schema binary [`Codec`].
///
/// ```rust
/// use peerlink_protocol::{BinaryCodec, Codec, PlayerControlState, Position2D, WireMessage};
///
/// let codec = BinaryCodec::default();
/// let msg = WireMessage::PlayerMoved {
///     control: PlayerControlState::new(true, false, false, true),
///     position: Position2D::new(12.5, -3.0),
/// };
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(bytes.len(), 10);
/// assert_eq!(codec.decode(&bytes).unwrap(), Some(msg));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec {
    peer_id_wire: PeerIdWire,
}

impl BinaryCodec {
    pub fn new(peer_id_wire: PeerIdWire) -> Self {
        Self { peer_id_wire }
    }

    pub fn peer_id_wire(&self) -> PeerIdWire {
        self.peer_id_wire
    }

    fn write_peer_id(&self, out: &mut Vec<u8>, id: &PeerId) -> Result<(), ProtocolError> {
        match self.peer_id_wire {
            PeerIdWire::Utf8 => {
                let bytes = id.as_str().as_bytes();
                let len = u16::try_from(bytes.len()).map_err(|_| {
                    ProtocolError::InvalidMessage(format!(
                        "peer id is {} bytes, limit is {}",
                        bytes.len(),
                        u16::MAX
                    ))
                })?;
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(bytes);
            }
            PeerIdWire::U64 => {
                let n = parse_canonical_u64(id.as_str()).ok_or_else(|| {
                    ProtocolError::InvalidMessage(format!(
                        "peer id {id:?} is not a decimal u64"
                    ))
                })?;
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
        Ok(())
    }

    fn read_peer_id(&self, r: &mut Reader<'_>) -> Result<PeerId, ProtocolError> {
        match self.peer_id_wire {
            PeerIdWire::Utf8 => {
                let len = r.u16()? as usize;
                let bytes = r.take(len)?;
                let s = std::str::from_utf8(bytes)?;
                Ok(PeerId::from(s))
            }
            PeerIdWire::U64 => Ok(PeerId::from(r.u64()?)),
        }
    }
}

impl Codec for BinaryCodec {
    fn encode(&self, message: &WireMessage) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(16);
        out.push(message.kind().tag());

        match message {
            WireMessage::PlayerMoved { control, position } => {
                out.push(control.to_bits());
                write_position(&mut out, *position);
            }
            WireMessage::WeaponFired { angle, power } => {
                out.extend_from_slice(&angle.to_le_bytes());
                out.extend_from_slice(&power.to_le_bytes());
            }
            WireMessage::PeerJoined { peer_id, position }
            | WireMessage::PeerPositionUpdate { peer_id, position } => {
                self.write_peer_id(&mut out, peer_id)?;
                write_position(&mut out, *position);
            }
            WireMessage::PeerLeft { peer_id } => {
                self.write_peer_id(&mut out, peer_id)?;
            }
            WireMessage::WorldSnapshot { peers } => {
                let count = u16::try_from(peers.len()).map_err(|_| {
                    ProtocolError::InvalidMessage(format!(
                        "snapshot has {} entries, limit is {}",
                        peers.len(),
                        u16::MAX
                    ))
                })?;
                out.extend_from_slice(&count.to_le_bytes());
                for entry in peers {
                    self.write_peer_id(&mut out, &entry.peer_id)?;
                    write_position(&mut out, entry.position);
                }
            }
        }

        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Option<WireMessage>, ProtocolError> {
        let mut r = Reader::new(data);
        let Some(kind) = MessageKind::from_tag(r.u8()?) else {
            return Ok(None);
        };

        let message = match kind {
            MessageKind::PlayerMoved => {
                let bits = r.u8()?;
                let control = PlayerControlState::from_bits(bits)
                    .ok_or(ProtocolError::InvalidControlBits(bits))?;
                WireMessage::PlayerMoved {
                    control,
                    position: r.position()?,
                }
            }
            MessageKind::WeaponFired => WireMessage::WeaponFired {
                angle: r.f32()?,
                power: r.f32()?,
            },
            MessageKind::PeerJoined => WireMessage::PeerJoined {
                peer_id: self.read_peer_id(&mut r)?,
                position: r.position()?,
            },
            MessageKind::PeerLeft => WireMessage::PeerLeft {
                peer_id: self.read_peer_id(&mut r)?,
            },
            MessageKind::PeerPositionUpdate => WireMessage::PeerPositionUpdate {
                peer_id: self.read_peer_id(&mut r)?,
                position: r.position()?,
            },
            MessageKind::WorldSnapshot => {
                let count = r.u16()? as usize;
                // Cap the preallocation by what the frame could hold so a
                // bogus count can't force a large allocation.
                let mut peers = Vec::with_capacity(count.min(r.remaining() / 8));
                for _ in 0..count {
                    peers.push(PeerPosition {
                        peer_id: self.read_peer_id(&mut r)?,
                        position: r.position()?,
                    });
                }
                WireMessage::WorldSnapshot { peers }
            }
        };

        if r.remaining() > 0 {
            return Err(ProtocolError::TrailingBytes(r.remaining()));
        }
        Ok(Some(message))
    }
}

fn write_position(out: &mut Vec<u8>, position: Position2D) {
    out.extend_from_slice(&position.x.to_le_bytes());
    out.extend_from_slice(&position.y.to_le_bytes());
}

/// Parses `s` as a `u64` only if it is the exact decimal rendering of that
/// number, so `"007"` and `"+7"` are rejected.
fn parse_canonical_u64(s: &str) -> Option<u64> {
    let n: u64 = s.parse().ok()?;
    (n.to_string() == s).then_some(n)
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over a frame.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                offset: self.offset,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn position(&mut self) -> Result<Position2D, ProtocolError> {
        Ok(Position2D {
            x: self.f32()?,
            y: self.f32()?,
        })
    }
}
