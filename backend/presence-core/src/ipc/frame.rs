//! Length-prefixed frame codec.
//!
//! Wire layout, no padding:
//!
//! ```text
//! +----------------+----------------+------------------+
//! | opcode: u32 LE | length: u32 LE | payload (length) |
//! +----------------+----------------+------------------+
//! ```
//!
//! The pure half (`encode`, `decode_header`, [`Frame::decode`]) never
//! touches I/O; [`read_frame`] and [`write_frame`] move one frame across a
//! [`Transport`] under a timeout.

use crate::error::LinkError;
use crate::error::protocol::ProtocolError;
use crate::error::transport::TransportError;
use crate::transport::Transport;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::time::Duration;

use log::trace;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

pub const HEADER_LEN: usize = 8;

/// Largest payload accepted in either direction.
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl Opcode {
    pub const ALL: [Opcode; 5] = [
        Opcode::Handshake,
        Opcode::Frame,
        Opcode::Close,
        Opcode::Ping,
        Opcode::Pong,
    ];

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Opcode {
    type Error = ProtocolError;

    #[track_caller]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            opcode => Err(ProtocolError::UnknownOpcode {
                opcode,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            Opcode::Handshake => "HANDSHAKE",
            Opcode::Frame => "FRAME",
            Opcode::Close => "CLOSE",
            Opcode::Ping => "PING",
            Opcode::Pong => "PONG",
        };
        write!(f, "{name}({})", self.as_u32())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Frame whose payload is `value` serialized as JSON.
    pub fn json<T: Serialize>(opcode: Opcode, value: &T) -> Result<Self, ProtocolError> {
        Ok(Self::new(opcode, serde_json::to_vec(value)?))
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.opcode, &self.payload)
    }

    /// Decode one complete frame occupying all of `bytes`.
    #[track_caller]
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (raw_opcode, length) = decode_header(header);
        let opcode = Opcode::try_from(raw_opcode)?;
        check_length(length)?;

        let expected = HEADER_LEN + length as usize;
        if bytes.len() != expected {
            return Err(ProtocolError::Truncated {
                expected,
                actual: bytes.len(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self::new(opcode, &bytes[HEADER_LEN..]))
    }

    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Payload as text for logging; invalid UTF-8 is replaced.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Header followed by the raw payload.
pub fn encode(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&opcode.as_u32().to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Split a header into `(opcode, payload length)`.
pub fn decode_header(header: [u8; HEADER_LEN]) -> (u32, u32) {
    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (opcode, length)
}

#[track_caller]
fn check_length(length: u32) -> Result<(), ProtocolError> {
    if length > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            length,
            max: MAX_FRAME_LEN,
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}

/// Write one frame, failing if it takes longer than `limit`.
pub async fn write_frame<S>(
    transport: &mut Transport<S>,
    frame: &Frame,
    limit: Duration,
) -> Result<(), LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let length = u32::try_from(frame.payload.len()).unwrap_or(u32::MAX);
    check_length(length)?;

    let bytes = frame.encode();
    timeout(limit, transport.write_all(&bytes))
        .await
        .map_err(|_| TransportError::timeout("frame write", limit))??;

    trace!("Sent frame {} ({} bytes)", frame.opcode, frame.payload.len());
    Ok(())
}

/// Read one frame, failing if the whole frame has not arrived within `limit`.
pub async fn read_frame<S>(transport: &mut Transport<S>, limit: Duration) -> Result<Frame, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    timeout(limit, read_frame_unbounded(transport))
        .await
        .map_err(|_| TransportError::timeout("frame read", limit))?
}

async fn read_frame_unbounded<S>(transport: &mut Transport<S>) -> Result<Frame, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut header = [0u8; HEADER_LEN];
    transport.read_exact(&mut header).await?;

    let (raw_opcode, length) = decode_header(header);
    let opcode = Opcode::try_from(raw_opcode)?;
    check_length(length)?;

    let mut payload = vec![0u8; length as usize];
    if length > 0 {
        transport.read_exact(&mut payload).await?;
    }

    trace!("Received frame {opcode} ({length} bytes)");
    Ok(Frame { opcode, payload })
}
