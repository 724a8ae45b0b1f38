use crate::error::LinkError;
use crate::error::protocol::ProtocolError;
use crate::error::transport::TransportError;
use crate::ipc::frame::{
    Frame, HEADER_LEN, MAX_FRAME_LEN, Opcode, decode_header, encode, read_frame, write_frame,
};
use crate::transport::Transport;

use std::time::Duration;

use tokio::io::{AsyncWriteExt, duplex};

const LIMIT: Duration = Duration::from_secs(10);

/// **VALUE**: Every opcode survives the trip through the codec unchanged.
///
/// **BUG THIS CATCHES**: Would catch a missing arm in the opcode conversion, or
/// a header written in the wrong byte order.
#[test]
fn given_each_opcode_when_encoded_and_decoded_then_frame_is_identical() {
    for opcode in Opcode::ALL {
        // GIVEN: A frame with a JSON payload
        let frame = Frame::new(opcode, br#"{"k":"v"}"#.to_vec());

        // WHEN: Encoding then decoding
        let decoded = Frame::decode(&frame.encode()).unwrap();

        // THEN: Nothing changed
        assert_eq!(decoded, frame, "Round trip failed for {opcode}");
    }
}

/// **VALUE**: Pins the exact wire layout the daemon expects.
///
/// **BUG THIS CATCHES**: Would catch big-endian headers or a length that counts
/// the header itself.
#[test]
fn given_frame_when_encoded_then_header_is_little_endian_opcode_and_length() {
    // GIVEN/WHEN: Encoding a Ping with a 2-byte payload
    let bytes = encode(Opcode::Ping, b"{}");

    // THEN: opcode 3, length 2, payload
    assert_eq!(bytes, vec![3, 0, 0, 0, 2, 0, 0, 0, b'{', b'}']);
}

#[test]
fn given_header_bytes_when_decoded_then_returns_opcode_and_length() {
    let header = [1, 0, 0, 0, 0x10, 0x01, 0, 0];

    assert_eq!(decode_header(header), (1, 0x0110));
}

#[test]
fn given_unknown_opcode_when_decoding_then_returns_unknown_opcode_error() {
    // GIVEN: Opcode 9 with an empty payload
    let bytes = [9, 0, 0, 0, 0, 0, 0, 0];

    // WHEN: Decoding
    let result = Frame::decode(&bytes);

    // THEN: Rejected
    assert!(matches!(
        result,
        Err(ProtocolError::UnknownOpcode { opcode: 9, .. })
    ));
}

#[test]
fn given_short_buffer_when_decoding_then_returns_truncated_error() {
    // GIVEN: A header announcing 10 bytes but only 3 present
    let mut bytes = encode(Opcode::Frame, b"0123456789");
    bytes.truncate(HEADER_LEN + 3);

    // WHEN/THEN
    assert!(matches!(
        Frame::decode(&bytes),
        Err(ProtocolError::Truncated {
            expected: 18,
            actual: 11,
            ..
        })
    ));
    assert!(matches!(
        Frame::decode(&bytes[..4]),
        Err(ProtocolError::Truncated { .. })
    ));
}

/// **VALUE**: A corrupted length must not make us allocate gigabytes.
///
/// **BUG THIS CATCHES**: Would catch the reader trusting the length field before
/// checking it against the cap.
#[tokio::test]
async fn given_oversized_length_when_reading_then_rejects_before_reading_payload() {
    // GIVEN: A peer announcing a payload one byte over the cap
    let (client, mut server) = duplex(64);
    let mut header = Vec::new();
    header.extend_from_slice(&Opcode::Frame.as_u32().to_le_bytes());
    header.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
    server.write_all(&header).await.unwrap();

    // WHEN: Reading a frame
    let mut transport = Transport::new(client);
    let result = read_frame(&mut transport, LIMIT).await;

    // THEN: FrameTooLarge, no payload read attempted
    assert!(matches!(
        result,
        Err(LinkError::Protocol(ProtocolError::FrameTooLarge { .. }))
    ));
}

#[tokio::test]
async fn given_frame_written_when_read_on_other_end_then_matches() {
    // GIVEN: Both ends of an in-memory stream
    let (client, server) = duplex(1024);
    let mut writer = Transport::new(client);
    let mut reader = Transport::new(server);
    let frame = Frame::new(Opcode::Frame, br#"{"cmd":"SET_ACTIVITY"}"#.to_vec());

    // WHEN: Writing on one side and reading on the other
    write_frame(&mut writer, &frame, LIMIT).await.unwrap();
    let received = read_frame(&mut reader, LIMIT).await.unwrap();

    // THEN: Same frame
    assert_eq!(received, frame);
}

/// **BUG THIS CATCHES**: Would catch a read that waits forever on a silent peer,
/// which would wedge the worker and block shutdown.
#[tokio::test(start_paused = true)]
async fn given_silent_peer_when_reading_then_times_out() {
    // GIVEN: A peer that never writes
    let (client, _server) = duplex(64);
    let mut transport = Transport::new(client);

    // WHEN: Reading with a 10 second limit
    let result = read_frame(&mut transport, LIMIT).await;

    // THEN: Timeout error
    assert!(matches!(
        result,
        Err(LinkError::Transport(TransportError::Timeout { .. }))
    ));
}

#[tokio::test]
async fn given_peer_hung_up_mid_frame_when_reading_then_returns_closed() {
    // GIVEN: A header promising 5 bytes, then only 2 and a hang-up
    let (client, mut server) = duplex(64);
    let mut bytes = encode(Opcode::Frame, b"hello");
    bytes.truncate(HEADER_LEN + 2);
    server.write_all(&bytes).await.unwrap();
    drop(server);

    // WHEN
    let mut transport = Transport::new(client);
    let result = read_frame(&mut transport, LIMIT).await;

    // THEN
    assert!(matches!(
        result,
        Err(LinkError::Transport(TransportError::Closed { .. }))
    ));
}

#[test]
fn given_opcode_when_displayed_then_shows_name_and_number() {
    assert_eq!(Opcode::Pong.to_string(), "PONG(4)");
    assert_eq!(Opcode::try_from(2).unwrap(), Opcode::Close);
}
