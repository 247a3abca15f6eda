//! Public codec API exercised on a byte stream shaped like real bus traffic.
use surron_bridge::{
    core::{BMS_ADDRESS, ESC_ADDRESS, HEADER_LEN, MAX_FRAME_LEN},
    error::FrameError,
    infra::codec::{
        bytes::ByteReader,
        frame::{checksum, decode_header, Command, Frame},
    },
};

/// ESC polling the BMS, the BMS answering, and an ESC status broadcast.
fn bus_capture() -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(&Frame::read_request(BMS_ADDRESS, 13, 1).unwrap().to_bytes());
    stream.extend_from_slice(&Frame::read_response(BMS_ADDRESS, 13, &[87]).unwrap().to_bytes());
    stream.extend_from_slice(&Frame::status(ESC_ADDRESS, 72, &[0xA5; 12]).unwrap().to_bytes());
    stream
}

#[test]
/// Headers alone are enough to find every frame boundary.
fn test_split_stream_on_header_lengths() {
    let stream = bus_capture();
    let mut offset = 0;
    let mut commands = Vec::new();

    while offset < stream.len() {
        let header = decode_header(&stream[offset..offset + HEADER_LEN]).unwrap();
        let end = offset + header.packet_length();
        let frame = Frame::decode(&stream[offset..end]).unwrap();
        assert_eq!(frame.header(), header);
        commands.push(frame.command());
        offset = end;
    }

    assert_eq!(
        commands,
        vec![Command::ReadRequest, Command::ReadResponse, Command::Status]
    );
    assert_eq!(offset, 6 + 7 + 18);
}

#[test]
fn test_status_length_byte_on_wire() {
    let bytes = Frame::status(ESC_ADDRESS, 72, &[0xA5; 12]).unwrap().to_bytes();
    assert_eq!(&bytes[..5], &[0x57, 0x83, 0x01, 72, 13]);
    assert_eq!(bytes.len(), 18);
}

#[test]
fn test_largest_frame() {
    let frame = Frame::read_response(BMS_ADDRESS, 39, &[0x11; 64]).unwrap();
    assert_eq!(frame.encoded_len(), MAX_FRAME_LEN);
    assert_eq!(Frame::decode(&frame.to_bytes()), Ok(frame));
    assert_eq!(
        Frame::read_response(BMS_ADDRESS, 39, &[0x11; 65]),
        Err(FrameError::PayloadTooLong { len: 65 })
    );
}

#[test]
fn test_checksum_wraps() {
    assert_eq!(checksum(&[]), 0);
    assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
    let bytes = Frame::read_request(BMS_ADDRESS, 9, 4).unwrap().to_bytes();
    assert_eq!(checksum(&bytes[..5]), bytes[5]);
}

#[test]
/// Response payloads are read as little-endian fields.
fn test_payload_fields() {
    let mut data = [0u8; 8];
    data[..4].copy_from_slice(&(-2_500i32).to_le_bytes());
    data[4..6].copy_from_slice(&4_150u16.to_le_bytes());
    data[6] = 0xF6;
    let frame = Frame::read_response(BMS_ADDRESS, 10, &data).unwrap();

    let mut reader = ByteReader::new(frame.payload().unwrap());
    assert_eq!(reader.read_i32(), Ok(-2_500));
    assert_eq!(reader.read_u16(), Ok(4_150));
    assert_eq!(reader.read_i8(), Ok(-10));
    assert_eq!(reader.remaining(), 1);
    assert!(reader.read_u16().is_err());
}
