//! End-to-end tests of the cipher and frame codec over a simulated byte
//! stream: frames produced by one side must survive arbitrary re-chunking
//! on the way to the other.

use taut_protocol::{Cipher, Frame, FRAME_HEADER_LEN};

fn relay_stream(chunks: &[&[u8]], cipher: &Cipher) -> Result<Vec<Vec<u8>>, taut_protocol::Error> {
    let mut rxbuf: Vec<u8> = Vec::new();
    let mut packets = Vec::new();
    for chunk in chunks {
        rxbuf.extend_from_slice(chunk);
        while let Some((frame, used)) = Frame::decode_next(&rxbuf)? {
            rxbuf.drain(..used);
            packets.push(cipher.decrypt(&frame)?);
        }
    }
    if !rxbuf.is_empty() {
        return Err(taut_protocol::Error::FrameTooShort {
            expected: Frame::required_len(&rxbuf),
            actual: rxbuf.len(),
        });
    }
    Ok(packets)
}

#[test]
fn three_packets_survive_every_chunking() {
    let cipher = Cipher::new(b"stream-test-key");
    let payloads: Vec<Vec<u8>> = vec![
        vec![0x01; 60],
        (0..200).map(|i| i as u8).collect(),
        vec![0xFF; 1],
    ];

    let mut wire = Vec::new();
    for p in &payloads {
        wire.extend_from_slice(&cipher.encrypt(p).unwrap().encode());
    }

    // Split the whole stream at every possible single cut point.
    for cut in 0..=wire.len() {
        let packets = relay_stream(&[&wire[..cut], &wire[cut..]], &cipher).unwrap();
        assert_eq!(packets, payloads, "failed with cut at {cut}");
    }

    // And byte-by-byte delivery.
    let bytes: Vec<&[u8]> = wire.chunks(1).collect();
    assert_eq!(relay_stream(&bytes, &cipher).unwrap(), payloads);
}

#[test]
fn truncated_stream_is_reported() {
    let cipher = Cipher::new(b"stream-test-key");
    let wire = cipher.encrypt(&[0u8; 60]).unwrap().encode();

    let err = relay_stream(&[&wire[..3]], &cipher).unwrap_err();
    match err {
        taut_protocol::Error::FrameTooShort { expected, actual } => {
            assert_eq!(actual, 3);
            assert!(expected >= FRAME_HEADER_LEN);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn corrupt_length_prefix_is_fatal() {
    let cipher = Cipher::new(b"stream-test-key");
    let mut wire = cipher.encrypt(&[0u8; 60]).unwrap().encode();
    // Desync the stream: a length that is not a block multiple.
    wire[0] = 0x00;
    wire[1] = 0x05;

    assert!(matches!(
        relay_stream(&[&wire], &cipher),
        Err(taut_protocol::Error::InvalidFrameLength(5))
    ));
}
