//! Wire-level tests through the public API: what a client would send and
//! what the server must read back.

use pocketgate_protocol::codec::{decode_unsigned, encode_unsigned};
use pocketgate_protocol::packets::{Login, Respawn, RespawnState, ids};
use pocketgate_protocol::{BatchLimits, Packet, ProtocolError, Vector3f, decode_batch, encode_batch};

#[test]
fn test_varint_round_trip_across_every_group_width() {
    // One value at each group boundary below 2^63.
    for shift in 0..63 {
        for value in [1u64 << shift, (1u64 << shift) - 1, (1u64 << shift) + 1] {
            let mut out = Vec::new();
            encode_unsigned(&mut out, value);
            let mut slice = out.as_slice();
            assert_eq!(decode_unsigned(&mut slice).unwrap(), value);
        }
    }
}

#[test]
fn test_varint_cut_mid_value_is_malformed() {
    let mut out = Vec::new();
    encode_unsigned(&mut out, 1 << 40);
    out.pop();
    assert!(matches!(
        decode_unsigned(&mut out.as_slice()),
        Err(ProtocolError::MalformedVarint)
    ));
}

#[test]
fn test_login_from_newer_client_decodes_without_body() {
    let mut frame = vec![ids::LOGIN];
    frame.extend_from_slice(&100i32.to_be_bytes());
    frame.extend_from_slice(b"whatever the new layout is");

    let Packet::Login(login) = Packet::decode(&frame).unwrap() else {
        panic!("expected a Login");
    };
    assert_eq!(login.protocol_version, 100);
    assert_eq!(login, Login { protocol_version: 100, ..Login::default() });
}

#[test]
fn test_respawn_state_byte_out_of_range_rejected_through_registry() {
    let packet = Packet::from(Respawn {
        position: Vector3f::new(1.0, 2.0, 3.0),
        state: RespawnState::ServerReady,
        entity_id: 9,
    });
    let mut bytes = packet.encode().unwrap();
    // id byte + 12 vector bytes, then the state byte.
    bytes[13] = 3;
    assert!(matches!(
        Packet::decode(&bytes),
        Err(ProtocolError::InvalidEnumValue { value: 3, .. })
    ));
}

#[test]
fn test_batch_carries_login_packet() {
    let login = Login {
        protocol_version: 91,
        game_edition: 0,
        chain_data: "{\"chain\":[]}".into(),
        skin_data: String::new(),
    };
    let frame = encode_batch(&[login.clone().into()], 6).unwrap();
    let raw = decode_batch(&frame, BatchLimits::default()).unwrap();
    assert_eq!(Packet::decode(&raw[0]).unwrap(), Packet::Login(login));
}
