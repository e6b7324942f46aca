//! Session tests driven the way a real client would: encoded datagrams in,
//! flushed frames out.

use std::sync::{Arc, Mutex};

use p384::SecretKey;
use p384::ecdsa::SigningKey;
use pocketgate_protocol::packets::{
    ClientToServerHandshake, Disconnect, Login, MobEquipment, PlayStatus, PlayStatusKind,
    RequestChunkRadius, ResourcePacksInfo, Text,
};
use pocketgate_protocol::{PROTOCOL_VERSION, Packet};
use pocketgate_session::auth::{JwtToken, encode_public_key};
use pocketgate_session::encryption::client_session_key;
use pocketgate_session::{
    EncryptionSupport, FrameCodec, LoginEvent, LoginListener, LoginPool, PacketCipher,
    PlayContext, PlayHandler, Session, SessionConfig, SessionError, SessionPhase,
    SessionServices, TrustRoot, ViewerSink, DEFAULT_BUSY_MESSAGE,
    DEFAULT_UNTRUSTED_IDENTITY_MESSAGE,
};
use pocketgate_transport::ConnectionId;
use rand_core::OsRng;
use serde_json::{Map, Value, json};

// =========================================================================
// Helpers
// =========================================================================

fn claims(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("claims must be an object"),
    }
}

/// A fake client: an identity key, a certificate chain signed by some
/// root, and its own frame codec.
struct TestClient {
    secret: SecretKey,
    signing: SigningKey,
    chain_data: String,
    codec: FrameCodec,
}

impl TestClient {
    fn new(root: &SecretKey, name: &str) -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let signing = SigningKey::from(&secret);
        let leaf = JwtToken::sign(
            &claims(json!({
                "identityPublicKey": encode_public_key(&secret.public_key()).unwrap(),
                "extraData": {"displayName": name, "identity": "0000-uuid", "XUID": "2535"}
            })),
            &SigningKey::from(root),
        )
        .unwrap();
        Self {
            secret,
            signing,
            chain_data: json!({ "chain": [leaf] }).to_string(),
            codec: FrameCodec::default(),
        }
    }

    fn login(&self) -> Packet {
        let client_data = JwtToken::sign(
            &claims(json!({"SkinId": "Standard_Steve", "LanguageCode": "en_US"})),
            &self.signing,
        )
        .unwrap();
        Login {
            protocol_version: PROTOCOL_VERSION,
            game_edition: 0,
            chain_data: self.chain_data.clone(),
            skin_data: client_data,
        }
        .into()
    }

    fn datagram(&mut self, packets: &[Packet]) -> Vec<u8> {
        self.codec.encode(packets).unwrap()
    }

    fn read_all(&mut self, frames: &[Vec<u8>]) -> Vec<Packet> {
        frames
            .iter()
            .flat_map(|frame| self.codec.decode(frame).unwrap())
            .collect()
    }
}

fn session_with(services: SessionServices) -> Session {
    Session::new(
        ConnectionId::new(1),
        "10.0.0.2:19132".parse().unwrap(),
        7,
        Arc::new(services),
    )
}

fn services(root: &SecretKey) -> SessionServices {
    SessionServices::new(Arc::new(TrustRoot::new(root.public_key())))
}

fn unencrypted(root: &SecretKey) -> SessionServices {
    services(root).with_config(SessionConfig {
        encryption: EncryptionSupport::Disabled,
        ..SessionConfig::default()
    })
}

/// Runs the handshake from the client side once the server has answered
/// the login with `frames`.
fn complete_handshake(client: &mut TestClient, frames: &[Vec<u8>]) -> Vec<u8> {
    let packets = client.read_all(frames);
    let Some(Packet::ServerToClientHandshake(handshake)) = packets.last() else {
        panic!("expected a handshake, got {packets:?}");
    };
    let key = client_session_key(&client.secret, handshake).unwrap();
    client.codec.enable_encryption(PacketCipher::new(&key));
    client.datagram(&[ClientToServerHandshake.into()])
}

#[derive(Default)]
struct Recorder {
    viewers: Mutex<Vec<(u64, Packet)>>,
    played: Mutex<Vec<&'static str>>,
}

impl ViewerSink for Recorder {
    fn queue_for_viewers(&self, source_entity: u64, packet: Packet) {
        self.viewers.lock().unwrap().push((source_entity, packet));
    }
}

impl PlayHandler for Recorder {
    fn handle(&self, _ctx: &mut PlayContext<'_>, packet: Packet) -> Result<(), SessionError> {
        self.played.lock().unwrap().push(packet.name());
        Ok(())
    }
}

struct Banlist(&'static str);

impl LoginListener for Banlist {
    fn on_login(&self, event: &mut LoginEvent<'_>) {
        if event.profile.display_name == self.0 {
            event.disallow("You are banned from this server");
        }
    }
}

// =========================================================================
// Happy paths
// =========================================================================

#[tokio::test]
async fn test_login_with_encryption_reaches_play() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let mut session = session_with(services(&root));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Authenticating);
    assert!(!session.is_encrypted(), "the cipher waits for the handshake frame");

    let frames = session.flush().unwrap();
    assert_eq!(frames.len(), 1, "only the handshake goes out before the reply");
    assert!(session.is_encrypted());
    let reply = complete_handshake(&mut client, &frames);

    session.handle_datagram(&reply).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Play);

    let packets = client.read_all(&session.flush().unwrap());
    assert_eq!(
        packets,
        vec![
            Packet::from(PlayStatus::new(PlayStatusKind::LoginSuccess)),
            Packet::from(ResourcePacksInfo::default()),
        ]
    );
}

#[tokio::test]
async fn test_login_without_encryption_goes_straight_to_play() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Alex");
    let mut session = session_with(unencrypted(&root));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    assert_eq!(session.phase(), SessionPhase::Play);
    assert!(!session.is_encrypted());
    let packets = client.read_all(&session.flush().unwrap());
    assert_eq!(packets[0], Packet::from(PlayStatus::new(PlayStatusKind::LoginSuccess)));
}

#[tokio::test]
async fn test_handshake_barrier_sends_earlier_packets_in_plaintext() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let mut session = session_with(services(&root));

    // Queued before the login is verified: must not be encrypted.
    session.outbound().queue(Text::chat("server", "welcome"));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    let frames = session.flush().unwrap();
    assert_eq!(frames.len(), 2);
    let first = client.codec.decode(&frames[0]).unwrap();
    assert_eq!(first, vec![Packet::from(Text::chat("server", "welcome"))]);

    let reply = complete_handshake(&mut client, &frames[1..]);
    session.handle_datagram(&reply).await.unwrap();

    // From here on the client needs the key.
    session.outbound().queue(RequestChunkRadius { radius: 6 });
    let frames = session.flush().unwrap();
    assert!(client.read_all(&frames).contains(&RequestChunkRadius { radius: 6 }.into()));
}

#[tokio::test]
async fn test_subscribe_sees_profile_and_play() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let mut session = session_with(unencrypted(&root));
    let snapshots = session.subscribe();

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    let snap = snapshots.borrow().clone();
    assert_eq!(snap.phase, SessionPhase::Play);
    assert_eq!(snap.entity_id, 7);
    assert_eq!(snap.profile.unwrap().display_name, "Steve");
    assert_eq!(snap.level.unwrap().to_string(), "world");
}

// =========================================================================
// Refusals
// =========================================================================

fn first_disconnect(session: &mut Session, client: &mut TestClient) -> String {
    let packets = client.read_all(&session.flush().unwrap());
    match packets.as_slice() {
        [Packet::Disconnect(Disconnect { message, .. })] => message.clone(),
        other => panic!("expected a single disconnect, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_untrusted_chain_sends_configured_message() {
    let root = SecretKey::random(&mut OsRng);
    let stranger = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&stranger, "Mallory");
    let mut session = session_with(services(&root));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    assert!(session.is_disconnected());
    assert_eq!(
        first_disconnect(&mut session, &mut client),
        DEFAULT_UNTRUSTED_IDENTITY_MESSAGE
    );
}

#[tokio::test]
async fn test_login_vetoed_by_listener_disconnects_with_reason() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Griefer");
    let mut session =
        session_with(unencrypted(&root).with_listener(Arc::new(Banlist("Griefer"))));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    assert!(session.is_disconnected());
    assert_eq!(
        first_disconnect(&mut session, &mut client),
        "You are banned from this server"
    );
}

#[tokio::test]
async fn test_login_pool_exhausted_sends_busy_message() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let mut session = session_with(services(&root).with_pool(LoginPool::new(0)));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();

    assert_eq!(first_disconnect(&mut session, &mut client), DEFAULT_BUSY_MESSAGE);
}

#[tokio::test]
async fn test_second_login_while_authenticating_is_violation() {
    let root = SecretKey::random(&mut OsRng);
    let client = TestClient::new(&root, "Steve");
    let mut session = session_with(services(&root));

    session.handle(client.login()).await.unwrap();
    let result = session.handle(client.login()).await;

    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        SessionError::ProtocolViolation { packet: "Login", state: "Authenticating" }
    ));
}

#[tokio::test]
async fn test_gameplay_while_authenticating_is_violation() {
    let root = SecretKey::random(&mut OsRng);
    let client = TestClient::new(&root, "Steve");
    let recorder = Arc::new(Recorder::default());
    let mut session = session_with(
        services(&root)
            .with_viewers(recorder.clone())
            .with_play_handler(recorder.clone()),
    );
    session.handle(client.login()).await.unwrap();

    let result = session.handle(RequestChunkRadius { radius: 4 }.into()).await;

    assert!(matches!(
        result,
        Err(SessionError::ProtocolViolation {
            packet: "RequestChunkRadius",
            state: "Authenticating"
        })
    ));
    let held = session
        .handle(
            MobEquipment {
                entity_id: 0,
                hotbar_slot: 1,
                inventory_slot: 10,
                stack: None,
            }
            .into(),
        )
        .await;
    assert!(held.is_err());
    assert!(recorder.played.lock().unwrap().is_empty());
    assert!(recorder.viewers.lock().unwrap().is_empty());
}

// =========================================================================
// Play
// =========================================================================

#[tokio::test]
async fn test_mob_equipment_in_play_reaches_viewers_and_handler() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let recorder = Arc::new(Recorder::default());
    let mut session = session_with(
        unencrypted(&root)
            .with_viewers(recorder.clone())
            .with_play_handler(recorder.clone()),
    );

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();
    let equip = client.datagram(&[MobEquipment {
        entity_id: 0,
        hotbar_slot: 3,
        inventory_slot: 12,
        stack: None,
    }
    .into()]);
    session.handle_datagram(&equip).await.unwrap();

    let viewers = recorder.viewers.lock().unwrap();
    assert_eq!(viewers.len(), 1);
    assert_eq!(
        viewers[0],
        (
            7,
            Packet::from(MobEquipment {
                entity_id: 7,
                hotbar_slot: 3,
                inventory_slot: 255,
                stack: None,
            })
        )
    );
    assert_eq!(*recorder.played.lock().unwrap(), vec!["MobEquipment"]);
}

#[tokio::test]
async fn test_client_disconnect_in_play_ends_session() {
    let root = SecretKey::random(&mut OsRng);
    let mut client = TestClient::new(&root, "Steve");
    let mut session = session_with(unencrypted(&root));

    let login = client.datagram(&[client.login()]);
    session.handle_datagram(&login).await.unwrap();
    let _ = session.flush().unwrap();

    let bye = client.datagram(&[Disconnect::new("quit").into()]);
    session.handle_datagram(&bye).await.unwrap();

    assert!(session.is_disconnected());
    assert!(session.flush().unwrap().is_empty());
}
