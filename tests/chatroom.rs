//! End-to-end tests over loopback TCP.
//!
//! Each test starts its own server on an ephemeral port so population counts
//! are isolated.

use std::net::SocketAddr;
use std::time::Duration;

use chatroom::serve;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on waiting for an expected line
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a client must stay quiet to count as "received nothing"
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Time given to the server to notice a dropped connection
const TEARDOWN_GRACE: Duration = Duration::from_millis(200);

const RETRY_PROMPT: &str = "Sorry, didn't catch that. Please enter your name: ";

// ============================================================================
// Test Helpers
// ============================================================================

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = serve(listener).await;
    });
    addr
}

fn welcome(population: usize) -> String {
    if population == 1 {
        "Welcome to the chatroom! There is currently 1 person including you in the room! Please enter your name: ".to_string()
    } else {
        format!(
            "Welcome to the chatroom! There are currently {} people including you in the room! Please enter your name: ",
            population
        )
    }
}

fn instructions(name: &str) -> String {
    format!("Welcome {}! Start typing below to send messages to your friends.", name)
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Connect, complete the handshake, and drain the greeting lines
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        let greeting = client.recv().await;
        assert!(greeting.starts_with("Welcome to the chatroom!"), "got {greeting:?}");
        client.send(name).await;
        assert_eq!(client.recv().await, instructions(name));
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write");
    }

    async fn recv(&mut self) -> String {
        timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read error")
            .expect("connection closed")
    }

    async fn expect_silence(&mut self) {
        if let Ok(result) = timeout(SILENCE_WINDOW, self.lines.next_line()).await {
            panic!("expected no traffic, got {result:?}");
        }
    }

    async fn expect_closed(&mut self) {
        match timeout(RECV_TIMEOUT, self.lines.next_line()).await {
            Ok(Ok(None)) | Ok(Err(_)) => {}
            Ok(Ok(Some(line))) => panic!("expected close, got line {line:?}"),
            Err(_) => panic!("connection was not closed"),
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_welcome_phrasing_tracks_population() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    assert_eq!(alice.recv().await, welcome(1));

    let mut bob = TestClient::connect(addr).await;
    assert_eq!(bob.recv().await, welcome(2));

    let mut carol = TestClient::connect(addr).await;
    assert_eq!(carol.recv().await, welcome(3));
}

#[tokio::test]
async fn test_welcome_precedes_retry_for_eager_clients() {
    let addr = start_server().await;

    for _ in 0..50 {
        let mut eager = TestClient::connect(addr).await;
        eager.send("").await;
        let first = eager.recv().await;
        assert!(first.starts_with("Welcome to the chatroom!"), "got {first:?}");
        assert_eq!(eager.recv().await, RETRY_PROMPT);
    }
}

#[tokio::test]
async fn test_empty_names_are_reprompted() {
    let addr = start_server().await;
    let mut bob = TestClient::join(addr, "Bob").await;
    let mut carol = TestClient::join(addr, "Carol").await;

    let mut alice = TestClient::connect(addr).await;
    assert_eq!(alice.recv().await, welcome(3));

    for _ in 0..3 {
        alice.send("").await;
        assert_eq!(alice.recv().await, RETRY_PROMPT);
    }

    // Not yet named, so not a recipient
    bob.send("early").await;
    assert_eq!(carol.recv().await, "Bob: early");

    alice.send("Alice").await;
    assert_eq!(alice.recv().await, instructions("Alice"));

    bob.send("later").await;
    assert_eq!(alice.recv().await, "Bob: later");
    assert_eq!(carol.recv().await, "Bob: later");
}

#[tokio::test]
async fn test_carriage_return_is_stripped() {
    let addr = start_server().await;
    let mut bob = TestClient::join(addr, "Bob").await;

    let mut alice = TestClient::connect(addr).await;
    alice.recv().await;
    alice.writer.write_all(b"Alice\r\n").await.expect("write");
    assert_eq!(alice.recv().await, instructions("Alice"));

    alice.writer.write_all(b"hi\r\n").await.expect("write");
    assert_eq!(bob.recv().await, "Alice: hi");
}

#[tokio::test]
async fn test_abandoned_handshake_frees_slot() {
    let addr = start_server().await;
    let mut bob = TestClient::join(addr, "Bob").await;

    let mut ghost = TestClient::connect(addr).await;
    assert_eq!(ghost.recv().await, welcome(2));
    drop(ghost);
    sleep(TEARDOWN_GRACE).await;

    let mut alice = TestClient::connect(addr).await;
    assert_eq!(alice.recv().await, welcome(2));
    bob.expect_silence().await;
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_others_not_sender() {
    let addr = start_server().await;
    let mut alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;
    let mut carol = TestClient::join(addr, "Carol").await;

    alice.send("hi").await;
    assert_eq!(bob.recv().await, "Alice: hi");
    assert_eq!(carol.recv().await, "Alice: hi");
    alice.expect_silence().await;
}

#[tokio::test]
async fn test_interleaved_senders_share_one_order() {
    let addr = start_server().await;
    let mut alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;
    let mut carol = TestClient::join(addr, "Carol").await;
    let mut dave = TestClient::join(addr, "Dave").await;

    const PER_SENDER: usize = 20;
    let send_alice = async {
        for i in 0..PER_SENDER {
            alice.send(&format!("a{i}")).await;
        }
    };
    let send_bob = async {
        for i in 0..PER_SENDER {
            bob.send(&format!("b{i}")).await;
        }
    };
    tokio::join!(send_alice, send_bob);

    let mut seen_by_carol = Vec::new();
    let mut seen_by_dave = Vec::new();
    for _ in 0..PER_SENDER * 2 {
        seen_by_carol.push(carol.recv().await);
        seen_by_dave.push(dave.recv().await);
    }

    assert_eq!(seen_by_carol, seen_by_dave);

    // Each sender's own lines keep their order, none lost or duplicated
    let from_alice: Vec<&String> = seen_by_carol.iter().filter(|l| l.starts_with("Alice: ")).collect();
    let expected: Vec<String> = (0..PER_SENDER).map(|i| format!("Alice: a{i}")).collect();
    assert_eq!(from_alice, expected.iter().collect::<Vec<_>>());

    let from_bob: Vec<&String> = seen_by_carol.iter().filter(|l| l.starts_with("Bob: ")).collect();
    let expected: Vec<String> = (0..PER_SENDER).map(|i| format!("Bob: b{i}")).collect();
    assert_eq!(from_bob, expected.iter().collect::<Vec<_>>());
}

// ============================================================================
// Departure
// ============================================================================

#[tokio::test]
async fn test_goodbye_announces_and_closes() {
    let addr = start_server().await;
    let mut alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;

    alice.send("GOODBYE").await;
    assert_eq!(bob.recv().await, "Alice has left the group!");
    alice.expect_closed().await;

    // Alice is gone from the population and from later broadcasts
    let mut carol = TestClient::connect(addr).await;
    assert_eq!(carol.recv().await, welcome(2));
    carol.send("Carol").await;
    assert_eq!(carol.recv().await, instructions("Carol"));

    bob.send("bye Alice").await;
    assert_eq!(carol.recv().await, "Bob: bye Alice");
}

#[tokio::test]
async fn test_eof_leaves_silently() {
    let addr = start_server().await;
    let alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;

    drop(alice);
    sleep(TEARDOWN_GRACE).await;
    bob.expect_silence().await;

    let mut carol = TestClient::connect(addr).await;
    assert_eq!(carol.recv().await, welcome(2));
}

// ============================================================================
// Input robustness
// ============================================================================

#[tokio::test]
async fn test_overlong_line_is_skipped() {
    let addr = start_server().await;
    let mut alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;

    let flood = "x".repeat(chatroom::codec::MAX_LINE_LENGTH + 1);
    alice.send(&flood).await;
    alice.send("after the flood").await;

    assert_eq!(bob.recv().await, "Alice: after the flood");
}

#[tokio::test]
async fn test_invalid_utf8_is_replaced_not_fatal() {
    let addr = start_server().await;
    let mut alice = TestClient::join(addr, "Alice").await;
    let mut bob = TestClient::join(addr, "Bob").await;

    alice.writer.write_all(b"caf\xe9\n").await.expect("write");
    alice.send("still here").await;

    assert_eq!(bob.recv().await, "Alice: caf\u{fffd}");
    assert_eq!(bob.recv().await, "Alice: still here");
}
