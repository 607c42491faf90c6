//! SET_NODE exchanges against a fake engine bound in a temp directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sm_gateway_core::{AckFields, CommandProtocolClient, ProtocolConfig};
use tempfile::TempDir;
use tokio::net::UnixDatagram;
use tokio::task::JoinHandle;

struct Harness {
    dir: TempDir,
    client: CommandProtocolClient,
}

impl Harness {
    fn new(ack_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ProtocolConfig {
            engine_socket_path: dir.path().join("engine"),
            client_socket_path: dir.path().join("client"),
            ack_timeout,
            ack_attempts: 5,
        };
        Self {
            dir,
            client: CommandProtocolClient::new(config),
        }
    }

    fn engine_socket(&self) -> UnixDatagram {
        UnixDatagram::bind(self.dir.path().join("engine")).unwrap()
    }

    fn client_path(&self, seqno: u64) -> PathBuf {
        self.dir.path().join(format!("client.{seqno}"))
    }

    async fn unlock(&self) -> (u64, AckFields) {
        let seqno = self.client.next_seqno();
        let ack = self
            .client
            .set_node_state(
                "mtce",
                "controller-1",
                "unlock",
                "unlocked",
                "available",
                "enabled",
                seqno,
            )
            .await;
        (seqno, ack)
    }
}

fn ack_for(seqno: &str, admin: &str, oper: &str) -> String {
    format!("1,1,{seqno},SET_NODE_ACK,sm,controller-1,unlock,{admin},{oper},Available")
}

/// Receive one request and answer with whatever `replies` builds from it.
fn spawn_engine<F>(socket: UnixDatagram, replies: F) -> JoinHandle<String>
where
    F: FnOnce(&str) -> Vec<String> + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        let (len, addr) = socket.recv_from(&mut buf).await.unwrap();
        let request = String::from_utf8(buf[..len].to_vec()).unwrap();
        let client_path = addr.as_pathname().unwrap().to_path_buf();
        for reply in replies(&request) {
            let _ = socket.send_to(reply.as_bytes(), &client_path).await;
        }
        request
    })
}

fn seqno_of(request: &str) -> String {
    request.split(',').nth(2).unwrap().to_string()
}

fn assert_gone(path: &Path) {
    assert!(!path.exists(), "{} should have been removed", path.display());
}

#[tokio::test]
async fn matching_ack_is_returned_lowercased() {
    let harness = Harness::new(Duration::from_secs(2));
    let engine = spawn_engine(harness.engine_socket(), |req| {
        vec![ack_for(&seqno_of(req), "UNLOCKED", "Enabled")]
    });

    let (seqno, ack) = harness.unlock().await;
    let request = engine.await.unwrap();

    assert_eq!(
        request,
        "1,1,1,SET_NODE,mtce,controller-1,unlock,unlocked,enabled,available"
    );
    assert!(!ack.is_synthesized());
    assert!(ack.matches_seqno(seqno));
    assert_eq!(ack.admin, "unlocked");
    assert_eq!(ack.oper, "enabled");
    assert_eq!(ack.avail, "available");
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn mismatched_seqnos_are_discarded() {
    let harness = Harness::new(Duration::from_secs(2));
    let engine = spawn_engine(harness.engine_socket(), |req| {
        let seqno = seqno_of(req);
        vec![
            ack_for("998", "locked", "disabled"),
            ack_for("999", "locked", "disabled"),
            ack_for(&seqno, "unlocked", "enabled"),
        ]
    });

    let (_, ack) = harness.unlock().await;
    engine.await.unwrap();

    assert_eq!(ack.seqno, "1");
    assert_eq!(ack.admin, "unlocked");
}

#[tokio::test]
async fn five_mismatches_yield_unknown_ack() {
    let harness = Harness::new(Duration::from_secs(2));
    let engine = spawn_engine(harness.engine_socket(), |req| {
        let mut replies: Vec<String> = (0..5)
            .map(|i| ack_for(&format!("10{i}"), "unlocked", "enabled"))
            .collect();
        // arrives too late to count
        replies.push(ack_for(&seqno_of(req), "unlocked", "enabled"));
        replies
    });

    let (seqno, ack) = harness.unlock().await;
    engine.await.unwrap();

    assert!(ack.is_synthesized());
    assert_eq!(ack.origin, "sm");
    assert_eq!(ack.node_name, "controller-1");
    assert_eq!(ack.action, "unlock");
    assert_eq!(ack.admin, "unknown");
    assert_eq!(ack.oper, "unknown");
    assert_eq!(ack.avail, "unknown");
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn silent_engine_times_out_to_unknown_ack() {
    let harness = Harness::new(Duration::from_millis(200));
    let engine = spawn_engine(harness.engine_socket(), |_| Vec::new());

    let started = tokio::time::Instant::now();
    let (seqno, ack) = harness.unlock().await;
    engine.await.unwrap();

    assert!(ack.is_synthesized());
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn malformed_matching_ack_yields_unknown_ack() {
    let harness = Harness::new(Duration::from_secs(2));
    let engine = spawn_engine(harness.engine_socket(), |req| {
        vec![format!("1,1,{},SET_NODE_ACK,sm", seqno_of(req))]
    });

    let (seqno, ack) = harness.unlock().await;
    engine.await.unwrap();

    assert!(ack.is_synthesized());
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn missing_engine_yields_unknown_ack() {
    let harness = Harness::new(Duration::from_secs(2));

    let (seqno, ack) = harness.unlock().await;

    assert!(ack.is_synthesized());
    assert_eq!(ack.node_name, "controller-1");
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn stale_client_socket_is_replaced() {
    let harness = Harness::new(Duration::from_secs(2));
    std::fs::write(harness.client_path(1), b"left over").unwrap();
    let engine = spawn_engine(harness.engine_socket(), |req| {
        vec![ack_for(&seqno_of(req), "unlocked", "enabled")]
    });

    let (seqno, ack) = harness.unlock().await;
    engine.await.unwrap();

    assert_eq!(seqno, 1);
    assert!(!ack.is_synthesized());
    assert_gone(&harness.client_path(seqno));
}

#[tokio::test]
async fn delimiter_in_value_never_reaches_the_engine() {
    let harness = Harness::new(Duration::from_millis(200));
    let engine = harness.engine_socket();

    let seqno = harness.client.next_seqno();
    let ack = harness
        .client
        .set_node_state(
            "mtce",
            "controller-1,controller-0",
            "lock",
            "locked",
            "available",
            "disabled",
            seqno,
        )
        .await;

    assert!(ack.is_synthesized());
    let mut buf = [0u8; 64];
    let received = tokio::time::timeout(Duration::from_millis(50), engine.recv(&mut buf)).await;
    assert!(received.is_err(), "engine should not have received anything");
}
