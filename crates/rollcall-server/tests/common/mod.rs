//! Shared helpers for server integration tests.

#![allow(dead_code)]

use std::{
    io::{self, Write},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use rollcall_core::RosterFormat;
use rollcall_server::{Server, ServerError, ServerRuntimeConfig};
use tokio::task::JoinHandle;

/// Output sink shared between the server task and the test.
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Lines starting with `message from `.
    pub fn messages(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.starts_with("message from "))
            .map(str::to_string)
            .collect()
    }
}

impl SharedOutput {
    /// Rosters written so far in the `peers` layout, oldest first, each
    /// without its trailing blank line.
    pub fn rosters(&self) -> Vec<String> {
        self.contents()
            .split("connected clients (")
            .skip(1)
            .map(|block| {
                let end = block.find("\n\n").map_or(block.len(), |i| i + 1);
                format!("connected clients ({}", &block[..end])
            })
            .collect()
    }

    /// Concatenated payloads of every message from `peer`, as raw bytes.
    ///
    /// Only meaningful for payloads without line breaks, where each message
    /// occupies exactly one line.
    pub fn payload_from(&self, peer: SocketAddr) -> Vec<u8> {
        let prefix = format!("message from {peer}: ");
        let buf = self.0.lock().unwrap();
        buf.split(|&b| b == b'\n')
            .filter_map(|line| line.strip_prefix(prefix.as_bytes()))
            .flatten()
            .copied()
            .collect()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Running server under test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub output: SharedOutput,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind a server on an ephemeral loopback port and run it in the background.
pub fn start_server(max_clients: usize, roster_format: RosterFormat) -> TestServer {
    let output = SharedOutput::default();
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        max_clients,
        roster_format,
    };
    let server = Server::bind(config, output.clone()).unwrap();
    let addr = server.local_addr();
    let task = tokio::spawn(server.run());

    TestServer { addr, output, task }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Raise SIGHUP exactly once and wait for the latest `peers` roster to equal
/// `expected`.
///
/// There is no retry: a lost signal fails the test.
pub async fn hangup_expecting(output: &SharedOutput, expected: &str) {
    let before = output.rosters().len();
    signal_hook::low_level::raise(signal_hook::consts::SIGHUP).unwrap();
    wait_until(&format!("roster {expected:?}"), || {
        let rosters = output.rosters();
        rosters.len() > before && rosters.last().is_some_and(|roster| roster == expected)
    })
    .await;
}

/// Peers roster text for the given clients, in admission order.
pub fn peers_roster(peers: &[SocketAddr]) -> String {
    let mut roster = format!("connected clients ({}):\n", peers.len());
    for (i, peer) in peers.iter().enumerate() {
        roster.push_str(&format!("  {}. {peer}\n", i + 1));
    }
    roster
}

/// Give the server a chance to act on anything pending.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
