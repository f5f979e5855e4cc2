//! Resting place for [SocketConnection] -- our TCP [Transport] -- and for [ResponderListener], which provides it to responders

use super::{Received, Transport};
use crate::config::ExchangeConfig;
use crate::error::{Error, Result};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::Relaxed;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use log::{debug, error, trace, warn};


static CONNECTION_COUNTER: AtomicU32 = AtomicU32::new(0);
pub type ConnectionId = u32;


/// A wrapper for a [TcpStream], speaking the newline-delimited textual dialog:
/// each line sent is followed by '\n'; each line received has its '\n' (and any '\r' before it) stripped.\
/// Received bytes that aren't valid UTF-8 are decoded with the replacement character: payloads are free text.\
/// Reads block for as long as the remote peer takes -- there is no timeout on this transport.\
/// The socket is closed when this object is dropped.
#[derive(Debug)]
pub struct SocketConnection {
    reader:       BufReader<OwnedReadHalf>,
    writer:       OwnedWriteHalf,
    /// A unique ID for the connection, for log correlation
    id:           ConnectionId,
    peer_address: SocketAddr,
    /// `true` after the end-of-stream was seen or after an I/O error
    closed:       bool,
    line_buffer:  Vec<u8>,
}

impl SocketConnection {

    /// Wraps an already established `connection`
    pub fn new(connection: TcpStream) -> Result<Self> {
        let peer_address = connection.peer_addr()?;
        let (read_half, write_half) = connection.into_split();
        Ok(Self {
            reader:      BufReader::new(read_half),
            writer:      write_half,
            id:          CONNECTION_COUNTER.fetch_add(1, Relaxed),
            peer_address,
            closed:      false,
            line_buffer: Vec::with_capacity(1024),
        })
    }

    /// Connects to the responder endpoint given in `config`.\
    /// A single attempt is made: an absent listener yields [Error::ConnectionRefused].
    pub async fn connect(config: &ExchangeConfig) -> Result<Self> {
        let address = config.address();
        trace!("`SocketConnection`: connecting to {address}");
        let connection = TcpStream::connect(&address).await
            .map_err(|err| match err.kind() {
                io::ErrorKind::ConnectionRefused => Error::ConnectionRefused { host: config.host.to_string(), port: config.port },
                _ => Error::Io(err),
            })?;
        Self::new(connection)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_address(&self) -> SocketAddr {
        self.peer_address
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    fn report_closed(&mut self) {
        self.closed = true;
    }
}

impl Transport for SocketConnection {

    async fn send(&mut self, line: String) -> Result<()> {
        let mut serialization_buffer = line.into_bytes();
        serialization_buffer.push(b'\n');
        let mut written = self.writer.write_all(&serialization_buffer).await;
        if written.is_ok() {
            written = self.writer.flush().await;
        }
        if let Err(err) = written {
            warn!("`SocketConnection`: PROBLEM in connection #{} with {} while WRITING: {err:?}", self.id, self.peer_address);
            self.report_closed();
            return Err(Error::Io(err))
        }
        Ok(())
    }

    /// Blocks until a full line (or the end-of-stream) is read
    async fn receive(&mut self) -> Result<Received> {
        self.line_buffer.clear();
        match self.reader.read_until(b'\n', &mut self.line_buffer).await {
            Ok(0) /* zero bytes received -- the other end closed the connection */ => {
                debug!("`SocketConnection`: EOF while reading from {} (connection #{})", self.peer_address, self.id);
                self.report_closed();
                Ok(Received::Closed)
            },
            Ok(_) => {
                let line = String::from_utf8_lossy(&self.line_buffer);
                let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
                Ok(Received::Message(line.to_string()))
            },
            Err(err) => {
                error!("`SocketConnection`: ERROR in connection #{} with {} while READING: {err:?}", self.id, self.peer_address);
                self.report_closed();
                Err(Error::Io(err))
            },
        }
    }
}


/// The responder side of the socket exchange: binds to the configured endpoint and hands out a single [SocketConnection].\
/// The listening socket is released when this object is dropped -- or consumed by [Self::accept()].
#[derive(Debug)]
pub struct ResponderListener {
    listener:      TcpListener,
    local_address: SocketAddr,
}

impl ResponderListener {

    pub async fn bind(config: &ExchangeConfig) -> Result<Self> {
        let address = config.address();
        let listener = TcpListener::bind(&address).await
            .map_err(|source| Error::Bind { address: address.clone(), source })?;
        let local_address = listener.local_addr()?;
        trace!("`ResponderListener`: bound to {local_address} (requested {address})");
        Ok(Self { listener, local_address })
    }

    /// The actual bound address -- useful when binding to port 0
    pub fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    /// Waits for exactly one connection, then stops listening
    pub async fn accept(self) -> Result<SocketConnection> {
        let (connection, peer_address) = self.listener.accept().await?;
        trace!("`ResponderListener`: accepted {peer_address} on {}", self.local_address);
        SocketConnection::new(connection)
    }
}


/// Unit tests the [socket_connection](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;
    use crate::unit_test_utils::{next_server_port, unused_port};
    use std::time::Duration;


    fn local_config(port: u16) -> ExchangeConfig {
        ExchangeConfig::default()
            .with_host("127.0.0.1")
            .with_port(port)
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn lines_travel_both_ways() {
        let listener = ResponderListener::bind(&local_config(0)).await.expect("binding to an ephemeral port");
        let config = local_config(listener.local_address().port());
        let accepting = tokio::spawn(listener.accept());
        let mut initiator = SocketConnection::connect(&config).await.expect("connecting");
        let mut responder = accepting.await.expect("accepting task panicked").expect("accepting");
        assert_ne!(initiator.id(), responder.id(), "connection ids should be unique");

        initiator.send(String::from("ping 1")).await.expect("sending");
        assert_eq!(responder.receive().await.expect("receiving"), Received::Message(String::from("ping 1")));
        responder.send(String::from("ping 1 1")).await.expect("sending back");
        assert_eq!(initiator.receive().await.expect("receiving"), Received::Message(String::from("ping 1 1")));

        drop(responder);
        assert_eq!(initiator.receive().await.expect("receiving"), Received::Closed);
        assert!(initiator.closed());
    }

    /// lines written by peers that use "\r\n" or that split writes must still be framed correctly
    #[cfg_attr(not(doc),tokio::test)]
    async fn framing_tolerates_crlf_and_partial_writes() {
        let config = local_config(next_server_port());
        let listener = ResponderListener::bind(&config).await.expect("binding");
        let accepting = tokio::spawn(listener.accept());
        let mut raw_peer = TcpStream::connect(config.address()).await.expect("connecting");
        let mut responder = accepting.await.expect("accepting task panicked").expect("accepting");

        raw_peer.write_all(b"pi").await.expect("writing");
        raw_peer.flush().await.expect("flushing");
        raw_peer.write_all(b"ng 1\r\nping 1 1 2\nSTOP\n").await.expect("writing");
        for expected in ["ping 1", "ping 1 1 2", "STOP"] {
            assert_eq!(responder.receive().await.expect("receiving"), Received::Message(expected.to_string()));
        }
        drop(raw_peer);
        assert_eq!(responder.receive().await.expect("receiving"), Received::Closed);
    }

    /// bytes that aren't valid UTF-8 are still delivered as a message -- with replacement characters -- and framing goes on
    #[cfg_attr(not(doc),tokio::test)]
    async fn framing_tolerates_invalid_utf8() {
        let config = local_config(next_server_port());
        let listener = ResponderListener::bind(&config).await.expect("binding");
        let accepting = tokio::spawn(listener.accept());
        let mut raw_peer = TcpStream::connect(config.address()).await.expect("connecting");
        let mut responder = accepting.await.expect("accepting task panicked").expect("accepting");

        raw_peer.write_all(b"ping \xff1\r\nping 1\n").await.expect("writing");
        assert_eq!(responder.receive().await.expect("invalid UTF-8 must not be an error"), Received::Message(String::from("ping \u{FFFD}1")));
        assert_eq!(responder.receive().await.expect("receiving"), Received::Message(String::from("ping 1")));
        assert!(!responder.closed());
    }

    /// Reads have no timeout: a peer that stays connected without sending anything keeps the reader waiting.\
    /// This is the known liveness gap of the socket exchange -- only in-process channels have bounded waits.
    #[cfg_attr(not(doc),tokio::test)]
    async fn silent_peer_blocks_the_reader_indefinitely() {
        let config = local_config(next_server_port());
        let listener = ResponderListener::bind(&config).await.expect("binding");
        let accepting = tokio::spawn(listener.accept());
        let _silent_peer = SocketConnection::connect(&config).await.expect("connecting");
        let mut responder = accepting.await.expect("accepting task panicked").expect("accepting");

        let waited = tokio::time::timeout(Duration::from_millis(200), responder.receive()).await;
        assert!(waited.is_err(), "`receive()` should still be waiting, but returned {waited:?}");
        assert!(!responder.closed());
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn connecting_without_a_listener_is_refused() {
        let config = local_config(unused_port());
        let result = SocketConnection::connect(&config).await;
        assert!(matches!(result, Err(Error::ConnectionRefused { port, .. }) if port == config.port),
                "expected `ConnectionRefused`, got {result:?}");
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn binding_twice_is_reported() {
        let listener = ResponderListener::bind(&local_config(0)).await.expect("binding");
        let result = ResponderListener::bind(&local_config(listener.local_address().port())).await;
        assert!(matches!(result, Err(Error::Bind { .. })), "expected `Bind` error, got {result:?}");
    }
}
