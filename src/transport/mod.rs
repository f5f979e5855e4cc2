//! Contains the [Transport] abstraction -- carrying message lines between the two participants --
//! and its implementations:
//!  * [HandoffChannel]: a pair of in-process FIFO queues, read with a bounded wait;
//!  * [SocketConnection]: a TCP connection with newline-delimited text framing,
//!    accepted through a [ResponderListener] or opened with [SocketConnection::connect()].
//!
//! The exchange loops are generic over [Transport], so the socket protocol may also be driven
//! through in-process channels.

use crate::error::Result;
use std::future::Future;

mod handoff_channel;
pub use handoff_channel::*;

mod socket_connection;
pub use socket_connection::*;


/// What a [Transport::receive()] attempt may produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A full line, without its delimiter
    Message(String),
    /// The bounded wait elapsed with nothing to read -- only bounded transports produce this
    TimedOut,
    /// The other end is gone and nothing else will ever arrive
    Closed,
}

/// A bidirectional, order preserving carrier of text lines
pub trait Transport: Send {

    /// Delivers `line` to the other end -- `line` must not contain '\n'
    fn send(&mut self, line: String) -> impl Future<Output=Result<()>> + Send;

    /// Waits for the next line from the other end, as dictated by the implementation's waiting policy
    fn receive(&mut self) -> impl Future<Output=Result<Received>> + Send;
}
