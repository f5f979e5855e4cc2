//! Resting place for [HandoffChannel], the in-process [Transport]

use super::{Received, Transport};
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::trace;


/// One end of a pair of unidirectional FIFO queues -- see [handoff_pair()].\
/// Receiving never blocks for longer than the configured `poll_timeout`.
#[derive(Debug)]
pub struct HandoffChannel {
    /// Name of whoever sits on the other end -- for diagnostics
    peer_name:    String,
    sender:       UnboundedSender<String>,
    receiver:     UnboundedReceiver<String>,
    poll_timeout: Duration,
}

/// Creates two connected [HandoffChannel]s: whatever is sent through one end is received, in order, by the other.\
/// `first_name` & `second_name` label the owners of each returned end.
pub fn handoff_pair(first_name: &str, second_name: &str, poll_timeout: Duration) -> (HandoffChannel, HandoffChannel) {
    let (to_second_sender, to_second_receiver) = mpsc::unbounded_channel();
    let (to_first_sender, to_first_receiver) = mpsc::unbounded_channel();
    let first = HandoffChannel {
        peer_name: second_name.to_string(),
        sender:    to_second_sender,
        receiver:  to_first_receiver,
        poll_timeout,
    };
    let second = HandoffChannel {
        peer_name: first_name.to_string(),
        sender:    to_first_sender,
        receiver:  to_second_receiver,
        poll_timeout,
    };
    (first, second)
}

impl HandoffChannel {

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }
}

impl Transport for HandoffChannel {

    async fn send(&mut self, line: String) -> Result<()> {
        trace!("`HandoffChannel`: handing '{line}' over to the {}", self.peer_name);
        self.sender.send(line)
            .map_err(|_| Error::ChannelDisconnected { direction: self.peer_name.clone() })
    }

    /// Polls for the next line, giving up after `poll_timeout` with [Received::TimedOut]
    async fn receive(&mut self) -> Result<Received> {
        match tokio::time::timeout(self.poll_timeout, self.receiver.recv()).await {
            Ok(Some(line)) => Ok(Received::Message(line)),
            Ok(None)       => Ok(Received::Closed),
            Err(_elapsed)  => Ok(Received::TimedOut),
        }
    }
}


/// Unit tests the [handoff_channel](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;

    const POLL_TIMEOUT: Duration = Duration::from_millis(20);


    #[cfg_attr(not(doc),tokio::test)]
    async fn lines_arrive_in_order_on_the_other_end() {
        let (mut initiator, mut responder) = handoff_pair("Initiator", "Responder", POLL_TIMEOUT);
        assert_eq!(initiator.peer_name(), "Responder");
        assert_eq!(responder.peer_name(), "Initiator");
        for line in ["ping 1", "ping 1 1 2", "ping 1 1 2 2 3"] {
            initiator.send(line.to_string()).await.expect("sending to a live peer");
        }
        for expected in ["ping 1", "ping 1 1 2", "ping 1 1 2 2 3"] {
            assert_eq!(responder.receive().await.expect("receiving"), Received::Message(expected.to_string()));
        }
        responder.send(String::from("ping 1 1")).await.expect("sending back");
        assert_eq!(initiator.receive().await.expect("receiving"), Received::Message(String::from("ping 1 1")));
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn empty_queue_times_out() {
        let (mut initiator, _responder) = handoff_pair("Initiator", "Responder", POLL_TIMEOUT);
        let start = std::time::Instant::now();
        assert_eq!(initiator.receive().await.expect("receiving"), Received::TimedOut);
        assert!(start.elapsed() >= POLL_TIMEOUT / 2, "the poll returned before its timeout: {:?}", start.elapsed());
        // a timeout is not terminal
        assert_eq!(initiator.receive().await.expect("receiving"), Received::TimedOut);
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn dropped_peer_is_reported() {
        let (mut initiator, mut responder) = handoff_pair("Initiator", "Responder", POLL_TIMEOUT);
        responder.send(String::from("ping 1 1")).await.expect("sending");
        drop(responder);
        // what is already queued is still delivered
        assert_eq!(initiator.receive().await.expect("receiving"), Received::Message(String::from("ping 1 1")));
        assert_eq!(initiator.receive().await.expect("receiving"), Received::Closed);
        let result = initiator.send(String::from("ping 1 1 2")).await;
        assert!(matches!(result, Err(Error::ChannelDisconnected { ref direction }) if direction == "Responder"),
                "sending to a dropped peer should fail with `ChannelDisconnected`, not {result:?}");
    }
}
