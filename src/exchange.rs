//! The socket exchange flavor: each role runs on its own process, driving one end of a [Transport]
//! (in production, a [crate::transport::SocketConnection]).
//!
//! The initiator opens with `"ping 1"` and replies to every answer until it has received `limit`
//! of them; the responder answers every line until the stream ends or a `STOP` line arrives.

use crate::error::Result;
use crate::participant::Participant;
use crate::protocol::{self, Tally};
use crate::transport::{Received, Transport};
use std::fmt;
use std::time::Duration;
use log::{debug, error, info, trace};


/// How a role's loop came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The initiator received all the replies it was waiting for
    Completed,
    /// The end-of-stream was seen by the responder -- its normal ending
    PeerClosed,
    /// The initiator saw the end-of-stream before receiving all its replies
    PrematureClose,
    /// The responder received the stop signal
    StopReceived,
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Self::Completed      => "all replies received",
            Self::PeerClosed     => "connection closed by the peer",
            Self::PrematureClose => "connection closed by the peer prematurely",
            Self::StopReceived   => "STOP received",
        };
        f.write_str(description)
    }
}

/// What each role reports when its loop ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReport {
    pub tally:   Tally,
    pub outcome: ExchangeOutcome,
    pub elapsed: Duration,
}


/// Runs the initiator side of the exchange through the already established `transport`:
/// sends `"ping 1"`, then answers each reply (appending its next sent count) until `limit` replies were received.\
/// An end-of-stream before that is logged and reported as [ExchangeOutcome::PrematureClose] -- not as an error;
/// I/O failures are returned as errors.
pub async fn run_initiator<TransportType: Transport>(participant: &Participant,
                                                     transport:   &mut TransportType,
                                                     limit:       u32)
                                                    -> Result<ExchangeReport> {
    let start = minstant::Instant::now();
    let name = participant.name();

    let opening = protocol::opening_message(participant.increment_and_get_sent_count());
    info!("[{name}] SENDING: {opening} (Sent Count: {})", participant.sent_count());
    transport.send(opening).await?;

    let mut outcome = ExchangeOutcome::Completed;
    while participant.received_count() < limit {
        let reply = match transport.receive().await? {
            Received::Message(reply) => reply,
            Received::TimedOut => {
                trace!("[{name}] Still waiting for a reply...");
                continue
            },
            Received::Closed => {
                error!("[{name}] Error: Connection closed by responder prematurely.");
                outcome = ExchangeOutcome::PrematureClose;
                break
            },
        };
        participant.record_receipt(&reply);
        if participant.received_count() < limit {
            let next = protocol::reply_to(&reply, participant.increment_and_get_sent_count());
            info!("[{name}] SENDING: {next} (Sent Count: {})", participant.sent_count());
            transport.send(next).await?;
        } else {
            info!("[{name}] Received {limit} replies. Stopping communication.");
        }
    }

    Ok(ExchangeReport { tally: participant.tally(), outcome, elapsed: start.elapsed() })
}

/// Runs the responder side of the exchange through the already accepted `transport`:
/// answers every line (appending its next -- capped -- sent count) until the end-of-stream or a `STOP` line.\
/// The responder keeps answering past `limit` received messages: ending the exchange is up to the initiator.
pub async fn run_responder<TransportType: Transport>(participant: &Participant,
                                                     transport:   &mut TransportType,
                                                     limit:       u32)
                                                    -> Result<ExchangeReport> {
    let start = minstant::Instant::now();
    let name = participant.name();

    let outcome = loop {
        let received = match transport.receive().await? {
            Received::Message(received) => received,
            Received::TimedOut => continue,
            Received::Closed => {
                info!("[{name}] Connection closed by initiator.");
                break ExchangeOutcome::PeerClosed
            },
        };
        if protocol::is_stop_signal(&received) {
            info!("[{name}] Received STOP signal. Closing connection.");
            break ExchangeOutcome::StopReceived
        }
        participant.record_receipt(&received);
        let already_capped = participant.sent_count() >= participant.limit();
        let sent_count = participant.increment_and_get_sent_count();
        if already_capped {
            debug!("[{name}] Send limit already reached -- replying with the capped count {sent_count}");
        }
        let reply = protocol::reply_to(&received, sent_count);
        info!("[{name}] SENDING: {reply} (Sent Count: {})", participant.sent_count());
        transport.send(reply).await?;
        if participant.received_count() >= limit {
            info!("[{name}] Processed {limit} messages. Waiting for initiator to close or send STOP.");
        }
    };

    Ok(ExchangeReport { tally: participant.tally(), outcome, elapsed: start.elapsed() })
}


/// Unit tests the [exchange](self) module -- the socket protocol is driven here through in-process channels
/// and through real local sockets
#[cfg(any(test,doc))]
mod tests {
    use super::*;
    use crate::config::{ExchangeConfig, MESSAGE_LIMIT};
    use crate::transport::{handoff_pair, HandoffChannel, ResponderListener, SocketConnection};
    use crate::unit_test_utils::next_server_port;

    const POLL_TIMEOUT: Duration = Duration::from_millis(10);


    /// Reads the next message from `channel`, skipping poll timeouts
    async fn next_message(channel: &mut HandoffChannel) -> Received {
        loop {
            match channel.receive().await.expect("receiving") {
                Received::TimedOut => continue,
                other => return other,
            }
        }
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn full_exchange_over_sockets() {
        let config = ExchangeConfig::default().with_host("127.0.0.1").with_port(next_server_port());
        let listener = ResponderListener::bind(&config).await.expect("binding");
        let responder_task = tokio::spawn(async move {
            let responder = Participant::new("responder");
            let mut connection = listener.accept().await.expect("accepting");
            run_responder(&responder, &mut connection, MESSAGE_LIMIT).await.expect("responder failed")
        });

        let initiator = Participant::new("initiator");
        let report = {
            let mut connection = SocketConnection::connect(&config).await.expect("connecting");
            run_initiator(&initiator, &mut connection, MESSAGE_LIMIT).await.expect("initiator failed")
            // the connection is dropped here, ending the responder
        };
        assert_eq!(report.outcome, ExchangeOutcome::Completed);
        assert_eq!(report.tally, Tally { name: String::from("initiator"), sent: MESSAGE_LIMIT, received: MESSAGE_LIMIT });

        let responder_report = responder_task.await.expect("responder task panicked");
        assert_eq!(responder_report.outcome, ExchangeOutcome::PeerClosed);
        assert_eq!(responder_report.tally, Tally { name: String::from("responder"), sent: MESSAGE_LIMIT, received: MESSAGE_LIMIT });
    }

    /// the contents grow as each participant appends its own sent count
    #[cfg_attr(not(doc),tokio::test)]
    async fn message_contents_as_seen_on_the_wire() {
        let (mut initiator_end, mut observer_end) = handoff_pair("initiator", "observer", POLL_TIMEOUT);
        let initiator_task = tokio::spawn(async move {
            let initiator = Participant::new("initiator");
            run_initiator(&initiator, &mut initiator_end, 3).await.expect("initiator failed")
        });

        assert_eq!(next_message(&mut observer_end).await, Received::Message(String::from("ping 1")));
        observer_end.send(String::from("ping 1 1")).await.expect("sending");
        assert_eq!(next_message(&mut observer_end).await, Received::Message(String::from("ping 1 1 2")));
        observer_end.send(String::from("ping 1 1 2 2")).await.expect("sending");
        assert_eq!(next_message(&mut observer_end).await, Received::Message(String::from("ping 1 1 2 2 3")));
        observer_end.send(String::from("ping 1 1 2 2 3 3")).await.expect("sending");

        let report = initiator_task.await.expect("initiator task panicked");
        assert_eq!(report.outcome, ExchangeOutcome::Completed);
        assert_eq!((report.tally.sent, report.tally.received), (3, 3));
        // after the last reply, nothing else is sent -- and the initiator's end is gone
        assert_eq!(next_message(&mut observer_end).await, Received::Closed);
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn responder_stops_on_stop_signal_without_replying() {
        let (mut responder_end, mut peer_end) = handoff_pair("responder", "peer", POLL_TIMEOUT);
        let responder_task = tokio::spawn(async move {
            let responder = Participant::new("responder");
            let report = run_responder(&responder, &mut responder_end, MESSAGE_LIMIT).await.expect("responder failed");
            (report, responder_end)
        });

        peer_end.send(String::from("ping 1")).await.expect("sending");
        assert_eq!(next_message(&mut peer_end).await, Received::Message(String::from("ping 1 1")));
        peer_end.send(String::from("sToP")).await.expect("sending");

        // the responder's end is kept alive by the task's output, so a missing reply can't be confused with a closed channel
        let (report, _responder_end) = responder_task.await.expect("responder task panicked");
        assert_eq!(report.outcome, ExchangeOutcome::StopReceived);
        assert_eq!(report.tally.sent, 1);
        assert_eq!(report.tally.received, 1, "the stop signal is not accounted as a received message");
        assert_eq!(peer_end.receive().await.expect("receiving"), Received::TimedOut, "no reply should follow the stop signal");
    }

    /// the responder keeps answering past the limit, with its sent count silently capped
    #[cfg_attr(not(doc),tokio::test)]
    async fn responder_replies_past_the_limit_with_capped_count() {
        let limit = 2;
        let (mut responder_end, mut peer_end) = handoff_pair("responder", "peer", POLL_TIMEOUT);
        let responder_task = tokio::spawn(async move {
            let responder = Participant::with_limit("responder", limit);
            run_responder(&responder, &mut responder_end, limit).await.expect("responder failed")
        });

        for (sent, expected) in [("a", "a 1"), ("b", "b 2"), ("c", "c 2"), ("d", "d 2")] {
            peer_end.send(sent.to_string()).await.expect("sending");
            assert_eq!(next_message(&mut peer_end).await, Received::Message(expected.to_string()));
        }
        drop(peer_end);

        let report = responder_task.await.expect("responder task panicked");
        assert_eq!(report.outcome, ExchangeOutcome::PeerClosed);
        assert_eq!((report.tally.sent, report.tally.received), (limit, 4));
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn initiator_reports_premature_close_with_partial_counters() {
        let (mut initiator_end, mut peer_end) = handoff_pair("initiator", "peer", POLL_TIMEOUT);
        let initiator_task = tokio::spawn(async move {
            let initiator = Participant::new("initiator");
            run_initiator(&initiator, &mut initiator_end, MESSAGE_LIMIT).await.expect("a premature close should not be an error")
        });

        assert_eq!(next_message(&mut peer_end).await, Received::Message(String::from("ping 1")));
        peer_end.send(String::from("ping 1 1")).await.expect("sending");
        assert_eq!(next_message(&mut peer_end).await, Received::Message(String::from("ping 1 1 2")));
        drop(peer_end);

        let report = initiator_task.await.expect("initiator task panicked");
        assert_eq!(report.outcome, ExchangeOutcome::PrematureClose);
        assert_eq!((report.tally.sent, report.tally.received), (2, 1));
    }
}
