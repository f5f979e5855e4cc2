//! The single-process exchange flavor: one task plays both roles in turns, handing messages over
//! through a pair of in-process channels -- see [Simulation::run()].

use crate::config::ExchangeConfig;
use crate::error::{Error, Result};
use crate::participant::Participant;
use crate::protocol::{self, Tally, Turn};
use crate::transport::{handoff_pair, HandoffChannel, Received, Transport};
use std::time::Duration;
use log::{debug, info};


pub const INITIATOR_NAME: &str = "Initiator";
pub const RESPONDER_NAME: &str = "Responder";


/// Final statistics of a [Simulation]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub initiator:     Tally,
    pub responder:     Tally,
    /// How many bounded waits elapsed without a message
    pub poll_timeouts: u32,
    pub elapsed:       Duration,
}

/// Drives an exchange between an initiator and a responder living in the same process.\
/// Only one of them is active at a time, as dictated by the current [Turn]; every wait is bounded
/// by the configured poll timeout, after which the same participant tries again.
#[derive(Debug)]
pub struct Simulation {
    limit:         u32,
    initiator:     Participant,
    responder:     Participant,
    /// initiator's end: sends to the responder, receives replies
    initiator_end: HandoffChannel,
    /// responder's end: sends replies, receives from the initiator
    responder_end: HandoffChannel,
    turn:          Turn,
    poll_timeouts: u32,
}

impl Simulation {

    pub fn new(config: &ExchangeConfig) -> Self {
        let (initiator_end, responder_end) = handoff_pair(INITIATOR_NAME, RESPONDER_NAME, config.poll_timeout());
        Self {
            limit:     config.message_limit,
            initiator: Participant::with_limit(INITIATOR_NAME, config.message_limit),
            responder: Participant::with_limit(RESPONDER_NAME, config.message_limit),
            initiator_end,
            responder_end,
            turn:          Turn::Initiator,
            poll_timeouts: 0,
        }
    }

    pub fn initiator(&self) -> &Participant {
        &self.initiator
    }

    pub fn responder(&self) -> &Participant {
        &self.responder
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    /// How many bounded waits elapsed without a message, so far
    pub fn poll_timeouts(&self) -> u32 {
        self.poll_timeouts
    }

    /// Sends the opening `"ping 1"` and alternates turns until the initiator has received `limit` replies.\
    /// The responder's last reply may still be in flight when this returns -- it is never read.\
    /// Both channel ends belong to this simulation, so [Error::ChannelDisconnected] is only possible if one of them is
    /// swapped out from under it. If this future is dropped before completion, the partial counters remain
    /// available through [Self::initiator()], [Self::responder()] & [Self::poll_timeouts()].
    pub async fn run(&mut self) -> Result<SimulationReport> {
        let start = minstant::Instant::now();
        info!("--- Starting Sequential Simulation with String Queues and Poll ---");

        let opening = protocol::opening_message(self.initiator.increment_and_get_sent_count());
        info!("[{}] SENDING: {opening} (Sent Count: {})", self.initiator.name(), self.initiator.sent_count());
        self.initiator_end.send(opening).await?;
        self.turn = Turn::Responder;

        while self.initiator.received_count() < self.limit {
            self.take_turn().await?;
        }

        let report = SimulationReport {
            initiator:     self.initiator.tally(),
            responder:     self.responder.tally(),
            poll_timeouts: self.poll_timeouts,
            elapsed:       start.elapsed(),
        };
        info!("--- Simulation Finished in {:?} ---", report.elapsed);
        Ok(report)
    }

    /// Lets the participant holding the current turn wait (bounded) for a message and, if one comes, answer it.\
    /// The initiator only answers while below the limit on both counters; the responder only checks its sent count.
    async fn take_turn(&mut self) -> Result<()> {
        let limit = self.limit;
        let (participant, end, may_reply): (&Participant, &mut HandoffChannel, fn(&Participant, u32) -> bool) = match self.turn {
            Turn::Initiator => (&self.initiator, &mut self.initiator_end, |initiator, limit| initiator.received_count() < limit && initiator.sent_count() < limit),
            Turn::Responder => (&self.responder, &mut self.responder_end, |responder, limit| responder.sent_count() < limit),
        };
        let name = participant.name();

        debug!("[{name}]: Waiting for a message...");
        match end.receive().await? {
            Received::Message(content) => {
                participant.record_receipt(&content);
                if may_reply(participant, limit) {
                    let reply = protocol::reply_to(&content, participant.increment_and_get_sent_count());
                    info!("[{name}] SENDING: {reply} (Sent Count: {})", participant.sent_count());
                    end.send(reply).await?;
                } else {
                    info!("[{name}] Reached message limit. Stopping sends.");
                }
                self.turn = self.turn.flip();
            },
            Received::TimedOut => {
                info!("[{name}]: Poll timed out waiting for a message.");
                self.poll_timeouts += 1;
            },
            Received::Closed => {
                return Err(Error::ChannelDisconnected { direction: end.peer_name().to_string() })
            },
        }
        Ok(())
    }
}


/// Unit tests & enforces the requisites of the [simulation](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;
    use crate::config::MESSAGE_LIMIT;

    #[cfg_attr(not(doc),tokio::test)]
    async fn terminates_with_the_expected_counters() {
        let mut simulation = Simulation::new(&ExchangeConfig::default());
        assert_eq!(simulation.turn(), Turn::Initiator);
        let report = tokio::time::timeout(Duration::from_secs(10), simulation.run()).await
            .expect("the simulation should not hang")
            .expect("the simulation should not fail");
        assert_eq!(report.initiator, simulation.initiator().tally(), "the counters should remain available after the run");

        assert_eq!(report.initiator.received, MESSAGE_LIMIT, "the simulation ends when the initiator gets all of its replies");
        assert!(report.initiator.sent <= MESSAGE_LIMIT);
        assert!(report.responder.sent <= MESSAGE_LIMIT);
        // with the strict alternation, every message finds its reader waiting
        assert_eq!(report.initiator.sent, MESSAGE_LIMIT);
        assert_eq!(report.responder.sent, MESSAGE_LIMIT);
        assert_eq!(report.responder.received, MESSAGE_LIMIT);
        assert_eq!(report.poll_timeouts, 0);
    }

    /// the first exchanged messages, as verified through the underlying channels
    #[cfg_attr(not(doc),tokio::test)]
    async fn first_message_and_first_reply() {
        let mut simulation = Simulation::new(&ExchangeConfig::default());
        let opening = protocol::opening_message(simulation.initiator.increment_and_get_sent_count());
        simulation.initiator_end.send(opening).await.expect("sending");
        simulation.turn = Turn::Responder;

        simulation.take_turn().await.expect("responder's turn");
        assert_eq!(simulation.responder().received_count(), 1);
        assert_eq!(simulation.responder().sent_count(), 1);
        assert_eq!(simulation.turn(), Turn::Initiator);

        // peek at the reply before the initiator consumes it
        let reply = simulation.initiator_end.receive().await.expect("receiving");
        assert_eq!(reply, Received::Message(String::from("ping 1 1")));
        simulation.responder_end.send(String::from("ping 1 1")).await.expect("re-sending");

        simulation.take_turn().await.expect("initiator's turn");
        assert_eq!(simulation.initiator().received_count(), 1);
        assert_eq!(simulation.initiator().sent_count(), 2);
        assert_eq!(simulation.responder_end.receive().await.expect("receiving"), Received::Message(String::from("ping 1 1 2")));
    }

    /// a turn whose queue is empty times out and keeps the turn
    #[cfg_attr(not(doc),tokio::test)]
    async fn timeouts_keep_the_turn() {
        let config = ExchangeConfig { poll_timeout_millis: 5, ..ExchangeConfig::default() };
        let mut simulation = Simulation::new(&config);
        simulation.take_turn().await.expect("initiator's turn");
        assert_eq!(simulation.turn(), Turn::Initiator);
        assert_eq!(simulation.poll_timeouts, 1);
        assert_eq!(simulation.initiator().received_count(), 0);
    }

    /// once at the limit, a participant still consumes its message and passes the turn along, but sends nothing
    #[cfg_attr(not(doc),tokio::test)]
    async fn capped_responder_passes_the_turn_without_replying() {
        let config = ExchangeConfig { message_limit: 1, poll_timeout_millis: 5, ..ExchangeConfig::default() };
        let mut simulation = Simulation::new(&config);
        simulation.responder.increment_and_get_sent_count();
        simulation.initiator_end.send(String::from("ping 1")).await.expect("sending");
        simulation.turn = Turn::Responder;

        simulation.take_turn().await.expect("responder's turn");
        assert_eq!(simulation.turn(), Turn::Initiator);
        assert_eq!(simulation.responder().received_count(), 1);
        assert_eq!(simulation.responder().sent_count(), 1);
        assert_eq!(simulation.initiator_end.receive().await.expect("receiving"), Received::TimedOut, "nothing should have been sent");
    }

    #[cfg_attr(not(doc),tokio::test)]
    async fn smaller_limits_are_honored() {
        let config = ExchangeConfig { message_limit: 3, ..ExchangeConfig::default() };
        let report = Simulation::new(&config).run().await.expect("the simulation should not fail");
        assert_eq!((report.initiator.sent, report.initiator.received), (3, 3));
        assert_eq!((report.responder.sent, report.responder.received), (3, 3));
    }

    /// an interrupted run leaves its partial counters behind, so they may still be reported
    #[cfg_attr(not(doc),tokio::test)]
    async fn interrupted_run_keeps_partial_counters() {
        let config = ExchangeConfig { poll_timeout_millis: 5, ..ExchangeConfig::default() };
        let mut simulation = Simulation::new(&config);
        // the opening message goes to an observer instead of the responder, which then waits forever
        let (observer_side_end, mut observer) = handoff_pair(INITIATOR_NAME, "Observer", config.poll_timeout());
        let _idle_initiator_end = std::mem::replace(&mut simulation.initiator_end, observer_side_end);

        let interrupted = tokio::time::timeout(Duration::from_millis(60), simulation.run()).await;
        assert!(interrupted.is_err(), "the run should have been interrupted, but returned {interrupted:?}");
        assert_eq!(simulation.initiator().tally(), Tally { name: String::from(INITIATOR_NAME), sent: 1, received: 0 });
        assert_eq!(simulation.responder().tally(), Tally { name: String::from(RESPONDER_NAME), sent: 0, received: 0 });
        assert!(simulation.poll_timeouts() > 0, "the responder should have timed out while waiting");
        assert_eq!(observer.receive().await.expect("receiving"), Received::Message(String::from("ping 1")));
    }

    /// a vanished counterpart is reported as an error rather than waited on
    #[cfg_attr(not(doc),tokio::test)]
    async fn disconnected_channel_aborts_the_turn() {
        let config = ExchangeConfig::default();
        let mut simulation = Simulation::new(&config);
        let (orphan_end, counterpart) = handoff_pair(RESPONDER_NAME, INITIATOR_NAME, config.poll_timeout());
        drop(counterpart);
        simulation.responder_end = orphan_end;
        simulation.turn = Turn::Responder;

        let result = simulation.take_turn().await;
        assert!(matches!(result, Err(Error::ChannelDisconnected { .. })), "expected `ChannelDisconnected`, got {result:?}");
        assert_eq!(simulation.responder().received_count(), 0);
    }
}
