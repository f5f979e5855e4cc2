//! Resting place for [Participant], one of the two parties of an exchange

use crate::config::MESSAGE_LIMIT;
use crate::protocol::Tally;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::Relaxed;
use log::info;


/// Tracks how many messages a party has sent & received.\
/// The sent counter is capped at [Self::limit()] -- see [Self::increment_and_get_sent_count()];
/// the received counter is not capped at all.\
/// Both counters are atomics, so a `&Participant` may be shared with other threads
/// (for instance, for reporting) while the exchange loop increments them.
#[derive(Debug)]
pub struct Participant {
    name:           String,
    limit:          u32,
    sent_count:     AtomicU32,
    received_count: AtomicU32,
}

impl Participant {

    /// Creates a participant able to send up to [MESSAGE_LIMIT] messages
    pub fn new<IntoString: Into<String>>(name: IntoString) -> Self {
        Self::with_limit(name, MESSAGE_LIMIT)
    }

    /// Creates a participant able to send up to `limit` messages
    pub fn with_limit<IntoString: Into<String>>(name: IntoString, limit: u32) -> Self {
        Self {
            name:           name.into(),
            limit,
            sent_count:     AtomicU32::new(0),
            received_count: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sent_count(&self) -> u32 {
        self.sent_count.load(Relaxed)
    }

    pub fn received_count(&self) -> u32 {
        self.received_count.load(Relaxed)
    }

    /// Returns the new sent count, unless the limit was already reached
    /// -- in which case the (unchanged) limit is returned.\
    /// Concurrent callers never push the counter past the limit: each successful increment has exactly one winner.
    pub fn increment_and_get_sent_count(&self) -> u32 {
        match self.sent_count.fetch_update(Relaxed, Relaxed, |count| (count < self.limit).then_some(count + 1)) {
            Ok(previous) => previous + 1,
            Err(capped)  => capped,
        }
    }

    pub fn increment_and_get_received_count(&self) -> u32 {
        self.received_count.fetch_add(1, Relaxed) + 1
    }

    /// Accounts for an incoming message, logging its `content` along with the new received total (which is returned)
    pub fn record_receipt(&self, content: &str) -> u32 {
        let received = self.increment_and_get_received_count();
        info!("[{}] Received: {content} (Total Received: {received})", self.name);
        received
    }

    /// Snapshot of the counters, for final reports
    pub fn tally(&self) -> Tally {
        Tally {
            name:     self.name.clone(),
            sent:     self.sent_count(),
            received: self.received_count(),
        }
    }
}


/// Unit tests & enforces the requisites of the [participant](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;


    #[cfg_attr(not(doc),test)]
    fn sent_count_is_capped() {
        let participant = Participant::new("TestPlayer");
        for expected in 1..=MESSAGE_LIMIT {
            assert_eq!(participant.increment_and_get_sent_count(), expected, "increments up to the limit should return the new count");
        }
        assert_eq!(participant.sent_count(), MESSAGE_LIMIT);
        for _ in 0..5 {
            assert_eq!(participant.increment_and_get_sent_count(), MESSAGE_LIMIT, "increments past the limit should be no-ops");
        }
        assert_eq!(participant.sent_count(), MESSAGE_LIMIT);
    }

    #[cfg_attr(not(doc),test)]
    fn received_count_is_not_capped() {
        let participant = Participant::with_limit("Responder", 2);
        for expected in 1..=5 {
            assert_eq!(participant.increment_and_get_received_count(), expected);
        }
        assert_eq!(participant.record_receipt("ping 1"), 6, "`record_receipt()` should return the new received total");
        assert_eq!(participant.received_count(), 6);
        assert_eq!(participant.sent_count(), 0, "receiving must not touch the sent counter");
    }

    #[cfg_attr(not(doc),test)]
    fn accessors_are_idempotent() {
        let participant = Participant::new("Initiator");
        participant.increment_and_get_sent_count();
        participant.record_receipt("ping 1 1");
        for _ in 0..3 {
            assert_eq!(participant.sent_count(), 1);
            assert_eq!(participant.received_count(), 1);
            assert_eq!(participant.name(), "Initiator");
        }
        assert_eq!(participant.tally(), Tally { name: String::from("Initiator"), sent: 1, received: 1 });
    }

    /// many threads racing for the last sent slots must not overshoot the limit and each winner must see a distinct count
    #[cfg_attr(not(doc),test)]
    fn concurrent_sent_increments() {
        const THREADS: usize = 8;
        const ATTEMPTS_PER_THREAD: usize = 100;
        let participant = Arc::new(Participant::new("Shared"));
        let observed = Arc::new(Mutex::new(Vec::with_capacity(THREADS * ATTEMPTS_PER_THREAD)));

        let handles: Vec<_> = (0..THREADS).map(|_| {
            let participant = Arc::clone(&participant);
            let observed = Arc::clone(&observed);
            thread::spawn(move || {
                let local: Vec<u32> = (0..ATTEMPTS_PER_THREAD).map(|_| participant.increment_and_get_sent_count()).collect();
                observed.lock().expect("poisoned").extend(local);
            })
        }).collect();
        handles.into_iter().for_each(|handle| handle.join().expect("incrementing thread panicked"));

        assert_eq!(participant.sent_count(), MESSAGE_LIMIT);
        let observed = observed.lock().expect("poisoned");
        let winners: HashSet<u32> = observed.iter().copied().filter(|&count| count < MESSAGE_LIMIT).collect();
        let winners_count = observed.iter().filter(|&&count| count < MESSAGE_LIMIT).count();
        assert_eq!(winners_count, winners.len(), "two callers were handed the same count");
        assert_eq!(winners, (1..MESSAGE_LIMIT).collect(), "every count below the limit should have been handed out exactly once");
        assert!(observed.iter().all(|&count| count <= MESSAGE_LIMIT), "a count above the limit was handed out");
    }

    #[cfg_attr(not(doc),test)]
    fn concurrent_received_increments() {
        let participant = Arc::new(Participant::new("Shared"));
        let handles: Vec<_> = (0..4).map(|_| {
            let participant = Arc::clone(&participant);
            thread::spawn(move || (0..250).for_each(|_| { participant.increment_and_get_received_count(); }))
        }).collect();
        handles.into_iter().for_each(|handle| handle.join().expect("incrementing thread panicked"));
        assert_eq!(participant.received_count(), 1000, "lost updates on the received counter");
    }
}
