//! The turn-taking protocol shared by both exchange flavors:
//!   * message contents grow by appending the sender's new sent count to whatever was received;
//!   * the initiator opens with `"ping 1"`;
//!   * a `STOP` line (any case) ends a responder without a reply.

use std::fmt::{self, Formatter};
use strum_macros::{AsRefStr, Display, EnumString};


/// The opening word of every exchange
pub const OPENING_WORD: &str = "ping";

/// Recognized by the responder only
pub const STOP_SIGNAL: &str = "STOP";


/// The two fixed roles of an exchange -- parsed case-insensitively from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

/// Who may attempt the next receive/send step in the in-process simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Initiator,
    Responder,
}

impl Turn {
    /// The turn of the other participant
    pub fn flip(self) -> Self {
        match self {
            Turn::Initiator => Turn::Responder,
            Turn::Responder => Turn::Initiator,
        }
    }
}

/// The first message of an exchange: `"ping <sent_count>"`
pub fn opening_message(sent_count: u32) -> String {
    format!("{OPENING_WORD} {sent_count}")
}

/// Builds the answer to `received`, appending the replier's new `sent_count`
pub fn reply_to(received: &str, sent_count: u32) -> String {
    format!("{received} {sent_count}")
}

pub fn is_stop_signal(content: &str) -> bool {
    content.eq_ignore_ascii_case(STOP_SIGNAL)
}

/// Final counters of a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub name:     String,
    pub sent:     u32,
    pub received: u32,
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] Finished. Sent: {}, Received: {}", self.name, self.sent, self.received)
    }
}


/// Unit tests the [protocol](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[cfg_attr(not(doc),test)]
    fn messages_grow_by_appending_counts() {
        let opening = opening_message(1);
        assert_eq!(opening, "ping 1");
        let reply = reply_to(&opening, 1);
        assert_eq!(reply, "ping 1 1");
        assert_eq!(reply_to(&reply, 2), "ping 1 1 2");
    }

    #[cfg_attr(not(doc),test)]
    fn stop_signal_is_case_insensitive() {
        for stop in ["STOP", "stop", "Stop", "sToP"] {
            assert!(is_stop_signal(stop), "'{stop}' should be recognized as the stop signal");
        }
        for not_stop in ["STOP ", "STOPPED", "ping 1", ""] {
            assert!(!is_stop_signal(not_stop), "'{not_stop}' should not be recognized as the stop signal");
        }
    }

    #[cfg_attr(not(doc),test)]
    fn turns_alternate() {
        assert_eq!(Turn::Initiator.flip(), Turn::Responder);
        assert_eq!(Turn::Responder.flip(), Turn::Initiator);
        assert_eq!(Turn::Initiator.flip().flip(), Turn::Initiator);
    }

    #[cfg_attr(not(doc),test)]
    fn roles_parse_ignoring_case() {
        assert_eq!(Role::from_str("initiator"), Ok(Role::Initiator));
        assert_eq!(Role::from_str("INITIATOR"), Ok(Role::Initiator));
        assert_eq!(Role::from_str("Responder"), Ok(Role::Responder));
        assert!(Role::from_str("observer").is_err());
        assert!(Role::from_str("").is_err());
        assert_eq!(Role::Responder.to_string(), "responder");
        assert_eq!(Role::Initiator.as_ref(), "initiator");
    }

    #[cfg_attr(not(doc),test)]
    fn tally_report_line() {
        let tally = Tally { name: String::from("initiator"), sent: 10, received: 10 };
        assert_eq!(tally.to_string(), "[initiator] Finished. Sent: 10, Received: 10");
    }
}
