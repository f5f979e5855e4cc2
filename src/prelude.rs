//! Re-exports of types useful for users of this crate

pub use crate::{
    config::{ExchangeConfig, MESSAGE_LIMIT},
    error::{Error, Result},
    exchange::{run_initiator, run_responder, ExchangeOutcome, ExchangeReport},
    participant::Participant,
    protocol::{Role, Tally, Turn},
    simulation::{Simulation, SimulationReport},
    transport::{handoff_pair, HandoffChannel, Received, ResponderListener, SocketConnection, Transport},
};
