//! Two processes, one per role, exchange messages over a TCP connection

use crate::utils::*;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process::Command;


/// Starting a responder then an initiator: the initiator opens with "ping 1" and stops after 10 replies,
/// closing the connection -- which ends the responder as well
#[cfg_attr(not(doc), test)]
fn initiator_and_responder_complete_the_exchange() {
    let port = unused_port();
    let mut responder = spawn_multi_process("responder", port);
    let mut responder_output = ProcessOutput::capture(&mut responder);
    assert!(responder_output.wait_for("Listening on port"), "the responder didn't start listening");

    let mut initiator = spawn_multi_process("initiator", port);
    let initiator_output = ProcessOutput::capture(&mut initiator);

    let initiator_status = wait_for_exit(&mut initiator).expect("the initiator should finish");
    let responder_status = wait_for_exit(&mut responder).expect("the responder should finish");
    let initiator_output = initiator_output.all();
    let responder_output = responder_output.all();

    assert!(initiator_status.success(), "initiator failed:\n{initiator_output}");
    assert!(responder_status.success(), "responder failed:\n{responder_output}");
    assert!(initiator_output.contains("SENDING: ping 1 "), "initiator should have sent the initial message:\n{initiator_output}");
    assert!(initiator_output.contains("Received 10 replies"), "initiator should receive 10 replies:\n{initiator_output}");
    assert!(initiator_output.contains("[initiator] Finished. Sent: 10, Received: 10"), "initiator tallies are wrong:\n{initiator_output}");
    assert!(responder_output.contains("SENDING: ping 1 1 "), "responder should respond to messages:\n{responder_output}");
    assert!(responder_output.contains("[responder] Finished. Sent: 10, Received: 10"), "responder tallies are wrong:\n{responder_output}");
}

/// A "STOP" line (in any case) ends the responder without a reply
#[cfg_attr(not(doc), test)]
fn responder_ends_on_stop() {
    let port = unused_port();
    let mut responder = spawn_multi_process("RESPONDER", port);
    let mut responder_output = ProcessOutput::capture(&mut responder);
    assert!(responder_output.wait_for("Listening on port"), "the responder didn't start listening");

    let connection = TcpStream::connect(("127.0.0.1", port)).expect("connecting to the responder");
    let mut writer = connection.try_clone().expect("cloning the connection");
    let mut reader = BufReader::new(connection);

    writer.write_all(b"ping 1\n").expect("writing");
    let mut reply = String::new();
    reader.read_line(&mut reply).expect("reading the reply");
    assert_eq!(reply, "ping 1 1\n");

    writer.write_all(b"Stop\n").expect("writing");
    let mut after_stop = String::new();
    let read = reader.read_line(&mut after_stop).expect("reading after STOP");
    assert_eq!(read, 0, "no reply should follow STOP -- got '{after_stop}'");

    let status = wait_for_exit(&mut responder).expect("the responder should finish after STOP");
    let responder_output = responder_output.all();
    assert!(status.success(), "responder failed:\n{responder_output}");
    assert!(responder_output.contains("Received STOP signal"), "STOP wasn't reported:\n{responder_output}");
    assert!(responder_output.contains("[responder] Finished. Sent: 1, Received: 1"), "responder tallies are wrong:\n{responder_output}");
}

/// With nobody listening, the initiator reports the refused connection and its (empty) tallies, then fails
#[cfg_attr(not(doc), test)]
fn initiator_without_responder_fails() {
    let mut initiator = spawn_multi_process("initiator", unused_port());
    let initiator_output = ProcessOutput::capture(&mut initiator);
    let status = wait_for_exit(&mut initiator).expect("the initiator should finish");
    let initiator_output = initiator_output.all();

    assert!(!status.success(), "a refused connection must end in a non-zero exit:\n{initiator_output}");
    assert!(initiator_output.contains("connection refused"), "the refused connection wasn't reported:\n{initiator_output}");
    assert!(initiator_output.contains("[initiator] Finished. Sent: 0, Received: 0"), "tallies should be reported on failures too:\n{initiator_output}");
}

/// Roles other than `initiator` & `responder` -- or no role at all -- are usage errors
#[cfg_attr(not(doc), test)]
fn invalid_roles_are_rejected() {
    for args in [vec!["observer"], vec![]] {
        let output = Command::new(env!("CARGO_BIN_EXE_multi_process"))
            .args(&args)
            .output()
            .expect("running `multi_process`");
        assert!(!output.status.success(), "`multi_process {args:?}` should fail: {output:?}");
    }
}
