//! The in-process simulation runs to completion on its own, reporting the final counters

use std::process::Command;


/// Running the simulation must end (not hang) with the initiator having received 10 replies
/// and no participant having sent more than 10 messages
#[cfg_attr(not(doc), test)]
fn simulation_completes() {
    let output = Command::new(env!("CARGO_BIN_EXE_single_process"))
        .output()
        .expect("running `single_process`");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "`single_process` failed: {output:?}");
    assert!(stdout.contains("SENDING: ping 1 "), "the opening message wasn't logged:\n{stdout}");
    assert!(stdout.contains("Received: ping 1 1 "), "the first reply wasn't logged:\n{stdout}");
    assert!(stdout.contains("Initiator Received: 10"), "final stats are missing or wrong:\n{stdout}");
    assert!(stdout.contains("Initiator Sent: 10"), "final stats are missing or wrong:\n{stdout}");
    assert!(stdout.contains("Responder Sent: 10"), "final stats are missing or wrong:\n{stdout}");
}
