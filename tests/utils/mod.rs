//! Contains common functions used across all the integration tests

use std::io::{BufRead, BufReader, Read};
use std::net::TcpListener;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};


/// How long any process (or any expected output line) is waited for before the test fails
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(15);


/// Returns a port nobody is listening on -- the OS just handed it out and it was released right away
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("binding to an ephemeral port");
    listener.local_addr().expect("reading the bound address").port()
}

/// Starts the `multi_process` binary for `role` on `127.0.0.1:port`, with stdout & stderr piped
pub fn spawn_multi_process(role: &str, port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_multi_process"))
        .args([role, "--host", "127.0.0.1", "--port", &port.to_string()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|err| panic!("couldn't start `multi_process {role}`: {err}"))
}

/// Waits up to [PROCESS_TIMEOUT] for `child` to exit, killing it otherwise
pub fn wait_for_exit(child: &mut Child) -> Option<ExitStatus> {
    let deadline = Instant::now() + PROCESS_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().expect("polling the child process") {
            return Some(status)
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    None
}

/// Collects, line by line, everything a child process writes to its stdout & stderr
pub struct ProcessOutput {
    lines:     Receiver<String>,
    collected: Vec<String>,
}

impl ProcessOutput {

    pub fn capture(child: &mut Child) -> Self {
        let (sender, lines) = mpsc::channel();
        let stdout = child.stdout.take().expect("stdout should be piped");
        let stderr = child.stderr.take().expect("stderr should be piped");
        Self::forward_lines(stdout, sender.clone());
        Self::forward_lines(stderr, sender);
        Self { lines, collected: vec![] }
    }

    fn forward_lines(stream: impl Read + Send + 'static, sender: mpsc::Sender<String>) {
        thread::spawn(move || {
            for line in BufReader::new(stream).lines().map_while(Result::ok) {
                if sender.send(line).is_err() {
                    break
                }
            }
        });
    }

    /// Blocks until a line containing `needle` shows up, returning `false` if it didn't within [PROCESS_TIMEOUT]
    pub fn wait_for(&mut self, needle: &str) -> bool {
        if self.collected.iter().any(|line| line.contains(needle)) {
            return true
        }
        let deadline = Instant::now() + PROCESS_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    let found = line.contains(needle);
                    self.collected.push(line);
                    if found {
                        return true
                    }
                },
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Reads everything until the process closes its outputs (or [PROCESS_TIMEOUT] elapses), returning all that was written
    pub fn all(mut self) -> String {
        let deadline = Instant::now() + PROCESS_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => self.collected.push(line),
                Err(_) => break,
            }
        }
        self.collected.join("\n")
    }
}
