//! Ensures the `single_process` & `multi_process` executables work as specified -- processes are
//! launched and observed from the outside, only through their exit codes, their console outputs
//! and (for the responder) their sockets.\
//! As a convention, each module (and their sub-test-functions) should bring a comment detailing the
//! requirement.

#[path = "../utils/mod.rs"]
mod utils;

mod multi_process;
mod single_process;
