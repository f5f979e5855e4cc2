#![doc = include_str!("../README.md")]


pub mod config;
pub mod error;
pub mod participant;
pub mod protocol;
pub mod transport;

pub mod exchange;
pub mod simulation;
pub mod prelude;

#[cfg(any(test,doc))]
mod unit_test_utils;
