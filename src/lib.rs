// src/lib.rs
// editbridge - native messaging host that hands browser text to an
// external editor and returns the edited result.

pub mod config;
pub mod editor;
pub mod error;
pub mod protocol;
pub mod scratch;
pub mod session;
pub mod watch;
