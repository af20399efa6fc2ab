//! Host-facing contracts and wire plumbing for native shell integration.

pub mod channel;
pub mod contract;
pub mod stdio;
