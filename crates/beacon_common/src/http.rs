//! HTTP helpers shared by the outbound clients.

pub mod client;
