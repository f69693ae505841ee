//! osmolock-lcd
//!
//! [`LockupTransport`](osmolock_query::LockupTransport) over a chain's REST
//! (LCD) endpoint.

pub mod client;
pub mod config;

pub use client::LcdClient;
pub use config::LcdConfig;
