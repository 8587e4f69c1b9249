//! Mode-switching tick relay: one instrument's price, sourced either from
//! a live upstream WebSocket feed or from a synthetic generator, fanned
//! out to streaming subscribers behind a small control API.

pub mod config;
pub mod error;
pub mod model;
pub mod relay;
pub mod server;
pub mod upstream;
