use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::mode::Mode;

/// Epoch milliseconds for tick stamping.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Which producer emitted a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TickSource {
    Live,
    Manual,
}

impl TickSource {
    /// A tick may update the relay price only while its producer's mode is
    /// the active one.
    pub fn matches(&self, mode: Mode) -> bool {
        matches!(
            (self, mode),
            (TickSource::Live, Mode::Live) | (TickSource::Manual, Mode::Manual)
        )
    }
}

impl fmt::Display for TickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickSource::Live => write!(f, "LIVE"),
            TickSource::Manual => write!(f, "MANUAL"),
        }
    }
}

/// One price observation for the relayed symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub timestamp_ms: u64,
    pub source: TickSource,
}

/// Frame delivered to streaming subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Info {
        message: String,
        mode: Mode,
    },
    Tick {
        symbol: String,
        price: f64,
        timestamp: u64,
        source: TickSource,
        mode: Mode,
    },
}

impl StreamFrame {
    pub fn from_tick(tick: &Tick, mode: Mode) -> Self {
        StreamFrame::Tick {
            symbol: tick.symbol.clone(),
            price: tick.price,
            timestamp: tick.timestamp_ms,
            source: tick.source,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_matches_only_its_own_mode() {
        assert!(TickSource::Live.matches(Mode::Live));
        assert!(TickSource::Manual.matches(Mode::Manual));
        assert!(!TickSource::Live.matches(Mode::Manual));
        assert!(!TickSource::Manual.matches(Mode::Live));
    }

    #[test]
    fn tick_frame_serializes_with_tagged_type() {
        let tick = Tick {
            symbol: "BTCUSD".to_string(),
            price: 42000.5,
            timestamp_ms: 1700000000000,
            source: TickSource::Live,
        };
        let json = serde_json::to_value(StreamFrame::from_tick(&tick, Mode::Live)).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["symbol"], "BTCUSD");
        assert_eq!(json["source"], "LIVE");
        assert_eq!(json["mode"], "LIVE");
        assert_eq!(json["timestamp"], 1700000000000u64);
    }

    #[test]
    fn info_frame_serializes_with_tagged_type() {
        let frame = StreamFrame::Info {
            message: "connected".to_string(),
            mode: Mode::Manual,
        };
        let json = serde_json::to_value(frame).unwrap();
        assert_eq!(json["type"], "info");
        assert_eq!(json["mode"], "MANUAL");
    }
}
