use serde::{Deserialize, Serialize};

use crate::model::tick::{now_millis, Tick, TickSource};

/// Subscription request sent once after the upstream socket opens.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub channel: String,
    pub symbol: String,
}

impl SubscribeRequest {
    pub fn new(channel: &str, symbol: &str) -> Self {
        Self {
            msg_type: "subscribe",
            channel: channel.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Raw upstream feed payload. Heartbeats and informational frames arrive
/// on the same stream with fields missing, so everything is optional.
#[derive(Debug, Deserialize)]
pub struct UpstreamFeedMessage {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl UpstreamFeedMessage {
    /// Normalize a feed payload into a live tick. Heartbeats and frames
    /// without a usable price map to `None`. A zero price is
    /// indistinguishable from a missing one on this feed and is dropped
    /// the same way. Frames without a timestamp are stamped with the
    /// local clock.
    pub fn into_tick(self) -> Option<Tick> {
        let symbol = self.symbol?;
        let price = self.price?;
        if price == 0.0 {
            return None;
        }
        Some(Tick {
            symbol,
            price,
            timestamp_ms: self.timestamp.unwrap_or_else(now_millis),
            source: TickSource::Live,
        })
    }
}
