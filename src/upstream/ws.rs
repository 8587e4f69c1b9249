use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

use super::types::{SubscribeRequest, UpstreamFeedMessage};
use crate::config::UpstreamConfig;
use crate::error::RelayError;
use crate::model::mode::Mode;
use crate::relay::controller::LiveTickSource;
use crate::relay::TickRelay;

/// Exponential backoff for reconnection.
struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// WebSocket client for the upstream tick feed. One task per live
/// activation; the relay aborts it when live mode deactivates.
#[derive(Clone)]
pub struct UpstreamWsClient {
    url: String,
    channel: String,
    symbol: String,
}

impl UpstreamWsClient {
    pub fn new(upstream: &UpstreamConfig, symbol: &str) -> Self {
        let url = match &upstream.api_token {
            Some(token) => format!("{}?token={}", upstream.ws_url, token),
            None => upstream.ws_url.clone(),
        };
        Self {
            url,
            channel: upstream.channel.clone(),
            symbol: symbol.to_string(),
        }
    }

    /// Connect and consume the upstream stream, reconnecting with backoff
    /// for as long as the task lives. The feed being down never stops the
    /// relay; live mode simply waits for the next successful connection.
    async fn connect_and_run(&self, relay: Arc<TickRelay>) {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let err = self.connect_once(&relay, &mut backoff).await;
            let delay = backoff.next_delay();
            tracing::warn!(
                error = %err,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Upstream connection lost, reconnecting"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one connection until it fails and return the failure.
    async fn connect_once(
        &self,
        relay: &Arc<TickRelay>,
        backoff: &mut ExponentialBackoff,
    ) -> RelayError {
        tracing::info!(url = %self.url, "Connecting to upstream feed");

        let (ws_stream, _resp) = match tokio_tungstenite::connect_async(&self.url).await {
            Ok(pair) => pair,
            Err(e) => return RelayError::UpstreamUnavailable(format!("connect failed: {}", e)),
        };
        backoff.reset();

        let (mut write, mut read) = ws_stream.split();

        let subscribe = SubscribeRequest::new(&self.channel, &self.symbol);
        let payload = match serde_json::to_string(&subscribe) {
            Ok(p) => p,
            Err(e) => {
                return RelayError::UpstreamUnavailable(format!("encode subscribe failed: {}", e))
            }
        };
        if let Err(e) = write.send(tungstenite::Message::Text(payload)).await {
            return RelayError::UpstreamUnavailable(format!("subscribe failed: {}", e));
        }
        tracing::info!(symbol = %self.symbol, channel = %self.channel, "Subscribed to upstream feed");

        loop {
            match read.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    match serde_json::from_str::<UpstreamFeedMessage>(&text) {
                        Ok(msg) => {
                            let Some(tick) = msg.into_tick() else {
                                tracing::debug!("Skipping upstream frame without price data");
                                continue;
                            };
                            // A tick that raced a mode switch is dropped
                            // here, never queued for later.
                            if relay.snapshot().mode != Mode::Live {
                                tracing::debug!("Discarding live tick after mode switch");
                                continue;
                            }
                            relay.publish(tick);
                        }
                        Err(e) => {
                            let err = RelayError::from(e);
                            tracing::warn!(error = %err, "Dropping upstream payload");
                        }
                    }
                }
                Some(Ok(tungstenite::Message::Ping(_))) => {
                    // tokio-tungstenite handles pong automatically
                }
                Some(Ok(tungstenite::Message::Close(_))) => {
                    return RelayError::UpstreamUnavailable(
                        "upstream closed the connection".to_string(),
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return RelayError::UpstreamUnavailable(format!("read error: {}", e));
                }
                None => {
                    return RelayError::UpstreamUnavailable("stream ended".to_string());
                }
            }
        }
    }
}

impl LiveTickSource for UpstreamWsClient {
    fn spawn(&self, relay: Arc<TickRelay>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move { client.connect_and_run(relay).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[test]
    fn backoff_reset_returns_to_the_initial_delay() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn token_is_appended_to_the_connect_url() {
        let upstream = UpstreamConfig {
            ws_url: "wss://feed.example.com/stream".to_string(),
            channel: "ticks".to_string(),
            api_token: Some("secret".to_string()),
        };
        let client = UpstreamWsClient::new(&upstream, "BTCUSD");
        assert_eq!(client.url, "wss://feed.example.com/stream?token=secret");
    }

    #[test]
    fn url_is_unchanged_without_a_token() {
        let upstream = UpstreamConfig {
            ws_url: "wss://feed.example.com/stream".to_string(),
            channel: "ticks".to_string(),
            api_token: None,
        };
        let client = UpstreamWsClient::new(&upstream, "BTCUSD");
        assert_eq!(client.url, "wss://feed.example.com/stream");
    }
}
