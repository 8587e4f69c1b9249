pub mod controller;
pub mod generator;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::model::mode::{Direction, Mode};
use crate::model::tick::{StreamFrame, Tick};
use self::controller::{ActiveProducer, LiveTickSource};

/// Capacity of each subscriber's frame channel. A subscriber that falls
/// this far behind is dropped rather than back-pressuring the producers.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Runtime settings for the relay core.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub symbol: String,
    pub initial_mode: Mode,
    pub tick_interval: Duration,
    pub manual_step: f64,
    pub default_price: f64,
}

impl RelaySettings {
    pub fn from_config(cfg: &RelayConfig) -> Result<Self, RelayError> {
        Ok(Self {
            symbol: cfg.symbol.clone(),
            initial_mode: cfg.initial_mode.parse()?,
            tick_interval: Duration::from_millis(cfg.tick_interval_ms),
            manual_step: cfg.manual_step,
            default_price: cfg.default_price,
        })
    }
}

/// Point-in-time view of the relay state.
#[derive(Debug, Clone, Copy)]
pub struct RelaySnapshot {
    pub mode: Mode,
    pub direction: Direction,
    pub current_price: Option<f64>,
}

/// The relay core: owns the current price, arbitrates between the two tick
/// producers and fans accepted ticks out to streaming subscribers.
///
/// Every piece of shared state lives behind one mutex, and no lock-holding
/// path awaits. Mode switches, direction changes, producer emissions and
/// subscriber changes all serialize on that lock, so none of them can
/// observe a half-applied transition.
pub struct TickRelay {
    settings: RelaySettings,
    live_source: Box<dyn LiveTickSource>,
    weak_self: Weak<TickRelay>,
    inner: Mutex<RelayInner>,
}

struct RelayInner {
    mode: Mode,
    direction: Direction,
    current_price: Option<f64>,
    subscribers: HashMap<u64, mpsc::Sender<StreamFrame>>,
    next_subscriber_id: u64,
    producer: Option<ActiveProducer>,
}

impl TickRelay {
    pub fn new(settings: RelaySettings, live_source: Box<dyn LiveTickSource>) -> Arc<Self> {
        let initial_mode = settings.initial_mode;
        Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            live_source,
            inner: Mutex::new(RelayInner {
                mode: initial_mode,
                direction: Direction::None,
                current_price: None,
                subscribers: HashMap::new(),
                next_subscriber_id: 1,
                producer: None,
            }),
            settings,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.settings.symbol
    }

    pub fn snapshot(&self) -> RelaySnapshot {
        Self::snapshot_locked(&self.state())
    }

    /// Accept a producer tick: update the price when the tick's source
    /// matches the active mode, then fan the tick out to every subscriber
    /// regardless.
    pub fn publish(&self, tick: Tick) {
        let mut inner = self.state();
        if tick.source.matches(inner.mode) {
            inner.current_price = Some(tick.price);
        } else {
            tracing::debug!(
                source = %tick.source,
                mode = %inner.mode,
                "Tick source does not match active mode, price unchanged"
            );
        }
        self.fan_out(&mut inner, &tick);
    }

    /// Register a streaming subscriber. Returns its id and the frame
    /// receiver; the caller owns the receiving side's lifecycle.
    pub fn subscribe(&self) -> (u64, mpsc::Receiver<StreamFrame>) {
        let mut inner = self.state();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        inner.subscribers.insert(id, tx);
        (id, rx)
    }

    /// Remove a subscriber. Safe to call for an id that was already
    /// dropped after a failed delivery.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.state();
        inner.subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, RelayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_locked(inner: &RelayInner) -> RelaySnapshot {
        RelaySnapshot {
            mode: inner.mode,
            direction: inner.direction,
            current_price: inner.current_price,
        }
    }

    /// Deliver one tick frame to every subscriber. A delivery failure
    /// drops that subscriber and never reaches the producer.
    fn fan_out(&self, inner: &mut RelayInner, tick: &Tick) {
        let frame = StreamFrame::from_tick(tick, inner.mode);
        let mut dropped = Vec::new();
        for (id, tx) in &inner.subscribers {
            if tx.try_send(frame.clone()).is_err() {
                dropped.push(*id);
            }
        }
        for id in dropped {
            inner.subscribers.remove(&id);
            tracing::warn!(
                error = %RelayError::SubscriberDelivery(id),
                "Dropping streaming subscriber"
            );
        }
    }
}
