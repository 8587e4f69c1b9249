use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{generator, RelayInner, RelaySnapshot, TickRelay};
use crate::model::mode::{Direction, Mode};

/// Producer seam for live mode. The relay spawns one task per activation
/// and aborts it on deactivation; the task forwards upstream ticks into
/// [`TickRelay::publish`] until then.
pub trait LiveTickSource: Send + Sync + 'static {
    fn spawn(&self, relay: Arc<TickRelay>) -> JoinHandle<()>;
}

/// Handle to whichever producer is currently active.
pub(crate) enum ActiveProducer {
    Live(JoinHandle<()>),
    Manual(JoinHandle<()>),
}

impl ActiveProducer {
    fn abort(&self) {
        match self {
            ActiveProducer::Live(handle) | ActiveProducer::Manual(handle) => handle.abort(),
        }
    }

    fn mode(&self) -> Mode {
        match self {
            ActiveProducer::Live(_) => Mode::Live,
            ActiveProducer::Manual(_) => Mode::Manual,
        }
    }
}

impl TickRelay {
    /// Switch the relay to `target`.
    ///
    /// Idempotent: switching to the mode that is already active leaves the
    /// producer and the direction untouched. A real transition stops the
    /// old producer, resets the direction, flips the mode and starts the
    /// new producer, all under the state lock so that neither a tick nor a
    /// concurrent control call can observe a half-switched relay. A
    /// producer callback that was already in flight when its task was
    /// aborted serializes behind the lock and is then rejected by the
    /// mode and source guards.
    pub fn set_mode(&self, target: Mode) -> RelaySnapshot {
        let mut inner = self.state();
        if inner.mode == target {
            return Self::snapshot_locked(&inner);
        }

        if let Some(producer) = inner.producer.take() {
            producer.abort();
        }
        inner.mode = target;
        inner.direction = Direction::None;
        if target == Mode::Manual && inner.current_price.is_none() {
            inner.current_price = Some(self.settings.default_price);
        }
        self.spawn_producer(&mut inner);

        tracing::info!(mode = %target, "Relay mode switched");
        Self::snapshot_locked(&inner)
    }

    /// Store the steering direction for the synthetic generator. The value
    /// is kept in every mode; it only shows in emitted prices while manual
    /// mode is active.
    pub fn set_direction(&self, direction: Direction) {
        let mut inner = self.state();
        inner.direction = direction;
        tracing::info!(direction = %direction, "Generator direction set");
    }

    /// Activate the producer for the current mode. No-op when a producer
    /// is already running.
    pub fn start(&self) {
        let mut inner = self.state();
        if inner.producer.is_some() {
            return;
        }
        if inner.mode == Mode::Manual && inner.current_price.is_none() {
            inner.current_price = Some(self.settings.default_price);
        }
        self.spawn_producer(&mut inner);
        tracing::info!(mode = %inner.mode, "Relay started");
    }

    /// Stop the active producer. Subscribers are left in place; they drop
    /// with their own connections.
    pub fn shutdown(&self) {
        let mut inner = self.state();
        if let Some(producer) = inner.producer.take() {
            producer.abort();
            tracing::info!("Relay producer stopped");
        }
    }

    /// Mode of the currently active producer, if any.
    pub fn active_producer_mode(&self) -> Option<Mode> {
        self.state().producer.as_ref().map(ActiveProducer::mode)
    }

    fn spawn_producer(&self, inner: &mut RelayInner) {
        // Upgrade fails only while the relay itself is being dropped.
        let Some(relay) = self.weak_self.upgrade() else {
            return;
        };
        let producer = match inner.mode {
            Mode::Live => ActiveProducer::Live(self.live_source.spawn(relay)),
            Mode::Manual => {
                ActiveProducer::Manual(generator::spawn(relay, self.settings.tick_interval))
            }
        };
        inner.producer = Some(producer);
    }
}
