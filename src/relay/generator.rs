use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::TickRelay;
use crate::model::mode::{Direction, Mode};
use crate::model::tick::{now_millis, Tick, TickSource};

/// Spawn the synthetic tick task: one manual tick per period until manual
/// mode is deactivated or the task is aborted.
pub(crate) fn spawn(relay: Arc<TickRelay>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The interval's first tick completes immediately; consume it so
        // the first emission lands one full period after activation.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !relay.emit_manual_tick() {
                break;
            }
        }
    })
}

impl TickRelay {
    /// Advance the synthetic price by one directional step and fan the
    /// resulting tick out. The mode check, the step arithmetic, the price
    /// store and the fan-out happen under one lock, so a concurrent mode
    /// or direction change is either fully before or fully after this
    /// emission.
    ///
    /// Returns `false` when manual mode is no longer active, which tells
    /// a generator task that fired late to stop.
    pub fn emit_manual_tick(&self) -> bool {
        let mut inner = self.state();
        if inner.mode != Mode::Manual {
            return false;
        }

        let base = inner.current_price.unwrap_or(self.settings.default_price);
        let price = match inner.direction {
            Direction::Up => base + self.settings.manual_step,
            Direction::Down => base - self.settings.manual_step,
            Direction::None => base,
        };
        inner.current_price = Some(price);

        let tick = Tick {
            symbol: self.settings.symbol.clone(),
            price,
            timestamp_ms: now_millis(),
            source: TickSource::Manual,
        };
        self.fan_out(&mut inner, &tick);
        true
    }
}
