use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use tick_relay::model::mode::{Direction, Mode};
use tick_relay::model::tick::{StreamFrame, Tick, TickSource};
use tick_relay::relay::controller::LiveTickSource;
use tick_relay::relay::{RelaySettings, TickRelay};

struct IdleLiveSource {
    spawn_count: Arc<AtomicUsize>,
}

impl LiveTickSource for IdleLiveSource {
    fn spawn(&self, _relay: Arc<TickRelay>) -> JoinHandle<()> {
        self.spawn_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tokio::spawn(std::future::pending::<()>())
    }
}

fn test_relay(initial_mode: Mode) -> Arc<TickRelay> {
    let settings = RelaySettings {
        symbol: "BTCUSD".to_string(),
        initial_mode,
        tick_interval: Duration::from_millis(1000),
        manual_step: 10.0,
        default_price: 100.0,
    };
    let source = IdleLiveSource {
        spawn_count: Arc::new(AtomicUsize::new(0)),
    };
    TickRelay::new(settings, Box::new(source))
}

async fn next_tick_price(frames: &mut mpsc::Receiver<StreamFrame>) -> f64 {
    let frame = timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("frame channel closed");
    match frame {
        StreamFrame::Tick { price, .. } => price,
        other => panic!("expected a tick frame, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
/// With no direction set, every generator period repeats the seeded
/// price. The first emission lands one full period after activation.
async fn generator_repeats_seed_price_without_direction() {
    let relay = test_relay(Mode::Manual);
    relay.start();
    let (_id, mut frames) = relay.subscribe();

    assert!((next_tick_price(&mut frames).await - 100.0).abs() < f64::EPSILON);
    assert!((next_tick_price(&mut frames).await - 100.0).abs() < f64::EPSILON);
    assert!((relay.snapshot().current_price.unwrap() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
/// Steering up moves the price one step per period: 100 seeds to 110,
/// 120, 130 on consecutive ticks.
async fn generator_steps_up_once_per_period() {
    let relay = test_relay(Mode::Manual);
    relay.start();
    relay.set_direction(Direction::Up);
    let (_id, mut frames) = relay.subscribe();

    assert!((next_tick_price(&mut frames).await - 110.0).abs() < f64::EPSILON);
    assert!((next_tick_price(&mut frames).await - 120.0).abs() < f64::EPSILON);
    assert!((next_tick_price(&mut frames).await - 130.0).abs() < f64::EPSILON);
    assert!((relay.snapshot().current_price.unwrap() - 130.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
/// Steering down steps the price downwards from wherever it currently is.
async fn generator_steps_down_from_current_price() {
    let relay = test_relay(Mode::Manual);
    relay.start();
    let (_id, mut frames) = relay.subscribe();

    // Move the price to 120 through a manual-source publish, then steer.
    relay.publish(Tick {
        symbol: "BTCUSD".to_string(),
        price: 120.0,
        timestamp_ms: 1_700_000_000_000,
        source: TickSource::Manual,
    });
    relay.set_direction(Direction::Down);

    assert!((next_tick_price(&mut frames).await - 120.0).abs() < f64::EPSILON);
    assert!((next_tick_price(&mut frames).await - 110.0).abs() < f64::EPSILON);
    assert!((next_tick_price(&mut frames).await - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
/// A generator fire that lost the race with a mode switch mutates
/// nothing and reports that the generator should stop.
async fn stale_generator_fire_is_rejected() {
    let relay = test_relay(Mode::Live);
    let (_id, mut frames) = relay.subscribe();

    assert!(!relay.emit_manual_tick());
    assert!(relay.snapshot().current_price.is_none());
    assert!(frames.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
/// Deactivating manual mode stops the tick stream: no manual frame
/// arrives after the switch.
async fn generator_goes_silent_after_switch_to_live() {
    let relay = test_relay(Mode::Manual);
    relay.start();
    let (_id, mut frames) = relay.subscribe();

    assert!((next_tick_price(&mut frames).await - 100.0).abs() < f64::EPSILON);
    relay.set_mode(Mode::Live);

    let res = timeout(Duration::from_secs(5), frames.recv()).await;
    assert!(res.is_err(), "no frame should arrive after deactivation");
}

#[tokio::test(start_paused = true)]
/// Reactivating manual mode resumes the generator from the preserved
/// price rather than the seed.
async fn generator_resumes_from_preserved_price_after_round_trip() {
    let relay = test_relay(Mode::Manual);
    relay.start();
    let (_id, mut frames) = relay.subscribe();
    assert!((next_tick_price(&mut frames).await - 100.0).abs() < f64::EPSILON);

    relay.set_mode(Mode::Live);
    relay.set_mode(Mode::Manual);
    relay.set_direction(Direction::Up);

    assert!((next_tick_price(&mut frames).await - 110.0).abs() < f64::EPSILON);
}
