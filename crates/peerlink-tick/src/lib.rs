//! Fixed-rate synchronization tick for Peerlink clients.
//!
//! The outbound tracker sends at most one update per tick, so the tick
//! rate is the upper bound on upstream message rate. [`SyncTicker`] fires
//! at that rate and skips ahead rather than bursting when the client falls
//! behind (a frame hitch, a laptop lid closing).
//!
//! # Integration
//!
//! The ticker sits in the client's `tokio::select!` loop next to the
//! transport's event receiver:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(event) = events.recv() => { session.handle_transport_event(event); }
//!         tick = ticker.wait_for_tick() => {
//!             drive(&mut session, &tick);
//!             session.flush();
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`SyncTicker`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second.
    pub tick_rate_hz: u32,
    /// Random delay (0–max µs) added before the first tick, so a batch of
    /// clients started together don't all send on the same instant.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    pub const MIN_TICK_RATE_HZ: u32 = 1;
    pub const MAX_TICK_RATE_HZ: u32 = 240;

    /// A config for a specific tick rate with default jitter.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps `tick_rate_hz` into
    /// [`MIN_TICK_RATE_HZ`](Self::MIN_TICK_RATE_HZ)..=[`MAX_TICK_RATE_HZ`](Self::MAX_TICK_RATE_HZ).
    pub fn validated(mut self) -> Self {
        let clamped = self
            .tick_rate_hz
            .clamp(Self::MIN_TICK_RATE_HZ, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped, "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self
    }

    /// Duration of one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about one tick, returned by [`SyncTicker::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// Fixed delta time for this tick (`1 / tick_rate`).
    pub dt: Duration,
    /// Whole ticks missed because this one fired late.
    pub ticks_skipped: u64,
}

impl TickInfo {
    /// `dt` in seconds, for movement integration.
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_secs_f32()
    }
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-rate tick source for one client session.
pub struct SyncTicker {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    total_skipped: u64,
    next_tick: Instant,
    paused: bool,
}

impl SyncTicker {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            tick_ms = tick_duration.as_secs_f64() * 1000.0,
            "sync ticker created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            total_skipped: 0,
            next_tick: Instant::now() + tick_duration + jitter,
            paused: false,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Waits until the next tick is due.
    ///
    /// While paused this future pends forever, which lets `select!` keep
    /// servicing its other branches. Cancel-safe: state only changes after
    /// the sleep completes.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let ticks_skipped = (late_by.as_nanos() / self.tick_duration.as_nanos()) as u64;
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "sync tick overrun, skipping ahead"
            );
        }

        // Schedule from now so a late tick never triggers a burst.
        self.next_tick = if ticks_skipped > 0 {
            now + self.tick_duration
        } else {
            due + self.tick_duration
        };
        self.tick_count += 1;
        self.total_skipped += ticks_skipped;

        trace!(tick = self.tick_count, "sync tick");

        TickInfo {
            tick: self.tick_count,
            dt: self.tick_duration,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "sync ticker paused");
        }
    }

    /// Resumes after a pause. The next tick is one full period from now,
    /// not a burst covering the paused time.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.tick_duration;
            debug!(tick = self.tick_count, "sync ticker resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks skipped over the ticker's lifetime.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
