//! Host timers
//!
//! A timer is owned by whoever created it; thread queues only hold weak
//! references and drive it from `check_timers`.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Shortest wait the queue will block for when a timer is due
pub const MINIMUM_TIMEOUT: Duration = Duration::from_millis(1);

type Tick = Box<dyn Fn(&Timer) + Send + Sync>;

struct TimerState {
    expires: Instant,
    enabled: bool,
}

pub struct Timer {
    interval: Duration,
    state: Mutex<TimerState>,
    tick: Tick,
}

impl Timer {
    /// Create an enabled timer first due `interval` from now
    pub fn new<F>(interval: Duration, tick: F) -> Self
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        Timer {
            interval,
            state: Mutex::new(TimerState {
                expires: Instant::now() + interval,
                enabled: true,
            }),
            tick: Box::new(tick),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn expires(&self) -> Instant {
        self.state.lock().unwrap().expires
    }

    pub fn enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().enabled = enabled;
    }

    /// Restart the period from `now`
    pub fn restart(&self, now: Instant) {
        self.state.lock().unwrap().expires = now + self.interval;
    }

    /// Advance the expiry past `now` by whole periods.
    ///
    /// Returns true if the timer was enabled and had expired.
    pub fn update(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.enabled || state.expires > now {
            return false;
        }
        if self.interval.is_zero() {
            state.expires = now;
        } else {
            while state.expires <= now {
                state.expires += self.interval;
            }
        }
        true
    }

    /// Run the tick callback
    pub fn fire_tick(&self) {
        (self.tick)(self);
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .field("expires", &state.expires)
            .field("enabled", &state.enabled)
            .finish()
    }
}
