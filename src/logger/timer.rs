//! Periodic sampling thread.
//!
//! The thread sleeps on a condvar until the next deadline, so an interval
//! change or a stop request takes effect immediately instead of after the
//! current sleep.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::logger::{MemLogger, TriggerCause};

/// Shortest accepted interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct Control {
    interval: Duration,
    /// Deadline must be recomputed from now.
    rearm: bool,
    stop: bool,
}

struct Shared {
    control: Mutex<Control>,
    changed: Condvar,
}

/// Handle to a running timer thread. Stops the thread on drop.
pub struct Ticker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<u64>>,
}

impl Ticker {
    /// Spawns a thread that calls [`MemLogger::trigger`] every `interval`.
    pub fn spawn(logger: Arc<MemLogger>, interval: Duration) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                interval: interval.max(MIN_INTERVAL),
                rearm: false,
                stop: false,
            }),
            changed: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("memlog-timer".into())
            .spawn(move || run(&thread_shared, &logger))?;

        info!(interval_ms = interval.as_millis() as u64, "timer started");
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.shared.control.lock().interval
    }

    /// Changes the interval. The next tick is one new interval from now.
    pub fn set_interval(&self, interval: Duration) {
        let interval = interval.max(MIN_INTERVAL);
        {
            let mut control = self.shared.control.lock();
            control.interval = interval;
            control.rearm = true;
        }
        self.shared.changed.notify_one();
        info!(interval_ms = interval.as_millis() as u64, "timer interval changed");
    }

    /// Stops the thread and returns the number of ticks it fired.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.shared.control.lock().stop = true;
        self.shared.changed.notify_one();
        let ticks = self
            .handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0);
        debug!(ticks, "timer stopped");
        ticks
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

fn run(shared: &Shared, logger: &MemLogger) -> u64 {
    let mut ticks = 0;
    let mut control = shared.control.lock();
    let mut deadline = Instant::now() + control.interval;

    loop {
        if control.stop {
            return ticks;
        }
        if control.rearm {
            control.rearm = false;
            deadline = Instant::now() + control.interval;
        }

        let now = Instant::now();
        if now < deadline {
            shared.changed.wait_until(&mut control, deadline);
            continue;
        }

        MutexGuard::unlocked(&mut control, || logger.trigger(TriggerCause::Timer));
        ticks += 1;

        // Skip missed ticks rather than firing a burst.
        deadline += control.interval;
        if deadline <= now {
            deadline = now + control.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::StaticSource;
    use crate::filter::FilterConfig;
    use crate::logger::{Providers, Sampler};

    fn logger() -> Arc<MemLogger> {
        let sampler = Sampler::new(Providers::from_source(StaticSource::new()));
        Arc::new(MemLogger::new(8, FilterConfig::default(), sampler))
    }

    fn wait_for_data(logger: &MemLogger, limit: Duration) -> bool {
        let started = Instant::now();
        while started.elapsed() < limit {
            if logger.unread() > 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_ticker_fires() {
        let logger = logger();
        let ticker = Ticker::spawn(Arc::clone(&logger), Duration::from_millis(5)).unwrap();

        assert!(wait_for_data(&logger, Duration::from_secs(5)));
        assert!(ticker.stop() >= 1);
    }

    #[test]
    fn test_set_interval_rearms() {
        let logger = logger();
        let ticker = Ticker::spawn(Arc::clone(&logger), Duration::from_secs(3600)).unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(logger.unread(), 0);

        ticker.set_interval(Duration::from_millis(5));
        assert_eq!(ticker.interval(), Duration::from_millis(5));
        assert!(wait_for_data(&logger, Duration::from_secs(5)));
    }

    #[test]
    fn test_interval_clamped() {
        let ticker = Ticker::spawn(logger(), Duration::ZERO).unwrap();
        assert_eq!(ticker.interval(), MIN_INTERVAL);
        ticker.set_interval(Duration::from_secs(3600));
    }

    #[test]
    fn test_drop_stops_thread() {
        let logger = logger();
        let ticker = Ticker::spawn(Arc::clone(&logger), Duration::from_secs(3600)).unwrap();
        drop(ticker);
        // Thread held the only other reference.
        assert_eq!(Arc::strong_count(&logger), 1);
    }
}
