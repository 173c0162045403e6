//! Offer countdown.
//!
//! Binds to a container (`#countdown`) holding four unit elements (`#days`,
//! `#hours`, `#minutes`, `#seconds`) and rewrites them once per second with
//! zero-padded values. When the deadline passes the ticker stops, the
//! container is replaced by the "offer ended" panel and a single
//! [`AppEvent::CountdownExpired`] is emitted.
//!
//! Hooks are looked up on every tick rather than held, so the countdown
//! keeps its deadline across page swaps and picks the display back up when
//! the offers section is injected again.

use crate::dom::Dom;
use crate::events::{AppEvent, Events};
use crate::views;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const TARGET_ID: &str = "countdown";
pub const UNIT_IDS: [&str; 4] = ["days", "hours", "minutes", "seconds"];

const SECOND_MS: i64 = 1000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const TICK: Duration = Duration::from_secs(1);

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Remaining time split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeUnits {
    pub fn from_millis(ms: i64) -> Self {
        let ms = ms.max(0);
        Self {
            days: ms / DAY_MS,
            hours: (ms % DAY_MS) / HOUR_MS,
            minutes: (ms % HOUR_MS) / MINUTE_MS,
            seconds: (ms % MINUTE_MS) / SECOND_MS,
        }
    }

    /// Two-digit strings in `UNIT_IDS` order.
    pub fn padded(&self) -> [String; 4] {
        [self.days, self.hours, self.minutes, self.seconds].map(|v| format!("{v:02}"))
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [d, h, m, s] = self.padded();
        write!(f, "{d}d {h}:{m}:{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(TimeUnits),
    Expired,
}

pub struct Countdown {
    dom: Dom,
    clock: Arc<dyn Clock>,
    events: Events,
    deadline_ms: AtomicI64,
    expired_announced: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("deadline_ms", &self.deadline_ms.load(Ordering::SeqCst))
            .field("expired_announced", &self.expired_announced)
            .finish_non_exhaustive()
    }
}

impl Countdown {
    pub fn new(dom: Dom, clock: Arc<dyn Clock>, deadline_ms: i64, events: Events) -> Arc<Self> {
        Arc::new(Self {
            dom,
            clock,
            events,
            deadline_ms: AtomicI64::new(deadline_ms),
            expired_announced: AtomicBool::new(false),
            ticker: Mutex::new(None),
        })
    }

    /// Deadline `days` after the clock's current time.
    pub fn deadline_in_days(clock: &dyn Clock, days: u32) -> i64 {
        clock.now_ms() + i64::from(days) * DAY_MS
    }

    pub fn deadline_ms(&self) -> i64 {
        self.deadline_ms.load(Ordering::SeqCst)
    }

    /// True when the container and all four unit elements are present.
    pub fn is_bound(&self) -> bool {
        self.dom.read(|doc| {
            doc.by_id(TARGET_ID).is_some() && UNIT_IDS.iter().all(|id| doc.by_id(id).is_some())
        })
    }

    pub fn is_running(&self) -> bool {
        self.ticker().as_ref().is_some_and(|t| !t.is_finished())
    }

    fn ticker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remaining_ms(&self) -> i64 {
        self.deadline_ms() - self.clock.now_ms()
    }

    /// Remaining time, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<TimeUnits> {
        let ms = self.remaining_ms();
        (ms > 0).then(|| TimeUnits::from_millis(ms))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms() <= 0
    }

    /// Recompute and display the remaining time, expiring when it is up.
    pub fn update(&self) -> Tick {
        let ms = self.remaining_ms();
        if ms <= 0 {
            self.expire();
            return Tick::Expired;
        }
        let units = TimeUnits::from_millis(ms);
        let values = units.padded();
        self.dom.write(|doc| {
            for (id, value) in UNIT_IDS.iter().zip(&values) {
                if let Some(node) = doc.by_id(id) {
                    doc.set_text(node, value);
                }
            }
        });
        Tick::Running(units)
    }

    fn expire(&self) {
        self.stop();
        let markup = views::countdown_expired().into_string();
        self.dom.write(|doc| {
            if let Some(target) = doc.by_id(TARGET_ID) {
                doc.set_inner_html(target, &markup);
            }
        });
        if !self.expired_announced.swap(true, Ordering::SeqCst) {
            info!("offer countdown expired");
            self.events.emit(AppEvent::CountdownExpired);
        }
    }

    /// Display immediately, then tick once per second until expiry.
    ///
    /// Returns false (and does nothing) when the hooks are missing.
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.is_bound() {
            debug!("countdown hooks missing, not starting");
            return false;
        }
        self.stop();
        if self.update() == Tick::Expired {
            return true;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return true;
        };
        let countdown = Arc::clone(self);
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.tick().await;
            loop {
                interval.tick().await;
                if countdown.update() == Tick::Expired {
                    break;
                }
            }
        });
        *self.ticker() = Some(task);
        true
    }

    pub fn stop(&self) {
        if let Some(task) = self.ticker().take() {
            task.abort();
        }
    }

    /// Stop, optionally move the deadline, and start again.
    pub fn restart(self: &Arc<Self>, new_deadline_ms: Option<i64>) -> bool {
        self.stop();
        if let Some(deadline) = new_deadline_ms {
            self.deadline_ms.store(deadline, Ordering::SeqCst);
            self.expired_announced.store(false, Ordering::SeqCst);
        }
        self.start()
    }

    /// Move the deadline; restarts only when the new one is still ahead.
    pub fn set_deadline(self: &Arc<Self>, deadline_ms: i64) {
        self.deadline_ms.store(deadline_ms, Ordering::SeqCst);
        if !self.is_expired() {
            self.expired_announced.store(false, Ordering::SeqCst);
            self.restart(None);
        }
    }
}
