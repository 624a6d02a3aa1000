//! Per-client request admission control.
//!
//! The [`RateGovernor`] guards every outbound jury call with two limits per
//! client identity (normally the peer IP):
//!
//! - a **sliding** per-minute window: at most `per_minute` admitted requests
//!   in the trailing 60 seconds;
//! - a **rolling** daily budget: at most `per_day` admitted requests before
//!   `daily_reset_at`, which is set 24 hours after the first request of the
//!   window rather than at midnight.
//!
//! The check and the mutation for one request happen under a single lock,
//! so concurrent requests from the same client cannot both slip through.
//! Client state is swept periodically and capped at `max_clients`; the
//! least recently seen client is found through an ordered index, so
//! eviction costs `O(log n)` per admission.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use crate::config::LimitsConfig;

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 86_400_000;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("Daily limit reached ({0} requests)")]
    DailyLimit(u32),
    #[error("Rate limit exceeded ({0} requests per minute)")]
    PerMinute(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied {
        reason: DenyReason,
        /// Seconds until a retry can succeed, rounded up.
        retry_after_secs: u64,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

#[derive(Debug, Clone)]
struct ClientWindow {
    recent: Vec<DateTime<Utc>>,
    daily_count: u32,
    daily_reset_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl ClientWindow {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            recent: Vec::new(),
            daily_count: 0,
            daily_reset_at: now + Duration::milliseconds(DAY_MS),
            last_seen: now,
        }
    }
}

/// Client windows plus an index ordered by `last_seen`.
#[derive(Default)]
struct ClientTable {
    windows: HashMap<String, ClientWindow>,
    by_last_seen: BTreeSet<(DateTime<Utc>, String)>,
}

impl ClientTable {
    /// Window for `client`, created if new, with `last_seen` moved to `now`.
    fn touch(&mut self, client: &str, now: DateTime<Utc>) -> &mut ClientWindow {
        let window = self
            .windows
            .entry(client.to_string())
            .or_insert_with(|| ClientWindow::new(now));
        self.by_last_seen.remove(&(window.last_seen, client.to_string()));
        window.last_seen = now;
        self.by_last_seen.insert((now, client.to_string()));
        window
    }

    fn len(&self) -> usize {
        self.windows.len()
    }

    fn evict_least_recent(&mut self, keep: &str) {
        let victim = self
            .by_last_seen
            .iter()
            .find(|(_, id)| id.as_str() != keep)
            .cloned();
        if let Some((seen, id)) = victim {
            tracing::debug!(client = %id, "evicting least recently seen client");
            self.by_last_seen.remove(&(seen, id.clone()));
            self.windows.remove(&id);
        }
    }

    fn retain(&mut self, mut keep: impl FnMut(&ClientWindow) -> bool) {
        self.windows.retain(|_, w| keep(w));
        let windows = &self.windows;
        self.by_last_seen.retain(|(_, id)| windows.contains_key(id));
    }
}

/// Snapshot of one client's counters, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUsage {
    pub in_window: usize,
    pub daily_count: u32,
    pub daily_reset_at: DateTime<Utc>,
}

pub struct RateGovernor {
    per_minute: usize,
    per_day: u32,
    max_clients: usize,
    clients: Mutex<ClientTable>,
}

impl RateGovernor {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            per_minute: limits.per_minute,
            per_day: limits.per_day,
            max_clients: limits.max_clients,
            clients: Mutex::new(ClientTable::default()),
        }
    }

    /// Admit or deny one request from `client` at `now`, recording it if admitted.
    pub fn check(&self, client: &str, now: DateTime<Utc>) -> Admission {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = clients.touch(client, now);

        if now > window.daily_reset_at {
            window.daily_count = 0;
            window.daily_reset_at = now + Duration::milliseconds(DAY_MS);
        }

        if window.daily_count >= self.per_day {
            return Admission::Denied {
                reason: DenyReason::DailyLimit(self.per_day),
                retry_after_secs: secs_until(now, window.daily_reset_at),
            };
        }

        let cutoff = now - Duration::milliseconds(MINUTE_MS);
        window.recent.retain(|t| *t > cutoff);

        if window.recent.len() >= self.per_minute {
            let oldest = window.recent[0];
            return Admission::Denied {
                reason: DenyReason::PerMinute(self.per_minute),
                retry_after_secs: secs_until(now, oldest + Duration::milliseconds(MINUTE_MS)),
            };
        }

        window.recent.push(now);
        window.daily_count += 1;

        if clients.len() > self.max_clients {
            clients.evict_least_recent(client);
        }

        Admission::Allowed
    }

    /// Drop clients that have nothing left to remember at `now`.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let cutoff = now - Duration::milliseconds(MINUTE_MS);
        let before = clients.len();
        clients.retain(|w| w.recent.iter().any(|t| *t > cutoff) || now <= w.daily_reset_at);
        before - clients.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn usage(&self, client: &str, now: DateTime<Utc>) -> Option<ClientUsage> {
        let clients = self.clients.lock().ok()?;
        let window = clients.windows.get(client)?;
        let cutoff = now - Duration::milliseconds(MINUTE_MS);
        Some(ClientUsage {
            in_window: window.recent.iter().filter(|t| **t > cutoff).count(),
            daily_count: window.daily_count,
            daily_reset_at: window.daily_reset_at,
        })
    }
}

fn secs_until(now: DateTime<Utc>, then: DateTime<Utc>) -> u64 {
    let ms = (then - now).num_milliseconds().max(0) as u64;
    ms.div_ceil(1000).max(1)
}
