//! Request counters shared between the listener and the designated thread

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Timestamp format used in status output
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
struct Counters {
    request_count: u64,
    last_request: Option<DateTime<Utc>>,
    last_method: Option<String>,
}

/// Lock-protected observability state
#[derive(Debug, Default)]
pub struct ServerStats {
    running: AtomicBool,
    counters: Mutex<Counters>,
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub running: bool,
    pub request_count: u64,
    #[serde(skip)]
    pub last_request: Option<DateTime<Utc>>,
    pub last_request_time: Option<String>,
    pub last_method: Option<String>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Count a request and remember when and what it was
    pub fn record(&self, method: &str) {
        let mut counters = self.counters.lock();
        counters.request_count += 1;
        counters.last_request = Some(Utc::now());
        counters.last_method = Some(method.to_string());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters.lock();
        StatsSnapshot {
            running: self.is_running(),
            request_count: counters.request_count,
            last_request: counters.last_request,
            last_request_time: counters
                .last_request
                .map(|t| t.format(TIME_FORMAT).to_string()),
            last_method: counters.last_method.clone(),
        }
    }
}

/// How recently a client talked to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientActivity {
    /// No request seen yet
    Waiting,
    /// Last request under 30 seconds ago
    Connected,
    /// Last request under 5 minutes ago
    Idle,
    Disconnected,
}

impl ClientActivity {
    pub fn classify(last_request: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(last) = last_request else {
            return ClientActivity::Waiting;
        };
        let elapsed = now - last;
        if elapsed < Duration::seconds(30) {
            ClientActivity::Connected
        } else if elapsed < Duration::minutes(5) {
            ClientActivity::Idle
        } else {
            ClientActivity::Disconnected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientActivity::Waiting => "waiting",
            ClientActivity::Connected => "connected",
            ClientActivity::Idle => "idle",
            ClientActivity::Disconnected => "disconnected",
        }
    }
}
