//! Tick statistics reported by backend servers.

use dashmap::DashMap;
use serde::Serialize;
use tracing::info;

/// Reports between two log lines for the same server.
const LOG_EVERY: u32 = 20;

/// Smoothed statistics of one server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickSample {
    pub mspt: f32,
    pub tps: f32,
    pub load: i32,
}

/// Running averages per server.
///
/// Each report is averaged with the previous value: `new = (old + sample) / 2`.
#[derive(Debug, Default)]
pub struct ServerStats {
    samples: DashMap<String, TickSample>,
    reports: DashMap<String, u32>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a report into the running averages and return the new values.
    pub fn record(&self, server: &str, mspt: f32, tps: f32, load: i32) -> TickSample {
        {
            let mut count = self.reports.entry(server.to_string()).or_insert(0);
            if *count == 0 {
                info!(
                    "📊 Server '{}' TPS: {} MSPT: {} Load: {}",
                    server, tps as i32, mspt as i32, load
                );
            }
            *count = (*count + 1) % (LOG_EVERY + 1);
        }

        let sample = match self.samples.get(server).map(|entry| *entry.value()) {
            Some(previous) => TickSample {
                mspt: (previous.mspt + mspt) / 2.0,
                tps: (previous.tps + tps) / 2.0,
                load: average(previous.load, load),
            },
            None => TickSample { mspt, tps, load },
        };

        self.samples.insert(server.to_string(), sample);
        sample
    }

    pub fn get(&self, server: &str) -> Option<TickSample> {
        self.samples.get(server).map(|entry| *entry.value())
    }

    /// Averaged load, or -1 when the server never reported.
    pub fn load(&self, server: Option<&str>) -> i32 {
        server.and_then(|s| self.get(s)).map_or(-1, |sample| sample.load)
    }

    /// Averaged milliseconds per tick, or -1 when unknown.
    pub fn mspt(&self, server: Option<&str>) -> f32 {
        server.and_then(|s| self.get(s)).map_or(-1.0, |sample| sample.mspt)
    }

    /// Averaged ticks per second, or -1 when unknown.
    pub fn tps(&self, server: Option<&str>) -> f32 {
        server.and_then(|s| self.get(s)).map_or(-1.0, |sample| sample.tps)
    }

    pub fn forget(&self, server: &str) {
        self.samples.remove(server);
        self.reports.remove(server);
    }
}

/// Mean of two loads, computed wide. The result always fits back in `i32`.
fn average(previous: i32, sample: i32) -> i32 {
    ((i64::from(previous) + i64::from(sample)) / 2) as i32
}
