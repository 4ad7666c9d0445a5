//! Metrics sinks notified at every tick boundary.

use crate::agent::Breed;
use crate::stats::{PopulationHistory, TickRecord};

/// Receives a record after every tick. The engine does not care how it is
/// stored or displayed.
pub trait MetricsSink {
    fn record(&mut self, record: &TickRecord);
}

impl<F> MetricsSink for F
where
    F: FnMut(&TickRecord),
{
    fn record(&mut self, record: &TickRecord) {
        self(record)
    }
}

impl MetricsSink for PopulationHistory {
    fn record(&mut self, record: &TickRecord) {
        PopulationHistory::record(self, record.clone());
    }
}

/// Emits an `info` line every `interval` ticks
#[derive(Debug, Clone)]
pub struct LogSink {
    interval: u64,
}

impl LogSink {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl MetricsSink for LogSink {
    fn record(&mut self, record: &TickRecord) {
        if record.tick_index % self.interval != 0 {
            return;
        }
        log::info!(
            "tick {}: prey={} predators={} grass={} births={} deaths={}",
            record.tick_index,
            record.count(Breed::Prey),
            record.count(Breed::Predator),
            record.count(Breed::Resource),
            record.births.values().sum::<usize>(),
            record.deaths.values().sum::<usize>(),
        );
    }
}
