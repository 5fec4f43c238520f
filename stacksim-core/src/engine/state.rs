//! Engine lifecycle state, run summary, and fatal error types.

use crate::domain::{EventError, EventKind};
use crate::strategy::StrategyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    Idle,
    Running,
    Done,
    Failed,
}

/// Errors that abort a run. Business rejections never show up here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine cannot run from status {0:?}")]
    NotRunnable(EngineStatus),

    #[error("{component} pushed an invalid event: {source}")]
    InvalidEvent {
        component: &'static str,
        #[source]
        source: EventError,
    },

    #[error("strategy '{strategy}' failed at {event}: {source}")]
    Strategy {
        strategy: String,
        event: String,
        #[source]
        source: StrategyError,
    },
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Units of work popped from the queue.
    pub units: usize,
    /// Events broadcast, by kind.
    pub events: BTreeMap<EventKind, usize>,
    /// Largest unit of work (simultaneous market events).
    pub max_batch: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_events(&self) -> usize {
        self.events.values().sum()
    }

    pub(crate) fn record(&mut self, kind: EventKind) {
        *self.events.entry(kind).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_by_kind() {
        let mut s = RunSummary::default();
        s.record(EventKind::Market);
        s.record(EventKind::Market);
        s.record(EventKind::Fill);
        assert_eq!(s.count(EventKind::Market), 2);
        assert_eq!(s.count(EventKind::Fill), 1);
        assert_eq!(s.count(EventKind::Signal), 0);
        assert_eq!(s.total_events(), 3);
    }

    #[test]
    fn summary_serializes_kind_keys() {
        let mut s = RunSummary::default();
        s.record(EventKind::FillDeclined);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"FILL_DECLINED\":1"));
    }
}
