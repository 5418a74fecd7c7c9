use std::sync::atomic::{AtomicU64, Ordering};

use andrew_core::{Error, ErrorKind};

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok,
    NotFound,
    PermissionDenied,
    ParseFailure,
    TemplateFailure,
    Unknown,
}

impl Outcome {
    pub fn from_error(err: &Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Outcome::NotFound,
            ErrorKind::PermissionDenied => Outcome::PermissionDenied,
            ErrorKind::ParseFailure => Outcome::ParseFailure,
            ErrorKind::TemplateFailure => Outcome::TemplateFailure,
            ErrorKind::Unknown => Outcome::Unknown,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Receives one outcome per served request.
pub trait MetricsSink: Send + Sync {
    fn record(&self, path: &str, outcome: Outcome);
}

/// Writes every outcome to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn record(&self, path: &str, outcome: Outcome) {
        match outcome {
            Outcome::Ok => log::info!("GET /{path} ok"),
            Outcome::NotFound | Outcome::PermissionDenied => {
                log::warn!("GET /{path} {outcome:?}")
            }
            _ => log::error!("GET /{path} {outcome:?}"),
        }
    }
}

/// Counts outcomes in memory.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    counts: [AtomicU64; 6],
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts[outcome.index()].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl MetricsSink for CountingMetrics {
    fn record(&self, _path: &str, outcome: Outcome) {
        self.counts[outcome.index()].fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_outcome_separately() {
        let metrics = CountingMetrics::new();
        metrics.record("a.html", Outcome::Ok);
        metrics.record("b.html", Outcome::Ok);
        metrics.record("c.html", Outcome::NotFound);

        assert_eq!(metrics.count(Outcome::Ok), 2);
        assert_eq!(metrics.count(Outcome::NotFound), 1);
        assert_eq!(metrics.count(Outcome::Unknown), 0);
        assert_eq!(metrics.total(), 3);
    }

    #[test]
    fn outcome_follows_error_kind() {
        let err = Error::parse("page.html", "too deep");
        assert_eq!(Outcome::from_error(&err), Outcome::ParseFailure);

        let err = Error::io(
            "page.html",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(Outcome::from_error(&err), Outcome::PermissionDenied);
    }
}
