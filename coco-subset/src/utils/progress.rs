use super::RateCounter;
use crate::common::*;

/// Periodic progress reports of a counted loop.
#[derive(Debug)]
pub struct Progress {
    title: &'static str,
    total: usize,
    index: usize,
    interval: NonZeroUsize,
    rate_counter: RateCounter,
}

impl Progress {
    pub fn new(title: &'static str, total: usize, interval: NonZeroUsize) -> Self {
        Self {
            title,
            total,
            index: 0,
            interval,
            rate_counter: RateCounter::new(Duration::from_secs(10)),
        }
    }

    /// Count one item. Returns true if a report was logged.
    pub fn tick(&mut self) -> bool {
        let index = self.index;
        self.index += 1;
        self.rate_counter.add(1.0);

        if index % self.interval.get() != 0 {
            return false;
        }

        match self.rate_counter.rate() {
            Some(rate) => info!(
                "{}: {} / {} ({:.1} images/s)",
                self.title, index, self.total, rate
            ),
            None => info!("{}: {} / {}", self.title, index, self.total),
        }
        true
    }

    pub fn count(&self) -> usize {
        self.index
    }
}
