//! Counters collected while processing a table.

use std::time::Duration;

/// Metrics collected during a table run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentMetrics {
    /// Enrichment queries issued.
    pub queries: usize,
    /// Resolve/validate cycles run.
    pub cycles: usize,
    /// Wall-clock time elapsed.
    pub wall_time: Duration,
}

impl EnrichmentMetrics {
    /// Adds another run's counters to these.
    pub fn absorb(&mut self, other: &Self) {
        self.queries += other.queries;
        self.cycles += other.cycles;
        self.wall_time += other.wall_time;
    }

    /// Average number of queries per cycle, zero when nothing ran.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn queries_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.queries as f64 / self.cycles as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_counters() {
        let mut total = EnrichmentMetrics::default();
        total.absorb(&EnrichmentMetrics {
            queries: 8,
            cycles: 2,
            wall_time: Duration::from_secs(3),
        });
        total.absorb(&EnrichmentMetrics {
            queries: 1,
            cycles: 1,
            wall_time: Duration::from_millis(500),
        });

        assert_eq!(total.queries, 9);
        assert_eq!(total.cycles, 3);
        assert_eq!(total.wall_time, Duration::from_millis(3500));
        assert!((total.queries_per_cycle() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_queries_per_cycle_empty() {
        assert!(EnrichmentMetrics::default().queries_per_cycle().abs() < f64::EPSILON);
    }
}
