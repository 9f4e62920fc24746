//! Search statistics tracking.

use std::time::{Duration, Instant};

use tracing::debug;

/// Statistics collected during one search (or summed over many).
#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    /// Nodes entered, leaves included
    pub nodes: u64,

    /// Nodes scored by the static evaluation
    pub leaves: u64,

    /// Nodes where the mover had no legal move
    pub dead_ends: u64,

    /// Sibling moves skipped by alpha-beta cutoffs
    pub branches_pruned: u64,

    /// Deepest fully completed iteration
    pub completed_depth: u8,

    /// Searches summed into these stats
    pub searches: u64,

    /// Wall time spent searching
    pub elapsed: Duration,

    start_time: Option<Instant>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            searches: 1,
            ..Default::default()
        }
    }

    /// Stop the timer started by [`SearchStats::new`].
    pub fn finish(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed = start.elapsed();
        }
    }

    /// Add another search's counters to these.
    pub fn absorb(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.leaves += other.leaves;
        self.dead_ends += other.dead_ends;
        self.branches_pruned += other.branches_pruned;
        self.completed_depth = self.completed_depth.max(other.completed_depth);
        self.searches += other.searches;
        self.elapsed += other.elapsed;
    }

    pub fn nodes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.nodes as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of generated branches that were cut off, in percent.
    pub fn pruning_pct(&self) -> f64 {
        if self.nodes > 0 {
            100.0 * self.branches_pruned as f64 / (self.nodes + self.branches_pruned) as f64
        } else {
            0.0
        }
    }

    /// Emit one tracing event for a finished search.
    pub fn log_summary(&self) {
        debug!(
            nodes = self.nodes,
            leaves = self.leaves,
            pruned = self.branches_pruned,
            depth = self.completed_depth,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "search finished"
        );
    }

    /// Print a summary of accumulated statistics
    pub fn print_summary(&self) {
        println!("Searches: {}", self.searches);
        println!("Nodes: {}", self.nodes);
        println!("Leaves: {}", self.leaves);
        println!("Dead ends: {}", self.dead_ends);
        println!("Branches pruned: {} ({:.1}%)", self.branches_pruned, self.pruning_pct());
        println!("Max completed depth: {}", self.completed_depth);
        println!("Search time: {:.2}s", self.elapsed.as_secs_f64());
        println!("Average rate: {:.0} nodes/sec", self.nodes_per_sec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_counters() {
        let mut total = SearchStats::default();
        let mut one = SearchStats::new();
        one.nodes = 10;
        one.branches_pruned = 5;
        one.completed_depth = 3;
        one.finish();
        total.absorb(&one);
        total.absorb(&one);
        assert_eq!(total.nodes, 20);
        assert_eq!(total.branches_pruned, 10);
        assert_eq!(total.completed_depth, 3);
        assert_eq!(total.searches, 2);
    }

    #[test]
    fn test_pruning_pct() {
        let stats = SearchStats {
            nodes: 75,
            branches_pruned: 25,
            ..Default::default()
        };
        assert!((stats.pruning_pct() - 25.0).abs() < 1e-9);
        assert_eq!(SearchStats::default().pruning_pct(), 0.0);
    }
}
