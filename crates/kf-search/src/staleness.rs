//! Best-so-far tracking shared by both searches.

/// Margin a score must exceed the current best by to replace it.
pub const EPSILON: f64 = 0.001;

/// Tracks the best score and how many consecutive observations failed to
/// improve on it.
#[derive(Debug, Clone, PartialEq)]
pub struct BestTracker {
    best_score: f64,
    unchanged: usize,
    staleness: usize,
}

impl BestTracker {
    pub fn new(staleness: usize) -> Self {
        Self::starting_at(f64::NEG_INFINITY, staleness)
    }

    pub fn starting_at(best_score: f64, staleness: usize) -> Self {
        Self {
            best_score,
            unchanged: 0,
            staleness,
        }
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn unchanged(&self) -> usize {
        self.unchanged
    }

    /// Returns `true` if `score` became the new best. Ties and improvements
    /// within [`EPSILON`] count as unchanged.
    pub fn observe(&mut self, score: f64) -> bool {
        if score - EPSILON > self.best_score {
            self.best_score = score;
            self.unchanged = 0;
            true
        } else {
            self.unchanged += 1;
            false
        }
    }

    pub fn is_stale(&self) -> bool {
        self.unchanged >= self.staleness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improvement_must_exceed_epsilon() {
        let mut tracker = BestTracker::new(3);
        assert!(tracker.observe(0.5));
        assert!(!tracker.observe(0.5005));
        assert_eq!(tracker.best_score(), 0.5);
        assert!(tracker.observe(0.502));
        assert_eq!(tracker.best_score(), 0.502);
        assert_eq!(tracker.unchanged(), 0);
    }

    #[test]
    fn negative_infinity_never_improves() {
        let mut tracker = BestTracker::new(2);
        assert!(!tracker.observe(f64::NEG_INFINITY));
        assert_eq!(tracker.unchanged(), 1);
        assert!(!tracker.is_stale());
        assert!(!tracker.observe(f64::NEG_INFINITY));
        assert!(tracker.is_stale());
    }

    #[test]
    fn best_never_regresses() {
        let mut tracker = BestTracker::new(10);
        let mut previous = tracker.best_score();
        for score in [0.2, 0.1, 0.4, 0.3999, 0.35, 0.9, 0.0] {
            tracker.observe(score);
            assert!(tracker.best_score() >= previous);
            previous = tracker.best_score();
        }
        assert_eq!(tracker.best_score(), 0.9);
    }
}
