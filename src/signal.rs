pub mod region;

use crate::instance::FrameKey;

/// Temporal presence signal over frame indices, kept as a normalized set of
/// half-open `[start, end)` intervals.
///
/// The signal is immutable once constructed; all set operations return a new
/// signal. An empty signal stands in for "no temporal extent".
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemporalSignal {
    intervals: Vec<(FrameKey, FrameKey)>,
}

impl TemporalSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a signal from arbitrary intervals. Degenerate intervals
    /// (`end <= start`) are dropped, overlapping and adjacent intervals are
    /// merged.
    ///
    pub fn from_intervals(intervals: &[(FrameKey, FrameKey)]) -> Self {
        let mut src: Vec<(FrameKey, FrameKey)> = intervals
            .iter()
            .copied()
            .filter(|(start, end)| end > start)
            .collect();
        src.sort_unstable();

        let mut merged: Vec<(FrameKey, FrameKey)> = Vec::with_capacity(src.len());
        for (start, end) in src {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end => {
                    *last_end = (*last_end).max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        Self { intervals: merged }
    }

    pub fn from_range(start: FrameKey, end: FrameKey) -> Self {
        Self::from_intervals(&[(start, end)])
    }

    pub fn intervals(&self) -> &[(FrameKey, FrameKey)] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total signal length in frames.
    pub fn area(&self) -> f64 {
        self.intervals
            .iter()
            .map(|(start, end)| (end - start) as f64)
            .sum()
    }

    pub fn contains(&self, frame: FrameKey) -> bool {
        let idx = self.intervals.partition_point(|(start, _)| *start <= frame);
        idx > 0 && frame < self.intervals[idx - 1].1
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let (a, b) = (&self.intervals, &other.intervals);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let start = a[i].0.max(b[j].0);
            let end = a[i].1.min(b[j].1);
            if start < end {
                out.push((start, end));
            }
            if a[i].1 < b[j].1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { intervals: out }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut all = self.intervals.clone();
        all.extend_from_slice(&other.intervals);
        Self::from_intervals(&all)
    }
}

#[cfg(test)]
mod temporal_signal_tests {
    use crate::signal::TemporalSignal;

    #[test]
    fn normalizes_unordered_and_overlapping_intervals() {
        let s = TemporalSignal::from_intervals(&[(10, 20), (5, 12), (30, 30), (25, 27)]);
        assert_eq!(s.intervals(), &[(5, 20), (25, 27)]);
        assert_eq!(s.area(), 17.0);
    }

    #[test]
    fn merges_adjacent_intervals() {
        let s = TemporalSignal::from_intervals(&[(0, 5), (5, 10)]);
        assert_eq!(s.intervals(), &[(0, 10)]);
    }

    #[test]
    fn membership_respects_half_open_bounds() {
        let s = TemporalSignal::from_range(10, 20);
        assert!(!s.contains(9));
        assert!(s.contains(10));
        assert!(s.contains(19));
        assert!(!s.contains(20));
    }

    #[test]
    fn intersection_of_disjoint_signals_is_empty() {
        let a = TemporalSignal::from_range(0, 10);
        let b = TemporalSignal::from_range(10, 20);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn intersection_across_multiple_intervals() {
        let a = TemporalSignal::from_intervals(&[(0, 10), (20, 30)]);
        let b = TemporalSignal::from_intervals(&[(5, 25)]);
        assert_eq!(a.intersection(&b).intervals(), &[(5, 10), (20, 25)]);
    }

    #[test]
    fn union_covers_both_operands() {
        let a = TemporalSignal::from_intervals(&[(0, 10)]);
        let b = TemporalSignal::from_intervals(&[(5, 15), (20, 25)]);
        let u = a.union(&b);
        assert_eq!(u.intervals(), &[(0, 15), (20, 25)]);
        assert_eq!(u.area(), 20.0);
    }
}
