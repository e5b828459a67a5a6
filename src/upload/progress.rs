//! Aggregate upload progress tracking.
//!
//! One tracker spans a whole upload plan, single file or batch. Progress is
//! the rounded percentage of `completed + in-flight` bytes over the plan
//! total. Reported values never regress, and 100 is only reached through
//! `file_completed`: an in-flight transfer caps at 99 so the bar cannot
//! show completion before the server acknowledged the last byte.

/// Tracks uploaded bytes across a sequence of file transfers.
#[derive(Debug)]
pub struct ProgressTracker {
    total_bytes: u64,
    completed_bytes: u64,
    in_flight_bytes: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    /// Creates a tracker for a plan totalling `total_bytes`.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            completed_bytes: 0,
            in_flight_bytes: 0,
            last_percent: None,
        }
    }

    /// Records bytes handed to the transport for the current file.
    ///
    /// Returns a new percentage to display, or `None` when the displayed
    /// value would not change. Capped at 99 while the transfer is in flight.
    pub fn chunk_sent(&mut self, bytes: u64) -> Option<u8> {
        self.in_flight_bytes += bytes;
        let percent = self.raw_percent().min(99);
        self.advance_to(percent)
    }

    /// Records a fully transferred file of `size` bytes.
    ///
    /// The file's bytes move from in-flight to completed, so the percentage
    /// reflects acknowledged data; the final file lands on exactly 100.
    pub fn file_completed(&mut self, size: u64) -> Option<u8> {
        self.completed_bytes += size;
        self.in_flight_bytes = 0;
        let percent = self.raw_percent();
        self.advance_to(percent)
    }

    /// The last percentage reported, or 0 before any progress.
    pub fn percent(&self) -> u8 {
        self.last_percent.unwrap_or(0)
    }

    fn raw_percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let uploaded = (self.completed_bytes + self.in_flight_bytes).min(self.total_bytes);
        ((uploaded as f64 / self.total_bytes as f64) * 100.0).round() as u8
    }

    fn advance_to(&mut self, percent: u8) -> Option<u8> {
        match self.last_percent {
            Some(last) if percent <= last => None,
            _ => {
                self.last_percent = Some(percent);
                Some(percent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_reaches_exactly_100_on_completion() {
        let mut tracker = ProgressTracker::new(1000);
        let mut reported = Vec::new();

        for _ in 0..10 {
            if let Some(p) = tracker.chunk_sent(100) {
                reported.push(p);
            }
        }
        // All bytes sent but not yet acknowledged: capped below 100
        assert_eq!(*reported.last().unwrap(), 99);

        let final_percent = tracker.file_completed(1000).unwrap();
        assert_eq!(final_percent, 100);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut tracker = ProgressTracker::new(500 + 10_000 + 15_000);
        let mut reported = Vec::new();
        let mut push = |p: Option<u8>| {
            if let Some(p) = p {
                reported.push(p);
            }
        };

        push(tracker.chunk_sent(500));
        push(tracker.file_completed(500));
        for _ in 0..10 {
            push(tracker.chunk_sent(1000));
        }
        push(tracker.file_completed(10_000));
        for _ in 0..15 {
            push(tracker.chunk_sent(1000));
        }
        push(tracker.file_completed(15_000));

        assert!(reported.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*reported.last().unwrap(), 100);
    }

    #[test]
    fn test_aggregate_reflects_total_not_per_file() {
        // Three files: 500, 10_000, 15_000 bytes
        let mut tracker = ProgressTracker::new(25_500);
        tracker.chunk_sent(500);
        let after_first = tracker.file_completed(500).unwrap_or(tracker.percent());
        // First file done is ~2% of the plan, not 100%
        assert_eq!(after_first, 2);
    }

    #[test]
    fn test_unchanged_percentage_not_reported_twice() {
        let mut tracker = ProgressTracker::new(1_000_000);
        assert!(tracker.chunk_sent(100).is_some());
        // A second tiny chunk rounds to the same percentage
        assert!(tracker.chunk_sent(100).is_none());
    }

    #[test]
    fn test_empty_plan_is_complete() {
        let mut tracker = ProgressTracker::new(0);
        assert_eq!(tracker.file_completed(0), Some(100));
    }
}
