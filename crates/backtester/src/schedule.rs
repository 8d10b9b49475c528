// In crates/backtester/src/schedule.rs

/// Decides which bars are check boundaries.
///
/// Time is split into fixed buckets of `interval_ms`; the first bar that falls
/// into a new bucket is a boundary. The first bar of a run is always one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSchedule {
    interval_ms: i64,
    last_bucket: Option<i64>,
}

impl CheckSchedule {
    /// `interval_secs` is clamped to at least one second.
    pub fn new(interval_secs: u64) -> Self {
        let interval_ms = i64::try_from(interval_secs.max(1))
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        Self {
            interval_ms,
            last_bucket: None,
        }
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Returns true and advances if `open_time` starts a new bucket.
    pub fn is_boundary(&mut self, open_time: i64) -> bool {
        let bucket = open_time.div_euclid(self.interval_ms);
        if self.last_bucket == Some(bucket) {
            return false;
        }
        self.last_bucket = Some(bucket);
        true
    }
}

impl Default for CheckSchedule {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_bar_is_always_a_boundary() {
        let mut schedule = CheckSchedule::default();
        // Minute zero of an hour.
        assert!(schedule.is_boundary(3_600_000));
    }

    #[test]
    fn one_minute_bars_are_each_a_boundary() {
        let mut schedule = CheckSchedule::new(60);
        let fired: Vec<bool> = (0..5).map(|i| schedule.is_boundary(i * 60_000)).collect();
        assert_eq!(fired, vec![true; 5]);
    }

    #[test]
    fn sub_interval_bars_fire_once_per_bucket() {
        let mut schedule = CheckSchedule::new(60);
        let fired: Vec<bool> = [0, 15_000, 30_000, 60_000, 75_000, 120_000]
            .into_iter()
            .map(|t| schedule.is_boundary(t))
            .collect();
        assert_eq!(fired, vec![true, false, false, true, false, true]);
    }

    #[test]
    fn bars_an_hour_apart_still_fire() {
        let mut schedule = CheckSchedule::new(60);
        assert!(schedule.is_boundary(0));
        assert!(schedule.is_boundary(3_600_000));
        assert!(schedule.is_boundary(7_200_000));
    }
}
