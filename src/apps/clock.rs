use std::time::{Duration, Instant};

/// Repeating timer driven by the event loop's `tick` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    pub fn start(now: Instant, period: Duration) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    /// Number of whole periods that elapsed up to `now`.
    pub fn elapsed(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        if self.period.is_zero() {
            return fired;
        }
        while self.next <= now {
            self.next += self.period;
            fired += 1;
        }
        fired
    }
}

/// Format whole seconds as `HH:MM:SS`.
pub fn format_hms(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whole_periods() {
        let t0 = Instant::now();
        let mut interval = Interval::start(t0, Duration::from_secs(1));
        assert_eq!(interval.elapsed(t0 + Duration::from_millis(999)), 0);
        assert_eq!(interval.elapsed(t0 + Duration::from_millis(3500)), 3);
        assert_eq!(interval.elapsed(t0 + Duration::from_millis(3900)), 0);
        assert_eq!(interval.elapsed(t0 + Duration::from_secs(4)), 1);
    }

    #[test]
    fn hms_pads_each_field() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3725), "01:02:05");
        assert_eq!(format_hms(360_000), "100:00:00");
    }
}
