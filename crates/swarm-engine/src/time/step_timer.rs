/// Converts successive frame timestamps (milliseconds) into step deltas.
///
/// The delta is zero on the first step, after a gap larger than the stall
/// threshold, and when time runs backwards. The previous timestamp is
/// replaced on every call, including the ones that yield zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTimer {
    previous_ms: Option<f64>,
    stall_threshold_ms: f64,
}

impl StepTimer {
    pub fn new(stall_threshold_ms: f64) -> Self {
        Self {
            previous_ms: None,
            stall_threshold_ms,
        }
    }

    /// Returns the delta in milliseconds since the previous call.
    pub fn advance(&mut self, timestamp_ms: f64) -> f64 {
        let delta = match self.previous_ms {
            Some(prev) => {
                let d = timestamp_ms - prev;
                if d < 0.0 || d > self.stall_threshold_ms || !d.is_finite() {
                    if d > self.stall_threshold_ms {
                        log::debug!("dropping {d:.1} ms stall");
                    }
                    0.0
                } else {
                    d
                }
            }
            None => 0.0,
        };
        self.previous_ms = Some(timestamp_ms);
        delta
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous_ms
    }

    pub fn stall_threshold_ms(&self) -> f64 {
        self.stall_threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_zero() {
        let mut t = StepTimer::new(500.0);
        assert_eq!(t.advance(1234.0), 0.0);
        assert_eq!(t.previous(), Some(1234.0));
    }

    #[test]
    fn regular_steps_report_the_gap() {
        let mut t = StepTimer::new(500.0);
        t.advance(1000.0);
        assert_eq!(t.advance(1016.0), 16.0);
        assert_eq!(t.advance(1032.5), 16.5);
    }

    #[test]
    fn stall_is_dropped_but_timestamp_kept() {
        let mut t = StepTimer::new(500.0);
        t.advance(1000.0);
        assert_eq!(t.advance(1700.0), 0.0);
        assert_eq!(t.previous(), Some(1700.0));
        assert_eq!(t.advance(1716.0), 16.0);
    }

    #[test]
    fn threshold_itself_is_not_a_stall() {
        let mut t = StepTimer::new(500.0);
        t.advance(0.0);
        assert_eq!(t.advance(500.0), 500.0);
    }

    #[test]
    fn backwards_time_yields_zero() {
        let mut t = StepTimer::new(500.0);
        t.advance(2000.0);
        assert_eq!(t.advance(1990.0), 0.0);
        assert_eq!(t.advance(2006.0), 16.0);
    }
}
