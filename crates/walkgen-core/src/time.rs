/// Tolerance used when comparing wall-clock times against deadlines.
pub const TIME_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Threshold gate firing once per `period`.
///
/// The deadline only moves forward; a late call fires once and the next
/// deadline is one period after the previous one, not after the call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    period: f64,
    deadline: f64,
}

impl Cadence {
    /// Create a gate whose first deadline is `start`.
    #[must_use]
    pub const fn new(period: f64, start: f64) -> Self {
        Self {
            period,
            deadline: start,
        }
    }

    #[must_use]
    pub const fn period(&self) -> f64 {
        self.period
    }

    /// Next time at which the gate fires.
    #[must_use]
    pub const fn deadline(&self) -> f64 {
        self.deadline
    }

    /// Inclusive within `TIME_EPSILON`: a call exactly at the deadline fires,
    /// so a gate created with `start = t0` fires on the first call at `t0`.
    #[must_use]
    pub fn is_due(&self, time: f64) -> bool {
        time + TIME_EPSILON >= self.deadline
    }

    /// Move to the next deadline, returning the one just passed.
    pub fn advance(&mut self) -> f64 {
        let passed = self.deadline;
        self.deadline += self.period;
        passed
    }
}

/// Sample instants of a horizon whose first interval is `first_period`.
///
/// Entry 0 is `start`; entry 1 is `start + first_period`; later entries
/// are spaced by `period`. Returns `n + 1` instants so the end of the last
/// sample is included.
#[must_use]
pub fn sampling_times(start: f64, first_period: f64, period: f64, n: usize) -> Vec<f64> {
    let mut times = Vec::with_capacity(n + 1);
    times.push(start);
    let mut t = start + first_period;
    for _ in 0..n {
        times.push(t);
        t += period;
    }
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cadence_fires_at_deadline() {
        let mut gate = Cadence::new(0.1, 0.0);
        assert!(gate.is_due(0.0));
        assert_relative_eq!(gate.advance(), 0.0);
        assert!(!gate.is_due(0.05));
        assert!(gate.is_due(0.1 - 1e-9));
        assert_relative_eq!(gate.advance(), 0.1);
        assert_relative_eq!(gate.deadline(), 0.2);
    }

    #[test]
    fn late_call_fires_once_per_period() {
        let mut gate = Cadence::new(0.02, 0.0);
        gate.advance();
        assert!(gate.is_due(0.5));
        gate.advance();
        assert_relative_eq!(gate.deadline(), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn sampling_times_with_short_first_period() {
        let times = sampling_times(1.0, 0.04, 0.1, 3);
        assert_eq!(times.len(), 4);
        assert_relative_eq!(times[1], 1.04, epsilon = 1e-12);
        assert_relative_eq!(times[3], 1.24, epsilon = 1e-12);
    }
}
