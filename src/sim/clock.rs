/// One tick handed out by the [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Zero-based step index.
    pub step: usize,
    /// Seconds elapsed since the start of the run at the beginning of this tick.
    pub elapsed_s: u64,
    /// Hour of day in `[0, 24)`.
    pub hour_of_day: f64,
}

/// A simulation clock that advances in fixed-length steps.
///
/// The clock finishes after `total` ticks; the caller may stop drawing
/// ticks at any step boundary.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3, 1800, 23.0);
/// let mut hours = Vec::new();
///
/// clock.run(|tick| hours.push(tick.hour_of_day));
/// assert_eq!(hours, vec![23.0, 23.5, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Number of ticks already handed out
    current: usize,
    /// Total ticks to run
    total: usize,
    /// Length of one tick in seconds
    timestep_s: u64,
    /// Hour of day at elapsed time zero
    start_hour: f64,
}

impl Clock {
    /// Creates a new clock.
    ///
    /// # Arguments
    ///
    /// * `total` - The total number of ticks the clock will run
    /// * `timestep_s` - Tick length in seconds
    /// * `start_hour` - Hour of day at the first tick
    pub fn new(total: usize, timestep_s: u64, start_hour: f64) -> Self {
        Self {
            current: 0,
            total,
            timestep_s,
            start_hour,
        }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The tick that starts now
    /// * `None` - If the clock has reached its total steps
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current < self.total {
            let tick = self.peek();
            self.current += 1;
            Some(tick)
        } else {
            None
        }
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }

    /// Seconds elapsed at the start of the next tick.
    pub fn elapsed_s(&self) -> u64 {
        self.current as u64 * self.timestep_s
    }

    /// Number of ticks already handed out.
    pub fn completed(&self) -> usize {
        self.current
    }

    /// Total number of ticks.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns `true` once every tick has been handed out.
    pub fn is_finished(&self) -> bool {
        self.current >= self.total
    }

    fn peek(&self) -> Tick {
        let elapsed_s = self.elapsed_s();
        Tick {
            step: self.current,
            elapsed_s,
            hour_of_day: hour_of_day(self.start_hour, elapsed_s),
        }
    }
}

/// Hour of day for a run that started at `start_hour`, `elapsed_s` seconds in.
pub fn hour_of_day(start_hour: f64, elapsed_s: u64) -> f64 {
    (start_hour + elapsed_s as f64 / 3600.0).rem_euclid(24.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = Clock::new(5, 60, 0.0);
        assert_eq!(clock.completed(), 0);
        assert_eq!(clock.total(), 5);
        assert_eq!(clock.elapsed_s(), 0);
        assert!(!clock.is_finished());
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(3, 60, 6.0);
        let first = clock.tick().unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.elapsed_s, 0);
        assert_eq!(first.hour_of_day, 6.0);

        let second = clock.tick().unwrap();
        assert_eq!(second.step, 1);
        assert_eq!(second.elapsed_s, 60);

        assert!(clock.tick().is_some());
        assert_eq!(clock.tick(), None);
        assert!(clock.is_finished());
        assert_eq!(clock.elapsed_s(), 180);
    }

    #[test]
    fn test_run() {
        let mut clock = Clock::new(4, 3600, 0.0);
        let mut steps = Vec::new();
        clock.run(|t| steps.push(t.step));
        assert_eq!(steps, vec![0, 1, 2, 3]);
        assert!(clock.is_finished());
    }

    #[test]
    fn test_zero_steps() {
        let mut clock = Clock::new(0, 60, 0.0);
        assert!(clock.is_finished());
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_hour_of_day_wraps() {
        assert_eq!(hour_of_day(22.0, 3 * 3600), 1.0);
        assert_eq!(hour_of_day(0.0, 48 * 3600), 0.0);
        assert_eq!(hour_of_day(12.0, 1800), 12.5);
    }
}
