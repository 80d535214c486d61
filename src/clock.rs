/// The longest frame the clock will catch up on, in s.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Turns variable frame times into a whole number of fixed-size ticks.
///
/// Each frame's time is clamped to `max_frame_time`, so a stalled frame can only
/// ever queue a bounded number of catch-up ticks.
#[derive(Clone, Copy, Debug)]
pub struct FixedTimestep {
    /// The length of a tick in s.
    timestep: f64,
    /// The longest frame time accepted, in s.
    max_frame_time: f64,
    /// Time received but not yet consumed by a tick, in s.
    accumulator: f64,
}

impl FixedTimestep {
    /// Creates a clock ticking `ticks_per_second` times per simulated second.
    ///
    /// # Panics
    /// If `ticks_per_second` is zero.
    pub fn new(ticks_per_second: u32, max_frame_time: f64) -> Self {
        assert!(ticks_per_second > 0, "a clock needs at least one tick per second");
        Self {
            timestep: 1.0 / ticks_per_second as f64,
            max_frame_time,
            accumulator: 0.0,
        }
    }

    /// The length of a tick in s.
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// The time received but not yet consumed, in s.
    pub fn pending(&self) -> f64 {
        self.accumulator
    }

    /// Adds the time taken by a frame.
    pub fn accumulate(&mut self, frame_time: f64) {
        self.accumulator += frame_time.clamp(0.0, self.max_frame_time);
    }

    /// Consumes one tick's worth of time, if there is enough.
    pub fn consume(&mut self) -> bool {
        if self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ticks(clock: &mut FixedTimestep, frame_time: f64) -> usize {
        clock.accumulate(frame_time);
        std::iter::from_fn(|| clock.consume().then_some(())).count()
    }

    #[test]
    fn ticks_are_decoupled_from_frames() {
        let mut clock = FixedTimestep::new(50, MAX_FRAME_TIME);
        assert_eq!(ticks(&mut clock, 0.01), 0);
        assert_eq!(ticks(&mut clock, 0.01), 1);
        assert_eq!(ticks(&mut clock, 0.05), 2);
        assert_approx_eq!(clock.pending(), 0.01);
    }

    #[test]
    fn stalls_are_clamped() {
        let mut clock = FixedTimestep::new(50, MAX_FRAME_TIME);
        assert_eq!(ticks(&mut clock, 10.0), 12);
        assert!(clock.pending() < clock.timestep());
    }

    #[test]
    fn negative_frame_time_is_ignored() {
        let mut clock = FixedTimestep::new(20, MAX_FRAME_TIME);
        assert_eq!(ticks(&mut clock, -1.0), 0);
        assert_eq!(clock.pending(), 0.0);
    }
}
