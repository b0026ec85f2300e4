use serde::Serialize;

/// Monotonic scene time fed by the host once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SceneClock {
    current_time: f32,
    delta_time: f32,
}

impl SceneClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new host reading and returns the time elapsed since the
    /// previous one. A stalled host clock yields a zero delta.
    pub fn tick(&mut self, now_seconds: f32) -> f32 {
        self.delta_time = now_seconds - self.current_time;
        self.current_time = now_seconds;
        self.delta_time
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }
}

#[cfg(test)]
mod tests {
    use super::SceneClock;

    #[test]
    fn first_tick_measures_from_zero() {
        let mut clock = SceneClock::new();
        assert_eq!(clock.tick(0.25), 0.25);
        assert_eq!(clock.current_time(), 0.25);
    }

    #[test]
    fn tick_reports_frame_to_frame_delta() {
        let mut clock = SceneClock::new();
        clock.tick(1.0);
        let delta = clock.tick(1.5);
        assert!((delta - 0.5).abs() < 1e-6);
        assert!((clock.delta_time() - 0.5).abs() < 1e-6);
        assert_eq!(clock.current_time(), 1.5);
    }

    #[test]
    fn stalled_host_clock_yields_zero_delta() {
        let mut clock = SceneClock::new();
        clock.tick(3.0);
        assert_eq!(clock.tick(3.0), 0.0);
        assert_eq!(clock.tick(3.0), 0.0);
        assert_eq!(clock.current_time(), 3.0);
    }
}
