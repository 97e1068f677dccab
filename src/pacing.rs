use rand::Rng;
use std::thread;
use std::time::Duration;

/// Randomized pauses between page operations.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    enabled: bool,
}

impl Pacing {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn none() -> Self {
        Self { enabled: false }
    }

    pub fn tiny(&self) {
        self.sleep_between(0.5, 1.2);
    }

    pub fn short(&self) {
        self.sleep_between(1.2, 3.0);
    }

    pub fn medium(&self) {
        self.sleep_between(3.0, 5.0);
    }

    fn sleep_between(&self, min_secs: f64, max_secs: f64) {
        if let Some(d) = self.duration_between(min_secs, max_secs) {
            thread::sleep(d);
        }
    }

    fn duration_between(&self, min_secs: f64, max_secs: f64) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let secs = rand::thread_rng().gen_range(min_secs..max_secs);
        Some(Duration::from_secs_f64(secs))
    }
}
