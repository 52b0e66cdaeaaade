//! Step counter behind the animated walkthroughs.
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walkthrough {
    step: usize,
    last_step: usize,
    interval_ms: u64,
    animating: bool,
}

impl Walkthrough {
    pub fn new(last_step: usize, interval: Duration) -> Self {
        Self {
            step: 0,
            last_step,
            interval_ms: interval.as_millis() as u64,
            animating: false,
        }
    }

    /// Toy network: steps 0..=4 every 1.5 s.
    pub fn toy() -> Self {
        Self::new(4, Duration::from_millis(1500))
    }

    /// 2-2-2 network: steps 0..=8 every second.
    pub fn multilayer() -> Self {
        Self::new(8, Duration::from_millis(1000))
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn last_step(&self) -> usize {
        self.last_step
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Restart the animation from step 0.
    pub fn start(&mut self) {
        self.step = 0;
        self.animating = true;
    }

    /// Timer callback. Past the last step the counter wraps to 0 and the
    /// animation stops.
    pub fn tick(&mut self) -> usize {
        if !self.animating {
            return self.step;
        }
        if self.step >= self.last_step {
            self.step = 0;
            self.animating = false;
        } else {
            self.step += 1;
        }
        self.step
    }

    pub fn next(&mut self) -> usize {
        self.step = (self.step + 1).min(self.last_step);
        self.step
    }

    pub fn prev(&mut self) -> usize {
        self.step = self.step.saturating_sub(1);
        self.step
    }

    pub fn reset(&mut self) {
        self.step = 0;
        self.animating = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_wraps_and_stops() {
        let mut w = Walkthrough::toy();
        w.start();
        let seen: Vec<usize> = (0..6).map(|_| w.tick()).collect();
        assert_eq!(seen, vec![1, 2, 3, 4, 0, 0]);
        assert!(!w.is_animating());
    }

    #[test]
    fn manual_paging_is_clamped() {
        let mut w = Walkthrough::multilayer();
        assert_eq!(w.prev(), 0);
        for _ in 0..20 {
            w.next();
        }
        assert_eq!(w.step(), 8);
        w.reset();
        assert_eq!(w.step(), 0);
        assert_eq!(w.interval(), Duration::from_secs(1));
    }

    #[test]
    fn idle_tick_holds() {
        let mut w = Walkthrough::toy();
        w.next();
        assert_eq!(w.tick(), 1);
    }
}
