//! Inbound frame limits for player connections.
//!
//! Every connection gets a burst window (per second) and a sustained window
//! (per minute). A frame is processed only when both windows admit it; a
//! refused frame is answered with an error and otherwise dropped.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Sliding window over the arrival times of recently admitted frames.
#[derive(Debug)]
pub struct SlidingWindow {
    arrivals: VecDeque<Instant>,
    capacity: usize,
    span: Duration,
}

impl SlidingWindow {
    /// Admit at most `capacity` frames in any `span`.
    ///
    /// ```
    /// use lh_server::api::rate_limiter::SlidingWindow;
    /// use std::time::{Duration, Instant};
    ///
    /// let mut window = SlidingWindow::new(2, Duration::from_secs(1));
    /// let now = Instant::now();
    /// assert!(window.admit_at(now));
    /// assert!(window.admit_at(now));
    /// assert!(!window.admit_at(now));
    /// ```
    pub fn new(capacity: usize, span: Duration) -> Self {
        Self {
            arrivals: VecDeque::with_capacity(capacity),
            capacity,
            span,
        }
    }

    /// Records a frame arriving at `now` if the window has room for it.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        while self
            .arrivals
            .front()
            .is_some_and(|&first| now.saturating_duration_since(first) >= self.span)
        {
            self.arrivals.pop_front();
        }

        if self.arrivals.len() >= self.capacity {
            return false;
        }
        self.arrivals.push_back(now);
        true
    }

    /// Frames admitted within the current span.
    pub fn in_flight(&self) -> usize {
        self.arrivals.len()
    }
}

/// Which limit refused a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Window {
    Burst,
    Sustained,
}

impl Window {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Burst => "burst",
            Self::Sustained => "sustained",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The pair of windows guarding one connection.
#[derive(Debug)]
pub struct InboundLimits {
    burst: SlidingWindow,
    sustained: SlidingWindow,
}

impl InboundLimits {
    /// `burst_limit` frames per second and `sustained_limit` per minute.
    pub fn new(burst_limit: usize, sustained_limit: usize) -> Self {
        Self {
            burst: SlidingWindow::new(burst_limit, Duration::from_secs(1)),
            sustained: SlidingWindow::new(sustained_limit, Duration::from_secs(60)),
        }
    }

    pub fn admit(&mut self) -> Result<(), Window> {
        self.admit_at(Instant::now())
    }

    /// A frame refused by the burst window doesn't count against the
    /// sustained one.
    pub fn admit_at(&mut self, now: Instant) -> Result<(), Window> {
        if !self.burst.admit_at(now) {
            return Err(Window::Burst);
        }
        if !self.sustained.admit_at(now) {
            return Err(Window::Sustained);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_refuses_over_capacity() {
        let mut window = SlidingWindow::new(3, Duration::from_secs(1));
        let now = Instant::now();
        for _ in 0..3 {
            assert!(window.admit_at(now));
        }
        assert!(!window.admit_at(now));
        assert_eq!(window.in_flight(), 3);
    }

    #[test]
    fn test_window_slides() {
        let mut window = SlidingWindow::new(2, Duration::from_millis(100));
        let start = Instant::now();
        assert!(window.admit_at(start));
        assert!(window.admit_at(start + Duration::from_millis(60)));
        assert!(!window.admit_at(start + Duration::from_millis(90)));

        // The first arrival has aged out; the second has not.
        assert!(window.admit_at(start + Duration::from_millis(100)));
        assert_eq!(window.in_flight(), 2);
        assert!(!window.admit_at(start + Duration::from_millis(150)));
    }

    #[test]
    fn test_burst_refuses_first() {
        let mut limits = InboundLimits::new(10, 100);
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limits.admit_at(now).is_ok());
        }
        assert_eq!(limits.admit_at(now), Err(Window::Burst));
        assert_eq!(limits.sustained.in_flight(), 10);
    }

    #[test]
    fn test_sustained_limit_across_seconds() {
        let mut limits = InboundLimits::new(10, 3);
        let start = Instant::now();
        for second in 0..3 {
            assert!(limits.admit_at(start + Duration::from_secs(second)).is_ok());
        }
        assert_eq!(
            limits.admit_at(start + Duration::from_secs(3)),
            Err(Window::Sustained)
        );
        assert!(limits.admit_at(start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_window_labels() {
        assert_eq!(Window::Burst.to_string(), "burst");
        assert_eq!(Window::Sustained.as_str(), "sustained");
    }
}
